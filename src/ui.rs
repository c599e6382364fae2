use crate::app::{App, Dialog, Pane, ToastKind};
use crate::forms::{Form, FieldKind};
use crate::models::{Task, TaskStatus};
use crate::paginator::PageLink;
use crate::route::Route;
use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((r.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// `#rrggbb` to a terminal colour.
fn hex_color(input: &str) -> Option<Color> {
    let hex = input.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::ToDo => Color::Blue,
        TaskStatus::InProgress => Color::Yellow,
        TaskStatus::Done => Color::Green,
    }
}

fn key_span(key: &'static str) -> Span<'static> {
    Span::styled(format!(" {} ", key), Style::default().fg(Color::Red))
}

fn legend_line(entries: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for &(key, action) in entries {
        spans.push(key_span(key));
        spans.push(Span::raw(format!(": {} ", action)));
    }
    Line::from(spans)
}

fn get_legend(app: &App) -> Text<'static> {
    let entries: &[(&str, &str)] = match (&app.dialog, app.route()) {
        (Some(Dialog::Name { .. }), _) => &[("Enter", "Save"), ("Esc", "Cancel")],
        (Some(Dialog::Confirm { .. }), _) => &[("y", "Delete"), ("n", "Cancel")],
        (None, Route::Login) => &[
            ("Tab", "Next Field"),
            ("Enter", "Log In"),
            ("Ctrl-n", "Sign Up"),
            ("Ctrl-c", "Quit"),
        ],
        (None, Route::Signup) => &[("Tab", "Next Field"), ("Enter", "Sign Up"), ("Esc", "Log In")],
        (None, Route::Dashboard) => &[
            ("q", "Quit"),
            ("Tab", "Switch Pane"),
            ("j/k", "Move"),
            ("Enter", "Open"),
            ("n", "New"),
            ("r", "Rename"),
            ("d", "Delete"),
            ("u", "Users"),
            ("R", "Reload"),
            ("p", "Username"),
            ("X", "Delete Account"),
            ("L", "Log Out"),
        ],
        (None, Route::Project { .. } | Route::ProjectTasks { .. }) => &[
            ("Esc", "Back"),
            ("j/k", "Move"),
            ("a", "Add Task"),
            ("e", "Edit"),
            ("s", "Start/Finish"),
            ("d", "Delete"),
            ("r", "Reload"),
        ],
        (None, Route::NewTask { .. } | Route::EditTask { .. }) => &[
            ("Tab", "Next Field"),
            ("Left/Right", "Change Choice"),
            ("Enter", "Save"),
            ("Esc", "Cancel"),
        ],
        (None, Route::Users(_)) => &[
            ("Up/Down", "Select"),
            ("Left/Right", "Page"),
            ("Home/End", "First/Last"),
            ("Enter", "Add/Remove Member"),
            ("Esc", "Back"),
        ],
    };
    Text::from(legend_line(entries))
}

fn draw_form(f: &mut Frame, form: &Form, area: Rect) {
    let width = area.width.min(60);
    let height = (form.fields.len() as u16 * 3 + 4).min(area.height);
    let area = centered_rect_absolute(width, height, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(form.title.clone())
        .style(Style::default().fg(Color::Green));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut constraints: Vec<Constraint> = form.fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Min(1));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let border = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut value = field.display();
        if focused && !matches!(field.kind, FieldKind::Choice(_)) {
            value.push('_');
        }
        let input = Paragraph::new(value)
            .style(Style::default().fg(Color::White))
            .block(Block::default().borders(Borders::ALL).title(field.label).border_style(border));
        f.render_widget(input, rows[i]);
    }

    if let Some(error) = &form.error {
        let error = Paragraph::new(error.clone())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        f.render_widget(error, rows[form.fields.len()]);
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).title(title).border_style(style)
}

fn list_state(selected: Option<usize>) -> ListState {
    let mut state = ListState::default();
    state.select(selected);
    state
}

fn highlighted(list: List<'static>) -> List<'static> {
    list.highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ")
}

fn placeholder(loading: bool, error: Option<&str>, empty: &str) -> ListItem<'static> {
    match (loading, error) {
        (true, _) => ListItem::new("Loading..."),
        (false, Some(error)) => {
            ListItem::new(Span::styled(error.to_string(), Style::default().fg(Color::Red)))
        }
        (false, None) => ListItem::new(empty.to_string()),
    }
}

fn draw_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let store = &app.store;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[1]);

    // Organizations
    let orgs = &store.organizations;
    let items: Vec<ListItem> = if orgs.items().is_empty() {
        vec![placeholder(orgs.loading(), orgs.error(), "No organizations yet, press n")]
    } else {
        orgs.items().iter().map(|o| ListItem::new(o.name.clone())).collect()
    };
    let title = match store.me.user() {
        Some(me) => format!("Organizations ({})", me.username),
        None => "Organizations".to_string(),
    };
    let list = highlighted(List::new(items).block(pane_block(title, app.pane == Pane::Organizations)));
    f.render_stateful_widget(list, left[0], &mut list_state(orgs.selected_index()));

    // Memberships
    let memberships = &store.membership.memberships;
    let items: Vec<ListItem> = if memberships.items().is_empty() {
        vec![placeholder(memberships.loading(), memberships.error(), "No memberships")]
    } else {
        memberships
            .items()
            .iter()
            .map(|m| {
                ListItem::new(Line::from(vec![
                    Span::raw(m.organization.name.clone()),
                    Span::styled(
                        format!("  since {}", m.joined_at.format("%b %-d, %Y")),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };
    f.render_widget(List::new(items).block(pane_block("Member Of".into(), false)), left[1]);

    // Projects
    let projects = &store.projects;
    let org_name = orgs.selected().map(|o| o.name.as_str()).unwrap_or("-");
    let items: Vec<ListItem> = if projects.items().is_empty() {
        vec![placeholder(projects.loading(), projects.error(), "No projects, press n")]
    } else {
        projects.items().iter().map(|p| ListItem::new(p.name.clone())).collect()
    };
    let list = highlighted(
        List::new(items).block(pane_block(format!("Projects in {}", org_name), app.pane == Pane::Projects)),
    );
    f.render_stateful_widget(list, right[0], &mut list_state(projects.selected_index()));

    // Members of the selected organization
    let members = &store.membership.members;
    let items: Vec<ListItem> = if members.items().is_empty() {
        vec![placeholder(members.loading(), members.error(), "No members")]
    } else {
        members
            .items()
            .iter()
            .map(|m| ListItem::new(format!("@{}", m.username)))
            .collect()
    };
    let title = format!("Members ({})", store.membership.members_ids().len());
    f.render_widget(List::new(items).block(pane_block(title, false)), right[1]);
}

fn task_item(task: &Task, today: NaiveDate) -> ListItem<'static> {
    let swatch = hex_color(&task.color).unwrap_or(Color::White);
    let mut meta = vec![Span::styled(
        format!("[{}] ", task.status),
        Style::default().fg(status_color(task.status)),
    )];
    if let Some(due) = task.due_label(today) {
        let style = if task.is_near_due(today) {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        meta.push(Span::styled(format!("{} ", due), style));
    }
    meta.push(Span::raw(format!("@ {}", task.assignee_label())));

    ListItem::new(vec![
        Line::from(vec![
            Span::styled("● ", Style::default().fg(swatch)),
            Span::styled(task.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(meta),
    ])
}

fn task_detail(task: &Task, today: NaiveDate) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(task.name.clone(), bold)),
        Line::from(vec![
            Span::styled("Status: ", bold),
            Span::styled(task.status.to_string(), Style::default().fg(status_color(task.status))),
        ]),
        Line::from(vec![
            Span::styled("Due Date: ", bold),
            Span::raw(task.due_label(today).unwrap_or_else(|| "No due date".to_string())),
        ]),
    ];

    let assignee = match &task.assignee {
        Some(a) if !a.initials().is_empty() => format!("{} ({})", a.display_name(), a.initials()),
        _ => task.assignee_label(),
    };
    lines.push(Line::from(vec![Span::styled("Assignee: ", bold), Span::raw(assignee)]));
    if let Some(updated) = task.updated_at {
        lines.push(Line::from(vec![
            Span::styled("Updated: ", bold),
            Span::raw(updated.with_timezone(&Local).format("%b %-d, %Y %H:%M").to_string()),
        ]));
    }

    lines.push(Line::from(Span::styled("Description: ", bold)));
    if task.description.trim().is_empty() {
        lines.push(Line::from("No description"));
    } else {
        lines.extend(task.description.lines().map(|l| Line::from(l.to_string())));
    }
    lines
}

fn draw_project(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let today = Local::now().date_naive();
    let tasks = &app.store.tasks;

    let title = match app.store.projects.selected() {
        Some(project) => format!("Tasks in {}", project.name),
        None => "Tasks".to_string(),
    };
    let items: Vec<ListItem> = if tasks.items().is_empty() {
        vec![placeholder(tasks.loading(), tasks.error(), "No tasks available")]
    } else {
        tasks.items().iter().map(|t| task_item(t, today)).collect()
    };
    let list = highlighted(List::new(items).block(pane_block(title, true)));
    f.render_stateful_widget(list, chunks[0], &mut list_state(tasks.selected_index()));

    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");
    let detail = match tasks.selected() {
        Some(task) => Paragraph::new(task_detail(task, today)),
        None => Paragraph::new("Select a task to see its details"),
    };
    f.render_widget(detail.block(detail_block).wrap(Wrap { trim: true }), chunks[1]);
}

fn page_spans(links: &[PageLink]) -> Vec<Span<'static>> {
    links
        .iter()
        .map(|link| match link {
            PageLink::Previous { .. } => Span::raw(" < Prev "),
            PageLink::Next { .. } => Span::raw(" Next > "),
            PageLink::Ellipsis => Span::raw(" ... "),
            PageLink::Page { page, .. } => {
                let style = if link.is_active() {
                    Style::default().fg(Color::Black).bg(Color::Green)
                } else {
                    Style::default()
                };
                Span::styled(format!(" {} ", page), style)
            }
        })
        .collect()
}

fn draw_users(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let input = Paragraph::new(format!("{}_", app.search.input_text()))
        .block(Block::default().borders(Borders::ALL).title("Search users"));
    f.render_widget(input, chunks[0]);

    let search = &app.store.search;
    let org = app.store.organizations.selected();
    let items: Vec<ListItem> = if search.data().data.is_empty() {
        vec![placeholder(search.loading(), search.error(), "No users found")]
    } else {
        search
            .data()
            .data
            .iter()
            .map(|user| {
                let mut spans = vec![
                    Span::styled(format!("@{} ", user.username), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(user.full_name()),
                ];
                if org.is_some() && app.store.membership.is_member(&user.id) {
                    spans.push(Span::styled("  member", Style::default().fg(Color::Green)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect()
    };
    let title = match org {
        Some(org) => format!("Users ({} total) for {}", search.data().total, org.name),
        None => format!("Users ({} total)", search.data().total),
    };
    let list = highlighted(List::new(items).block(Block::default().borders(Borders::ALL).title(title)));
    f.render_stateful_widget(list, chunks[1], &mut app.search_cursor);

    let pages = Paragraph::new(Line::from(page_spans(&app.page_links()))).alignment(Alignment::Center);
    f.render_widget(pages, chunks[2]);
}

fn draw_dialog(f: &mut Frame, dialog: &Dialog, area: Rect) {
    let (body, height) = match dialog {
        Dialog::Name { input, .. } => (format!("{}_", input), 3),
        Dialog::Confirm { prompt, .. } => (prompt.clone(), 4),
    };
    let popup_area = centered_rect_absolute(area.width.min(50), height, area);
    let popup = Paragraph::new(body)
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .title(dialog.title())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // Split the main layout into body and footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(size);
    let body_chunk = chunks[0];
    let footer_chunk = chunks[1];

    match app.route() {
        Route::Login | Route::Signup | Route::NewTask { .. } | Route::EditTask { .. } => {
            match &app.form {
                Some(form) => draw_form(f, form, body_chunk),
                None => {
                    let message = app.store.tasks.error().unwrap_or("Loading...").to_string();
                    f.render_widget(Paragraph::new(message).alignment(Alignment::Center), body_chunk);
                }
            }
        }
        Route::Dashboard => draw_dashboard(f, app, body_chunk),
        Route::Project { .. } | Route::ProjectTasks { .. } => draw_project(f, app, body_chunk),
        Route::Users(_) => draw_users(f, app, body_chunk),
    }

    if let Some(dialog) = &app.dialog {
        draw_dialog(f, dialog, body_chunk);
    }

    // Toast above the legend
    let mut footer = get_legend(app);
    if let Some(toast) = &app.toast {
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
        };
        footer.lines.insert(
            0,
            Line::from(Span::styled(format!(" {} ", toast.message), Style::default().fg(color))),
        );
    }
    let legend = Paragraph::new(footer)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(legend, footer_chunk);
}

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key).await {
                    return Ok(());
                }
            }
        }

        app.tick(Instant::now()).await;
    }
}
