use crate::forms::{self, Form};
use crate::models::{Entity, MemberRef, TaskPatch, UserPatch};
use crate::paginator::{page_links, PageLink};
use crate::route::{History, Route};
use crate::search::{SearchController, SearchParams};
use crate::store::AppStore;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub search_debounce: Duration,
    pub toast_duration: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            search_debounce: Duration::from_millis(500),
            toast_duration: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Organizations,
    Projects,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTarget {
    NewOrganization,
    RenameOrganization(String),
    NewProject,
    RenameProject(String),
    Username,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Organization(String),
    Project(String),
    Task(String),
    Account,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Name { target: NameTarget, input: String },
    Confirm { target: DeleteTarget, prompt: String },
}

impl Dialog {
    pub fn title(&self) -> &'static str {
        match self {
            Dialog::Name { target, .. } => match target {
                NameTarget::NewOrganization => "New Organization",
                NameTarget::RenameOrganization(_) => "Rename Organization",
                NameTarget::NewProject => "New Project",
                NameTarget::RenameProject(_) => "Rename Project",
                NameTarget::Username => "Change Username",
            },
            Dialog::Confirm { .. } => "Are you sure?",
        }
    }
}

/// Picks the neighbour of `current`, wrapping at both ends.
fn step<T: Entity>(items: &[T], current: Option<usize>, delta: isize) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    let len = items.len() as isize;
    let next = match current {
        Some(i) => (i as isize + delta).rem_euclid(len),
        None => 0,
    };
    items.get(next as usize).cloned()
}

pub struct App {
    pub store: AppStore,
    pub history: History,
    pub settings: Settings,
    pub form: Option<Form>,
    pub dialog: Option<Dialog>,
    pub toast: Option<Toast>,
    pub search: SearchController,
    pub search_cursor: ListState,
    pub pane: Pane,
    loaded_project: Option<String>,
    quit: bool,
}

impl App {
    pub fn new(store: AppStore, settings: Settings) -> App {
        App {
            store,
            history: History::new(Route::Login),
            settings,
            form: Some(forms::login_form()),
            dialog: None,
            toast: None,
            search: SearchController::new(SearchParams::default(), settings.search_debounce),
            search_cursor: ListState::default(),
            pane: Pane::Organizations,
            loaded_project: None,
            quit: false,
        }
    }

    pub fn route(&self) -> &Route {
        self.history.current()
    }

    /// Uses a stored token to skip the login screen when it still works.
    pub async fn start(&mut self) {
        let start = if self.store.reset_access_token().is_some()
            && self.store.get_me().await.is_fulfilled()
        {
            Route::Dashboard
        } else {
            Route::Login
        };
        // an expired token is dropped here instead of going through the toast path
        if self.store.take_session_expired() {
            self.store.logout();
        }
        self.history.reset(start);
        self.enter().await;
    }

    pub fn notify(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.toast = Some(Toast {
            kind,
            message: message.into(),
            expires_at: Instant::now() + self.settings.toast_duration,
        });
    }

    fn notify_error(&mut self, error: Option<&str>) {
        let message = error.unwrap_or("Something went wrong").to_string();
        self.notify(ToastKind::Error, message);
    }

    fn set_form_error(&mut self, error: Option<String>) {
        if let Some(form) = self.form.as_mut() {
            form.error = error;
        }
    }

    pub async fn navigate(&mut self, route: Route) {
        if !route.is_public() && self.store.auth.access_token().is_none() {
            self.history.reset(Route::Login);
            return self.enter().await;
        }
        debug!(path = %route.to_path(), "navigate");
        self.history.push(route);
        self.enter().await;
    }

    async fn redirect(&mut self, route: Route) {
        debug!(path = %route.to_path(), "redirect");
        self.history.replace(route);
        self.enter().await;
    }

    async fn back(&mut self) {
        if self.history.back() {
            self.enter().await;
        }
    }

    /// Prepares the screen for the current route.
    async fn enter(&mut self) {
        self.dialog = None;
        match self.route().clone() {
            Route::Login => self.form = Some(forms::login_form()),
            Route::Signup => self.form = Some(forms::signup_form()),
            Route::Dashboard => {
                self.form = None;
                self.load_dashboard().await;
            }
            Route::Users(params) => {
                self.form = None;
                self.search.sync_from_url(params);
                self.search.invalidate();
            }
            Route::Project { id } | Route::ProjectTasks { id } => {
                self.form = None;
                self.load_project(&id, false).await;
            }
            Route::NewTask { .. } => {
                self.form = Some(forms::task_form(None, self.store.membership.members.items()));
            }
            Route::EditTask { task_id, .. } => {
                self.form = None;
                if self.store.get_task(&task_id).await.is_fulfilled() {
                    self.form = Some(forms::task_form(
                        self.store.tasks.selected(),
                        self.store.membership.members.items(),
                    ));
                } else {
                    let error = self.store.tasks.error().map(str::to_string);
                    self.notify_error(error.as_deref());
                }
            }
        }
    }

    async fn load_dashboard(&mut self) {
        if self.store.organizations.items().is_empty() {
            self.store.find_all_organizations().await;
        }
        self.store.find_all_memberships().await;
        self.load_selected_organization().await;
    }

    async fn load_selected_organization(&mut self) {
        match self.store.organizations.selected_id().map(str::to_string) {
            Some(id) => {
                self.store.find_all_projects(&id).await;
                self.store.find_all_org_members(&id).await;
            }
            None => {
                self.store.projects.clear();
                self.store.membership.members.clear();
            }
        }
    }

    async fn load_project(&mut self, id: &str, force: bool) {
        if force || self.loaded_project.as_deref() != Some(id) {
            self.store.find_all_tasks(id).await;
            self.loaded_project = Some(id.to_string());
        }
        let project = self
            .store
            .projects
            .items()
            .iter()
            .find(|p| p.id == id)
            .cloned();
        match project {
            Some(project) => self.store.set_selected_project(Some(project)),
            // opened without the dashboard list, e.g. from a parsed path
            None => {
                self.store.get_project(id).await;
            }
        }
    }

    fn logout(&mut self) {
        self.store.logout();
        self.store.clear_resources();
        self.search = SearchController::new(SearchParams::default(), self.settings.search_debounce);
        self.search_cursor.select(None);
        self.loaded_project = None;
        self.dialog = None;
        self.history.reset(Route::Login);
        self.form = Some(forms::login_form());
        info!("logged out");
    }

    fn check_session(&mut self) {
        if self.store.take_session_expired() {
            self.logout();
            self.notify(ToastKind::Error, "Session expired, please log in again");
        }
    }

    /// Timers: toast expiry, debounced search and its fetch.
    pub async fn tick(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.toast = None;
        }

        if matches!(self.route(), Route::Users(_)) {
            if let Some(params) = self.search.tick(now) {
                self.history.replace(Route::Users(params));
            }
            if let Some(params) = self.search.fetch_due(self.store.search.loading()) {
                self.store.search_users(&params.query, params.page).await;
                let first = if self.store.search.data().data.is_empty() {
                    None
                } else {
                    Some(0)
                };
                self.search_cursor.select(first);
            }
        }
        self.check_session();
    }

    /// Returns true when the app should exit.
    pub async fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        if self.dialog.is_some() {
            self.handle_dialog_key(key).await;
        } else {
            match self.route() {
                Route::Login | Route::Signup => self.handle_auth_key(key).await,
                Route::Dashboard => self.handle_dashboard_key(key).await,
                Route::Users(_) => self.handle_users_key(key).await,
                Route::Project { .. } | Route::ProjectTasks { .. } => {
                    self.handle_project_key(key).await
                }
                Route::NewTask { .. } | Route::EditTask { .. } => {
                    self.handle_task_form_key(key).await
                }
            }
        }
        self.check_session();
        self.quit
    }

    fn edit_form(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
            KeyCode::Left => form.cycle(-1),
            KeyCode::Right => form.cycle(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(c) => form.insert(c),
            _ => {}
        }
    }

    // ---- Login / Signup ----

    async fn handle_auth_key(&mut self, key: KeyEvent) {
        let on_login = matches!(self.route(), Route::Login);
        match key.code {
            KeyCode::Enter if on_login => self.submit_login().await,
            KeyCode::Enter => self.submit_signup().await,
            KeyCode::Char('n') if on_login && key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.navigate(Route::Signup).await
            }
            KeyCode::Esc if !on_login => self.redirect(Route::Login).await,
            _ => self.edit_form(key),
        }
    }

    async fn submit_login(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let credentials = match forms::credentials(form) {
            Ok(credentials) => credentials,
            Err(message) => return self.set_form_error(Some(message)),
        };
        if self.store.login(&credentials).await.is_fulfilled() {
            self.store.get_me().await;
            self.history.reset(Route::Dashboard);
            self.enter().await;
        } else {
            let error = self.store.auth.error().map(str::to_string);
            self.set_form_error(error);
        }
    }

    async fn submit_signup(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let data = match forms::signup_data(form) {
            Ok(data) => data,
            Err(message) => return self.set_form_error(Some(message)),
        };
        if self.store.signup(&data).await.is_fulfilled() {
            self.notify(ToastKind::Success, "Account created, you can log in now");
            self.history.reset(Route::Login);
            self.enter().await;
        } else {
            let error = self.store.auth.error().map(str::to_string);
            self.set_form_error(error);
        }
    }

    // ---- Dashboard ----

    async fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Tab => {
                self.pane = match self.pane {
                    Pane::Organizations => Pane::Projects,
                    Pane::Projects => Pane::Organizations,
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_dashboard(1).await,
            KeyCode::Char('k') | KeyCode::Up => self.move_dashboard(-1).await,
            KeyCode::Enter => match self.pane {
                Pane::Organizations => self.pane = Pane::Projects,
                Pane::Projects => {
                    if let Some(id) = self.store.projects.selected_id().map(str::to_string) {
                        self.navigate(Route::Project { id }).await;
                    }
                }
            },
            KeyCode::Char('n') => self.open_create_dialog(),
            KeyCode::Char('r') => self.open_rename_dialog(),
            KeyCode::Char('d') => self.open_delete_dialog(),
            KeyCode::Char('u') => self.navigate(Route::Users(SearchParams::default())).await,
            KeyCode::Char('R') => self.reload_dashboard().await,
            KeyCode::Char('p') => {
                self.dialog = self.store.me.user().map(|me| Dialog::Name {
                    target: NameTarget::Username,
                    input: me.username.clone(),
                });
            }
            KeyCode::Char('X') => {
                self.dialog = Some(Dialog::Confirm {
                    target: DeleteTarget::Account,
                    prompt: "Delete your account? This cannot be undone.".to_string(),
                });
            }
            KeyCode::Char('L') => self.logout(),
            _ => {}
        }
    }

    /// Refetches everything but stays on the selected organization.
    async fn reload_dashboard(&mut self) {
        let selected = self.store.organizations.selected_id().map(str::to_string);
        self.store.find_all_organizations().await;
        if let Some(id) = selected {
            self.store.get_organization(&id).await;
        }
        self.store.get_me().await;
        self.load_dashboard().await;
    }

    async fn move_dashboard(&mut self, delta: isize) {
        match self.pane {
            Pane::Organizations => {
                let orgs = &self.store.organizations;
                let next = step(orgs.items(), orgs.selected_index(), delta);
                if next.is_some() && next.as_ref().map(|o| o.id.as_str()) != orgs.selected_id() {
                    self.store.set_selected_organization(next);
                    self.load_selected_organization().await;
                }
            }
            Pane::Projects => {
                let projects = &self.store.projects;
                let next = step(projects.items(), projects.selected_index(), delta);
                if next.is_some() {
                    self.store.set_selected_project(next);
                }
            }
        }
    }

    fn open_create_dialog(&mut self) {
        let target = match self.pane {
            Pane::Organizations => NameTarget::NewOrganization,
            Pane::Projects if self.store.organizations.selected().is_some() => {
                NameTarget::NewProject
            }
            Pane::Projects => {
                return self.notify(ToastKind::Error, "Create an organization first");
            }
        };
        self.dialog = Some(Dialog::Name {
            target,
            input: String::new(),
        });
    }

    fn open_rename_dialog(&mut self) {
        let dialog = match self.pane {
            Pane::Organizations => self.store.organizations.selected().map(|o| Dialog::Name {
                target: NameTarget::RenameOrganization(o.id.clone()),
                input: o.name.clone(),
            }),
            Pane::Projects => self.store.projects.selected().map(|p| Dialog::Name {
                target: NameTarget::RenameProject(p.id.clone()),
                input: p.name.clone(),
            }),
        };
        self.dialog = dialog;
    }

    fn open_delete_dialog(&mut self) {
        let dialog = match self.pane {
            Pane::Organizations => self.store.organizations.selected().map(|o| Dialog::Confirm {
                target: DeleteTarget::Organization(o.id.clone()),
                prompt: format!("Delete organization \"{}\"? This cannot be undone.", o.name),
            }),
            Pane::Projects => self.store.projects.selected().map(|p| Dialog::Confirm {
                target: DeleteTarget::Project(p.id.clone()),
                prompt: format!("Delete project \"{}\" and all of its tasks?", p.name),
            }),
        };
        self.dialog = dialog;
    }

    // ---- Dialogs ----

    async fn handle_dialog_key(&mut self, key: KeyEvent) {
        match self.dialog.as_mut() {
            Some(Dialog::Name { input, .. }) => match key.code {
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                KeyCode::Esc => self.dialog = None,
                KeyCode::Enter => self.submit_name_dialog().await,
                _ => {}
            },
            Some(Dialog::Confirm { .. }) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete().await,
                KeyCode::Char('n') | KeyCode::Esc => self.dialog = None,
                _ => {}
            },
            None => {}
        }
    }

    async fn submit_name_dialog(&mut self) {
        let Some(Dialog::Name { target, input }) = self.dialog.clone() else {
            return;
        };
        let name = input.trim();
        if name.is_empty() {
            return;
        }

        let (status, success, error) = match &target {
            NameTarget::NewOrganization => (
                self.store.create_organization(name).await,
                "Organization has been created successfully",
                self.store.organizations.error(),
            ),
            NameTarget::RenameOrganization(id) => (
                self.store.update_organization(id, name).await,
                "Organization has been updated successfully",
                self.store.organizations.error(),
            ),
            NameTarget::NewProject => {
                let Some(org_id) = self.store.organizations.selected_id().map(str::to_string)
                else {
                    return;
                };
                (
                    self.store.create_project(&org_id, name).await,
                    "Project has been created successfully",
                    self.store.projects.error(),
                )
            }
            NameTarget::RenameProject(id) => (
                self.store.update_project(id, name).await,
                "Project has been updated successfully",
                self.store.projects.error(),
            ),
            NameTarget::Username => {
                let patch = UserPatch {
                    username: Some(name.to_string()),
                    ..Default::default()
                };
                (
                    self.store.update_me(&patch).await,
                    "Profile has been updated successfully",
                    self.store.me.error(),
                )
            }
        };
        let error = error.map(str::to_string);

        if status.is_fulfilled() {
            self.dialog = None;
            self.notify(ToastKind::Success, success);
            if target == NameTarget::NewOrganization {
                self.load_selected_organization().await;
            }
        } else {
            self.notify_error(error.as_deref());
        }
    }

    async fn confirm_delete(&mut self) {
        let Some(Dialog::Confirm { target, .. }) = self.dialog.take() else {
            return;
        };
        let (status, success, error) = match &target {
            DeleteTarget::Organization(id) => (
                self.store.delete_organization(id).await,
                "Organization has been deleted successfully",
                self.store.organizations.error(),
            ),
            DeleteTarget::Project(id) => (
                self.store.delete_project(id).await,
                "Project deleted successfully",
                self.store.projects.error(),
            ),
            DeleteTarget::Task(id) => (
                self.store.delete_task(id).await,
                "Task deleted successfully",
                self.store.tasks.error(),
            ),
            DeleteTarget::Account => (
                self.store.delete_me().await,
                "Your account has been deleted",
                self.store.me.error(),
            ),
        };
        let error = error.map(str::to_string);

        if status.is_fulfilled() {
            self.notify(ToastKind::Success, success);
            match target {
                DeleteTarget::Organization(_) => self.load_selected_organization().await,
                DeleteTarget::Account => self.logout(),
                _ => {}
            }
        } else {
            self.notify_error(error.as_deref());
        }
    }

    // ---- Project ----

    async fn handle_project_key(&mut self, key: KeyEvent) {
        let Some(project_id) = self.route().project_id().map(str::to_string) else {
            return;
        };
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Esc | KeyCode::Char('h') => self.back().await,
            KeyCode::Char('j') | KeyCode::Down => {
                let next = step(self.store.tasks.items(), self.store.tasks.selected_index(), 1);
                if next.is_some() {
                    self.store.set_selected_task(next);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let next = step(self.store.tasks.items(), self.store.tasks.selected_index(), -1);
                if next.is_some() {
                    self.store.set_selected_task(next);
                }
            }
            KeyCode::Char('a') => self.navigate(Route::NewTask { project_id }).await,
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(task_id) = self.store.tasks.selected_id().map(str::to_string) {
                    self.navigate(Route::EditTask {
                        project_id,
                        task_id,
                    })
                    .await;
                }
            }
            KeyCode::Char('d') => {
                self.dialog = self.store.tasks.selected().map(|t| Dialog::Confirm {
                    target: DeleteTarget::Task(t.id.clone()),
                    prompt: format!("Delete task \"{}\"?", t.name),
                });
            }
            KeyCode::Char('s') => self.advance_selected_task().await,
            KeyCode::Char('r') => self.load_project(&project_id, true).await,
            _ => {}
        }
    }

    /// Start (To Do -> In Progress) or Finish (In Progress -> Done).
    async fn advance_selected_task(&mut self) {
        let Some(task) = self.store.tasks.selected().cloned() else {
            return;
        };
        let Some(status) = task.status.advance() else {
            return;
        };
        let id = task.id.clone();
        self.store.set_selected_task(Some(task));
        let patch = TaskPatch {
            status: Some(status),
            ..Default::default()
        };
        if !self.store.update_task(&id, &patch).await.is_fulfilled() {
            let error = self.store.tasks.error().map(str::to_string);
            self.notify_error(error.as_deref());
        }
    }

    // ---- Task form ----

    async fn handle_task_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.back().await,
            KeyCode::Enter => self.submit_task().await,
            _ => self.edit_form(key),
        }
    }

    async fn submit_task(&mut self) {
        let (project_id, task_id) = match self.route() {
            Route::NewTask { project_id } => (project_id.clone(), None),
            Route::EditTask {
                project_id,
                task_id,
            } => (project_id.clone(), Some(task_id.clone())),
            _ => return,
        };
        let Some(form) = self.form.as_ref() else {
            return;
        };

        let status = match &task_id {
            None => match forms::new_task(form, &project_id) {
                Ok(task) => self.store.create_task(&task).await,
                Err(message) => return self.set_form_error(Some(message)),
            },
            Some(id) => match forms::task_patch(form) {
                Ok(patch) => self.store.update_task(id, &patch).await,
                Err(message) => return self.set_form_error(Some(message)),
            },
        };

        if status.is_fulfilled() {
            let message = if task_id.is_some() {
                "Task has been updated successfully"
            } else {
                "Task has been created successfully"
            };
            self.notify(ToastKind::Success, message);
            self.redirect(Route::ProjectTasks { id: project_id }).await;
        } else {
            let error = self.store.tasks.error().map(str::to_string);
            self.set_form_error(error);
        }
    }

    // ---- User search ----

    async fn handle_users_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.back().await,
            KeyCode::Down => self.move_search_cursor(1),
            KeyCode::Up => self.move_search_cursor(-1),
            KeyCode::Left => self.follow_page_link(|l| matches!(l, PageLink::Previous { .. })).await,
            KeyCode::Right => self.follow_page_link(|l| matches!(l, PageLink::Next { .. })).await,
            KeyCode::Home => {
                self.follow_page_link(|l| matches!(l, PageLink::Page { page: 1, active: false, .. }))
                    .await
            }
            KeyCode::End => {
                let last = self.store.search.data().page_count;
                self.follow_page_link(|l| {
                    matches!(l, PageLink::Page { page, active: false, .. } if *page == last)
                })
                .await
            }
            KeyCode::Enter => self.toggle_membership().await,
            KeyCode::Backspace => {
                let mut text = self.search.input_text().to_string();
                text.pop();
                self.search.on_input(text, Instant::now());
            }
            KeyCode::Char(c) => {
                let mut text = self.search.input_text().to_string();
                text.push(c);
                self.search.on_input(text, Instant::now());
            }
            _ => {}
        }
    }

    fn move_search_cursor(&mut self, delta: isize) {
        let len = self.store.search.data().data.len();
        if len == 0 {
            return;
        }
        let next = match self.search_cursor.selected() {
            Some(i) => (i as isize + delta).rem_euclid(len as isize) as usize,
            None => 0,
        };
        self.search_cursor.select(Some(next));
    }

    pub fn page_links(&self) -> Vec<PageLink> {
        let params = self.search.params();
        page_links(
            params.page,
            self.store.search.data().page_count,
            &params.base_url(),
        )
    }

    async fn follow_page_link(&mut self, pick: impl Fn(&PageLink) -> bool) {
        let route = self
            .page_links()
            .iter()
            .find(|l| pick(l))
            .and_then(PageLink::href)
            .and_then(Route::parse);
        if let Some(route) = route {
            self.navigate(route).await;
        }
    }

    /// Adds the highlighted user to the selected organization, or removes
    /// them if they already belong to it.
    async fn toggle_membership(&mut self) {
        let Some(user) = self
            .search_cursor
            .selected()
            .and_then(|i| self.store.search.data().data.get(i))
            .cloned()
        else {
            return;
        };
        let Some(org) = self.store.organizations.selected().cloned() else {
            return self.notify(ToastKind::Error, "Select an organization first");
        };
        let member = MemberRef {
            user_id: user.id.clone(),
            org_id: org.id.clone(),
        };

        let (status, message) = if self.store.membership.is_member(&user.id) {
            (
                self.store.remove_from_organization(&member).await,
                format!("@{} removed from {}", user.username, org.name),
            )
        } else {
            (
                self.store.add_member_to_organization(&member).await,
                format!("@{} added to {}", user.username, org.name),
            )
        };
        if status.is_fulfilled() {
            self.notify(ToastKind::Success, message);
        } else {
            let error = self.store.membership.members.error().map(str::to_string);
            self.notify_error(error.as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{store_with, FakeBackend};
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c))).await;
        }
    }

    async fn login(app: &mut App, password: &str) {
        type_text(app, "ada@example.com").await;
        app.handle_key(key(KeyCode::Tab)).await;
        type_text(app, password).await;
        app.handle_key(key(KeyCode::Enter)).await;
    }

    fn app_with(fake: FakeBackend) -> (App, Arc<FakeBackend>) {
        let (store, fake) = store_with(fake);
        (App::new(store, Settings::default()), fake)
    }

    #[tokio::test]
    async fn test_login_redirects_to_dashboard() {
        let (mut app, _fake) = app_with(FakeBackend::new());
        login(&mut app, "correct").await;
        assert!(app.store.auth.access_token().is_some());
        assert_eq!(app.route().to_path(), "/");
        app.logout();
    }

    #[tokio::test]
    async fn test_bad_login_stays_put_with_message() {
        let (mut app, _fake) = app_with(FakeBackend::new());
        login(&mut app, "wrong").await;
        assert!(app.store.auth.access_token().is_none());
        assert_eq!(app.route(), &Route::Login);
        assert_eq!(
            app.form.as_ref().and_then(|f| f.error.as_deref()),
            Some("Invalid credentials")
        );
    }

    #[tokio::test]
    async fn test_create_task_navigates_to_project_tasks() {
        let (mut app, _fake) = app_with(FakeBackend::new());
        login(&mut app, "correct").await;
        app.navigate(Route::Project { id: "123".into() }).await;
        app.handle_key(key(KeyCode::Char('a'))).await;
        assert_eq!(app.route().to_path(), "/projects/123/new-task");

        type_text(&mut app, "Test Task").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.route().to_path(), "/projects/123/tasks");
        let task = app.store.tasks.selected().unwrap();
        assert_eq!(task.name, "Test Task");
        assert_eq!(task.status.label(), "To Do");
        assert!(app.store.tasks.items().iter().any(|t| t.name == "Test Task"));
        assert_eq!(app.toast.as_ref().map(|t| t.kind), Some(ToastKind::Success));
        app.logout();
    }

    #[tokio::test]
    async fn test_invalid_task_form_stays_on_form() {
        let (mut app, _fake) = app_with(FakeBackend::new());
        app.history.reset(Route::NewTask {
            project_id: "p".into(),
        });
        app.enter().await;
        app.handle_key(key(KeyCode::Enter)).await;
        assert_eq!(app.route().to_path(), "/projects/p/new-task");
        assert_eq!(
            app.form.as_ref().and_then(|f| f.error.as_deref()),
            Some("Task Name is required")
        );
    }

    #[tokio::test]
    async fn test_org_switch_reloads_projects() {
        let fake = FakeBackend::new();
        fake.seed_organizations(&["acme", "globex"]);
        fake.seed_projects("acme", &["a1"]);
        fake.seed_projects("globex", &["g1", "g2"]);
        let (mut app, _fake) = app_with(fake);
        login(&mut app, "correct").await;

        assert_eq!(app.store.organizations.selected_id(), Some("acme"));
        assert_eq!(app.store.projects.items().len(), 1);

        app.handle_key(key(KeyCode::Char('j'))).await;
        assert_eq!(app.store.organizations.selected_id(), Some("globex"));
        assert_eq!(app.store.projects.items().len(), 2);
        app.logout();
    }

    #[tokio::test]
    async fn test_delete_project_through_confirm_dialog() {
        let fake = FakeBackend::new();
        fake.seed_organizations(&["acme"]);
        fake.seed_projects("acme", &["a1", "a2"]);
        let (mut app, _fake) = app_with(fake);
        login(&mut app, "correct").await;

        app.handle_key(key(KeyCode::Tab)).await;
        app.handle_key(key(KeyCode::Char('d'))).await;
        assert!(matches!(app.dialog, Some(Dialog::Confirm { .. })));
        app.handle_key(key(KeyCode::Char('y'))).await;

        assert!(app.dialog.is_none());
        assert_eq!(app.store.projects.selected_id(), Some("a2"));
        assert_eq!(app.toast.as_ref().unwrap().message, "Project deleted successfully");
        app.logout();
    }

    #[tokio::test]
    async fn test_search_debounces_then_fetches_and_pages() {
        let fake = FakeBackend::new();
        fake.seed_users(25);
        let (mut app, _fake) = app_with(fake);
        login(&mut app, "correct").await;
        app.navigate(Route::Users(SearchParams::default())).await;

        app.tick(Instant::now()).await;
        assert_eq!(app.store.search.data().total, 25);

        type_text(&mut app, "user1").await;
        app.tick(Instant::now()).await;
        assert_eq!(app.route().to_path(), "/users?q=&page=1");

        app.tick(Instant::now() + Duration::from_secs(1)).await;
        assert_eq!(app.route().to_path(), "/users?q=user1&page=1");
        // user1 and user10..user19
        assert_eq!(app.store.search.data().total, 11);

        app.handle_key(key(KeyCode::Right)).await;
        assert_eq!(app.route().to_path(), "/users?q=user1&page=2");
        app.tick(Instant::now()).await;
        assert_eq!(app.store.search.data().page, 2);
        assert_eq!(app.store.search.data().data.len(), 1);

        // no next page past the last one
        app.handle_key(key(KeyCode::Right)).await;
        assert_eq!(app.route().to_path(), "/users?q=user1&page=2");
        app.logout();
    }

    #[tokio::test]
    async fn test_user_search_fetches_again_after_relogin() {
        let fake = FakeBackend::new();
        fake.seed_users(5);
        let (mut app, _fake) = app_with(fake);

        login(&mut app, "correct").await;
        app.navigate(Route::Users(SearchParams::default())).await;
        app.tick(Instant::now()).await;
        assert_eq!(app.store.search.data().data.len(), 5);

        app.logout();
        login(&mut app, "correct").await;
        app.navigate(Route::Users(SearchParams::default())).await;
        app.tick(Instant::now()).await;
        assert_eq!(app.store.search.data().data.len(), 5);
        assert_eq!(app.search_cursor.selected(), Some(0));
        app.logout();
    }

    #[tokio::test]
    async fn test_revisiting_search_refetches() {
        let fake = FakeBackend::new();
        fake.seed_users(3);
        let (mut app, fake) = app_with(fake);
        login(&mut app, "correct").await;
        app.navigate(Route::Users(SearchParams::default())).await;
        app.tick(Instant::now()).await;

        app.handle_key(key(KeyCode::Esc)).await;
        fake.seed_users(1);
        app.handle_key(key(KeyCode::Char('u'))).await;
        app.tick(Instant::now()).await;
        assert_eq!(app.store.search.data().total, 4);
        app.logout();
    }

    #[tokio::test]
    async fn test_expired_stored_token_is_dropped_at_start() {
        let (mut app, fake) = app_with(FakeBackend::new());
        login(&mut app, "correct").await;

        fake.fail_next(crate::error::ApiError::Status {
            status: 401,
            message: Some("Token expired".to_string()),
        });
        app.start().await;
        assert_eq!(app.route(), &Route::Login);
        assert!(app.toast.is_none());
        assert!(app.store.auth.access_token().is_none());
        assert!(app.store.reset_access_token().is_none());

        login(&mut app, "wrong").await;
        assert_eq!(
            app.form.as_ref().and_then(|f| f.error.as_deref()),
            Some("Invalid credentials")
        );
    }

    #[tokio::test]
    async fn test_protected_route_without_session_goes_to_login() {
        let (mut app, _fake) = app_with(FakeBackend::new());
        app.navigate(Route::Project { id: "p".into() }).await;
        assert_eq!(app.route(), &Route::Login);
        assert!(!app.history.back());
    }

    #[tokio::test]
    async fn test_deleting_account_logs_out() {
        let (mut app, _fake) = app_with(FakeBackend::new());
        login(&mut app, "correct").await;
        app.handle_key(key(KeyCode::Char('X'))).await;
        app.handle_key(key(KeyCode::Char('y'))).await;
        assert_eq!(app.route(), &Route::Login);
        assert!(app.store.me.user().is_none());
        assert_eq!(
            app.toast.as_ref().map(|t| t.message.as_str()),
            Some("Your account has been deleted")
        );
    }

    #[tokio::test]
    async fn test_rename_username_through_dialog() {
        let (mut app, _fake) = app_with(FakeBackend::new());
        login(&mut app, "correct").await;
        app.handle_key(key(KeyCode::Char('p'))).await;
        app.handle_key(key(KeyCode::Backspace)).await;
        app.handle_key(key(KeyCode::Backspace)).await;
        type_text(&mut app, "ada").await;
        app.handle_key(key(KeyCode::Enter)).await;
        assert!(app.dialog.is_none());
        assert_eq!(app.store.me.user().map(|u| u.username.as_str()), Some("ada"));
        app.logout();
    }

    #[tokio::test]
    async fn test_enter_on_search_result_toggles_membership() {
        let fake = FakeBackend::new();
        fake.seed_organizations(&["acme"]);
        fake.seed_users(1);
        let (mut app, _fake) = app_with(fake);
        login(&mut app, "correct").await;
        app.handle_key(key(KeyCode::Char('u'))).await;
        app.tick(Instant::now()).await;

        app.handle_key(key(KeyCode::Enter)).await;
        assert!(app.store.membership.is_member("u0"));
        app.handle_key(key(KeyCode::Enter)).await;
        assert!(!app.store.membership.is_member("u0"));
        app.logout();
    }

    #[tokio::test]
    async fn test_unauthorized_response_routes_to_login() {
        let fake = FakeBackend::new();
        let (mut app, fake) = app_with(fake);
        login(&mut app, "correct").await;
        app.navigate(Route::Project { id: "p".into() }).await;

        fake.fail_next(crate::error::ApiError::Unauthorized);
        app.handle_key(key(KeyCode::Char('r'))).await;
        assert_eq!(app.route(), &Route::Login);
        assert!(app.store.auth.access_token().is_none());
        assert_eq!(app.toast.as_ref().map(|t| t.kind), Some(ToastKind::Error));
    }

    #[test]
    fn test_step_wraps() {
        use crate::models::Project;
        let items: Vec<Project> = ["a", "b"]
            .iter()
            .map(|id| Project {
                id: id.to_string(),
                name: id.to_string(),
            })
            .collect();
        assert_eq!(step(&items, Some(1), 1).unwrap().id, "a");
        assert_eq!(step(&items, Some(0), -1).unwrap().id, "b");
        assert_eq!(step(&items, None, 1).unwrap().id, "a");
        assert!(step::<Project>(&[], None, 1).is_none());
    }
}
