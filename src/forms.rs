use crate::models::{
    Credentials, NewTask, OrgMember, SignupData, Task, TaskPatch, TaskStatus,
};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

fn color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap())
}

pub fn is_email(input: &str) -> bool {
    email_re().is_match(input.trim())
}

pub fn is_hex_color(input: &str) -> bool {
    color_re().is_match(input.trim())
}

/// Empty means "no due date".
pub fn parse_due_date(input: &str) -> Result<Option<NaiveDate>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| "Due date must look like YYYY-MM-DD".to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Secret,
    /// `(value, label)` pairs, cycled with left/right.
    Choice(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub kind: FieldKind,
}

impl Field {
    fn text(name: &'static str, label: &'static str) -> Field {
        Field {
            name,
            label,
            value: String::new(),
            kind: FieldKind::Text,
        }
    }

    fn secret(name: &'static str, label: &'static str) -> Field {
        Field {
            kind: FieldKind::Secret,
            ..Field::text(name, label)
        }
    }

    fn choice(name: &'static str, label: &'static str, options: Vec<(String, String)>) -> Field {
        Field {
            value: options.first().map(|(v, _)| v.clone()).unwrap_or_default(),
            kind: FieldKind::Choice(options),
            ..Field::text(name, label)
        }
    }

    fn with_value(mut self, value: impl Into<String>) -> Field {
        self.value = value.into();
        self
    }

    /// What the form shows for this field.
    pub fn display(&self) -> String {
        match &self.kind {
            FieldKind::Text => self.value.clone(),
            FieldKind::Secret => "*".repeat(self.value.chars().count()),
            FieldKind::Choice(options) => options
                .iter()
                .find(|(v, _)| *v == self.value)
                .map(|(_, label)| format!("< {} >", label))
                .unwrap_or_else(|| "< none >".to_string()),
        }
    }
}

/// A set of inputs with one focused field.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub title: String,
    pub fields: Vec<Field>,
    pub focus: usize,
    pub error: Option<String>,
}

impl Form {
    pub fn new(title: impl Into<String>, fields: Vec<Field>) -> Form {
        Form {
            title: title.into(),
            fields,
            focus: 0,
            error: None,
        }
    }

    pub fn value(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    pub fn set_value(&mut self, name: &str, value: &str) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.value = value.to_string();
        }
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn insert(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if !matches!(field.kind, FieldKind::Choice(_)) {
                field.value.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if !matches!(field.kind, FieldKind::Choice(_)) {
                field.value.pop();
            }
        }
    }

    /// Moves a choice field `delta` options along, wrapping around.
    pub fn cycle(&mut self, delta: isize) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        let FieldKind::Choice(options) = &field.kind else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let len = options.len() as isize;
        let current = options
            .iter()
            .position(|(v, _)| *v == field.value)
            .unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        field.value = options[next].0.clone();
    }

    fn required(&self, names: &[&str]) -> Result<(), String> {
        for name in names {
            if self.value(name).trim().is_empty() {
                let label = self
                    .fields
                    .iter()
                    .find(|f| f.name == *name)
                    .map(|f| f.label)
                    .unwrap_or(*name);
                return Err(format!("{} is required", label));
            }
        }
        Ok(())
    }
}

pub fn login_form() -> Form {
    Form::new(
        "Login to your account",
        vec![Field::text("email", "Email"), Field::secret("password", "Password")],
    )
}

pub fn credentials(form: &Form) -> Result<Credentials, String> {
    form.required(&["email", "password"])?;
    Ok(Credentials {
        email: form.value("email").trim().to_string(),
        password: form.value("password").to_string(),
    })
}

pub fn signup_form() -> Form {
    Form::new(
        "Create an account",
        vec![
            Field::text("firstName", "First name"),
            Field::text("lastName", "Last name"),
            Field::text("username", "Username"),
            Field::text("email", "Email"),
            Field::secret("password", "Password"),
        ],
    )
}

pub fn signup_data(form: &Form) -> Result<SignupData, String> {
    form.required(&["firstName", "lastName", "username", "email", "password"])?;
    if !is_email(form.value("email")) {
        return Err("Email is not valid".to_string());
    }
    Ok(SignupData {
        email: form.value("email").trim().to_string(),
        password: form.value("password").to_string(),
        username: form.value("username").trim().to_string(),
        first_name: form.value("firstName").trim().to_string(),
        last_name: form.value("lastName").trim().to_string(),
    })
}

/// Create form when `task` is `None`, edit form otherwise.
pub fn task_form(task: Option<&Task>, members: &[OrgMember]) -> Form {
    let statuses = TaskStatus::ALL
        .iter()
        .map(|s| (s.label().to_string(), s.label().to_string()))
        .collect();
    let mut assignees = vec![(String::new(), "Unassigned".to_string())];
    assignees.extend(
        members
            .iter()
            .map(|m| (m.id.clone(), format!("{} {}", m.first_name, m.last_name))),
    );

    let title = if task.is_some() { "Edit Task" } else { "Create Task" };
    let mut form = Form::new(
        title,
        vec![
            Field::text("name", "Task Name"),
            Field::text("description", "Description"),
            Field::choice("status", "Status", statuses),
            Field::text("color", "Color").with_value("#ffffff"),
            Field::text("dueDate", "Due Date"),
            Field::choice("assigneeId", "Assignee", assignees),
        ],
    );

    if let Some(task) = task {
        form.set_value("name", &task.name);
        form.set_value("description", &task.description);
        form.set_value("status", task.status.label());
        if !task.color.is_empty() {
            form.set_value("color", &task.color);
        }
        if let Some(due) = task.due_date {
            form.set_value("dueDate", &due.format("%Y-%m-%d").to_string());
        }
        let assignee = task
            .assignee
            .as_ref()
            .map(|a| a.id.clone())
            .or_else(|| task.assignee_id.clone())
            .unwrap_or_default();
        form.set_value("assigneeId", &assignee);
    }
    form
}

fn status_of(form: &Form) -> TaskStatus {
    TaskStatus::ALL
        .into_iter()
        .find(|s| s.label() == form.value("status"))
        .unwrap_or_default()
}

fn checked_task_fields(form: &Form) -> Result<Option<NaiveDate>, String> {
    form.required(&["name"])?;
    if !is_hex_color(form.value("color")) {
        return Err("Color must look like #rrggbb".to_string());
    }
    parse_due_date(form.value("dueDate"))
}

fn assignee_of(form: &Form) -> Option<String> {
    Some(form.value("assigneeId").to_string()).filter(|id| !id.is_empty())
}

pub fn new_task(form: &Form, project_id: &str) -> Result<NewTask, String> {
    let due_date = checked_task_fields(form)?;
    Ok(NewTask {
        name: form.value("name").trim().to_string(),
        description: form.value("description").to_string(),
        status: status_of(form),
        color: form.value("color").trim().to_string(),
        project_id: project_id.to_string(),
        due_date,
        assignee_id: assignee_of(form),
    })
}

pub fn task_patch(form: &Form) -> Result<TaskPatch, String> {
    let due_date = checked_task_fields(form)?;
    Ok(TaskPatch {
        name: Some(form.value("name").trim().to_string()),
        description: Some(form.value("description").to_string()),
        status: Some(status_of(form)),
        color: Some(form.value("color").trim().to_string()),
        due_date,
        assignee_id: assignee_of(form),
    })
}
