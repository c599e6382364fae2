use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything the store keeps in a list and selects by id.
pub trait Entity: Clone {
    fn id(&self) -> &str;

    /// Called when `updated` replaces `self` as the selection after an update.
    fn carry_over(&self, _updated: &mut Self) {}
}

// Organization struct
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

impl Entity for Organization {
    fn id(&self) -> &str {
        &self.id
    }
}

// Project struct, owned by one organization
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl Entity for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::ToDo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// Start moves To Do forward, Finish moves In Progress forward.
    pub fn advance(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::ToDo => Some(TaskStatus::InProgress),
            TaskStatus::InProgress => Some(TaskStatus::Done),
            TaskStatus::Done => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The public projection of a user attached to a task.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Assignee {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.username) {
            (Some(first), _) => {
                format!("{} {}", first, self.last_name.as_deref().unwrap_or("")).trim().to_string()
            }
            (None, Some(username)) => username.clone(),
            (None, None) => "Unknown".to_string(),
        }
    }

    pub fn initials(&self) -> String {
        let first = self.first_name.as_deref().and_then(|s| s.chars().next());
        let last = self.last_name.as_deref().and_then(|s| s.chars().next());
        first
            .into_iter()
            .chain(last)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

// Task struct
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub color: String,
    pub project_id: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
}

impl Entity for Task {
    fn id(&self) -> &str {
        &self.id
    }

    // Update responses don't embed the assignee, keep the one we had.
    fn carry_over(&self, updated: &mut Self) {
        if updated.assignee.is_none() {
            updated.assignee = self.assignee.clone();
        }
    }
}

impl Task {
    /// Calendar days from `today` until the due date, if there is one.
    /// Both sides are local dates.
    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.due_date
            .map(|due| (due.with_timezone(&Local).date_naive() - today).num_days())
    }

    pub fn is_near_due(&self, today: NaiveDate) -> bool {
        matches!(self.days_left(today), Some(d) if (0..=3).contains(&d))
    }

    /// "You" when nobody is assigned.
    pub fn assignee_label(&self) -> String {
        match &self.assignee {
            Some(assignee) => assignee.display_name(),
            None => "You".to_string(),
        }
    }

    pub fn due_label(&self, today: NaiveDate) -> Option<String> {
        let due = self.due_date?;
        if self.is_near_due(today) {
            let days = self.days_left(today).unwrap_or_default();
            Some(format!("{} day{} left", days, if days != 1 { "s" } else { "" }))
        } else {
            Some(due.format("%b %-d, %Y").to_string())
        }
    }
}

/// The current user's view of one of their memberships.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserMembership {
    pub id: String,
    pub organization: Organization,
    pub joined_at: DateTime<Utc>,
}

impl Entity for UserMembership {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A member as seen from the organization side.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgMember {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl Entity for OrgMember {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.id
    }
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One page of `GET /users/search`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub data: Vec<User>,
    pub total: u64,
    pub page: u32,
    pub page_count: u32,
}

impl Default for SearchPage {
    fn default() -> Self {
        SearchPage {
            data: Vec::new(),
            total: 0,
            page: 1,
            page_count: 0,
        }
    }
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignupData {
    pub email: String,
    pub password: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct SignupResponse {
    pub user: User,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub organization_id: String,
    pub name: String,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub color: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
}

/// Partial task update; absent fields are left untouched by the server.
#[derive(Clone, Serialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
}

#[derive(Clone, Serialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub user_id: String,
    pub org_id: String,
}
