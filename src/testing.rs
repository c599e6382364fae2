//! In-memory backend for store and app tests.

use crate::api::{ApiResult, Backend};
use crate::error::ApiError;
use crate::models::{
    Assignee, Credentials, NewProject, NewTask, OrgMember, Organization, Project, SearchPage,
    SignupData, Task, TaskPatch, User, UserMembership, UserPatch,
};
use crate::store::AppStore;
use crate::token::TokenStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const PAGE_SIZE: usize = 10;

static STORES: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct FakeData {
    next_id: u64,
    fail_next: Option<ApiError>,
    token: Option<String>,
    me: Option<User>,
    users: Vec<User>,
    organizations: Vec<Organization>,
    projects: Vec<(String, Project)>,
    tasks: Vec<Task>,
    members: Vec<(String, OrgMember)>,
    memberships: Vec<UserMembership>,
}

#[derive(Default)]
pub struct FakeBackend {
    data: Mutex<FakeData>,
}

fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        first_name: "First".to_string(),
        last_name: "Last".to_string(),
        email: format!("{}@example.com", username),
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        message: Some("Not found".to_string()),
    }
}

impl FakeBackend {
    pub fn new() -> FakeBackend {
        let fake = FakeBackend::default();
        fake.lock().me = Some(user("me", "me"));
        fake
    }

    fn lock(&self) -> MutexGuard<'_, FakeData> {
        self.data.lock().unwrap()
    }

    /// Makes the next call fail with `err`.
    pub fn fail_next(&self, err: ApiError) {
        self.lock().fail_next = Some(err);
    }

    pub fn current_token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn seed_organizations(&self, names: &[&str]) {
        let mut data = self.lock();
        for name in names {
            data.organizations.push(Organization {
                id: name.to_string(),
                name: name.to_string(),
            });
        }
    }

    pub fn seed_projects(&self, org_id: &str, ids: &[&str]) {
        let mut data = self.lock();
        for id in ids {
            data.projects.push((
                org_id.to_string(),
                Project {
                    id: id.to_string(),
                    name: format!("Project {}", id),
                },
            ));
        }
    }

    pub fn seed_assigned_task(&self, project_id: &str, task_id: &str, assignee_id: &str) {
        self.lock().tasks.push(Task {
            id: task_id.to_string(),
            name: format!("Task {}", task_id),
            description: String::new(),
            status: Default::default(),
            color: "#ffffff".to_string(),
            project_id: project_id.to_string(),
            due_date: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            assignee_id: Some(assignee_id.to_string()),
            assignee: Some(Assignee {
                id: assignee_id.to_string(),
                username: Some("ada".to_string()),
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
            }),
        });
    }

    pub fn seed_members(&self, org_id: &str, ids: &[&str]) {
        let mut data = self.lock();
        for id in ids {
            data.members.push((
                org_id.to_string(),
                OrgMember {
                    id: id.to_string(),
                    username: id.to_string(),
                    first_name: "First".to_string(),
                    last_name: "Last".to_string(),
                    joined_at: Some(Utc::now()),
                },
            ));
        }
    }

    pub fn seed_membership(&self, id: &str, org_id: &str, org_name: &str) {
        self.lock().memberships.push(UserMembership {
            id: id.to_string(),
            organization: Organization {
                id: org_id.to_string(),
                name: org_name.to_string(),
            },
            joined_at: Utc::now(),
        });
    }

    pub fn seed_users(&self, count: usize) {
        let mut data = self.lock();
        for i in 0..count {
            data.users.push(user(&format!("u{}", i), &format!("user{}", i)));
        }
    }

    fn guard(&self) -> ApiResult<()> {
        match self.lock().fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> String {
        let mut data = self.lock();
        data.next_id += 1;
        format!("new-{}", data.next_id)
    }
}

/// A store wired to `fake`, with its own throwaway token file.
pub fn store_with(fake: FakeBackend) -> (AppStore, Arc<FakeBackend>) {
    let n = STORES.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir()
        .join(format!("taskboard-test-{}-{}", std::process::id(), n))
        .join("access_token");
    let fake = Arc::new(fake);
    let store = AppStore::new(fake.clone(), TokenStore::new(path));
    (store, fake)
}

#[async_trait]
impl Backend for FakeBackend {
    fn set_access_token(&self, token: Option<String>) {
        self.lock().token = token;
    }

    async fn signup(&self, data: &SignupData) -> ApiResult<User> {
        self.guard()?;
        let created = User {
            id: self.next_id(),
            username: data.username.clone(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
        };
        self.lock().users.push(created.clone());
        Ok(created)
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<String> {
        self.guard()?;
        if credentials.password == "correct" {
            Ok(format!("token-for-{}", credentials.email))
        } else {
            Err(ApiError::Status {
                status: 401,
                message: Some("Invalid credentials".to_string()),
            })
        }
    }

    async fn get_me(&self) -> ApiResult<User> {
        self.guard()?;
        self.lock().me.clone().ok_or_else(not_found)
    }

    async fn update_me(&self, patch: &UserPatch) -> ApiResult<User> {
        self.guard()?;
        let mut data = self.lock();
        let me = data.me.as_mut().ok_or_else(not_found)?;
        if let Some(username) = &patch.username {
            me.username = username.clone();
        }
        if let Some(first) = &patch.first_name {
            me.first_name = first.clone();
        }
        if let Some(last) = &patch.last_name {
            me.last_name = last.clone();
        }
        Ok(me.clone())
    }

    async fn delete_me(&self) -> ApiResult<()> {
        self.guard()?;
        self.lock().me = None;
        Ok(())
    }

    async fn my_memberships(&self) -> ApiResult<Vec<UserMembership>> {
        self.guard()?;
        Ok(self.lock().memberships.clone())
    }

    async fn search_users(&self, query: &str, page: u32) -> ApiResult<SearchPage> {
        self.guard()?;
        let data = self.lock();
        let matching: Vec<User> = data
            .users
            .iter()
            .filter(|u| u.username.contains(query))
            .cloned()
            .collect();
        let total = matching.len();
        let page_count = total.div_ceil(PAGE_SIZE);
        let start = (page.max(1) as usize - 1) * PAGE_SIZE;
        Ok(SearchPage {
            data: matching.into_iter().skip(start).take(PAGE_SIZE).collect(),
            total: total as u64,
            page,
            page_count: page_count as u32,
        })
    }

    async fn list_organizations(&self) -> ApiResult<Vec<Organization>> {
        self.guard()?;
        Ok(self.lock().organizations.clone())
    }

    async fn create_organization(&self, name: &str) -> ApiResult<Organization> {
        self.guard()?;
        let org = Organization {
            id: self.next_id(),
            name: name.to_string(),
        };
        self.lock().organizations.push(org.clone());
        Ok(org)
    }

    async fn get_organization(&self, id: &str) -> ApiResult<Organization> {
        self.guard()?;
        let data = self.lock();
        data.organizations
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn update_organization(&self, id: &str, name: &str) -> ApiResult<Organization> {
        self.guard()?;
        let mut data = self.lock();
        let org = data
            .organizations
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(not_found)?;
        org.name = name.to_string();
        Ok(org.clone())
    }

    async fn delete_organization(&self, id: &str) -> ApiResult<()> {
        self.guard()?;
        self.lock().organizations.retain(|o| o.id != id);
        Ok(())
    }

    async fn list_members(&self, org_id: &str) -> ApiResult<Vec<OrgMember>> {
        self.guard()?;
        let data = self.lock();
        Ok(data
            .members
            .iter()
            .filter(|(org, _)| org == org_id)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn add_member(&self, org_id: &str, user_id: &str) -> ApiResult<()> {
        self.guard()?;
        let mut data = self.lock();
        let exists = data
            .members
            .iter()
            .any(|(org, m)| org == org_id && m.id == user_id);
        if !exists {
            data.members.push((
                org_id.to_string(),
                OrgMember {
                    id: user_id.to_string(),
                    username: user_id.to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                    joined_at: Some(Utc::now()),
                },
            ));
        }
        Ok(())
    }

    async fn remove_member(&self, org_id: &str, user_id: &str) -> ApiResult<()> {
        self.guard()?;
        self.lock()
            .members
            .retain(|(org, m)| !(org == org_id && m.id == user_id));
        Ok(())
    }

    async fn list_projects(&self, org_id: &str) -> ApiResult<Vec<Project>> {
        self.guard()?;
        let data = self.lock();
        Ok(data
            .projects
            .iter()
            .filter(|(org, _)| org == org_id)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn create_project(&self, project: &NewProject) -> ApiResult<Project> {
        self.guard()?;
        let created = Project {
            id: self.next_id(),
            name: project.name.clone(),
        };
        self.lock()
            .projects
            .push((project.organization_id.clone(), created.clone()));
        Ok(created)
    }

    async fn get_project(&self, id: &str) -> ApiResult<Project> {
        self.guard()?;
        let data = self.lock();
        data.projects
            .iter()
            .find(|(_, p)| p.id == id)
            .map(|(_, p)| p.clone())
            .ok_or_else(not_found)
    }

    async fn update_project(&self, id: &str, name: &str) -> ApiResult<Project> {
        self.guard()?;
        let mut data = self.lock();
        let (_, project) = data
            .projects
            .iter_mut()
            .find(|(_, p)| p.id == id)
            .ok_or_else(not_found)?;
        project.name = name.to_string();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> ApiResult<()> {
        self.guard()?;
        self.lock().projects.retain(|(_, p)| p.id != id);
        Ok(())
    }

    async fn list_tasks(&self, project_id: &str) -> ApiResult<Vec<Task>> {
        self.guard()?;
        let data = self.lock();
        Ok(data
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        self.guard()?;
        let now = Utc::now();
        let created = Task {
            id: self.next_id(),
            name: task.name.clone(),
            description: task.description.clone(),
            status: task.status,
            color: task.color.clone(),
            project_id: task.project_id.clone(),
            due_date: task
                .due_date
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc()),
            created_at: Some(now),
            updated_at: Some(now),
            assignee_id: task.assignee_id.clone(),
            assignee: None,
        };
        self.lock().tasks.push(created.clone());
        Ok(created)
    }

    async fn get_task(&self, id: &str) -> ApiResult<Task> {
        self.guard()?;
        let data = self.lock();
        data.tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    // Like the real server, the response leaves out the assignee object.
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> ApiResult<Task> {
        self.guard()?;
        let mut data = self.lock();
        let task = data
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(not_found)?;
        if let Some(name) = &patch.name {
            task.name = name.clone();
        }
        if let Some(description) = &patch.description {
            task.description = description.clone();
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(color) = &patch.color {
            task.color = color.clone();
        }
        if let Some(assignee_id) = &patch.assignee_id {
            task.assignee_id = Some(assignee_id.clone());
        }
        task.updated_at = Some(Utc::now());
        let mut response = task.clone();
        response.assignee = None;
        Ok(response)
    }

    async fn delete_task(&self, id: &str) -> ApiResult<()> {
        self.guard()?;
        self.lock().tasks.retain(|t| t.id != id);
        Ok(())
    }
}
