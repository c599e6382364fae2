//! Client-side mirror of the server resources.
//!
//! `AppStore` is an ordinary value owned by the app loop. Every operation
//! is `pending -> fulfilled | rejected` on one slice and reports a
//! [`RequestStatus`] the caller branches on; failures are kept as state
//! and never returned as errors.

pub mod auth;
pub mod me;
pub mod membership;
pub mod search;
pub mod selection;
pub mod slice;

use crate::api::{ApiResult, Backend};
use crate::error::ApiError;
use crate::models::{NewProject, NewTask, Organization, Project, Task, TaskPatch};
use crate::token::TokenStore;
use std::sync::Arc;
use tracing::info;

pub use auth::AuthState;
pub use me::MeState;
pub use membership::MembershipState;
pub use search::SearchState;
pub use slice::{Effect, RequestState, RequestStatus, ResourceSlice};

pub struct AppStore {
    backend: Arc<dyn Backend>,
    tokens: TokenStore,
    session_expired: bool,
    pub auth: AuthState,
    pub me: MeState,
    pub organizations: ResourceSlice<Organization>,
    pub projects: ResourceSlice<Project>,
    pub tasks: ResourceSlice<Task>,
    pub membership: MembershipState,
    pub search: SearchState,
}

impl AppStore {
    pub fn new(backend: Arc<dyn Backend>, tokens: TokenStore) -> AppStore {
        AppStore {
            backend,
            tokens,
            session_expired: false,
            auth: AuthState::default(),
            me: MeState::default(),
            organizations: ResourceSlice::new(),
            projects: ResourceSlice::new(),
            tasks: ResourceSlice::new(),
            membership: MembershipState::default(),
            search: SearchState::default(),
        }
    }

    /// True once a request came back 401 even after retrying with the
    /// stored token.
    pub fn take_session_expired(&mut self) -> bool {
        std::mem::take(&mut self.session_expired)
    }

    fn watch<R>(&mut self, result: ApiResult<R>) -> ApiResult<R> {
        if result.as_ref().is_err_and(ApiError::is_unauthorized) {
            self.session_expired = true;
        }
        result
    }

    /// Empties every resource slice. Auth is left to `logout`.
    pub fn clear_resources(&mut self) {
        self.me.clear();
        self.organizations.clear();
        self.projects.clear();
        self.tasks.clear();
        self.membership.clear();
        self.search.clear();
    }

    // ---- Organizations ----

    pub async fn find_all_organizations(&mut self) -> RequestStatus {
        let ticket = self.organizations.begin();
        let result = self.backend.list_organizations().await.map(Effect::Replace);
        let result = self.watch(result);
        self.organizations
            .settle(ticket, result, "Failed to fetch organizations")
    }

    pub async fn create_organization(&mut self, name: &str) -> RequestStatus {
        let ticket = self.organizations.begin();
        let result = self.backend.create_organization(name).await.map(Effect::Append);
        let result = self.watch(result);
        let status = self
            .organizations
            .settle(ticket, result, "Failed to create organization");
        if status.is_fulfilled() {
            info!(name, "organization created");
        }
        status
    }

    pub async fn get_organization(&mut self, id: &str) -> RequestStatus {
        let ticket = self.organizations.begin();
        let result = self.backend.get_organization(id).await.map(Effect::Select);
        let result = self.watch(result);
        self.organizations
            .settle(ticket, result, "Failed to fetch organization")
    }

    pub async fn update_organization(&mut self, id: &str, name: &str) -> RequestStatus {
        let ticket = self.organizations.begin();
        let result = self
            .backend
            .update_organization(id, name)
            .await
            .map(Effect::Update);
        let result = self.watch(result);
        self.organizations
            .settle(ticket, result, "Failed to update organization")
    }

    pub async fn delete_organization(&mut self, id: &str) -> RequestStatus {
        let ticket = self.organizations.begin();
        let result = self
            .backend
            .delete_organization(id)
            .await
            .map(|_| Effect::Remove(id.to_string()));
        let result = self.watch(result);
        self.organizations
            .settle(ticket, result, "Failed to delete organization")
    }

    pub fn set_selected_organization(&mut self, organization: Option<Organization>) {
        self.organizations.set_selected(organization);
    }

    // ---- Projects ----

    pub async fn find_all_projects(&mut self, organization_id: &str) -> RequestStatus {
        let ticket = self.projects.begin();
        let result = self
            .backend
            .list_projects(organization_id)
            .await
            .map(Effect::Replace);
        let result = self.watch(result);
        self.projects.settle(ticket, result, "Failed to fetch projects")
    }

    pub async fn create_project(&mut self, organization_id: &str, name: &str) -> RequestStatus {
        let project = NewProject {
            organization_id: organization_id.to_string(),
            name: name.to_string(),
        };
        let ticket = self.projects.begin();
        let result = self.backend.create_project(&project).await.map(Effect::Append);
        let result = self.watch(result);
        self.projects.settle(ticket, result, "Failed to create project")
    }

    pub async fn get_project(&mut self, id: &str) -> RequestStatus {
        let ticket = self.projects.begin();
        let result = self.backend.get_project(id).await.map(Effect::Select);
        let result = self.watch(result);
        self.projects.settle(ticket, result, "Failed to fetch project")
    }

    pub async fn update_project(&mut self, id: &str, name: &str) -> RequestStatus {
        let ticket = self.projects.begin();
        let result = self.backend.update_project(id, name).await.map(Effect::Update);
        let result = self.watch(result);
        self.projects.settle(ticket, result, "Failed to update project")
    }

    pub async fn delete_project(&mut self, id: &str) -> RequestStatus {
        let ticket = self.projects.begin();
        let result = self
            .backend
            .delete_project(id)
            .await
            .map(|_| Effect::Remove(id.to_string()));
        let result = self.watch(result);
        self.projects.settle(ticket, result, "Failed to delete project")
    }

    pub fn set_selected_project(&mut self, project: Option<Project>) {
        self.projects.set_selected(project);
    }

    // ---- Tasks ----

    pub async fn find_all_tasks(&mut self, project_id: &str) -> RequestStatus {
        let ticket = self.tasks.begin();
        let result = self.backend.list_tasks(project_id).await.map(Effect::Replace);
        let result = self.watch(result);
        self.tasks.settle(ticket, result, "Failed to fetch tasks")
    }

    pub async fn create_task(&mut self, task: &NewTask) -> RequestStatus {
        let ticket = self.tasks.begin();
        let result = self.backend.create_task(task).await.map(Effect::Append);
        let result = self.watch(result);
        self.tasks.settle(ticket, result, "Failed to create task")
    }

    pub async fn get_task(&mut self, id: &str) -> RequestStatus {
        let ticket = self.tasks.begin();
        let result = self.backend.get_task(id).await.map(Effect::Select);
        let result = self.watch(result);
        self.tasks.settle(ticket, result, "Failed to fetch task")
    }

    pub async fn update_task(&mut self, id: &str, patch: &TaskPatch) -> RequestStatus {
        let ticket = self.tasks.begin();
        let result = self.backend.update_task(id, patch).await.map(Effect::Update);
        let result = self.watch(result);
        self.tasks.settle(ticket, result, "Failed to update task")
    }

    pub async fn delete_task(&mut self, id: &str) -> RequestStatus {
        let ticket = self.tasks.begin();
        let result = self
            .backend
            .delete_task(id)
            .await
            .map(|_| Effect::Remove(id.to_string()));
        let result = self.watch(result);
        self.tasks.settle(ticket, result, "Failed to delete task")
    }

    pub fn set_selected_task(&mut self, task: Option<Task>) {
        self.tasks.set_selected(task);
    }
}
