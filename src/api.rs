use crate::error::ApiError;
use crate::models::{
    Credentials, LoginResponse, NewProject, NewTask, OrgMember, Organization, Project,
    SearchPage, SignupData, SignupResponse, Task, TaskPatch, User, UserMembership, UserPatch,
};
use crate::token::TokenStore;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Mutex;
use tracing::{debug, warn};

pub type ApiResult<T> = Result<T, ApiError>;

/// Every REST call the client makes. The store only talks to this trait.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Token attached to subsequent requests; `None` falls back to storage.
    fn set_access_token(&self, token: Option<String>);

    async fn signup(&self, data: &SignupData) -> ApiResult<User>;
    async fn login(&self, credentials: &Credentials) -> ApiResult<String>;

    async fn get_me(&self) -> ApiResult<User>;
    async fn update_me(&self, patch: &UserPatch) -> ApiResult<User>;
    async fn delete_me(&self) -> ApiResult<()>;
    async fn my_memberships(&self) -> ApiResult<Vec<UserMembership>>;
    async fn search_users(&self, query: &str, page: u32) -> ApiResult<SearchPage>;

    async fn list_organizations(&self) -> ApiResult<Vec<Organization>>;
    async fn create_organization(&self, name: &str) -> ApiResult<Organization>;
    async fn get_organization(&self, id: &str) -> ApiResult<Organization>;
    async fn update_organization(&self, id: &str, name: &str) -> ApiResult<Organization>;
    async fn delete_organization(&self, id: &str) -> ApiResult<()>;

    async fn list_members(&self, org_id: &str) -> ApiResult<Vec<OrgMember>>;
    async fn add_member(&self, org_id: &str, user_id: &str) -> ApiResult<()>;
    async fn remove_member(&self, org_id: &str, user_id: &str) -> ApiResult<()>;

    async fn list_projects(&self, org_id: &str) -> ApiResult<Vec<Project>>;
    async fn create_project(&self, project: &NewProject) -> ApiResult<Project>;
    async fn get_project(&self, id: &str) -> ApiResult<Project>;
    async fn update_project(&self, id: &str, name: &str) -> ApiResult<Project>;
    async fn delete_project(&self, id: &str) -> ApiResult<()>;

    async fn list_tasks(&self, project_id: &str) -> ApiResult<Vec<Task>>;
    async fn create_task(&self, task: &NewTask) -> ApiResult<Task>;
    async fn get_task(&self, id: &str) -> ApiResult<Task>;
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> ApiResult<Task>;
    async fn delete_task(&self, id: &str) -> ApiResult<()>;
}

/// Builds `/users/search?q=..&page=..` with proper escaping.
pub fn search_path(query: &str, page: u32) -> String {
    let qs = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("q", query)
        .append_pair("page", &page.to_string())
        .finish();
    format!("/users/search?{}", qs)
}

/// Pulls `message` out of an error body. Validation errors send an array.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        Value::String(message) => Some(message.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

/// A 401 that names its reason (bad credentials, expired token) keeps the
/// message; a bare one is `Unauthorized`.
async fn unauthorized(res: reqwest::Response) -> ApiError {
    let text = match res.text().await {
        Ok(text) => text,
        Err(err) => return err.into(),
    };
    match error_message(&text) {
        Some(message) => ApiError::Status {
            status: 401,
            message: Some(message),
        },
        None => ApiError::Unauthorized,
    }
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Mutex<Option<String>>,
    storage: TokenStore,
}

impl HttpBackend {
    pub fn new(base_url: &str, storage: TokenStore) -> HttpBackend {
        HttpBackend {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
            storage,
        }
    }

    fn current_token(&self) -> Option<String> {
        let held = self.token.lock().ok().and_then(|t| t.clone());
        held.or_else(|| self.storage.load())
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let res = request.send().await?;
        debug!(%method, path, status = res.status().as_u16(), "api request");
        Ok(res)
    }

    /// Sends a request, retrying once with the stored token after a 401.
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<String> {
        let token = self.current_token();
        let mut res = self
            .send_once(&method, path, body.as_ref(), token.as_deref())
            .await?;

        if res.status() == StatusCode::UNAUTHORIZED {
            match self.storage.load() {
                Some(fresh) => {
                    debug!(path, "401, retrying with stored token");
                    if let Ok(mut held) = self.token.lock() {
                        *held = Some(fresh.clone());
                    }
                    res = self
                        .send_once(&method, path, body.as_ref(), Some(&fresh))
                        .await?;
                    if res.status() == StatusCode::UNAUTHORIZED {
                        warn!(path, "still unauthorized after retry");
                        return Err(unauthorized(res).await);
                    }
                }
                // Login failures are 401s too and carry a message worth showing.
                None => return Err(unauthorized(res).await),
            }
        }

        let status = res.status();
        let text = res.text().await?;
        if status.is_success() {
            Ok(text)
        } else {
            warn!(%method, path, status = status.as_u16(), "api error");
            Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            })
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ApiResult<T> {
        let text = self.send(method, path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<()> {
        self.send(method, path, body).await.map(|_| ())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut held) = self.token.lock() {
            *held = token;
        }
    }

    async fn signup(&self, data: &SignupData) -> ApiResult<User> {
        let res: SignupResponse = self
            .fetch(Method::POST, "/auth/signup", Some(serde_json::to_value(data)?))
            .await?;
        Ok(res.user)
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<String> {
        let res: LoginResponse = self
            .fetch(Method::POST, "/auth/login", Some(serde_json::to_value(credentials)?))
            .await?;
        Ok(res.access_token)
    }

    async fn get_me(&self) -> ApiResult<User> {
        self.fetch(Method::GET, "/users/me", None).await
    }

    async fn update_me(&self, patch: &UserPatch) -> ApiResult<User> {
        self.fetch(Method::PATCH, "/users/me", Some(serde_json::to_value(patch)?))
            .await
    }

    async fn delete_me(&self) -> ApiResult<()> {
        self.execute(Method::DELETE, "/users/me", None).await
    }

    async fn my_memberships(&self) -> ApiResult<Vec<UserMembership>> {
        self.fetch(Method::GET, "/users/me/memberships", None).await
    }

    async fn search_users(&self, query: &str, page: u32) -> ApiResult<SearchPage> {
        self.fetch(Method::GET, &search_path(query, page), None).await
    }

    async fn list_organizations(&self) -> ApiResult<Vec<Organization>> {
        self.fetch(Method::GET, "/organizations", None).await
    }

    async fn create_organization(&self, name: &str) -> ApiResult<Organization> {
        self.fetch(Method::POST, "/organizations", Some(json!({ "name": name })))
            .await
    }

    async fn get_organization(&self, id: &str) -> ApiResult<Organization> {
        self.fetch(Method::GET, &format!("/organizations/{}", id), None)
            .await
    }

    async fn update_organization(&self, id: &str, name: &str) -> ApiResult<Organization> {
        self.fetch(
            Method::PATCH,
            &format!("/organizations/{}", id),
            Some(json!({ "name": name })),
        )
        .await
    }

    async fn delete_organization(&self, id: &str) -> ApiResult<()> {
        self.execute(Method::DELETE, &format!("/organizations/{}", id), None)
            .await
    }

    async fn list_members(&self, org_id: &str) -> ApiResult<Vec<OrgMember>> {
        self.fetch(Method::GET, &format!("/organizations/{}/members", org_id), None)
            .await
    }

    async fn add_member(&self, org_id: &str, user_id: &str) -> ApiResult<()> {
        self.execute(
            Method::POST,
            &format!("/organizations/{}/members", org_id),
            Some(json!({ "userId": user_id })),
        )
        .await
    }

    async fn remove_member(&self, org_id: &str, user_id: &str) -> ApiResult<()> {
        self.execute(
            Method::DELETE,
            &format!("/organizations/{}/members/{}", org_id, user_id),
            None,
        )
        .await
    }

    async fn list_projects(&self, org_id: &str) -> ApiResult<Vec<Project>> {
        self.fetch(Method::GET, &format!("/organizations/{}/projects", org_id), None)
            .await
    }

    async fn create_project(&self, project: &NewProject) -> ApiResult<Project> {
        self.fetch(
            Method::POST,
            &format!("/organizations/{}/projects", project.organization_id),
            Some(json!({ "name": project.name })),
        )
        .await
    }

    async fn get_project(&self, id: &str) -> ApiResult<Project> {
        self.fetch(Method::GET, &format!("/projects/{}", id), None).await
    }

    async fn update_project(&self, id: &str, name: &str) -> ApiResult<Project> {
        self.fetch(
            Method::PATCH,
            &format!("/projects/{}", id),
            Some(json!({ "name": name })),
        )
        .await
    }

    async fn delete_project(&self, id: &str) -> ApiResult<()> {
        self.execute(Method::DELETE, &format!("/projects/{}", id), None)
            .await
    }

    async fn list_tasks(&self, project_id: &str) -> ApiResult<Vec<Task>> {
        self.fetch(Method::GET, &format!("/projects/{}/tasks", project_id), None)
            .await
    }

    async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        self.fetch(
            Method::POST,
            &format!("/projects/{}/tasks", task.project_id),
            Some(serde_json::to_value(task)?),
        )
        .await
    }

    async fn get_task(&self, id: &str) -> ApiResult<Task> {
        self.fetch(Method::GET, &format!("/tasks/{}", id), None).await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> ApiResult<Task> {
        self.fetch(
            Method::PATCH,
            &format!("/tasks/{}", id),
            Some(serde_json::to_value(patch)?),
        )
        .await
    }

    async fn delete_task(&self, id: &str) -> ApiResult<()> {
        self.execute(Method::DELETE, &format!("/tasks/{}", id), None)
            .await
    }
}
