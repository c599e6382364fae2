use crate::search::SearchParams;

/// Screens, each addressable by a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Signup,
    Dashboard,
    Users(SearchParams),
    Project { id: String },
    ProjectTasks { id: String },
    NewTask { project_id: String },
    EditTask { project_id: String, task_id: String },
}

impl Route {
    pub fn to_path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::Dashboard => "/".to_string(),
            Route::Users(params) => params.to_path(),
            Route::Project { id } => format!("/projects/{}", id),
            Route::ProjectTasks { id } => format!("/projects/{}/tasks", id),
            Route::NewTask { project_id } => format!("/projects/{}/new-task", project_id),
            Route::EditTask {
                project_id,
                task_id,
            } => format!("/projects/{}/edit-task/{}", project_id, task_id),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let route = match segments.as_slice() {
            [] => Route::Dashboard,
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            ["users"] => Route::Users(SearchParams::from_query(query)),
            ["projects", id] => Route::Project { id: id.to_string() },
            ["projects", id, "tasks"] => Route::ProjectTasks { id: id.to_string() },
            ["projects", project_id, "new-task"] => Route::NewTask {
                project_id: project_id.to_string(),
            },
            ["projects", project_id, "edit-task", task_id] => Route::EditTask {
                project_id: project_id.to_string(),
                task_id: task_id.to_string(),
            },
            _ => return None,
        };
        Some(route)
    }

    /// Screens reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Signup)
    }

    /// The project whose tasks this screen shows, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Route::Project { id } | Route::ProjectTasks { id } => Some(id),
            Route::NewTask { project_id } | Route::EditTask { project_id, .. } => Some(project_id),
            _ => None,
        }
    }
}

/// Current route plus a back stack.
#[derive(Debug, Clone)]
pub struct History {
    stack: Vec<Route>,
}

impl History {
    pub fn new(start: Route) -> History {
        History { stack: vec![start] }
    }

    pub fn current(&self) -> &Route {
        // never empty: `back` refuses to pop the last entry
        &self.stack[self.stack.len() - 1]
    }

    pub fn push(&mut self, route: Route) {
        if self.current() != &route {
            self.stack.push(route);
        }
    }

    /// Swaps the current entry, like a URL update that shouldn't add history.
    pub fn replace(&mut self, route: Route) {
        if let Some(top) = self.stack.last_mut() {
            *top = route;
        }
    }

    /// Starts over at `route` with no history behind it.
    pub fn reset(&mut self, route: Route) {
        self.stack = vec![route];
    }

    pub fn back(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            true
        } else {
            false
        }
    }
}
