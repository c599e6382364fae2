//! The list + selection state every resource shares, and the
//! pending / fulfilled / rejected transitions applied to it.

use crate::api::ApiResult;
use crate::models::Entity;
use crate::store::selection::{remove_and_reselect, replace_in_place};
use tracing::{debug, warn};

/// Identifies one dispatched request. Only the newest ticket of a slice
/// may settle it; older ones are dropped when they come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// What the caller learns once a dispatch settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Fulfilled,
    Rejected,
    /// A newer request was dispatched on the same slice before this one
    /// came back, so its outcome was discarded.
    Superseded,
}

impl RequestStatus {
    pub fn is_fulfilled(self) -> bool {
        self == RequestStatus::Fulfilled
    }
}

/// Loading flag, last error and ticket counter.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    loading: bool,
    error: Option<String>,
    issued: u64,
}

impl RequestState {
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Pending: clears the error and marks the slice busy.
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        self.loading = true;
        self.error = None;
        Ticket(self.issued)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }

    /// Fulfilled. Returns false if the ticket is stale.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, latest = self.issued, "dropping stale response");
            return false;
        }
        self.loading = false;
        true
    }

    /// Rejected with a user-facing message.
    pub fn fail(&mut self, ticket: Ticket, message: String) -> RequestStatus {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, latest = self.issued, "dropping stale failure");
            return RequestStatus::Superseded;
        }
        warn!(error = %message, "request rejected");
        self.loading = false;
        self.error = Some(message);
        RequestStatus::Rejected
    }

    /// Resets flags and invalidates anything still in flight.
    pub fn reset(&mut self) {
        self.issued += 1;
        self.loading = false;
        self.error = None;
    }

    /// Settles a request whose success needs no list bookkeeping.
    pub fn settle<R>(
        &mut self,
        ticket: Ticket,
        result: ApiResult<R>,
        fallback: &str,
    ) -> (RequestStatus, Option<R>) {
        match result {
            Ok(value) if self.finish(ticket) => (RequestStatus::Fulfilled, Some(value)),
            Ok(_) => (RequestStatus::Superseded, None),
            Err(err) => (self.fail(ticket, err.message_or(fallback)), None),
        }
    }
}

/// How a fulfilled request changes the slice.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<T> {
    /// `list`: replace everything, select the first item.
    Replace(Vec<T>),
    /// `create`: append and select.
    Append(T),
    /// `update`: replace by id in place.
    Update(T),
    /// `getOne`: select without touching the list.
    Select(T),
    /// `delete`: drop by id, reselect if needed.
    Remove(String),
    /// Success with nothing to apply.
    Nothing,
}

#[derive(Debug, Clone)]
pub struct ResourceSlice<T> {
    items: Vec<T>,
    selected: Option<T>,
    request: RequestState,
}

impl<T> Default for ResourceSlice<T> {
    fn default() -> Self {
        ResourceSlice {
            items: Vec::new(),
            selected: None,
            request: RequestState::default(),
        }
    }
}

impl<T: Entity> ResourceSlice<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.as_ref()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(Entity::id)
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected_id()?;
        self.items.iter().position(|i| i.id() == id)
    }

    pub fn loading(&self) -> bool {
        self.request.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.request.error()
    }

    pub fn set_selected(&mut self, selected: Option<T>) {
        self.selected = selected;
    }

    pub fn begin(&mut self) -> Ticket {
        self.request.begin()
    }

    /// Applies the outcome of the request behind `ticket`.
    pub fn settle(
        &mut self,
        ticket: Ticket,
        result: ApiResult<Effect<T>>,
        fallback: &str,
    ) -> RequestStatus {
        let (status, effect) = self.request.settle(ticket, result, fallback);
        if let Some(effect) = effect {
            self.apply(effect);
        }
        status
    }

    fn apply(&mut self, effect: Effect<T>) {
        match effect {
            Effect::Replace(items) => {
                self.selected = items.first().cloned();
                self.items = items;
            }
            Effect::Append(item) => {
                self.items.push(item.clone());
                self.selected = Some(item);
            }
            Effect::Update(mut item) => {
                replace_in_place(&mut self.items, &item);
                if let Some(previous) = self.selected.as_ref().filter(|s| s.id() == item.id()) {
                    previous.carry_over(&mut item);
                    self.selected = Some(item);
                }
            }
            Effect::Select(item) => self.selected = Some(item),
            Effect::Remove(id) => {
                let items = std::mem::take(&mut self.items);
                let (items, selected) = remove_and_reselect(items, self.selected.take(), &id);
                self.items = items;
                self.selected = selected;
            }
            Effect::Nothing => {}
        }
    }

    /// Back to the empty state.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
        self.request.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::{Assignee, Organization, Task, TaskStatus};

    fn org(id: &str, name: &str) -> Organization {
        Organization {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn task(id: &str, status: TaskStatus, assignee: Option<Assignee>) -> Task {
        Task {
            id: id.to_string(),
            name: format!("task {}", id),
            description: String::new(),
            status,
            color: "#ffffff".to_string(),
            project_id: "p".to_string(),
            due_date: None,
            created_at: None,
            updated_at: None,
            assignee_id: assignee.as_ref().map(|a| a.id.clone()),
            assignee,
        }
    }

    fn server_error(message: &str) -> ApiError {
        ApiError::Status {
            status: 400,
            message: Some(message.to_string()),
        }
    }

    fn loaded(orgs: Vec<Organization>) -> ResourceSlice<Organization> {
        let mut slice = ResourceSlice::new();
        let t = slice.begin();
        slice.settle(t, Ok(Effect::Replace(orgs)), "Failed to fetch organizations");
        slice
    }

    #[test]
    fn test_pending_sets_loading_and_clears_error() {
        let mut slice: ResourceSlice<Organization> = ResourceSlice::new();
        let t = slice.begin();
        slice.settle(t, Err(server_error("boom")), "Failed");
        assert_eq!(slice.error(), Some("boom"));

        slice.begin();
        assert!(slice.loading());
        assert_eq!(slice.error(), None);
    }

    #[test]
    fn test_list_replaces_and_selects_first() {
        let slice = loaded(vec![org("1", "a"), org("2", "b")]);
        assert_eq!(slice.items().len(), 2);
        assert_eq!(slice.selected_id(), Some("1"));
        assert!(!slice.loading());
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        let slice = loaded(vec![]);
        assert!(slice.selected().is_none());
    }

    #[test]
    fn test_create_appends_and_selects() {
        let mut slice = loaded(vec![org("1", "a")]);
        let t = slice.begin();
        let status = slice.settle(t, Ok(Effect::Append(org("2", "b"))), "Failed to create organization");
        assert_eq!(status, RequestStatus::Fulfilled);
        assert_eq!(slice.items().last().unwrap().id, "2");
        assert_eq!(slice.selected_id(), Some("2"));
    }

    #[test]
    fn test_update_replaces_in_place_and_refreshes_selection() {
        let mut slice = loaded(vec![org("1", "a"), org("2", "b"), org("3", "c")]);
        slice.set_selected(Some(org("2", "b")));
        let t = slice.begin();
        slice.settle(t, Ok(Effect::Update(org("2", "renamed"))), "Failed to update organization");
        let names: Vec<&str> = slice.items().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "renamed", "c"]);
        assert_eq!(slice.selected().unwrap().name, "renamed");
    }

    #[test]
    fn test_update_unknown_id_is_silent_noop() {
        let mut slice = loaded(vec![org("1", "a")]);
        let t = slice.begin();
        let status = slice.settle(t, Ok(Effect::Update(org("9", "ghost"))), "Failed");
        assert_eq!(status, RequestStatus::Fulfilled);
        assert_eq!(slice.items(), &[org("1", "a")]);
        assert_eq!(slice.selected_id(), Some("1"));
        assert_eq!(slice.error(), None);
    }

    #[test]
    fn test_get_one_selects_without_touching_items() {
        let mut slice = loaded(vec![org("1", "a")]);
        let t = slice.begin();
        slice.settle(t, Ok(Effect::Select(org("42", "elsewhere"))), "Failed");
        assert_eq!(slice.items().len(), 1);
        assert_eq!(slice.selected_id(), Some("42"));
    }

    #[test]
    fn test_delete_applies_reselection() {
        let mut slice = loaded(vec![org("1", "a"), org("2", "b")]);
        let t = slice.begin();
        slice.settle(t, Ok(Effect::Remove("1".to_string())), "Failed to delete organization");
        assert_eq!(slice.items(), &[org("2", "b")]);
        assert_eq!(slice.selected_id(), Some("2"));
    }

    #[test]
    fn test_rejection_uses_fallback_and_keeps_items() {
        let mut slice = loaded(vec![org("1", "a")]);
        let t = slice.begin();
        let status = slice.settle(
            t,
            Err(ApiError::Status {
                status: 500,
                message: None,
            }),
            "Failed to create organization",
        );
        assert_eq!(status, RequestStatus::Rejected);
        assert_eq!(slice.error(), Some("Failed to create organization"));
        assert!(!slice.loading());
        assert_eq!(slice.items().len(), 1);
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut slice: ResourceSlice<Organization> = ResourceSlice::new();
        let first = slice.begin();
        let second = slice.begin();

        let status = slice.settle(first, Ok(Effect::Replace(vec![org("old", "old")])), "Failed");
        assert_eq!(status, RequestStatus::Superseded);
        assert!(slice.items().is_empty());
        assert!(slice.loading());

        let status = slice.settle(second, Ok(Effect::Replace(vec![org("new", "new")])), "Failed");
        assert_eq!(status, RequestStatus::Fulfilled);
        assert_eq!(slice.selected_id(), Some("new"));
        assert!(!slice.loading());
    }

    #[test]
    fn test_clear_is_idempotent_and_drops_in_flight() {
        let mut slice = loaded(vec![org("1", "a")]);
        let in_flight = slice.begin();
        slice.clear();
        let once = (slice.items().to_vec(), slice.selected().cloned(), slice.loading(), slice.error().map(str::to_string));
        slice.clear();
        let twice = (slice.items().to_vec(), slice.selected().cloned(), slice.loading(), slice.error().map(str::to_string));
        assert_eq!(once, twice);
        assert_eq!(once, (vec![], None, false, None));

        let status = slice.settle(in_flight, Ok(Effect::Replace(vec![org("late", "late")])), "Failed");
        assert_eq!(status, RequestStatus::Superseded);
        assert!(slice.items().is_empty());
    }

    #[test]
    fn test_task_update_keeps_previous_assignee_on_selection() {
        let ada = Assignee {
            id: "u1".to_string(),
            username: Some("ada".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
        };
        let mut slice: ResourceSlice<Task> = ResourceSlice::new();
        let t = slice.begin();
        slice.settle(
            t,
            Ok(Effect::Replace(vec![task("1", TaskStatus::ToDo, Some(ada.clone()))])),
            "Failed to fetch tasks",
        );

        let t = slice.begin();
        slice.settle(
            t,
            Ok(Effect::Update(task("1", TaskStatus::InProgress, None))),
            "Failed to update task",
        );
        let selected = slice.selected().unwrap();
        assert_eq!(selected.status, TaskStatus::InProgress);
        assert_eq!(selected.assignee.as_ref(), Some(&ada));
        // the list copy mirrors the server response
        assert_eq!(slice.items()[0].status, TaskStatus::InProgress);
    }
}
