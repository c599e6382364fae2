use crate::models::{User, UserPatch};
use crate::store::{AppStore, RequestState, RequestStatus};

/// The signed-in user.
#[derive(Debug, Clone, Default)]
pub struct MeState {
    user: Option<User>,
    request: RequestState,
}

impl MeState {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.request.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.request.error()
    }

    pub fn clear(&mut self) {
        self.user = None;
        self.request.reset();
    }
}

impl AppStore {
    pub async fn get_me(&mut self) -> RequestStatus {
        let ticket = self.me.request.begin();
        let result = self.backend.get_me().await;
        let result = self.watch(result);
        let (status, user) = self.me.request.settle(ticket, result, "Failed to get user");
        if user.is_some() {
            self.me.user = user;
        }
        status
    }

    pub async fn update_me(&mut self, patch: &UserPatch) -> RequestStatus {
        let ticket = self.me.request.begin();
        let result = self.backend.update_me(patch).await;
        let result = self.watch(result);
        let (status, user) = self
            .me
            .request
            .settle(ticket, result, "Failed to update user");
        if user.is_some() {
            self.me.user = user;
        }
        status
    }

    pub async fn delete_me(&mut self) -> RequestStatus {
        let ticket = self.me.request.begin();
        let result = self.backend.delete_me().await;
        let result = self.watch(result);
        let (status, _) = self
            .me
            .request
            .settle(ticket, result, "Failed to delete user");
        if status.is_fulfilled() {
            self.me.user = None;
        }
        status
    }
}
