use crate::models::SearchPage;
use crate::store::{AppStore, RequestState, RequestStatus};

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    data: SearchPage,
    request: RequestState,
}

impl SearchState {
    pub fn data(&self) -> &SearchPage {
        &self.data
    }

    pub fn loading(&self) -> bool {
        self.request.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.request.error()
    }

    pub fn clear(&mut self) {
        self.data = SearchPage::default();
        self.request.reset();
    }
}

impl AppStore {
    pub async fn search_users(&mut self, name: &str, page: u32) -> RequestStatus {
        let ticket = self.search.request.begin();
        let result = self.backend.search_users(name, page).await;
        let result = self.watch(result);
        let (status, data) = self
            .search
            .request
            .settle(ticket, result, "Error fetching users");
        match (status, data) {
            (_, Some(data)) => self.search.data = data,
            (RequestStatus::Rejected, None) => self.search.data = SearchPage::default(),
            _ => {}
        }
        status
    }
}
