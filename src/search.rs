//! User search: debounced input, URL-carried parameters, and the rule for
//! when to fetch. The three stages are independent of each other.

use std::time::{Duration, Instant};

/// Raw keystrokes in, settled query out.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    raw: String,
    changed_at: Option<Instant>,
    committed: String,
}

impl Debouncer {
    pub fn new(initial: &str, delay: Duration) -> Debouncer {
        Debouncer {
            delay,
            raw: initial.to_string(),
            changed_at: None,
            committed: initial.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn input(&mut self, value: String, now: Instant) {
        self.raw = value;
        self.changed_at = Some(now);
    }

    /// Commits the raw value once it has been quiet for the delay.
    /// Returns the new query only when it differs from the last one.
    pub fn poll(&mut self, now: Instant) -> Option<&str> {
        let changed_at = self.changed_at?;
        if now.duration_since(changed_at) < self.delay {
            return None;
        }
        self.changed_at = None;
        if self.raw == self.committed {
            return None;
        }
        self.committed = self.raw.clone();
        Some(&self.committed)
    }
}

/// The part of search state that lives in the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub page: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            query: String::new(),
            page: 1,
        }
    }
}

impl SearchParams {
    /// `/users?q=<query>`, the prefix page links append `&page=N` to.
    pub fn base_url(&self) -> String {
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("q", &self.query)
            .finish();
        format!("/users?{}", qs)
    }

    pub fn to_path(&self) -> String {
        format!("{}&page={}", self.base_url(), self.page)
    }

    /// Reads `q` and `page` from a query string. Bad pages become 1.
    pub fn from_query(query: &str) -> SearchParams {
        let mut params = SearchParams::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "q" => params.query = value.into_owned(),
                "page" => params.page = value.parse().ok().filter(|p| *p >= 1).unwrap_or(1),
                _ => {}
            }
        }
        params
    }
}

/// Decides when the search screen should hit the network.
#[derive(Debug, Clone)]
pub struct SearchController {
    debouncer: Debouncer,
    params: SearchParams,
    last_fetched: Option<SearchParams>,
}

impl SearchController {
    pub fn new(params: SearchParams, delay: Duration) -> SearchController {
        SearchController {
            debouncer: Debouncer::new(&params.query, delay),
            params,
            last_fetched: None,
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn input_text(&self) -> &str {
        self.debouncer.raw()
    }

    pub fn on_input(&mut self, text: String, now: Instant) {
        self.debouncer.input(text, now);
    }

    /// A settled query starts over at page 1. Returns the params the URL
    /// should now show, if they changed.
    pub fn tick(&mut self, now: Instant) -> Option<SearchParams> {
        let query = self.debouncer.poll(now)?.to_string();
        self.params = SearchParams { query, page: 1 };
        Some(self.params.clone())
    }

    /// Follows the URL (page links, back navigation).
    pub fn sync_from_url(&mut self, params: SearchParams) {
        if params.query != self.debouncer.committed() {
            self.debouncer = Debouncer::new(&params.query, self.debouncer.delay);
        }
        self.params = params;
    }

    /// Forgets the last fetch so the next `fetch_due` fires again.
    pub fn invalidate(&mut self) {
        self.last_fetched = None;
    }

    /// Params to fetch now, if they differ from the last fetch and nothing
    /// is in flight. A failed fetch is not retried until inputs change.
    pub fn fetch_due(&mut self, loading: bool) -> Option<SearchParams> {
        if loading || self.last_fetched.as_ref() == Some(&self.params) {
            return None;
        }
        self.last_fetched = Some(self.params.clone());
        Some(self.params.clone())
    }
}
