//! Common test utilities shared across integration tests.

#![allow(dead_code, missing_docs)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use goldkit_core::navigation::{Navigator, Route};
use goldkit_core::storage::{KeyValueStore, MemoryStore};

// Integration tests link the crate without `cfg(test)`, so the recording
// navigator from `navigation::test_support` is repeated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCall {
    NavigateTo(Route, HashMap<String, String>),
    Replace(Route, HashMap<String, String>),
    Reset(Vec<Route>),
}

#[derive(Default)]
pub struct RecordingNavigator {
    calls: Mutex<Vec<NavCall>>,
}

impl RecordingNavigator {
    pub fn calls(&self) -> Vec<NavCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, route: Route, params: HashMap<String, String>) {
        self.calls
            .lock()
            .unwrap()
            .push(NavCall::NavigateTo(route, params));
    }

    fn replace(&self, route: Route, params: HashMap<String, String>) {
        self.calls.lock().unwrap().push(NavCall::Replace(route, params));
    }

    fn reset(&self, routes: Vec<Route>) {
        self.calls.lock().unwrap().push(NavCall::Reset(routes));
    }
}

/// A store holding a signed-in session with `token`.
pub fn signed_in_store(token: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set("auth_token".to_string(), token.to_string())
        .expect("set token");
    store
        .set(
            "user".to_string(),
            r#"{"id":"11","phone":"9876543210","name":null,"email":null}"#.to_string(),
        )
        .expect("set user");
    store
}

/// API config JSON pointing at a mock server, with retries off.
pub fn api_config_json(base_url: &str) -> String {
    format!(r#"{{"base_url": "{base_url}", "timeout_secs": 5, "max_retries": 0}}"#)
}
