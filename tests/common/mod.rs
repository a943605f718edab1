#![allow(dead_code)]

pub use dotgraph_test_utils::builders;
pub use dotgraph_test_utils::{init_tracing, with_timeout, TestContext};

use std::sync::{Arc, Mutex};

/// Shared, ordered record of which stages ran.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str) {
        self.entries.lock().unwrap().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries.lock().unwrap().iter().filter(|e| *e == name).count()
    }

    /// Position of the first run of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == name)
    }

    /// Handler that records `name` and succeeds.
    pub fn recorder(
        &self,
        name: &str,
    ) -> impl Fn(Arc<dotgraph::context::ExecutionContext>) -> std::future::Ready<anyhow::Result<()>>
    + Send
    + Sync
    + 'static {
        let log = self.clone();
        let name = name.to_string();
        move |_ctx| {
            log.push(&name);
            std::future::ready(Ok(()))
        }
    }
}
