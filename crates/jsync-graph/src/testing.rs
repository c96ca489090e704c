//! Recording script client for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::ScriptClient;
use crate::error::SchemaResult;
use crate::script::Script;

type Responder = Box<dyn FnMut(&Script) -> SchemaResult<Value> + Send>;

/// Records every submitted script and answers through a closure.
pub struct RecordingClient {
    scripts: Mutex<Vec<Script>>,
    responder: Mutex<Responder>,
}

impl RecordingClient {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: FnMut(&Script) -> SchemaResult<Value> + Send + 'static,
    {
        Arc::new(Self {
            scripts: Mutex::new(Vec::new()),
            responder: Mutex::new(Box::new(responder)),
        })
    }

    pub fn scripts(&self) -> Vec<Script> {
        self.scripts.lock().unwrap().clone()
    }

    /// Number of submitted scripts whose text contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.scripts
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.text.contains(needle))
            .count()
    }
}

#[async_trait]
impl ScriptClient for RecordingClient {
    async fn execute(&self, script: &Script) -> SchemaResult<Value> {
        self.scripts.lock().unwrap().push(script.clone());
        let mut responder = self.responder.lock().unwrap();
        (&mut **responder)(script)
    }
}
