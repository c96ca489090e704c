//! Gremlin script endpoint client.
//!
//! [`ScriptClient`] is the only way the synchronizer reaches the database.
//! [`GremlinHttpClient`] talks to the Gremlin Server HTTP channel, which
//! accepts `{"gremlin": ..., "bindings": ...}` and answers with a GraphSON
//! result envelope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::EndpointConfig;
use crate::error::{SchemaError, SchemaResult};
use crate::script::Script;

/// Executes a script with named bindings and returns its result.
#[async_trait]
pub trait ScriptClient: Send + Sync {
    async fn execute(&self, script: &Script) -> SchemaResult<Value>;
}

#[async_trait]
impl<T: ScriptClient + ?Sized> ScriptClient for Arc<T> {
    async fn execute(&self, script: &Script) -> SchemaResult<Value> {
        (**self).execute(script).await
    }
}

/// Client for the Gremlin Server HTTP endpoint.
#[derive(Clone)]
pub struct GremlinHttpClient {
    url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ScriptRequest<'a> {
    gremlin: &'a str,
    bindings: &'a Map<String, Value>,
    language: &'static str,
}

#[derive(Deserialize)]
struct ScriptResponse {
    result: ScriptResult,
}

#[derive(Deserialize)]
struct ScriptResult {
    #[serde(default)]
    data: Value,
}

impl GremlinHttpClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: &EndpointConfig) -> SchemaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ScriptClient for GremlinHttpClient {
    async fn execute(&self, script: &Script) -> SchemaResult<Value> {
        let request = ScriptRequest {
            gremlin: &script.text,
            bindings: &script.bindings,
            language: "gremlin-groovy",
        };

        debug!(
            bytes = script.text.len(),
            bindings = script.bindings.len(),
            "Submitting Gremlin script"
        );

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SchemaError::backend(status.as_u16(), error_message(&body)));
        }

        let envelope: ScriptResponse = response
            .json()
            .await
            .map_err(|e| SchemaError::unexpected(format!("malformed result envelope: {}", e)))?;

        Ok(untype(envelope.result.data))
    }
}

/// Pull the server's message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Strip GraphSON `{"@type", "@value"}` wrappers into plain JSON.
pub fn untype(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(untype).collect()),
        Value::Object(mut obj) => {
            if obj.len() == 2 && obj.contains_key("@type") && obj.contains_key("@value") {
                let ty = obj.remove("@type");
                let inner = obj.remove("@value").unwrap_or(Value::Null);
                match ty.as_ref().and_then(Value::as_str) {
                    Some("g:Map") => untype_map(inner),
                    _ => untype(inner),
                }
            } else {
                Value::Object(obj.into_iter().map(|(k, v)| (k, untype(v))).collect())
            }
        }
        other => other,
    }
}

/// GraphSON maps are flat `[k1, v1, k2, v2, ...]` arrays.
fn untype_map(inner: Value) -> Value {
    let Value::Array(items) = inner else {
        return untype(inner);
    };
    let mut map = Map::new();
    let mut iter = items.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        let key = match untype(k) {
            Value::String(s) => s,
            other => other.to_string(),
        };
        map.insert(key, untype(v));
    }
    Value::Object(map)
}

/// Flatten a result into a list of strings, ignoring nulls.
///
/// Script results come back as a list of whatever the last statement
/// produced; a collection result may also arrive nested one level deep.
pub fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => out.push(s.clone()),
            Value::Array(_) => out.extend(string_list(item)?),
            Value::Null => {}
            _ => return None,
        }
    }
    Some(out)
}
