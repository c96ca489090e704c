//! # jsync graph
//!
//! Schema synchronization for JanusGraph over the Gremlin script endpoint.
//!
//! Creates, checks and drops graphs, and keeps vertex labels, edge labels,
//! property keys and indexes in line with a declarative mapping. All work is
//! expressed as Gremlin scripts with named bindings and run by the server.

pub mod client;
pub mod config;
pub mod error;
pub mod index;
pub mod mapping;
pub mod schema;
pub mod script;

#[cfg(test)]
mod testing;

pub use client::{GremlinHttpClient, ScriptClient};
pub use config::{AwaitStrategy, JsyncConfig};
pub use error::{SchemaError, SchemaResult};
pub use index::{IndexStatus, SyncReport};
pub use mapping::{IndexSpec, MappingDescriptor};
pub use schema::SchemaSynchronizer;
pub use script::{Script, ScriptBuilder, Statement};
