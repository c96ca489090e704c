//! Declarative mapping for one vertex label.
//!
//! A mapping lists the edge labels, property keys and indexes that should
//! exist alongside the vertex label. Maps keep declaration order, which is the
//! order statements are emitted in.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

/// Edge label multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiplicity {
    #[serde(rename = "MULTI")]
    Multi,
    #[serde(rename = "SIMPLE")]
    Simple,
    #[serde(rename = "MANY2ONE")]
    ManyToOne,
    #[serde(rename = "ONE2MANY")]
    OneToMany,
    #[serde(rename = "ONE2ONE")]
    OneToOne,
}

impl Multiplicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Multiplicity::Multi => "MULTI",
            Multiplicity::Simple => "SIMPLE",
            Multiplicity::ManyToOne => "MANY2ONE",
            Multiplicity::OneToMany => "ONE2MANY",
            Multiplicity::OneToOne => "ONE2ONE",
        }
    }
}

/// Property key cardinality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cardinality {
    #[default]
    Single,
    List,
    Set,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Single => "SINGLE",
            Cardinality::List => "LIST",
            Cardinality::Set => "SET",
        }
    }
}

/// Property data types understood by JanusGraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    String,
    Character,
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Date,
    Instant,
    #[serde(rename = "UUID", alias = "Uuid")]
    Uuid,
    Geoshape,
}

impl DataType {
    /// Class reference as written in a Groovy script.
    pub fn class_name(&self) -> &'static str {
        match self {
            DataType::String => "String.class",
            DataType::Character => "Character.class",
            DataType::Boolean => "Boolean.class",
            DataType::Byte => "Byte.class",
            DataType::Short => "Short.class",
            DataType::Integer => "Integer.class",
            DataType::Long => "Long.class",
            DataType::Float => "Float.class",
            DataType::Double => "Double.class",
            DataType::Date => "Date.class",
            DataType::Instant => "java.time.Instant.class",
            DataType::Uuid => "UUID.class",
            DataType::Geoshape => "Geoshape.class",
        }
    }
}

/// Edge direction covered by a vertex-centric index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Out,
    In,
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Out => "OUT",
            Direction::In => "IN",
            Direction::Both => "BOTH",
        }
    }
}

/// Sort order of a vertex-centric index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "ASC", alias = "incr")]
    Asc,
    #[serde(alias = "DESC", alias = "decr")]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Declaration of a property key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub cardinality: Cardinality,
}

/// Declaration of an index, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IndexSpec {
    Composite {
        keys: Vec<String>,
        #[serde(default)]
        unique: bool,
    },
    Mixed {
        keys: Vec<String>,
        #[serde(default)]
        unique: bool,
        /// Search index name; falls back to the configured one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        backend: Option<String>,
    },
    VertexCentric {
        keys: Vec<String>,
        /// Edge label the index is scoped to.
        label: String,
        direction: Direction,
        #[serde(default)]
        order: SortOrder,
    },
}

impl IndexSpec {
    pub fn keys(&self) -> &[String] {
        match self {
            IndexSpec::Composite { keys, .. }
            | IndexSpec::Mixed { keys, .. }
            | IndexSpec::VertexCentric { keys, .. } => keys,
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            IndexSpec::Composite { .. } => IndexKind::Composite,
            IndexSpec::Mixed { .. } => IndexKind::Mixed,
            IndexSpec::VertexCentric { .. } => IndexKind::VertexCentric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Composite,
    Mixed,
    VertexCentric,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Composite => write!(f, "composite"),
            IndexKind::Mixed => write!(f, "mixed"),
            IndexKind::VertexCentric => write!(f, "vertex-centric"),
        }
    }
}

/// Everything that should exist for one vertex label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingDescriptor {
    pub relations: IndexMap<String, Multiplicity>,
    pub properties: IndexMap<String, PropertySpec>,
    pub indexes: IndexMap<String, IndexSpec>,
}

impl MappingDescriptor {
    /// Parse a mapping from JSON text.
    pub fn from_json_str(text: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a mapping from TOML text.
    pub fn from_toml_str(text: &str) -> SchemaResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a mapping file; `.toml` files parse as TOML, anything else as JSON.
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    /// Check the mapping can be rendered into valid management statements.
    pub fn validate(&self) -> SchemaResult<()> {
        for name in self.relations.keys() {
            require_name("edge label", name)?;
        }
        for name in self.properties.keys() {
            require_name("property key", name)?;
        }
        for (name, index) in &self.indexes {
            validate_index(name, index)?;
        }
        Ok(())
    }
}

/// Check a single index declaration.
pub fn validate_index(name: &str, index: &IndexSpec) -> SchemaResult<()> {
    require_name("index", name)?;
    if index.keys().is_empty() {
        return Err(SchemaError::invalid_mapping(format!(
            "index '{}' must declare at least one key",
            name
        )));
    }
    for key in index.keys() {
        require_name("index key", key)?;
    }
    if let IndexSpec::VertexCentric { label, .. } = index {
        require_name("index edge label", label)?;
    }
    Ok(())
}

fn require_name(what: &str, name: &str) -> SchemaResult<()> {
    if name.trim().is_empty() {
        return Err(SchemaError::invalid_mapping(format!("{} name must not be empty", what)));
    }
    Ok(())
}
