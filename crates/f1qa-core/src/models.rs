//! Wire types for the Q&A backend.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

/// Answer returned by `POST /ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub related_entities: Vec<RelatedEntity>,
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A structured fact the backend associates with an answer, e.g.
/// `{"type": "driver", "name": "Verstappen"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedEntity {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RelatedEntity {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            name: Some(name.to_string()),
            value: None,
        }
    }

    /// Card label; falls back to "Entity" when the backend omits the type.
    pub fn label(&self) -> String {
        self.kind.clone().unwrap_or_else(|| "Entity".to_string())
    }

    /// Card value: `name`, then `value`, then "N/A".
    pub fn display_value(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "N/A".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub knowledge_base_loaded: Option<bool>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == "ok" || self.status == "healthy"
    }
}

/// Entity collections exposed by `GET /entities/{type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Drivers,
    Teams,
    Circuits,
    Sessions,
    Motors,
    Countries,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Drivers => "drivers",
            EntityType::Teams => "teams",
            EntityType::Circuits => "circuits",
            EntityType::Sessions => "sessions",
            EntityType::Motors => "motors",
            EntityType::Countries => "countries",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drivers" => Ok(EntityType::Drivers),
            "teams" => Ok(EntityType::Teams),
            "circuits" => Ok(EntityType::Circuits),
            "sessions" => Ok(EntityType::Sessions),
            "motors" => Ok(EntityType::Motors),
            "countries" => Ok(EntityType::Countries),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

/// One record of an entity listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityListResponse {
    pub entity_type: String,
    pub count: usize,
    pub entities: Vec<EntityRecord>,
}

/// Payload of `GET /network/explore/{node_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkExploreResponse {
    pub node_id: String,
    pub node_type: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub related_nodes: HashMap<String, Vec<Value>>,
}
