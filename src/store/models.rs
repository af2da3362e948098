// src/store/models.rs
// Data model — Conversation, Branch, Message (§3)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// What kind of drift gave birth to a branch — born of a new-cluster drift,
/// or a same-cluster (functional) drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftType {
    Semantic,
    Functional,
}

impl DriftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftType::Semantic => "semantic",
            DriftType::Functional => "functional",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "semantic" => Some(DriftType::Semantic),
            "functional" => Some(DriftType::Functional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub conversation_id: String,
    pub parent_branch_id: Option<String>,
    pub summary: String,
    pub centroid: Vec<f32>,
    pub drift_type: DriftType,
    pub depth: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub branch_id: String,
    pub role: Role,
    pub content: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Lightweight branch summary returned by `list_branches`, with bookkeeping
/// the classifier and pipeline need but that isn't stored as-is.
#[derive(Debug, Clone, Serialize)]
pub struct BranchSummary {
    pub id: String,
    pub summary: String,
    pub message_count: u32,
    pub centroid: Vec<f32>,
    pub parent_id: Option<String>,
    pub drift_type: DriftType,
    pub updated_at: DateTime<Utc>,
    pub is_current: bool,
}
