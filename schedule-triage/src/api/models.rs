//! Request and response shapes for the Intercom search endpoints

use serde::{Deserialize, Serialize};

/// `{"query": {"operator": "AND", "value": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: CompoundQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompoundQuery {
    pub operator: String,
    pub value: Vec<FieldQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldQuery {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl SearchRequest {
    /// Single `field = value` condition wrapped in an AND group
    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            query: CompoundQuery {
                operator: "AND".to_string(),
                value: vec![FieldQuery {
                    field: field.into(),
                    operator: "=".to_string(),
                    value: value.into(),
                }],
            },
        }
    }
}

/// Result envelope shared by both search endpoints
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Contact as returned by `/contacts/search` (only the fields we use)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Conversation entries are only counted, so their body is ignored
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConversationStub {
    #[serde(default)]
    pub id: Option<String>,
}
