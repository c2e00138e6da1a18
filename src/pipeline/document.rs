//! The final output of a pipeline run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A generated meeting protocol. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolDocument {
    id: Uuid,
    source_name: String,
    created_at: DateTime<Utc>,
    transcript: String,
    text: String,
}

impl ProtocolDocument {
    pub(crate) fn new(source_name: &str, transcript: String, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_name: source_name.to_string(),
            created_at: Utc::now(),
            transcript,
            text,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// File name of the recording this protocol was generated from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The assembled transcript the protocol was generated from.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// The protocol text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Download name: `protocol-<source name>.txt`.
    pub fn suggested_file_name(&self) -> String {
        format!("protocol-{}.txt", self.source_name)
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
