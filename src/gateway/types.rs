// src/gateway/types.rs
// Inputs and serializable replies of gateway operations.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::body::{AppliedResult, Field};
use crate::store::{ExperimentRecord, Researcher, Role};

/// A researcher as shown to callers; never carries the password hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResearcherProfile {
    pub id: u64,
    pub name: String,
    pub elab_item_id: Option<u64>,
    pub role: Role,
    pub created_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub experiments: Vec<ExperimentRecord>,
}

impl ResearcherProfile {
    pub fn new(r: &Researcher, experiments: Vec<ExperimentRecord>) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            elab_item_id: r.elab_item_id,
            role: r.role,
            created_at: r.created_at,
            experiments,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ExperimentRequest {
    /// Scheduling reference, e.g. `PROJ-X-001`; the local experiment key.
    pub agendamento_id: String,
    pub researcher_id: u64,
    pub display_name: String,
    pub tipo_amostra: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExperimentCreated {
    pub agendamento_id: String,
    pub experiment_id: u64,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub status: &'static str,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: "ok", message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub experiment_id: u64,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultsReport {
    pub experiment_id: u64,
    /// `table` or `flat_text`.
    pub mode: &'static str,
    pub applied: Vec<AppliedResult>,
    pub unmatched: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TemplateFields {
    pub title: String,
    /// `table`, `table_no_fields` or `no_table`.
    pub source: &'static str,
    pub fields: Vec<Field>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExperimentBody {
    pub experiment_id: u64,
    pub source: &'static str,
    pub fields: Vec<Field>,
    pub body: String,
}
