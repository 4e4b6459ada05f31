// src/elab/mod.rs
//! eLabFTW API access.
//!
//! [`ElabApi`] is the set of remote operations the gateway needs;
//! [`ElabClient`] implements it over HTTP. Tests substitute their own
//! implementation.

pub mod client;
pub mod error;
pub mod response;

use serde::Serialize;
use serde_json::Value;

pub use client::ElabClient;
pub use error::{ElabError, ElabResult};

use crate::config::consts::{BLOOD_TEMPLATE_TITLE, TEMPLATE_TITLE};

/// An experiment template as listed by `experiments_templates`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: u64,
    pub title: String,
    pub body: String,
}

impl Template {
    pub fn from_value(v: &Value) -> Self {
        Self {
            id: response::value_id(v).unwrap_or_default(),
            title: v.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
            body: v.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
        }
    }
}

/// Template title used for a sample type.
pub fn template_title_for(sample_type: &str) -> &'static str {
    match sample_type.trim().to_lowercase().as_str() {
        "sangue" => BLOOD_TEMPLATE_TITLE,
        _ => TEMPLATE_TITLE,
    }
}

/// Replace `{{name}}` tokens (inner whitespace ignored) with their variable.
/// Tokens without a variable are left in place.
pub fn fill_placeholders(body: &str, vars: &[(String, String)]) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else { break };
        let name = after[..close].trim();
        match vars.iter().find(|(k, _)| k == name) {
            Some((_, value)) => {
                out.push_str(&rest[..open]);
                out.push_str(value);
            }
            None => out.push_str(&rest[..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// Remote operations against one eLabFTW instance.
pub trait ElabApi {
    /// Cheap authenticated call to validate credentials.
    fn ping(&self) -> ElabResult<()>;

    /// Id of the researcher item type, creating it on first use.
    fn ensure_item_type(&self) -> ElabResult<u64>;

    /// Create a researcher item and return its id.
    fn register_researcher_item(&self, name: &str) -> ElabResult<u64>;

    fn find_template(&self, title: &str) -> ElabResult<Template>;

    /// Create an experiment from the template for `vars["tipo_amostra"]`,
    /// with placeholders filled from `vars`. Returns the experiment id.
    fn create_experiment(&self, title: &str, vars: &[(String, String)]) -> ElabResult<u64>;

    fn link_experiment_to_item(&self, experiment_id: u64, item_id: u64) -> ElabResult<()>;

    fn experiment_status(&self, experiment_id: u64) -> ElabResult<String>;

    fn export_pdf(&self, experiment_id: u64, include_changelog: bool) -> ElabResult<Vec<u8>>;

    fn experiment_body(&self, experiment_id: u64) -> ElabResult<String>;

    fn patch_experiment_body(&self, experiment_id: u64, body: &str) -> ElabResult<()>;

    /// Forward a status value verbatim; its meaning depends on the instance.
    fn set_status(&self, experiment_id: u64, status: &Value) -> ElabResult<()>;
}
