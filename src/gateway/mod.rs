// src/gateway/mod.rs
//! Operations offered to lab clients: account management, experiment
//! creation from templates, status/PDF access and machine result entry.
//!
//! Every operation that acts on behalf of someone takes the requester's
//! local id and checks their role (and ownership where it applies) before
//! touching eLabFTW.

pub mod error;
pub mod types;

use chrono::{Local, NaiveDateTime};
use serde_json::Value;

use crate::body::{extract_fields, write_results, ResultsPatch, WriteOutcome};
use crate::elab::{template_title_for, ElabApi};
use crate::store::{ExperimentRecord, NewResearcher, Researcher, Role, Store};

pub use error::{GatewayError, GatewayResult};
pub use types::*;

pub struct Gateway<E> {
    elab: E,
    store: Store,
}

impl<E: ElabApi> Gateway<E> {
    pub fn new(elab: E, store: Store) -> Self {
        Self { elab, store }
    }

    pub fn elab(&self) -> &E {
        &self.elab
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /* ---------------- Access checks ---------------- */

    fn requester(&self, id: u64) -> GatewayResult<&Researcher> {
        self.store
            .researcher(id)
            .ok_or_else(|| GatewayError::Unauthorized(format!("requester {id} is not a registered account")))
    }

    fn require_role(&self, id: u64, allowed: &[Role]) -> GatewayResult<&Researcher> {
        let r = self.requester(id)?;
        if !allowed.contains(&r.role) {
            let names: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
            return Err(GatewayError::Forbidden(format!("only role(s) {} may do this", names.join("/"))));
        }
        Ok(r)
    }

    /// Admins see everything; others only experiments registered to them.
    fn require_owner(&self, id: u64, experiment_id: u64) -> GatewayResult<()> {
        let r = self.requester(id)?;
        if r.role == Role::Admin {
            return Ok(());
        }
        let exp = self
            .store
            .experiment_by_elab_id(experiment_id)
            .ok_or_else(|| GatewayError::NotFound(format!("experiment {experiment_id} is not registered locally")))?;
        if exp.researcher_id != r.id {
            return Err(GatewayError::Forbidden(format!("experiment {experiment_id} belongs to another researcher")));
        }
        Ok(())
    }

    /* ---------------- Connection ---------------- */

    pub fn test_connection(&self) -> GatewayResult<Ack> {
        self.elab
            .ping()
            .map_err(|e| GatewayError::BadRequest(format!("connection to eLabFTW failed: {e}")))?;
        Ok(Ack::ok("connected to eLabFTW"))
    }

    /// Make sure the eLab structures the bridge relies on exist.
    pub fn initialize(&self) -> GatewayResult<Ack> {
        let type_id = self.elab.ensure_item_type()?;
        self.store.init()?;
        Ok(Ack::ok(format!(
            "researcher item type ready (id {type_id}); store at {}",
            self.store.dir().display()
        )))
    }

    /* ---------------- Accounts ---------------- */

    pub fn list_researchers(&self) -> Vec<ResearcherProfile> {
        self.store
            .researchers()
            .iter()
            .map(|r| ResearcherProfile::new(r, self.store.experiments_of(r.id).cloned().collect()))
            .collect()
    }

    pub fn list_experiments(&self) -> Vec<ExperimentRecord> {
        self.store.experiments().to_vec()
    }

    /// Register an account and its eLab item. Unknown roles become `pesquisador`.
    pub fn create_researcher(&mut self, name: &str, password: &str, role: Option<&str>) -> GatewayResult<ResearcherProfile> {
        let name = name.trim();
        if name.is_empty() || password.is_empty() {
            return Err(GatewayError::BadRequest(s!("name and password are required")));
        }
        if self.store.researcher_by_name(name).is_some() {
            return Err(GatewayError::BadRequest(format!("user name '{name}' already exists")));
        }
        let role = role.map(Role::parse_or_default).unwrap_or_default();

        let item_id = self.elab.register_researcher_item(name)?;
        let r = self.store.register_researcher(NewResearcher {
            name,
            password: Some(password),
            elab_item_id: Some(item_id),
            role: Some(role),
        })?;
        Ok(ResearcherProfile::new(&r, Vec::new()))
    }

    pub fn login(&self, name: &str, password: &str) -> GatewayResult<ResearcherProfile> {
        if name.trim().is_empty() || password.is_empty() {
            return Err(GatewayError::BadRequest(s!("name and password are required")));
        }
        let r = self
            .store
            .verify_login(name, password)
            .ok_or_else(|| GatewayError::Unauthorized(s!("invalid name or password")))?;
        logf!("Login: '{}' ({})", r.name, r.role);
        Ok(ResearcherProfile::new(r, self.store.experiments_of(r.id).cloned().collect()))
    }

    /* ---------------- Experiments ---------------- */

    pub fn create_experiment(&mut self, requester: u64, req: &ExperimentRequest) -> GatewayResult<ExperimentCreated> {
        self.create_experiment_at(requester, req, Local::now().naive_local())
    }

    /// [`Self::create_experiment`] with an explicit clock.
    pub fn create_experiment_at(
        &mut self,
        requester: u64,
        req: &ExperimentRequest,
        now: NaiveDateTime,
    ) -> GatewayResult<ExperimentCreated> {
        let who = self.require_role(requester, &[Role::Pesquisador])?.id;
        if who != req.researcher_id {
            return Err(GatewayError::Forbidden(s!("requester must match the experiment's researcher")));
        }
        let reference = req.agendamento_id.trim();
        if reference.is_empty() {
            return Err(GatewayError::BadRequest(s!("agendamento_id is required")));
        }

        let researcher = self
            .store
            .researcher(req.researcher_id)
            .ok_or_else(|| GatewayError::NotFound(format!("researcher {} not found", req.researcher_id)))?;
        let item_id = match researcher.elab_item_id {
            Some(id) => id,
            None => {
                // Accounts created before the eLab link existed.
                logf!("Researcher '{}' has no eLab item; creating it", researcher.name);
                let name = researcher.name.clone();
                let id = self.elab.register_researcher_item(&name)?;
                self.store.set_elab_item_id(req.researcher_id, id)?;
                id
            }
        };

        let title = format!("[AG:{}] Análises {} - {}", reference, req.display_name.trim(), now.format("%Y-%m-%d"));
        let vars = vec![
            (s!("agendamento_id"), s!(reference)),
            (s!("data_coleta"), now.format("%Y-%m-%dT%H:%M").to_string()),
            (s!("tipo_amostra"), req.tipo_amostra.clone()),
        ];

        let experiment_id = self.elab.create_experiment(&title, &vars)?;
        self.elab.link_experiment_to_item(experiment_id, item_id)?;
        let status = self.elab.experiment_status(experiment_id)?;
        self.store.register_experiment(reference, experiment_id, req.researcher_id)?;

        Ok(ExperimentCreated { agendamento_id: s!(reference), experiment_id, status })
    }

    pub fn experiment_status(&self, requester: u64, experiment_id: u64) -> GatewayResult<StatusReport> {
        self.require_owner(requester, experiment_id)?;
        let status = self.elab.experiment_status(experiment_id).map_err(|e| {
            if e.is_not_found() {
                GatewayError::NotFound(format!("experiment {experiment_id} not found in eLabFTW"))
            } else {
                e.into()
            }
        })?;
        Ok(StatusReport { experiment_id, status })
    }

    pub fn experiment_pdf(&self, requester: u64, experiment_id: u64, include_changelog: bool) -> GatewayResult<Vec<u8>> {
        self.require_owner(requester, experiment_id)?;
        Ok(self.elab.export_pdf(experiment_id, include_changelog)?)
    }

    /// Write machine results into the experiment's result table, or replace
    /// the body with `label: value` lines when it has no table.
    pub fn update_results(&self, requester: u64, experiment_id: u64, patch: &ResultsPatch) -> GatewayResult<ResultsReport> {
        self.require_role(requester, &[Role::Maquina])?;
        if patch.is_empty() {
            return Err(GatewayError::BadRequest(s!("results must be a non-empty object")));
        }

        let body = self.elab.experiment_body(experiment_id)?;
        let outcome = write_results(&body, patch);
        let unmatched = outcome.unmatched().to_vec();
        if !unmatched.is_empty() {
            logw!("Experiment {}: no row for {}", experiment_id, unmatched.join(", "));
        }

        let mode = outcome.mode();
        let applied = match &outcome {
            WriteOutcome::Table { applied, .. } => applied.clone(),
            _ => Vec::new(),
        };
        self.elab.patch_experiment_body(experiment_id, outcome.body())?;

        logf!("Experiment {}: results written ({}, {} cell(s))", experiment_id, mode, applied.len());
        Ok(ResultsReport { experiment_id, mode, applied, unmatched })
    }

    pub fn set_status(&self, requester: u64, experiment_id: u64, status: &Value) -> GatewayResult<Ack> {
        self.require_role(requester, &[Role::Maquina, Role::Admin])?;
        if status.is_null() {
            return Err(GatewayError::BadRequest(s!("status is required")));
        }
        self.elab.set_status(experiment_id, status)?;
        Ok(Ack::ok(format!("experiment {experiment_id} status set to {status}")))
    }

    /// Template for a sample type and the fields it asks for.
    pub fn template_fields(&self, sample_type: &str) -> GatewayResult<TemplateFields> {
        let template = self.elab.find_template(template_title_for(sample_type))?;
        let extraction = extract_fields(&template.body);
        Ok(TemplateFields {
            title: template.title,
            source: extraction.source(),
            fields: extraction.into_fields(),
            body: template.body,
        })
    }

    pub fn experiment_body(&self, requester: u64, experiment_id: u64) -> GatewayResult<ExperimentBody> {
        self.require_role(requester, &[Role::Maquina, Role::Admin])?;
        let body = self.elab.experiment_body(experiment_id)?;
        let extraction = extract_fields(&body);
        Ok(ExperimentBody {
            experiment_id,
            source: extraction.source(),
            fields: extraction.into_fields(),
            body,
        })
    }
}
