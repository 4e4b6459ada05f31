// tests/gateway.rs
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::{json, Value};

use elab_bridge::body::{parse_fields, ResultsPatch};
use elab_bridge::config::options::StoreOptions;
use elab_bridge::elab::{ElabApi, ElabError, ElabResult, Template};
use elab_bridge::gateway::{ExperimentRequest, Gateway, GatewayError};
use elab_bridge::store::{NewResearcher, Role, Store};

const HEMOGRAMA: &str = include_str!("fixtures/hemograma.html");

/// In-memory eLabFTW: one template, experiments kept as bodies.
#[derive(Default)]
struct FakeElab {
    next_id: Cell<u64>,
    bodies: RefCell<Vec<(u64, String, String)>>,
    links: RefCell<Vec<(u64, u64)>>,
    statuses: RefCell<Vec<(u64, Value)>>,
    items: RefCell<Vec<String>>,
}

impl FakeElab {
    fn next(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn body_of(&self, id: u64) -> Option<String> {
        self.bodies.borrow().iter().find(|(i, _, _)| *i == id).map(|(_, _, b)| b.clone())
    }

    fn add_experiment(&self, body: &str) -> u64 {
        let id = self.next();
        self.bodies.borrow_mut().push((id, "seeded".to_string(), body.to_string()));
        id
    }
}

fn not_found(path: String) -> ElabError {
    ElabError::Api { method: "GET".into(), path, status: 404, detail: "not found".into() }
}

impl ElabApi for FakeElab {
    fn ping(&self) -> ElabResult<()> {
        Ok(())
    }

    fn ensure_item_type(&self) -> ElabResult<u64> {
        Ok(3)
    }

    fn register_researcher_item(&self, name: &str) -> ElabResult<u64> {
        self.items.borrow_mut().push(name.to_string());
        Ok(100 + self.items.borrow().len() as u64)
    }

    fn find_template(&self, title: &str) -> ElabResult<Template> {
        Ok(Template { id: 5, title: title.to_string(), body: HEMOGRAMA.to_string() })
    }

    fn create_experiment(&self, title: &str, vars: &[(String, String)]) -> ElabResult<u64> {
        let body = elab_bridge::elab::fill_placeholders(HEMOGRAMA, vars);
        let id = self.next();
        self.bodies.borrow_mut().push((id, title.to_string(), body));
        Ok(id)
    }

    fn link_experiment_to_item(&self, experiment_id: u64, item_id: u64) -> ElabResult<()> {
        self.links.borrow_mut().push((experiment_id, item_id));
        Ok(())
    }

    fn experiment_status(&self, experiment_id: u64) -> ElabResult<String> {
        match self.body_of(experiment_id) {
            Some(_) => Ok("Em andamento".to_string()),
            None => Err(not_found(format!("experiments/{experiment_id}"))),
        }
    }

    fn export_pdf(&self, experiment_id: u64, include_changelog: bool) -> ElabResult<Vec<u8>> {
        let mut pdf = format!("%PDF-1.4 {experiment_id}").into_bytes();
        if include_changelog {
            pdf.extend_from_slice(b" changelog");
        }
        Ok(pdf)
    }

    fn experiment_body(&self, experiment_id: u64) -> ElabResult<String> {
        self.body_of(experiment_id).ok_or_else(|| not_found(format!("experiments/{experiment_id}")))
    }

    fn patch_experiment_body(&self, experiment_id: u64, body: &str) -> ElabResult<()> {
        let mut bodies = self.bodies.borrow_mut();
        let entry = bodies
            .iter_mut()
            .find(|(i, _, _)| *i == experiment_id)
            .ok_or_else(|| not_found(format!("experiments/{experiment_id}")))?;
        entry.2 = body.to_string();
        Ok(())
    }

    fn set_status(&self, experiment_id: u64, status: &Value) -> ElabResult<()> {
        self.statuses.borrow_mut().push((experiment_id, status.clone()));
        Ok(())
    }
}

fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("elab_bridge_gateway_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

/// Gateway with a researcher (1), an admin (2) and a machine (3).
fn gateway(name: &str) -> Gateway<FakeElab> {
    let mut store = Store::open(&StoreOptions { dir: tmp_dir(name) }).unwrap();
    for (who, role) in [("Ana", Role::Pesquisador), ("Root", Role::Admin), ("Analisador", Role::Maquina)] {
        store
            .register_researcher(NewResearcher { name: who, password: Some("pw"), elab_item_id: None, role: Some(role) })
            .unwrap();
    }
    Gateway::new(FakeElab::default(), store)
}

fn request(researcher_id: u64) -> ExperimentRequest {
    ExperimentRequest {
        agendamento_id: "PROJ-X-001".into(),
        researcher_id,
        display_name: "Ana".into(),
        tipo_amostra: "sangue".into(),
    }
}

fn noon() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap().and_hms_opt(12, 30, 0).unwrap()
}

#[test]
fn create_experiment_runs_the_whole_flow() {
    let mut gw = gateway("create");
    let created = gw.create_experiment_at(1, &request(1), noon()).unwrap();
    assert_eq!(created.agendamento_id, "PROJ-X-001");
    assert_eq!(created.status, "Em andamento");

    let elab = gw.elab();
    let (id, title, body) = elab.bodies.borrow()[0].clone();
    assert_eq!(id, created.experiment_id);
    assert_eq!(title, "[AG:PROJ-X-001] Análises Ana - 2025-03-14");
    assert!(body.contains("Agendamento: PROJ-X-001"));
    assert!(body.contains("Coleta: 2025-03-14T12:30"));

    // the researcher had no eLab item yet, so one was created and linked
    assert_eq!(elab.items.borrow().as_slice(), ["Ana".to_string()]);
    assert_eq!(elab.links.borrow().as_slice(), [(created.experiment_id, 101)]);
    assert_eq!(gw.store().researcher(1).unwrap().elab_item_id, Some(101));
    assert_eq!(gw.store().experiment_by_elab_id(created.experiment_id).unwrap().researcher_id, 1);
}

#[test]
fn only_the_researcher_themself_may_create() {
    let mut gw = gateway("create_roles");
    assert!(matches!(gw.create_experiment_at(9, &request(9), noon()), Err(GatewayError::Unauthorized(_))));
    assert!(matches!(gw.create_experiment_at(2, &request(2), noon()), Err(GatewayError::Forbidden(_))));
    assert!(matches!(gw.create_experiment_at(1, &request(3), noon()), Err(GatewayError::Forbidden(_))));
    assert!(gw.elab().bodies.borrow().is_empty());
}

#[test]
fn status_and_pdf_are_owner_or_admin() {
    let mut gw = gateway("owner");
    let created = gw.create_experiment_at(1, &request(1), noon()).unwrap();
    let id = created.experiment_id;

    assert_eq!(gw.experiment_status(1, id).unwrap().status, "Em andamento");
    assert_eq!(gw.experiment_status(2, id).unwrap().status, "Em andamento");
    // the machine account owns nothing
    assert!(matches!(gw.experiment_status(3, id), Err(GatewayError::Forbidden(_))));
    // unknown locally for a non-admin
    assert!(matches!(gw.experiment_status(1, 999), Err(GatewayError::NotFound(_))));
    // admin reaches eLab, which answers 404
    let err = gw.experiment_status(2, 999).unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
    assert_eq!(err.status(), 404);

    let pdf = gw.experiment_pdf(1, id, true).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert!(pdf.ends_with(b"changelog"));
}

#[test]
fn machine_results_land_in_the_table() {
    let gw = gateway("results");
    let id = gw.elab().add_experiment(HEMOGRAMA);

    let patch: ResultsPatch = [("Hemácias", "4.9"), ("hemoglobina", "14"), ("Ferritina", "80")].into_iter().collect();
    let report = gw.update_results(3, id, &patch).unwrap();
    assert_eq!(report.mode, "table");
    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.unmatched, vec!["Ferritina".to_string()]);

    let body = gw.elab().body_of(id).unwrap();
    let fields = parse_fields(&body);
    assert_eq!(fields[0].value, "4.9");
    assert_eq!(fields[1].value, "14");
}

#[test]
fn results_without_table_become_lines() {
    let gw = gateway("results_flat");
    let id = gw.elab().add_experiment("<p>{{glicose}}</p>");
    let patch: ResultsPatch = [("Glicose", "95")].into_iter().collect();

    let report = gw.update_results(3, id, &patch).unwrap();
    assert_eq!(report.mode, "flat_text");
    assert_eq!(gw.elab().body_of(id).unwrap(), "Glicose: 95");
}

#[test]
fn results_need_a_machine_and_a_patch() {
    let gw = gateway("results_roles");
    let id = gw.elab().add_experiment(HEMOGRAMA);
    let patch: ResultsPatch = [("Hemácias", "4.9")].into_iter().collect();

    assert!(matches!(gw.update_results(1, id, &patch), Err(GatewayError::Forbidden(_))));
    assert!(matches!(gw.update_results(2, id, &patch), Err(GatewayError::Forbidden(_))));
    assert!(matches!(gw.update_results(3, id, &ResultsPatch::new()), Err(GatewayError::BadRequest(_))));
    assert_eq!(gw.elab().body_of(id).unwrap(), HEMOGRAMA);
}

#[test]
fn status_is_forwarded_verbatim() {
    let gw = gateway("set_status");
    assert!(gw.set_status(3, 10, &json!(2)).is_ok());
    assert!(gw.set_status(2, 10, &json!("Concluído")).is_ok());
    assert!(matches!(gw.set_status(1, 10, &json!(2)), Err(GatewayError::Forbidden(_))));
    assert!(matches!(gw.set_status(3, 10, &Value::Null), Err(GatewayError::BadRequest(_))));
    assert_eq!(gw.elab().statuses.borrow().as_slice(), [(10, json!(2)), (10, json!("Concluído"))]);
}

#[test]
fn accounts_register_and_log_in() {
    let mut gw = gateway("accounts");
    let profile = gw.create_researcher("Bia", "segredo", Some("robot")).unwrap();
    assert_eq!(profile.role, Role::Pesquisador);
    assert_eq!(profile.elab_item_id, Some(101));

    assert!(matches!(gw.create_researcher("Bia", "x", None), Err(GatewayError::BadRequest(_))));
    assert!(matches!(gw.create_researcher(" ", "x", None), Err(GatewayError::BadRequest(_))));

    assert_eq!(gw.login("Bia", "segredo").unwrap().id, profile.id);
    assert!(matches!(gw.login("Bia", "errada"), Err(GatewayError::Unauthorized(_))));
    assert!(matches!(gw.login("", ""), Err(GatewayError::BadRequest(_))));

    let json = serde_json::to_value(gw.login("Bia", "segredo").unwrap()).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["role"], "pesquisador");
}

#[test]
fn template_and_body_fields() {
    let gw = gateway("fields");
    let t = gw.template_fields("sangue").unwrap();
    assert_eq!(t.source, "table");
    assert_eq!(t.fields.len(), 4);

    let id = gw.elab().add_experiment("<p>{{ureia}}</p>");
    assert!(matches!(gw.experiment_body(1, id), Err(GatewayError::Forbidden(_))));
    let b = gw.experiment_body(2, id).unwrap();
    assert_eq!(b.source, "no_table");
    assert_eq!(b.fields[0].key, "ureia");
}

#[test]
fn initialize_creates_store_files() {
    let gw = gateway("init");
    let ack = gw.initialize().unwrap();
    assert!(ack.message.contains("id 3"));
    assert!(ack.message.contains(&gw.store().dir().display().to_string()));
    assert!(gw.store().dir().join("experiments.csv").exists());
}
