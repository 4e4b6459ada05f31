// src/store.rs
//! Local record of researchers and the experiments created for them.
//!
//! Two CSV files under the store directory, rewritten whole on every
//! change. The eLab side stays the source of truth for experiment content;
//! this store only maps local users to eLab ids and owners to experiments.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::consts::{EXPERIMENTS_FILE, RESEARCHERS_FILE, STORE_SEP};
use crate::config::options::StoreOptions;
use crate::csv::{self, parse_rows, split_header};
use crate::file;

const RESEARCHER_HEADER: &[&str] = &["id", "name", "password_hash", "elab_item_id", "role", "created_at"];
const EXPERIMENT_HEADER: &[&str] = &["id", "elab_experiment_id", "researcher_id", "created_at"];
const TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{file} line {line}: {reason}")]
    Malformed { file: &'static str, line: usize, reason: String },

    #[error("researcher with local id {0} not found")]
    ResearcherNotFound(u64),

    #[error("researcher name must not be empty")]
    EmptyName,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Access role of a local account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Pesquisador,
    Admin,
    Maquina,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Pesquisador, Role::Admin, Role::Maquina];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Pesquisador => "pesquisador",
            Role::Admin => "admin",
            Role::Maquina => "maquina",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        let s = s.trim().to_lowercase();
        Role::ALL.into_iter().find(|r| r.as_str() == s)
    }

    /// Unknown roles fall back to `pesquisador`.
    pub fn parse_or_default(s: &str) -> Role {
        Role::parse(s).unwrap_or_else(|| {
            logw!("Invalid role '{}'; using '{}'", s.trim(), Role::default());
            Role::default()
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Researcher {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub elab_item_id: Option<u64>,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

/// An experiment created through the bridge, keyed by the scheduling reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExperimentRecord {
    pub id: String,
    pub elab_experiment_id: u64,
    pub researcher_id: u64,
    pub created_at: NaiveDateTime,
}

/// Fields for [`Store::register_researcher`]. `None` leaves an existing value alone.
#[derive(Clone, Debug, Default)]
pub struct NewResearcher<'a> {
    pub name: &'a str,
    pub password: Option<&'a str>,
    pub elab_item_id: Option<u64>,
    pub role: Option<Role>,
}

pub struct Store {
    dir: PathBuf,
    researchers: Vec<Researcher>,
    experiments: Vec<ExperimentRecord>,
}

impl Store {
    /// Load both files; missing files start empty.
    pub fn open(opts: &StoreOptions) -> StoreResult<Self> {
        let dir = opts.dir.clone();
        let researchers = load_researchers(&dir.join(RESEARCHERS_FILE))?;
        let experiments = load_experiments(&dir.join(EXPERIMENTS_FILE))?;
        logd!(
            "Store: {} researcher(s), {} experiment(s) in {}",
            researchers.len(),
            experiments.len(),
            dir.display()
        );
        Ok(Self { dir, researchers, experiments })
    }

    /// Create the directory and write both files with headers if absent.
    pub fn init(&self) -> StoreResult<()> {
        let r = self.dir.join(RESEARCHERS_FILE);
        if !r.exists() {
            self.save_researchers()?;
        }
        let e = self.dir.join(EXPERIMENTS_FILE);
        if !e.exists() {
            self.save_experiments()?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn researchers(&self) -> &[Researcher] {
        &self.researchers
    }

    pub fn experiments(&self) -> &[ExperimentRecord] {
        &self.experiments
    }

    pub fn researcher(&self, id: u64) -> Option<&Researcher> {
        self.researchers.iter().find(|r| r.id == id)
    }

    pub fn researcher_by_name(&self, name: &str) -> Option<&Researcher> {
        let name = name.trim();
        self.researchers.iter().find(|r| r.name == name)
    }

    pub fn experiments_of(&self, researcher_id: u64) -> impl Iterator<Item = &ExperimentRecord> {
        self.experiments.iter().filter(move |e| e.researcher_id == researcher_id)
    }

    pub fn experiment_by_elab_id(&self, elab_experiment_id: u64) -> Option<&ExperimentRecord> {
        self.experiments.iter().find(|e| e.elab_experiment_id == elab_experiment_id)
    }

    /// Insert a researcher, or update the one with the same name: a missing
    /// eLab id is filled in, password and role are replaced when given.
    pub fn register_researcher(&mut self, new: NewResearcher<'_>) -> StoreResult<Researcher> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let password_hash = new.password.map(hash_password).transpose()?;

        if let Some(existing) = self.researchers.iter_mut().find(|r| r.name == name) {
            let mut updated = false;
            if let (Some(id), None) = (new.elab_item_id, existing.elab_item_id) {
                existing.elab_item_id = Some(id);
                updated = true;
            }
            if let Some(hash) = password_hash {
                existing.password_hash = hash;
                updated = true;
            }
            if let Some(role) = new.role.filter(|r| *r != existing.role) {
                existing.role = role;
                updated = true;
            }
            let found = existing.clone();
            if updated {
                self.save_researchers()?;
                logd!("Store: researcher '{}' updated", name);
            }
            return Ok(found);
        }

        let researcher = Researcher {
            id: self.researchers.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            name: name.to_string(),
            password_hash: password_hash.unwrap_or_default(),
            elab_item_id: new.elab_item_id,
            role: new.role.unwrap_or_default(),
            created_at: now(),
        };
        self.researchers.push(researcher.clone());
        self.save_researchers()?;
        logf!("Store: researcher '{}' created with id {} ({})", researcher.name, researcher.id, researcher.role);
        Ok(researcher)
    }

    pub fn set_elab_item_id(&mut self, researcher_id: u64, elab_item_id: u64) -> StoreResult<()> {
        let r = self
            .researchers
            .iter_mut()
            .find(|r| r.id == researcher_id)
            .ok_or(StoreError::ResearcherNotFound(researcher_id))?;
        r.elab_item_id = Some(elab_item_id);
        self.save_researchers()
    }

    /// Record an experiment. An already known reference is left as is.
    pub fn register_experiment(&mut self, id: &str, elab_experiment_id: u64, researcher_id: u64) -> StoreResult<bool> {
        if self.experiments.iter().any(|e| e.id == id) {
            logf!("Store: experiment '{}' already registered", id);
            return Ok(false);
        }
        if self.researcher(researcher_id).is_none() {
            return Err(StoreError::ResearcherNotFound(researcher_id));
        }
        self.experiments.push(ExperimentRecord {
            id: id.to_string(),
            elab_experiment_id,
            researcher_id,
            created_at: now(),
        });
        self.save_experiments()?;
        logf!("Store: experiment '{}' (eLab id {}) registered", id, elab_experiment_id);
        Ok(true)
    }

    /// The researcher named `name`, if `password` matches their hash.
    pub fn verify_login(&self, name: &str, password: &str) -> Option<&Researcher> {
        let r = self.researcher_by_name(name)?;
        verify_password(password, &r.password_hash).then_some(r)
    }

    fn save_researchers(&self) -> StoreResult<()> {
        let rows: Vec<Vec<String>> = self
            .researchers
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.name.clone(),
                    r.password_hash.clone(),
                    r.elab_item_id.map(|id| id.to_string()).unwrap_or_default(),
                    s!(r.role.as_str()),
                    r.created_at.format(TIME_FMT).to_string(),
                ]
            })
            .collect();
        self.write(RESEARCHERS_FILE, &csv::rows_to_string(RESEARCHER_HEADER, &rows, STORE_SEP))
    }

    fn save_experiments(&self) -> StoreResult<()> {
        let rows: Vec<Vec<String>> = self
            .experiments
            .iter()
            .map(|e| {
                vec![
                    e.id.clone(),
                    e.elab_experiment_id.to_string(),
                    e.researcher_id.to_string(),
                    e.created_at.format(TIME_FMT).to_string(),
                ]
            })
            .collect();
        self.write(EXPERIMENTS_FILE, &csv::rows_to_string(EXPERIMENT_HEADER, &rows, STORE_SEP))
    }

    fn write(&self, name: &str, text: &str) -> StoreResult<()> {
        let path = self.dir.join(name);
        file::write_file(&path, text.as_bytes()).map_err(|source| StoreError::Io { path, source })
    }
}

pub fn hash_password(password: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| StoreError::Hash(e.to_string()))
}

/// False for a wrong password and for an unparsable or empty hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/* ---------------- Loading ---------------- */

fn read_rows(path: &Path, header: &[&str]) -> StoreResult<Vec<Vec<String>>> {
    let text = file::read_text_or_empty(path).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    let (_, rows) = split_header(parse_rows(&text, STORE_SEP), header);
    Ok(rows)
}

fn malformed(file: &'static str, line: usize, reason: impl Into<String>) -> StoreError {
    StoreError::Malformed { file, line, reason: reason.into() }
}

fn parse_id(file: &'static str, line: usize, what: &str, v: &str) -> StoreResult<u64> {
    v.trim().parse().map_err(|_| malformed(file, line, format!("bad {what} '{v}'")))
}

fn parse_time(file: &'static str, line: usize, v: &str) -> StoreResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(v.trim(), TIME_FMT).map_err(|_| malformed(file, line, format!("bad timestamp '{v}'")))
}

fn load_researchers(path: &Path) -> StoreResult<Vec<Researcher>> {
    let f = RESEARCHERS_FILE;
    let mut out = Vec::new();
    for (i, row) in read_rows(path, RESEARCHER_HEADER)?.into_iter().enumerate() {
        let line = i + 2;
        let [id, name, hash, item, role, created] = row.as_slice() else {
            return Err(malformed(f, line, format!("expected {} fields, got {}", RESEARCHER_HEADER.len(), row.len())));
        };
        out.push(Researcher {
            id: parse_id(f, line, "id", id)?,
            name: name.clone(),
            password_hash: hash.clone(),
            elab_item_id: match item.trim() {
                "" => None,
                v => Some(parse_id(f, line, "elab_item_id", v)?),
            },
            role: Role::parse(role).ok_or_else(|| malformed(f, line, format!("unknown role '{role}'")))?,
            created_at: parse_time(f, line, created)?,
        });
    }
    Ok(out)
}

fn load_experiments(path: &Path) -> StoreResult<Vec<ExperimentRecord>> {
    let f = EXPERIMENTS_FILE;
    let mut out = Vec::new();
    for (i, row) in read_rows(path, EXPERIMENT_HEADER)?.into_iter().enumerate() {
        let line = i + 2;
        let [id, elab_id, researcher_id, created] = row.as_slice() else {
            return Err(malformed(f, line, format!("expected {} fields, got {}", EXPERIMENT_HEADER.len(), row.len())));
        };
        out.push(ExperimentRecord {
            id: id.clone(),
            elab_experiment_id: parse_id(f, line, "elab_experiment_id", elab_id)?,
            researcher_id: parse_id(f, line, "researcher_id", researcher_id)?,
            created_at: parse_time(f, line, created)?,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_leniently() {
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("robot"), None);
        assert_eq!(Role::parse_or_default("robot"), Role::Pesquisador);
        assert_eq!(Role::Maquina.to_string(), "maquina");
    }

    #[test]
    fn hashes_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("other", &hash));
        assert!(!verify_password("s3cret", ""));
    }
}
