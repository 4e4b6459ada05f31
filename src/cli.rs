// src/cli.rs
// Command line front end. One operation per invocation; results go to
// stdout as text, or as JSON with `--json`.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::Serialize;
use serde_json::Value;

use crate::body::{extract_fields, write_results, Field, ResultsPatch};
use crate::config::options::{ElabOptions, StoreOptions};
use crate::elab::ElabClient;
use crate::file;
use crate::gateway::{ExperimentRequest, Gateway, ResearcherProfile};
use crate::store::Store;

#[derive(Parser, Debug)]
#[command(name = "elab-bridge")]
#[command(about = "Bridge between eLabFTW, local researcher accounts and result-entry machines")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: Global,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct Global {
    /// eLabFTW API base URL, e.g. https://elab.example/api/v2 [env: ELAB_URL]
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// eLabFTW API key [env: ELAB_API_KEY]
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Skip TLS certificate verification [env: ELAB_VERIFY_TLS=0]
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Local store directory [env: ELAB_BRIDGE_STORE] [default: .store]
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Local id of the account performing the operation
    #[arg(long = "as", value_name = "ID", global = true)]
    pub requester: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Also append log lines to a file [default: <store>/debug.log]
    #[arg(long, value_name = "PATH", global = true, num_args = 0..=1)]
    pub log_file: Option<Option<PathBuf>>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the fields of an HTML body (file or `-` for stdin); no network
    Fields {
        input: PathBuf,
    },
    /// Write results into an HTML body (file or `-`); no network
    Apply {
        input: PathBuf,
        #[command(flatten)]
        results: ResultsInput,
        /// Output file [default: stdout]
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    #[command(flatten)]
    Remote(Remote),
}

/// Subcommands that talk to eLabFTW and the local store.
#[derive(Subcommand, Debug)]
pub enum Remote {
    /// Check the eLabFTW credentials
    Ping,
    /// Create the researcher item type in eLabFTW and the local store files
    Init,
    /// List local accounts
    Researchers,
    /// List experiments created through the bridge
    Experiments,
    /// Register an account (and its eLabFTW item)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// pesquisador, admin or maquina
        #[arg(long)]
        role: Option<String>,
    },
    /// Check a name/password pair
    Login {
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    /// Create an experiment for a researcher (requires --as)
    Create {
        /// Scheduling reference, e.g. PROJ-X-001
        #[arg(long = "ref")]
        reference: String,
        #[arg(long)]
        researcher_id: u64,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        sample_type: String,
    },
    /// Current status of an experiment (requires --as)
    Status {
        experiment_id: u64,
    },
    /// Export an experiment as PDF (requires --as)
    Pdf {
        experiment_id: u64,
        #[arg(long)]
        changelog: bool,
        /// Output file [default: experiment_<ID>.pdf]
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Write machine results into an experiment (requires --as)
    Results {
        experiment_id: u64,
        #[command(flatten)]
        results: ResultsInput,
    },
    /// Set an experiment's status; the value is sent as given (requires --as)
    SetStatus {
        experiment_id: u64,
        value: String,
    },
    /// Show the template for a sample type and its fields
    Template {
        #[arg(long, default_value = "")]
        sample_type: String,
    },
    /// Show an experiment's body and fields (requires --as)
    Body {
        experiment_id: u64,
    },
}

#[derive(Args, Debug)]
pub struct ResultsInput {
    /// A result as LABEL=VALUE; repeatable
    #[arg(long = "set", value_name = "LABEL=VALUE")]
    pub pairs: Vec<String>,

    /// JSON file with an object of results, bare or under "results"
    #[arg(long = "results-json", value_name = "FILE")]
    pub json_file: Option<PathBuf>,
}

impl ResultsInput {
    fn to_patch(&self) -> Result<ResultsPatch> {
        let mut patch = ResultsPatch::new();
        if let Some(path) = &self.json_file {
            let text = file::read_input(path).wrap_err_with(|| format!("reading {}", path.display()))?;
            let value: Value = serde_json::from_str(&text).wrap_err("results file is not JSON")?;
            let obj = value.get("results").unwrap_or(&value);
            let from_file = ResultsPatch::from_json(obj).ok_or_else(|| eyre!("results must be a JSON object"))?;
            for (k, v) in from_file.iter() {
                patch.insert(k, v);
            }
        }
        let from_args = ResultsPatch::from_pairs(self.pairs.iter().map(String::as_str)).map_err(|e| eyre!(e))?;
        for (k, v) in from_args.iter() {
            patch.insert(k, v);
        }
        Ok(patch)
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::log::init(cli.global.log_path().as_deref()).wrap_err("starting logger")?;
    execute(cli)
}

impl Global {
    /// `--log-file` without a value logs into the resolved store directory.
    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.log_file {
            Some(Some(path)) => Some(path.clone()),
            Some(None) => Some(StoreOptions::resolve(self.store.clone()).log_file()),
            None => None,
        }
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let g = &cli.global;
    match &cli.command {
        Command::Fields { input } => {
            let html = file::read_input(input).wrap_err_with(|| format!("reading {}", input.display()))?;
            let extraction = extract_fields(&html);
            if g.json {
                print_json(extraction.fields())
            } else {
                println!("source: {}", extraction.source());
                print_fields(extraction.fields());
                Ok(())
            }
        }
        Command::Apply { input, results, out } => {
            let html = file::read_input(input).wrap_err_with(|| format!("reading {}", input.display()))?;
            let outcome = write_results(&html, &results.to_patch()?);
            for label in outcome.unmatched() {
                logw!("No row matched '{}'", label);
            }
            file::write_output(out.as_deref(), outcome.body().as_bytes()).wrap_err("writing output")
        }
        Command::Remote(remote) => {
            let mut gw = connect(g)?;
            run_remote(&mut gw, g, remote)
        }
    }
}

fn connect(g: &Global) -> Result<Gateway<ElabClient>> {
    let verify = if g.insecure { Some(false) } else { None };
    let elab_opts = ElabOptions::resolve(g.url.clone(), g.api_key.clone(), verify)
        .ok_or_else(|| eyre!("eLabFTW URL and API key are required (--url/--api-key or ELAB_URL/ELAB_API_KEY)"))?;
    let store_opts = StoreOptions::resolve(g.store.clone());

    let client = ElabClient::new(&elab_opts)?;
    let store = Store::open(&store_opts).wrap_err_with(|| format!("opening store {}", store_opts.dir.display()))?;
    Ok(Gateway::new(client, store))
}

fn requester(g: &Global) -> Result<u64> {
    g.requester.ok_or_else(|| eyre!("this command acts on behalf of an account; pass --as <ID>"))
}

fn run_remote(gw: &mut Gateway<ElabClient>, g: &Global, command: &Remote) -> Result<()> {
    match command {
        Remote::Ping => report(g, &gw.test_connection()?, |a| println!("{}", a.message)),
        Remote::Init => report(g, &gw.initialize()?, |a| println!("{}", a.message)),
        Remote::Researchers => report(g, &gw.list_researchers(), |rs| {
            for r in rs {
                print_profile(r);
            }
        }),
        Remote::Experiments => report(g, &gw.list_experiments(), |es| {
            for e in es {
                println!("{}\telab={}\tresearcher={}\t{}", e.id, e.elab_experiment_id, e.researcher_id, e.created_at);
            }
        }),
        Remote::Register { name, password, role } => {
            report(g, &gw.create_researcher(name, password, role.as_deref())?, print_profile)
        }
        Remote::Login { name, password } => report(g, &gw.login(name, password)?, print_profile),
        Remote::Create { reference, researcher_id, display_name, sample_type } => {
            let req = ExperimentRequest {
                agendamento_id: reference.clone(),
                researcher_id: *researcher_id,
                display_name: display_name.clone(),
                tipo_amostra: sample_type.clone(),
            };
            let created = gw.create_experiment(requester(g)?, &req)?;
            report(g, &created, |c| println!("experiment {} ({}) status: {}", c.experiment_id, c.agendamento_id, c.status))
        }
        Remote::Status { experiment_id } => {
            report(g, &gw.experiment_status(requester(g)?, *experiment_id)?, |s| println!("{}", s.status))
        }
        Remote::Pdf { experiment_id, changelog, out } => {
            let bytes = gw.experiment_pdf(requester(g)?, *experiment_id, *changelog)?;
            let path = out.clone().unwrap_or_else(|| file::pdf_path(*experiment_id));
            file::write_file(&path, &bytes).wrap_err_with(|| format!("writing {}", path.display()))?;
            logf!("PDF written to {}", path.display());
            println!("{}", path.display());
            Ok(())
        }
        Remote::Results { experiment_id, results } => {
            let written = gw.update_results(requester(g)?, *experiment_id, &results.to_patch()?)?;
            report(g, &written, |r| {
                println!("mode: {}", r.mode);
                for a in &r.applied {
                    println!("{} = {}", a.label, a.value);
                }
                for u in &r.unmatched {
                    println!("unmatched: {u}");
                }
            })
        }
        Remote::SetStatus { experiment_id, value } => {
            let status = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.clone()));
            report(g, &gw.set_status(requester(g)?, *experiment_id, &status)?, |a| println!("{}", a.message))
        }
        Remote::Template { sample_type } => report(g, &gw.template_fields(sample_type)?, |t| {
            println!("template: {} ({})", t.title, t.source);
            print_fields(&t.fields);
        }),
        Remote::Body { experiment_id } => report(g, &gw.experiment_body(requester(g)?, *experiment_id)?, |b| {
            println!("source: {}", b.source);
            print_fields(&b.fields);
        }),
    }
}

fn report<T: Serialize + ?Sized>(g: &Global, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if g.json {
        return print_json(value);
    }
    text(value);
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_profile(r: &ResearcherProfile) {
    let item = r.elab_item_id.map(|id| id.to_string()).unwrap_or_else(|| s!("-"));
    println!("{}\t{}\t{}\titem={}\texperiments={}", r.id, r.name, r.role, item, r.experiments.len());
}

fn print_fields(fields: &[Field]) {
    for f in fields {
        println!("{}\t{}\t{}\t{}\t{}\t{}", f.key, f.label, f.value, f.unit, f.reference, f.observation);
    }
}

/// Load `.env` from the working directory, if present.
pub fn load_env(dir: &Path) {
    match dotenvy::from_path(dir.join(".env")) {
        Ok(()) => logd!("Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("Warning: ignoring .env: {e}"),
    }
}
