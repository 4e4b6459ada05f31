// src/config/consts.rs

// Net config
pub const TIMEOUT_SECS: u64 = 30;
pub const ERROR_BODY_MAX: usize = 600;
pub const RECENT_EXPERIMENTS_LIMIT: u32 = 5;

// eLabFTW structures
pub const ITEM_TYPE_TITLE: &str = "Pesquisador";
pub const ITEM_TYPE_BODY: &str = "Tipo para cadastro de Pesquisadores do LIACLI.";
pub const TEMPLATE_TITLE: &str = "Análise Clínica teste";
pub const BLOOD_TEMPLATE_TITLE: &str = "Análise Clínica teste";
pub const FALLBACK_TEMPLATE_ID: u64 = 1;
pub const UNKNOWN_STATUS: &str = "desconhecido";

// Experiment body tables
/// Lower-cased first-column texts of header rows that templates sometimes
/// render with `<td>` instead of `<th>`.
pub const HEADER_LABELS: &[&str] = &["parâmetro", "resultado", "hemograma", "série branca"];

// Local store
pub const STORE_DIR: &str = ".store";
pub const STORE_SEP: char = ',';
pub const RESEARCHERS_FILE: &str = "researchers.csv";
pub const EXPERIMENTS_FILE: &str = "experiments.csv";
pub const LOG_FILE_NAME: &str = "debug.log";

// Environment
pub const ENV_URL: &str = "ELAB_URL";
pub const ENV_API_KEY: &str = "ELAB_API_KEY";
pub const ENV_VERIFY_TLS: &str = "ELAB_VERIFY_TLS";
pub const ENV_STORE: &str = "ELAB_BRIDGE_STORE";
