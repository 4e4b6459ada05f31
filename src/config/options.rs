// src/config/options.rs
use std::env;
use std::path::PathBuf;

use super::consts::*;

/// Connection settings for one eLabFTW instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElabOptions {
    pub url: String,
    pub api_key: String,
    pub verify_tls: bool,
}

impl ElabOptions {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { url: url.into(), api_key: api_key.into(), verify_tls: true }
    }

    /// Fill missing values from `ELAB_URL` / `ELAB_API_KEY` / `ELAB_VERIFY_TLS`.
    /// Returns `None` when either the URL or the key is still missing.
    pub fn resolve(url: Option<String>, api_key: Option<String>, verify_tls: Option<bool>) -> Option<Self> {
        let url = url.or_else(|| non_empty_var(ENV_URL))?;
        let api_key = api_key.or_else(|| non_empty_var(ENV_API_KEY))?;
        let verify_tls = verify_tls
            .or_else(|| non_empty_var(ENV_VERIFY_TLS).map(|v| parse_flag(&v)))
            .unwrap_or(true);
        Some(Self { url, api_key, verify_tls })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub dir: PathBuf,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { dir: PathBuf::from(STORE_DIR) }
    }
}

impl StoreOptions {
    pub fn resolve(dir: Option<PathBuf>) -> Self {
        match dir.or_else(|| non_empty_var(ENV_STORE).map(PathBuf::from)) {
            Some(dir) => Self { dir },
            None => Self::default(),
        }
    }

    /// Default log file, kept next to the store's CSV files.
    pub fn log_file(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Anything but an explicit "off" value counts as enabled.
pub fn parse_flag(v: &str) -> bool {
    !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing_is_lenient() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(" False "));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn explicit_values_win() {
        let opts = ElabOptions::resolve(Some(s!("https://elab.test")), Some(s!("k")), Some(false)).unwrap();
        assert_eq!(opts.url, "https://elab.test");
        assert_eq!(opts.api_key, "k");
        assert!(!opts.verify_tls);
    }

    #[test]
    fn explicit_store_dir_wins() {
        let opts = StoreOptions::resolve(Some(PathBuf::from("/tmp/x")));
        assert_eq!(opts.dir, PathBuf::from("/tmp/x"));
        assert_eq!(opts.log_file(), PathBuf::from("/tmp/x/debug.log"));
    }
}
