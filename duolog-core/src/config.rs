use std::sync::LazyLock;

use derive_from_env::FromEnv;

use crate::Severity;

#[derive(FromEnv)]
#[from_env(prefix = "DUOLOG")]
#[allow(non_snake_case)]
pub struct DuologConfig {
    #[from_env(default = "100")]
    pub FLUSH_INTERVAL_MS: u64,
    /// Raw level; anything but one of the six standard levels means INFO.
    #[from_env(default = "20")]
    pub DEFAULT_SEVERITY: String,
    /// Raw level; anything but one of the six standard levels means CRITICAL.
    #[from_env(default = "50")]
    pub ERROR_SEVERITY: String,
    /// Path list (OS separator) of roots used to infer the application name.
    #[from_env(default = "")]
    pub APP_ROOTS: String,
}

impl DuologConfig {
    pub fn default_severity(&self) -> Severity {
        parse_severity(&self.DEFAULT_SEVERITY, Severity::Info)
    }

    pub fn error_severity(&self) -> Severity {
        parse_severity(&self.ERROR_SEVERITY, Severity::Critical)
    }
}

fn parse_severity(raw: &str, fallback: Severity) -> Severity {
    Severity::resolve(raw.trim().parse().ok(), fallback)
}

pub static DUOLOG_CONFIG: LazyLock<DuologConfig> =
    LazyLock::new(|| DuologConfig::from_env().unwrap());
