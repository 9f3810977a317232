/// Runtime settings for the snapshot daemon

use serde::{Deserialize, Serialize};

/// Path checked when `STAGEWATCH_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "stagewatch.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Company id inside the ticketing widget.
    pub company_id: String,

    #[serde(default = "default_list_url")]
    pub list_url: String,
    #[serde(default = "default_events_data_url")]
    pub events_data_url: String,
    #[serde(default = "default_customer_url")]
    pub customer_url: String,

    /// Seconds between snapshot cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Consecutive failed cycles before escalating log severity.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Directory for rolling JSON log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_list_url() -> String {
    "https://widget.profticket.ru/api/event/list/?company_id=".to_string()
}

fn default_events_data_url() -> String {
    "https://widget.profticket.ru/widget-api/events-data/".to_string()
}

fn default_customer_url() -> String {
    "https://spa.profticket.ru/customer/".to_string()
}

fn default_poll_interval() -> u64 {
    1800
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Settings {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load from `STAGEWATCH_CONFIG` or the default path.
    pub fn load() -> anyhow::Result<Self> {
        let path =
            std::env::var("STAGEWATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_file(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "company_id = \"30\"").unwrap();

        let settings = Settings::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.company_id, "30");
        assert_eq!(settings.poll_interval_secs, 1800);
        assert!(settings.list_url.starts_with("https://"));
    }

    #[test]
    fn overrides_take_effect() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "company_id = \"7\"\npoll_interval_secs = 60\nmax_consecutive_errors = 2"
        )
        .unwrap();

        let settings = Settings::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.poll_interval_secs, 60);
        assert_eq!(settings.max_consecutive_errors, 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Settings::load_from_file("/definitely/not/here.toml").is_err());
    }
}
