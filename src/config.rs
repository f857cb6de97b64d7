use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

/// Top-level configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub cisco_aci: Vec<AciInstance>,
    #[serde(default)]
    pub vault: Vec<StatsInstance>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_interval")]
    pub default_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            log_level: default_log_level(),
            default_interval_secs: default_interval(),
        }
    }
}

/// One fabric controller cluster to monitor
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AciInstance {
    pub aci_url: Option<String>,
    #[serde(default)]
    pub aci_urls: Vec<String>,
    pub username: String,
    pub pwd: String,
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    #[serde(default = "default_aci_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub report_timing: bool,
    #[serde(default)]
    pub tenant: Vec<String>,
    pub interval_secs: Option<u64>,
}

impl AciInstance {
    /// `aci_urls` followed by `aci_url`, if set
    pub fn urls(&self) -> Result<Vec<String>> {
        let mut urls = self.aci_urls.clone();
        if let Some(ref url) = self.aci_url {
            urls.push(url.clone());
        }
        if urls.is_empty() {
            bail!("The Cisco ACI check requires at least one url");
        }
        Ok(urls)
    }

    /// Stable key for the session cache
    pub fn content_hash(&self) -> u64 {
        content_hash(self)
    }
}

/// One secrets-server stats endpoint to monitor
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatsInstance {
    pub stats_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_stats_timeout")]
    pub timeout: u64,
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    pub url: String,
    #[serde(default)]
    pub headers: std::collections::HashMap<String, String>,
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        // Expand environment variables
        let expanded = expand_env_vars(content);

        let config: Config = toml::from_str(&expanded)
            .with_context(|| "Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (i, instance) in self.cisco_aci.iter().enumerate() {
            instance
                .urls()
                .with_context(|| format!("cisco_aci instance #{}", i))?;
        }
        for (i, instance) in self.vault.iter().enumerate() {
            if instance.stats_url.is_empty() {
                bail!("vault instance #{} has an empty stats_url", i);
            }
        }
        Ok(())
    }
}

fn content_hash<T: Serialize>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    // serde_json keeps field order, so equal configs hash equally
    serde_json::to_string(value)
        .unwrap_or_default()
        .hash(&mut hasher);
    hasher.finish()
}

static ENV_VAR: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Expand ${ENV_VAR} references in config string
fn expand_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .to_string()
}

// Default value functions
fn default_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
fn default_log_level() -> String { "info".to_string() }
fn default_interval() -> u64 { 15 }
fn default_true() -> bool { true }
fn default_aci_timeout() -> u64 { 15 }
fn default_stats_timeout() -> u64 { 10 }
fn default_webhook_timeout() -> u64 { 10 }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[agent]
hostname = "collector-1"
log_level = "debug"

[[cisco_aci]]
aci_url = "https://apic-3"
aci_urls = ["https://apic-1", "https://apic-2"]
username = "admin"
pwd = "${SYSOPS_TEST_ACI_PWD}"
tenant = ["acme"]
tags = ["env:prod"]
report_timing = true

[[vault]]
stats_url = "http://localhost:8200/stats"

[output.webhook]
enabled = true
url = "https://collector.example.com/ingest"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        std::env::set_var("SYSOPS_TEST_ACI_PWD", "s3cret");
        let config = Config::parse(SAMPLE).unwrap();

        assert_eq!(config.agent.hostname, "collector-1");
        assert_eq!(config.agent.default_interval_secs, 15);

        let aci = &config.cisco_aci[0];
        assert_eq!(aci.pwd, "s3cret");
        assert!(aci.ssl_verify);
        assert_eq!(aci.timeout, 15);
        assert_eq!(
            aci.urls().unwrap(),
            vec!["https://apic-1", "https://apic-2", "https://apic-3"]
        );

        assert_eq!(config.vault[0].timeout, 10);
        let webhook = config.output.webhook.unwrap();
        assert!(webhook.enabled);
        assert!(webhook.headers.is_empty());
    }

    #[test]
    fn unset_env_var_expands_to_empty() {
        assert_eq!(expand_env_vars("pwd = \"${SYSOPS_TEST_SURELY_UNSET}\""), "pwd = \"\"");
    }

    #[test]
    fn instance_without_url_is_rejected() {
        let err = Config::parse(
            r#"
[[cisco_aci]]
username = "admin"
pwd = "x"
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("requires at least one url"));
    }

    #[test]
    fn content_hash_tracks_configuration() {
        let base = AciInstance {
            aci_url: Some("https://apic-1".into()),
            aci_urls: vec![],
            username: "admin".into(),
            pwd: "x".into(),
            ssl_verify: true,
            timeout: 15,
            tags: vec![],
            report_timing: false,
            tenant: vec![],
            interval_secs: None,
        };
        let same = base.clone();
        let mut other = base.clone();
        other.tags.push("env:dev".into());

        assert_eq!(base.content_hash(), same.content_hash());
        assert_ne!(base.content_hash(), other.content_hash());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[vault]]\nstats_url = \"http://127.0.0.1:8200/stats\"\ntags = [\"role:edge\"]"
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert!(config.cisco_aci.is_empty());
        assert_eq!(config.vault[0].tags, vec!["role:edge"]);
        assert!(config.output.webhook.is_none());
    }

    #[test]
    fn missing_file_has_context() {
        let err = Config::load("/nonexistent/sysops-checks.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
