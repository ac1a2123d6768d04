//! NWDAF configuration
//!
//! Two sources feed the process:
//! - a YAML file describing the NF itself (name, SBI binding, PLMNs, analytics cadence)
//! - environment variables configuring the auto-steering controller

use crate::error::{Result, SteeringError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Default location of the NF configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/nwdafcfg.yaml";

const DEFAULT_SBI_PORT: u16 = 8000;
const DEFAULT_SBI_SCHEME: &str = "http";
const DEFAULT_ANALYTICS_DELAY_SECS: u64 = 10;
const DEFAULT_VERSION: &str = "1.0.0";

// Key aliases cover config sources that lowercase keys.

/// Top-level YAML document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NwdafConfig {
    #[serde(default)]
    pub info: Info,
    pub configuration: Configuration,
    #[serde(default)]
    pub logger: Option<LoggerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(rename = "nwdafName", alias = "nwdafname", default)]
    pub nwdaf_name: String,
    #[serde(default)]
    pub sbi: SbiConfig,
    #[serde(rename = "serviceNameList", alias = "servicenamelist", default)]
    pub service_name_list: Vec<String>,
    #[serde(rename = "nrfUri", alias = "nrfuri", default)]
    pub nrf_uri: String,
    #[serde(rename = "plmnList", alias = "plmnlist", default)]
    pub plmn_list: Vec<PlmnId>,
    /// Analytics cycle period in seconds
    #[serde(rename = "analyticsDelay", alias = "analyticsdelay", default)]
    pub analytics_delay: u64,
    #[serde(rename = "dataCollection", alias = "datacollection", default)]
    pub data_collection: Option<DataCollectionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SbiConfig {
    #[serde(default)]
    pub scheme: String,
    #[serde(rename = "registerIPv4", alias = "registeripv4", default)]
    pub register_ipv4: String,
    #[serde(rename = "bindingIPv4", alias = "bindingipv4", default)]
    pub binding_ipv4: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for SbiConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SBI_SCHEME.to_string(),
            register_ipv4: String::new(),
            binding_ipv4: String::new(),
            port: DEFAULT_SBI_PORT,
            tls: None,
        }
    }
}

impl SbiConfig {
    /// Socket address the SBI server binds to
    pub fn bind_addr(&self) -> String {
        let host = if self.binding_ipv4.is_empty() {
            "0.0.0.0"
        } else {
            self.binding_ipv4.as_str()
        };
        format!("{}:{}", host, self.port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub pem: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlmnId {
    pub mcc: String,
    pub mnc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataCollectionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "collectionPeriod", alias = "collectionperiod", default)]
    pub collection_period: u64,
    #[serde(rename = "targetNFs", alias = "targetnfs", default)]
    pub target_nfs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

impl NwdafConfig {
    /// Load the YAML configuration file and fill in defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = path.to_string_lossy();

        let mut config: NwdafConfig = config::Config::builder()
            .add_source(config::File::new(&source, config::FileFormat::Yaml).required(true))
            .build()
            .map_err(|e| {
                SteeringError::Config(format!("failed to read config file {}: {}", source, e))
            })?
            .try_deserialize()
            .map_err(|e| {
                SteeringError::Config(format!("failed to parse config file {}: {}", source, e))
            })?;

        config.apply_defaults();
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        let configuration = &mut self.configuration;
        if configuration.analytics_delay == 0 {
            configuration.analytics_delay = DEFAULT_ANALYTICS_DELAY_SECS;
        }
        if configuration.sbi.port == 0 {
            configuration.sbi.port = DEFAULT_SBI_PORT;
        }
        if configuration.sbi.scheme.is_empty() {
            configuration.sbi.scheme = DEFAULT_SBI_SCHEME.to_string();
        }
    }

    pub fn version(&self) -> &str {
        match self.info.version.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => DEFAULT_VERSION,
        }
    }

    pub fn analytics_period(&self) -> Duration {
        Duration::from_secs(self.configuration.analytics_delay)
    }
}

/// Auto-steering controller settings, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub nef_url: String,
    pub prometheus_url: String,
    pub af_id: String,
    pub dnn: String,
    pub sst: u8,
    pub sd: String,
    pub ollama_base: String,
    pub model_name: String,
    pub enabled: bool,
    pub interval: Duration,
    pub threshold_bps: f64,
    pub cooldown: Duration,
    /// Kubernetes namespace holding the UPF pods
    pub upf_namespace: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            nef_url: "http://10.152.183.162:80".to_string(),
            prometheus_url: "http://prometheus-kube-prometheus-prometheus.monitoring:9090"
                .to_string(),
            af_id: "traffic-steering-agent".to_string(),
            dnn: "internet".to_string(),
            sst: 1,
            sd: "010203".to_string(),
            ollama_base: "http://192.168.0.149:11434".to_string(),
            model_name: "qwen2.5-coder".to_string(),
            enabled: true,
            interval: Duration::from_secs(30),
            threshold_bps: 100_000.0,
            cooldown: Duration::from_secs(60),
            upf_namespace: "free5gc".to_string(),
        }
    }
}

/// Raw environment values, keys lowercased by the `config` environment source
#[derive(Debug, Default, Deserialize)]
struct ControllerEnv {
    nef_url: Option<String>,
    prometheus_url: Option<String>,
    af_id: Option<String>,
    dnn: Option<String>,
    sst: Option<String>,
    sd: Option<String>,
    ollama_api_base: Option<String>,
    llm_model: Option<String>,
    auto_steer_enabled: Option<String>,
    auto_steer_interval: Option<String>,
    auto_steer_threshold_bps: Option<String>,
    auto_steer_cooldown: Option<String>,
    upf_namespace: Option<String>,
}

impl ControllerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::default())
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self> {
        Self::from_environment(config::Environment::default().source(Some(vars)))
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let raw: ControllerEnv = config::Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: ControllerEnv) -> Self {
        let defaults = Self::default();

        let interval = parse_or("AUTO_STEER_INTERVAL", raw.auto_steer_interval, 30u64);
        let interval = if interval == 0 {
            warn!(key = "AUTO_STEER_INTERVAL", "Interval must be positive, using default");
            defaults.interval
        } else {
            Duration::from_secs(interval)
        };

        Self {
            nef_url: raw.nef_url.unwrap_or(defaults.nef_url),
            prometheus_url: raw.prometheus_url.unwrap_or(defaults.prometheus_url),
            af_id: raw.af_id.unwrap_or(defaults.af_id),
            dnn: raw.dnn.unwrap_or(defaults.dnn),
            sst: parse_or("SST", raw.sst, defaults.sst),
            sd: raw.sd.unwrap_or(defaults.sd),
            ollama_base: raw.ollama_api_base.unwrap_or(defaults.ollama_base),
            model_name: raw.llm_model.unwrap_or(defaults.model_name),
            // Only the exact literal enables the controller
            enabled: raw
                .auto_steer_enabled
                .map(|v| v == "true")
                .unwrap_or(defaults.enabled),
            interval,
            threshold_bps: parse_or(
                "AUTO_STEER_THRESHOLD_BPS",
                raw.auto_steer_threshold_bps,
                defaults.threshold_bps,
            ),
            cooldown: Duration::from_secs(parse_or(
                "AUTO_STEER_COOLDOWN",
                raw.auto_steer_cooldown,
                defaults.cooldown.as_secs(),
            )),
            upf_namespace: raw.upf_namespace.unwrap_or(defaults.upf_namespace),
        }
    }

    /// Traffic-influence subscription collection URL on the NEF
    pub fn nef_collection_url(&self) -> String {
        format!(
            "{}/3gpp-traffic-influence/v1/{}/subscriptions",
            self.nef_url.trim_end_matches('/'),
            self.af_id
        )
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key = key, value = %raw, "Invalid value, using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_controller_defaults_when_env_empty() {
        let config = ControllerConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.af_id, "traffic-steering-agent");
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.threshold_bps, 100_000.0);
        assert_eq!(config.cooldown, Duration::from_secs(60));
        assert!(config.enabled);
    }

    #[test]
    fn test_controller_reads_overrides() {
        let config = ControllerConfig::from_vars(vars(&[
            ("AF_ID", "test-agent"),
            ("NEF_URL", "http://nef:8080"),
            ("SST", "2"),
            ("SD", "112233"),
            ("AUTO_STEER_INTERVAL", "5"),
            ("AUTO_STEER_THRESHOLD_BPS", "2.5e5"),
            ("AUTO_STEER_COOLDOWN", "0"),
        ]))
        .unwrap();

        assert_eq!(config.af_id, "test-agent");
        assert_eq!(config.sst, 2);
        assert_eq!(config.sd, "112233");
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.threshold_bps, 250_000.0);
        assert_eq!(config.cooldown, Duration::ZERO);
        assert_eq!(
            config.nef_collection_url(),
            "http://nef:8080/3gpp-traffic-influence/v1/test-agent/subscriptions"
        );
    }

    #[test]
    fn test_enabled_flag_is_case_sensitive_literal() {
        let on = ControllerConfig::from_vars(vars(&[("AUTO_STEER_ENABLED", "true")])).unwrap();
        assert!(on.enabled);

        for value in ["TRUE", "True", "1", "yes", "false", ""] {
            let config =
                ControllerConfig::from_vars(vars(&[("AUTO_STEER_ENABLED", value)])).unwrap();
            assert!(!config.enabled, "value {:?} must disable", value);
        }
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = ControllerConfig::from_vars(vars(&[
            ("AUTO_STEER_INTERVAL", "soon"),
            ("AUTO_STEER_THRESHOLD_BPS", "lots"),
            ("SST", "-1"),
        ]))
        .unwrap();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.threshold_bps, 100_000.0);
        assert_eq!(config.sst, 1);
    }

    #[test]
    fn test_zero_interval_uses_default() {
        let config = ControllerConfig::from_vars(vars(&[("AUTO_STEER_INTERVAL", "0")])).unwrap();
        assert_eq!(config.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_load_yaml_applies_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
info:
  version: 1.0.2
  description: NWDAF initial local configuration
configuration:
  nwdafName: NWDAF
  sbi:
    scheme: http
    registerIPv4: 127.0.0.9
    bindingIPv4: 127.0.0.9
  serviceNameList:
    - nnwdaf-eventssubscription
    - nnwdaf-analyticsinfo
  nrfUri: http://127.0.0.10:8000
  plmnList:
    - mcc: "208"
      mnc: "93"
  dataCollection:
    enabled: true
    collectionPeriod: 30
    targetNFs: [AMF, SMF]
"#
        )
        .unwrap();

        let config = NwdafConfig::load(file.path()).unwrap();
        assert_eq!(config.version(), "1.0.2");
        assert_eq!(config.configuration.nwdaf_name, "NWDAF");
        assert_eq!(config.configuration.sbi.port, 8000);
        assert_eq!(config.configuration.sbi.bind_addr(), "127.0.0.9:8000");
        assert_eq!(config.configuration.analytics_delay, 10);
        assert_eq!(config.configuration.plmn_list.len(), 1);
        assert_eq!(config.configuration.plmn_list[0].mcc, "208");
        let collection = config.configuration.data_collection.unwrap();
        assert!(collection.enabled);
        assert_eq!(collection.target_nfs, vec!["AMF", "SMF"]);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = NwdafConfig::load("/nonexistent/nwdafcfg.yaml").unwrap_err();
        assert!(matches!(err, SteeringError::Config(_)));
    }

    #[test]
    fn test_version_defaults_when_absent() {
        let config = NwdafConfig::default();
        assert_eq!(config.version(), "1.0.0");
        assert_eq!(SbiConfig::default().bind_addr(), "0.0.0.0:8000");
    }
}
