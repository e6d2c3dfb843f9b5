use crate::domain::error::{CeError, CeResult};
use serde::{Deserialize, Serialize};

/// ontapce configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CeConfig {
    /// Cluster connection settings
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Defaults applied to every volume created by `create_volume`
    #[serde(default)]
    pub volume: VolumeDefaults,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How we connect to the storage cluster or vserver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster or SVM management address
    #[serde(default = "default_host")]
    pub host: String,
    /// API user
    #[serde(default = "default_username")]
    pub username: String,
    /// API password
    #[serde(default)]
    pub password: String,
    /// SVM that owns the volumes
    #[serde(default = "default_vserver")]
    pub vserver: String,
    /// Verify the cluster's TLS certificate
    #[serde(default)]
    pub verify_tls: bool,
    /// Maximum time to wait for an asynchronous job, in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Delay between job status queries, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Per-request timeout, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Volume creation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDefaults {
    #[serde(default = "default_aggregates")]
    pub aggregates: Vec<String>,
    /// Volume size, e.g. `10240g`; plain numbers are bytes
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default)]
    pub uid: u32,
    #[serde(default = "default_gid")]
    pub gid: u32,
    #[serde(default = "default_unix_permissions")]
    pub unix_permissions: u32,
    #[serde(default = "default_export_policy")]
    pub export_policy: String,
    #[serde(default = "default_snapshot_policy")]
    pub snapshot_policy: String,
    #[serde(default)]
    pub snapshot_reserve_percent: u8,
    #[serde(default = "default_guarantee")]
    pub guarantee: String,
    #[serde(default = "default_security_style")]
    pub security_style: String,
    /// `files.maximum` applied after creation; 0 leaves the cluster default
    #[serde(default = "default_max_files")]
    pub max_files: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_policy: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_host() -> String {
    "vs1".to_string()
}

fn default_username() -> String {
    "vsadmin".to_string()
}

fn default_vserver() -> String {
    "vs1".to_string()
}

fn default_poll_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    1
}

fn default_request_timeout() -> u64 {
    60
}

fn default_aggregates() -> Vec<String> {
    vec!["aggr1".to_string()]
}

fn default_size() -> String {
    "10240g".to_string()
}

fn default_gid() -> u32 {
    25
}

fn default_unix_permissions() -> u32 {
    777
}

fn default_export_policy() -> String {
    "default".to_string()
}

fn default_snapshot_policy() -> String {
    "none".to_string()
}

fn default_guarantee() -> String {
    "none".to_string()
}

fn default_security_style() -> String {
    "unix".to_string()
}

fn default_max_files() -> u64 {
    75_000_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CeConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            volume: VolumeDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            username: default_username(),
            password: String::new(),
            vserver: default_vserver(),
            verify_tls: false,
            poll_timeout_secs: default_poll_timeout(),
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for VolumeDefaults {
    fn default() -> Self {
        Self {
            aggregates: default_aggregates(),
            size: default_size(),
            uid: 0,
            gid: default_gid(),
            unix_permissions: default_unix_permissions(),
            export_policy: default_export_policy(),
            snapshot_policy: default_snapshot_policy(),
            snapshot_reserve_percent: 0,
            guarantee: default_guarantee(),
            security_style: default_security_style(),
            max_files: default_max_files(),
            efficiency_policy: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CeConfig {
    /// Check the settings every operation relies on
    pub fn validate(&self) -> CeResult<()> {
        let required = [
            ("cluster.host", &self.cluster.host),
            ("cluster.username", &self.cluster.username),
            ("cluster.vserver", &self.cluster.vserver),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(CeError::Config {
                    message: format!("{} must not be empty", key),
                });
            }
        }
        self.volume.size_bytes()?;
        Ok(())
    }
}

impl VolumeDefaults {
    /// Configured size in bytes
    pub fn size_bytes(&self) -> CeResult<u64> {
        parse_size(&self.size)
    }
}

/// Parse a size such as `10240g`, `512M` or `1099511627776`.
///
/// Suffixes are powers of 1024 and may be followed by `b`.
pub fn parse_size(input: &str) -> CeResult<u64> {
    let trimmed = input.trim().to_ascii_lowercase();
    let unit_str = trimmed.strip_suffix('b').unwrap_or(&trimmed);
    let split = unit_str
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unit_str.len());
    let (digits, unit) = unit_str.split_at(split);

    if digits.is_empty() {
        return Err(CeError::InvalidSize(input.to_string()));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| CeError::InvalidSize(input.to_string()))?;

    let multiplier: u64 = match unit {
        "" => 1,
        "k" => 1 << 10,
        "m" => 1 << 20,
        "g" => 1 << 30,
        "t" => 1 << 40,
        "p" => 1 << 50,
        _ => return Err(CeError::InvalidSize(input.to_string())),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| CeError::InvalidSize(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = CeConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: CeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.cluster.vserver, "vs1");
        assert_eq!(deserialized.volume.max_files, 75_000_000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CeConfig = toml::from_str(
            r#"
            [cluster]
            host = "cluster1.example.com"
            password = "secret"

            [volume]
            size = "100g"
            "#,
        )
        .unwrap();

        assert_eq!(config.cluster.host, "cluster1.example.com");
        assert_eq!(config.cluster.username, "vsadmin");
        assert_eq!(config.cluster.poll_timeout_secs, 120);
        assert!(!config.cluster.verify_tls);
        assert_eq!(config.volume.aggregates, vec!["aggr1".to_string()]);
        assert_eq!(config.volume.size_bytes().unwrap(), 100 * 1024 * 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("10240g").unwrap(), 10240 * (1u64 << 30));
        assert_eq!(parse_size("512M").unwrap(), 512 * (1u64 << 20));
        assert_eq!(parse_size("2tb").unwrap(), 2 * (1u64 << 40));
        assert_eq!(parse_size(" 4096 ").unwrap(), 4096);
        assert!(parse_size("").is_err());
        assert!(parse_size("g").is_err());
        assert!(parse_size("10x").is_err());
        assert!(parse_size("1.5g").is_err());
        assert!(parse_size("99999999999p").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_vserver() {
        let mut config = CeConfig::default();
        config.cluster.vserver = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cluster.vserver"));
    }

    #[test]
    fn test_validate_rejects_bad_size() {
        let mut config = CeConfig::default();
        config.volume.size = "lots".to_string();
        assert!(matches!(config.validate(), Err(CeError::InvalidSize(_))));
    }
}
