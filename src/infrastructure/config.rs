use crate::domain::{config::CeConfig, error::{CeError, CeResult}};
use std::path::{Path, PathBuf};
use std::fs;
use tracing::debug;

const PROJECT_DIR: &str = ".ontapce";
const CONFIG_FILE: &str = "config.toml";

const PROJECT_TEMPLATE: &str = r#"# ontapce configuration
#
# How we connect to the storage cluster or vserver.
[cluster]
host = "vs1"
username = "vsadmin"
password = ""
vserver = "vs1"
# Self-signed certificates are accepted unless this is true.
verify_tls = false
poll_timeout_secs = 120
poll_interval_secs = 1
request_timeout_secs = 60

# Defaults for create_volume.
[volume]
aggregates = ["aggr1"]
size = "10240g"
uid = 0
gid = 25
unix_permissions = 777
export_policy = "default"
snapshot_policy = "none"
snapshot_reserve_percent = 0
guarantee = "none"
security_style = "unix"
# files.maximum set after creation; 0 keeps the cluster default.
max_files = 75000000
# efficiency_policy = "auto"

[logging]
level = "info"
"#;

/// Configuration manager
pub struct ConfigManager {
    global_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> Self {
        Self {
            global_config_path: Self::default_global_config_path(),
            project_config_path: Self::find_project_config_path(),
        }
    }

    /// Manager with explicit locations, mostly for tests
    pub fn with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            global_config_path: global,
            project_config_path: project,
        }
    }

    /// Load configuration: defaults, then the global file, then the project file.
    ///
    /// A file replaces whole sections of the previous layer, keys it leaves out
    /// inside a section take their defaults.
    pub fn load_config(&self) -> CeResult<CeConfig> {
        let mut layers = Vec::new();
        if let Some(path) = &self.global_config_path {
            layers.push(path);
        }
        if let Some(path) = &self.project_config_path {
            layers.push(path);
        }

        let mut merged = toml::Table::new();
        for path in layers.into_iter().filter(|p| p.exists()) {
            debug!("Loading configuration from {}", path.display());
            let table = Self::read_table(path)?;
            for (section, value) in table {
                merged.insert(section, value);
            }
        }

        let config: CeConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| CeError::Config {
                message: format!("Invalid configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> CeResult<CeConfig> {
        let content = fs::read_to_string(path).map_err(|e| CeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: CeConfig = toml::from_str(&content).map_err(|e| CeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write a commented default configuration into `<path>/.ontapce/config.toml`
    pub fn init_project_config(&self, path: &Path) -> CeResult<PathBuf> {
        let config_dir = path.join(PROJECT_DIR);
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            return Err(CeError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| CeError::Config {
            message: format!("Failed to create {} directory: {}", PROJECT_DIR, e),
        })?;
        fs::write(&config_file, PROJECT_TEMPLATE).map_err(|e| CeError::Config {
            message: format!("Failed to write config file {}: {}", config_file.display(), e),
        })?;

        Ok(config_file)
    }

    fn read_table(path: &Path) -> CeResult<toml::Table> {
        let content = fs::read_to_string(path).map_err(|e| CeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        content.parse::<toml::Table>().map_err(|e| CeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    fn default_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("ontapce").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
