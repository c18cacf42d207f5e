use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use vigia_core::ValidationConfig;

/// Server configuration loaded from YAML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub validation: ValidationConfig,
    pub queue: QueueSettings,
    pub relay: RelaySettings,
    pub cors: CorsSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Path segment in `/api/{api_version}/exames/...`
    pub api_version: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub enabled: bool,
    pub api_keys: Vec<ApiKey>,
    pub jwt: Option<JwtSettings>,
}

/// HS256 bearer tokens issued by the state identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub db_path: PathBuf,
    pub message_group_id: String,
    pub max_attempts: u32,
}

/// Forwarding of queued hemograms to the processing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub interval_secs: u64,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    /// `*` allows any origin
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_version: "v1".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/queue.sqlite"),
            message_group_id: "hemograma-processing".to_string(),
            max_attempts: 5,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            interval_secs: 5,
            batch_size: 10,
            timeout_secs: 10,
            headers: HashMap::new(),
        }
    }
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = if let Some(path) = config_path {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Override settings from `VIGIA_*` variables.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("VIGIA_PORT")
            && let Ok(port_num) = port.parse()
        {
            self.server.port = port_num;
        }

        if let Some(host) = var("VIGIA_HOST") {
            self.server.host = host;
        }

        if let Some(db_path) = var("VIGIA_QUEUE_DB") {
            self.queue.db_path = PathBuf::from(db_path);
        }

        if let Some(profile_url) = var("VIGIA_PROFILE_URL") {
            self.validation.profile_url = profile_url;
        }

        if let Some(secret) = var("VIGIA_JWT_SECRET") {
            self.auth.jwt.get_or_insert_with(JwtSettings::default).secret = secret;
        }

        if let Some(level) = var("VIGIA_LOG_LEVEL") {
            self.log.level = level;
        }

        if let Some(format) = var("VIGIA_LOG_FORMAT").as_deref().and_then(LogFormat::parse) {
            self.log.format = format;
        }

        if let Some(endpoint) = var("VIGIA_RELAY_ENDPOINT") {
            self.relay.endpoint = Some(endpoint);
            self.relay.enabled = true;
        }
    }

    /// Path of the hemogram submission route
    pub fn hemograma_path(&self) -> String {
        format!("/api/{}/exames/hemograma", self.server.api_version)
    }

    pub fn exames_health_path(&self) -> String {
        format!("/api/{}/exames/health", self.server.api_version)
    }
}
