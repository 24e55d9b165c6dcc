use std::path::{Path, PathBuf};

use anyhow::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// HTTP server bind IP address
    #[serde(rename = "http-bind-ip", default = "default_bind_ip")]
    pub http_bind_ip: String,

    /// HTTP server bind port
    #[serde(rename = "http-bind-port", default = "default_bind_port")]
    pub http_bind_port: u16,

    /// HTTP Basic Auth password (plain text, optional)
    /// When None, authentication is disabled
    #[serde(rename = "http-password")]
    pub http_password: Option<String>,

    /// Shared secret for verifying payment-rail webhook signatures.
    /// When None, webhook signature verification is disabled.
    #[serde(rename = "webhook-secret")]
    pub webhook_secret: Option<String>,

    /// Data directory for the daemon (contains the ledger file and config)
    #[serde(rename = "data-dir")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind_ip: default_bind_ip(),
            http_bind_port: default_bind_port(),
            http_password: None,
            webhook_secret: None,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists (important for Docker volumes)
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file atomically
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists (important for Docker volumes)
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;

        // Write to temporary file first, then rename, so the config file is
        // never left in a partially written state
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, contents)?;

        match std::fs::rename(&temp_path, path) {
            Ok(_) => Ok(()),
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                Err(e.into())
            }
        }
    }

    /// Get the complete HTTP server address
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http_bind_ip, self.http_bind_port)
    }

    /// Check if authentication is enabled
    pub fn is_auth_enabled(&self) -> bool {
        self.http_password.is_some()
    }

    /// Get the authentication password
    pub fn auth_password(&self) -> Option<&str> {
        self.http_password.as_deref()
    }

    /// Generate a secure random 32-byte hex password
    pub fn generate_password() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Load or create configuration file with automatic password generation.
    /// Uses atomic file operations to prevent password loss on crash.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        let mut password_generated = false;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut config = if path.exists() {
            match Self::load_from_file(path) {
                Ok(cfg) => cfg,
                Err(_) => {
                    // If config file is corrupted, recreate it
                    let cfg = Self::default();
                    cfg.save_to_file(path)?;
                    cfg
                }
            }
        } else {
            let config = Self::default();
            config.save_to_file(path)?;
            config
        };

        if config.http_password.is_none() {
            let generated_password = Self::generate_password();
            config.http_password = Some(generated_password);
            password_generated = true;

            // Save the complete config with the password properly in the structure
            config.save_to_file(path)?;
        }

        Ok((config, password_generated))
    }
}

// Default value functions
fn default_bind_ip() -> String {
    // Use 0.0.0.0 in containerized environments to allow external connections
    if std::env::var("DOCKER_CONTAINER").is_ok()
        || std::env::var("PAYOUTD_ADDR").is_ok()
        || std::path::Path::new("/.dockerenv").exists()
        || std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
    {
        "0.0.0.0".to_string()
    } else {
        "127.0.0.1".to_string()
    }
}

fn default_bind_port() -> u16 {
    8990
}
