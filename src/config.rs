use std::fs;

use once_cell::sync::Lazy;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_path: String,
    pub log_level: String,
    pub db_url: String,
    pub vault_key: String,
    pub vault_key_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8900,
            base_path: "/".to_string(),
            log_level: "info".to_string(),
            db_url: "vault.db".to_string(),
            vault_key: String::new(),
            vault_key_file: ".vault_key".to_string(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    let mut config = fs::read_to_string("config.local.yaml")
        .or_else(|_| fs::read_to_string("config.yaml"))
        .ok()
        .map(|yaml_str| serde_yaml::from_str::<Config>(&yaml_str).expect("config yaml invalid"))
        .unwrap_or_default();
    // env overrides, mainly for tests and containers
    if let Ok(db_url) = std::env::var("VAULT_DB") {
        config.db_url = db_url;
    }
    if let Ok(key) = std::env::var("VAULT_KEY") {
        config.vault_key = key;
    }
    config
});
