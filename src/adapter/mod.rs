use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use thiserror::Error;

mod claw_code_router;
mod openclaw;
mod sillytavern;

pub use claw_code_router::ClawCodeRouterAdapter;
pub use openclaw::OpenClawAdapter;
pub use sillytavern::SillyTavernAdapter;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// One provider-shaped entry found in a client's config file.
#[derive(Debug, Clone)]
pub struct AdapterEntry {
    pub provider_name: String,
    pub base_url: String,
    pub api_key: String,
    /// Client-specific fields worth carrying through an import, e.g. the
    /// protocol flavor or model list.
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default)]
pub struct AdapterState {
    pub providers: Vec<AdapterEntry>,
}

/// What a sync wants written into the client config.
pub struct ApplyRequest<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
    /// Update only the named entry; `None` means every entry the adapter
    /// manages.
    pub provider_name: Option<&'a str>,
    pub extra_fields: Option<&'a Map<String, Value>>,
}

/// A downstream client config format. Implementations read the current state
/// of a config file and write credentials into it, preserving everything they
/// do not understand.
pub trait ConfigAdapter: Send + Sync {
    fn id(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn default_config_path(&self) -> String;

    /// `Ok(None)` when the config file does not exist yet.
    fn read_current(&self, path: &str) -> AdapterResult<Option<AdapterState>>;

    /// Returns `Ok(false)` when nothing applicable was found to update, e.g.
    /// the named entry is absent.
    fn apply(&self, path: &str, request: &ApplyRequest) -> AdapterResult<bool>;

    fn resolve_path(&self, configured: &str) -> String {
        if configured.is_empty() {
            self.default_config_path()
        } else {
            configured.to_string()
        }
    }
}

pub struct AdapterRegistry {
    adapters: BTreeMap<&'static str, Box<dyn ConfigAdapter>>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(OpenClawAdapter));
        registry.register(Box::new(ClawCodeRouterAdapter));
        registry.register(Box::new(SillyTavernAdapter));
        registry
    }

    pub fn register(&mut self, adapter: Box<dyn ConfigAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, id: &str) -> Option<&dyn ConfigAdapter> {
        self.adapters.get(id).map(|a| a.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ConfigAdapter> {
        self.adapters.values().map(|a| a.as_ref())
    }
}

pub static REGISTRY: Lazy<AdapterRegistry> = Lazy::new(AdapterRegistry::builtin);

pub(crate) fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
}

pub(crate) fn read_json(path: &str) -> AdapterResult<Option<Value>> {
    let path = Path::new(path);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

pub(crate) fn write_json(path: &str, value: &Value) -> AdapterResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub(crate) fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_file(dir: &tempfile::TempDir, name: &str, value: &Value) -> String {
        let path = dir.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn registry_knows_builtin_adapters() {
        let registry = AdapterRegistry::builtin();
        for id in ["openclaw", "claw_code_router", "sillytavern"] {
            assert!(registry.get(id).is_some(), "missing adapter {id}");
        }
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn missing_config_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let state = OpenClawAdapter
            .read_current(path.to_str().unwrap())
            .unwrap();
        assert!(state.is_none());
    }

    #[test]
    fn openclaw_reads_named_providers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "openclaw.json",
            &json!({ "models": { "providers": {
                "proxy-a": { "baseUrl": "https://a.test/v1", "apiKey": "sk-a",
                             "api": "openai", "models": [{"id": "gpt-x"}] },
            } } }),
        );
        let state = OpenClawAdapter.read_current(&path).unwrap().unwrap();
        assert_eq!(state.providers.len(), 1);
        let entry = &state.providers[0];
        assert_eq!(entry.provider_name, "proxy-a");
        assert_eq!(entry.base_url, "https://a.test/v1");
        assert_eq!(entry.api_key, "sk-a");
        assert_eq!(entry.extra.get("api"), Some(&json!("openai")));
        assert_eq!(entry.extra.get("models"), Some(&json!(["gpt-x"])));
    }

    #[test]
    fn openclaw_apply_updates_only_the_named_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "openclaw.json",
            &json!({ "models": { "providers": {
                "proxy-a": { "baseUrl": "old", "apiKey": "old", "models": [] },
                "proxy-b": { "baseUrl": "keep", "apiKey": "keep", "models": [] },
            } } }),
        );
        let updated = OpenClawAdapter
            .apply(
                &path,
                &ApplyRequest {
                    base_url: "https://new.test/v1",
                    api_key: "sk-new",
                    provider_name: Some("proxy-a"),
                    extra_fields: None,
                },
            )
            .unwrap();
        assert!(updated);

        let root = read_json(&path).unwrap().unwrap();
        let providers = &root["models"]["providers"];
        assert_eq!(providers["proxy-a"]["apiKey"], "sk-new");
        assert_eq!(providers["proxy-a"]["baseUrl"], "https://new.test/v1");
        assert_eq!(providers["proxy-b"]["apiKey"], "keep");
    }

    #[test]
    fn openclaw_apply_refuses_unknown_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "openclaw.json",
            &json!({ "models": { "providers": {
                "proxy-a": { "baseUrl": "old", "apiKey": "old" },
            } } }),
        );
        let updated = OpenClawAdapter
            .apply(
                &path,
                &ApplyRequest {
                    base_url: "u",
                    api_key: "k",
                    provider_name: Some("ghost"),
                    extra_fields: None,
                },
            )
            .unwrap();
        assert!(!updated);
        // Nothing was written either.
        let root = read_json(&path).unwrap().unwrap();
        assert_eq!(root["models"]["providers"]["proxy-a"]["apiKey"], "old");
    }

    #[test]
    fn claw_code_router_apply_preserves_unrelated_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.json",
            &json!({
                "LOG": true,
                "Providers": [
                    { "name": "p1", "api_base_url": "old", "api_key": "old",
                      "models": ["m1"] },
                ],
            }),
        );
        let updated = ClawCodeRouterAdapter
            .apply(
                &path,
                &ApplyRequest {
                    base_url: "https://r.test",
                    api_key: "sk-r",
                    provider_name: Some("p1"),
                    extra_fields: None,
                },
            )
            .unwrap();
        assert!(updated);

        let root = read_json(&path).unwrap().unwrap();
        assert_eq!(root["LOG"], true);
        assert_eq!(root["Providers"][0]["api_key"], "sk-r");
        assert_eq!(root["Providers"][0]["models"], json!(["m1"]));
    }

    #[test]
    fn claw_code_router_apply_without_match_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.json",
            &json!({ "Providers": [ { "name": "p1", "api_base_url": "u", "api_key": "k" } ] }),
        );
        let updated = ClawCodeRouterAdapter
            .apply(
                &path,
                &ApplyRequest {
                    base_url: "x",
                    api_key: "y",
                    provider_name: Some("missing"),
                    extra_fields: None,
                },
            )
            .unwrap();
        assert!(!updated);
    }

    #[test]
    fn sillytavern_reads_profiles_with_secret_lookup() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            &dir,
            "secrets.json",
            &json!({ "api_key_custom": [
                { "id": "s-1", "value": "sk-prof", "label": "l", "active": true },
            ] }),
        );
        write_file(
            &dir,
            "settings.json",
            &json!({ "connectionManager": { "profiles": [
                { "name": "work", "api-url": "https://st.test/v1", "secret-id": "s-1",
                  "model": "m", "preset": "p" },
            ] } }),
        );
        let base = dir.path().to_str().unwrap();
        let state = SillyTavernAdapter.read_current(base).unwrap().unwrap();
        assert_eq!(state.providers.len(), 1);
        assert_eq!(state.providers[0].provider_name, "work");
        assert_eq!(state.providers[0].api_key, "sk-prof");
        assert_eq!(state.providers[0].base_url, "https://st.test/v1");
    }

    #[test]
    fn sillytavern_legacy_layout_reads_as_default_entry() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            &dir,
            "secrets.json",
            &json!({ "api_key_custom": [
                { "id": "s-1", "value": "sk-legacy", "active": true },
            ] }),
        );
        write_file(
            &dir,
            "settings.json",
            &json!({ "selected_proxy": { "url": "https://legacy.test" } }),
        );
        let base = dir.path().to_str().unwrap();
        let state = SillyTavernAdapter.read_current(base).unwrap().unwrap();
        assert_eq!(state.providers.len(), 1);
        assert_eq!(state.providers[0].provider_name, "default");
        assert_eq!(state.providers[0].api_key, "sk-legacy");
        assert_eq!(state.providers[0].base_url, "https://legacy.test");
    }

    #[test]
    fn sillytavern_apply_rotates_active_key_and_links_profile() {
        let dir = tempfile::tempdir().unwrap();
        let secrets_p = write_file(
            &dir,
            "secrets.json",
            &json!({ "api_key_custom": [
                { "id": "s-old", "value": "sk-old", "active": true },
            ] }),
        );
        let settings_p = write_file(
            &dir,
            "settings.json",
            &json!({ "connectionManager": { "profiles": [
                { "name": "work", "api-url": "old", "secret-id": "s-old" },
            ] } }),
        );
        let base = dir.path().to_str().unwrap();
        let ok = SillyTavernAdapter
            .apply(
                base,
                &ApplyRequest {
                    base_url: "https://st.test/v1",
                    api_key: "sk-new",
                    provider_name: Some("work"),
                    extra_fields: None,
                },
            )
            .unwrap();
        assert!(ok);

        let secrets = read_json(&secrets_p).unwrap().unwrap();
        let keys = secrets["api_key_custom"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0]["active"], false);
        assert_eq!(keys[1]["value"], "sk-new");
        assert_eq!(keys[1]["active"], true);
        let new_id = keys[1]["id"].as_str().unwrap().to_string();

        let settings = read_json(&settings_p).unwrap().unwrap();
        let profile = &settings["connectionManager"]["profiles"][0];
        assert_eq!(profile["api-url"], "https://st.test/v1");
        assert_eq!(profile["secret-id"], new_id.as_str());
        assert_eq!(settings["selected_proxy"]["url"], "https://st.test/v1");
        assert_eq!(settings["selected_proxy"]["password"], "sk-new");
    }

    #[test]
    fn sillytavern_apply_without_secrets_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "settings.json", &json!({}));
        let base = dir.path().to_str().unwrap();
        let ok = SillyTavernAdapter
            .apply(
                base,
                &ApplyRequest {
                    base_url: "https://st.test",
                    api_key: "sk",
                    provider_name: None,
                    extra_fields: None,
                },
            )
            .unwrap();
        assert!(!ok);
        // The proxy block is still refreshed for legacy installs.
        let settings = read_json(&format!("{}/settings.json", base)).unwrap().unwrap();
        assert_eq!(settings["selected_proxy"]["name"], "api-vault");
    }
}

