use serde_json::{json, Value};

use super::{
    home_dir, read_json, str_field, write_json, AdapterEntry, AdapterResult, AdapterState,
    ApplyRequest, ConfigAdapter,
};

/// Claw Code Router lists providers as an array under `Providers`:
///
/// ```json
/// { "Providers": [
///     { "name": "my-proxy", "api_base_url": "...", "api_key": "...", "models": [] }
/// ] }
/// ```
pub struct ClawCodeRouterAdapter;

impl ConfigAdapter for ClawCodeRouterAdapter {
    fn id(&self) -> &'static str {
        "claw_code_router"
    }

    fn label(&self) -> &'static str {
        "Claw Code Router"
    }

    fn default_config_path(&self) -> String {
        format!("{}/.claw-code-router/config.json", home_dir())
    }

    fn read_current(&self, path: &str) -> AdapterResult<Option<AdapterState>> {
        let Some(root) = read_json(path)? else {
            return Ok(None);
        };
        let providers = root.get("Providers").and_then(Value::as_array);
        let Some(providers) = providers.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        let mut state = AdapterState::default();
        for entry in providers {
            let Some(entry) = entry.as_object() else {
                continue;
            };
            let mut extra = serde_json::Map::new();
            if let Some(models) = entry.get("models") {
                extra.insert("models".to_string(), models.clone());
            }
            state.providers.push(AdapterEntry {
                provider_name: str_field(entry, "name"),
                base_url: str_field(entry, "api_base_url"),
                api_key: str_field(entry, "api_key"),
                extra,
            });
        }
        Ok(Some(state))
    }

    fn apply(&self, path: &str, request: &ApplyRequest) -> AdapterResult<bool> {
        let Some(mut root) = read_json(path)? else {
            return Ok(false);
        };
        let mut updated = false;
        if let Some(providers) = root.get_mut("Providers").and_then(Value::as_array_mut) {
            for entry in providers {
                let Some(entry) = entry.as_object_mut() else {
                    continue;
                };
                if let Some(target) = request.provider_name {
                    if entry.get("name").and_then(Value::as_str) != Some(target) {
                        continue;
                    }
                }
                entry.insert("api_base_url".to_string(), json!(request.base_url));
                entry.insert("api_key".to_string(), json!(request.api_key));
                updated = true;
            }
        }
        if !updated {
            return Ok(false);
        }
        write_json(path, &root)?;
        Ok(true)
    }
}
