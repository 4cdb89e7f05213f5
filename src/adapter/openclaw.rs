use serde_json::{json, Map, Value};

use super::{
    home_dir, read_json, str_field, write_json, AdapterEntry, AdapterResult, AdapterState,
    ApplyRequest, ConfigAdapter,
};

/// OpenClaw keeps providers under `models.providers`, keyed by name:
///
/// ```json
/// { "models": { "providers": {
///     "my-proxy": { "baseUrl": "...", "apiKey": "...", "api": "openai", "models": [] }
/// } } }
/// ```
pub struct OpenClawAdapter;

fn update_entry(entry: &mut Map<String, Value>, request: &ApplyRequest) {
    entry.insert("baseUrl".to_string(), json!(request.base_url));
    entry.insert("apiKey".to_string(), json!(request.api_key));
    if let Some(api) = request.extra_fields.and_then(|extra| extra.get("api")) {
        entry.insert("api".to_string(), api.clone());
    }
}

impl ConfigAdapter for OpenClawAdapter {
    fn id(&self) -> &'static str {
        "openclaw"
    }

    fn label(&self) -> &'static str {
        "OpenClaw"
    }

    fn default_config_path(&self) -> String {
        format!("{}/.openclaw/openclaw.json", home_dir())
    }

    fn read_current(&self, path: &str) -> AdapterResult<Option<AdapterState>> {
        let Some(root) = read_json(path)? else {
            return Ok(None);
        };
        let providers = root
            .get("models")
            .and_then(|m| m.get("providers"))
            .and_then(Value::as_object);
        let Some(providers) = providers.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        let mut state = AdapterState::default();
        for (name, entry) in providers {
            let Some(entry) = entry.as_object() else {
                continue;
            };
            let mut extra = Map::new();
            if let Some(api) = entry.get("api") {
                extra.insert("api".to_string(), api.clone());
            }
            if let Some(models) = entry.get("models").and_then(Value::as_array) {
                let ids: Vec<Value> = models
                    .iter()
                    .filter_map(|m| m.get("id"))
                    .cloned()
                    .collect();
                extra.insert("models".to_string(), Value::Array(ids));
            }
            state.providers.push(AdapterEntry {
                provider_name: name.clone(),
                base_url: str_field(entry, "baseUrl"),
                api_key: str_field(entry, "apiKey"),
                extra,
            });
        }
        Ok(Some(state))
    }

    /// Refuses to write when the config file does not exist, or when a named
    /// target is not already present in it.
    fn apply(&self, path: &str, request: &ApplyRequest) -> AdapterResult<bool> {
        let Some(mut root) = read_json(path)? else {
            return Ok(false);
        };
        let providers = root
            .as_object_mut()
            .map(|o| o.entry("models").or_insert_with(|| json!({})))
            .and_then(Value::as_object_mut)
            .map(|o| o.entry("providers").or_insert_with(|| json!({})))
            .and_then(Value::as_object_mut);
        let Some(providers) = providers else {
            return Ok(false);
        };

        match request.provider_name {
            Some(name) => match providers.get_mut(name).and_then(Value::as_object_mut) {
                Some(entry) => update_entry(entry, request),
                None => return Ok(false),
            },
            None => {
                for entry in providers.values_mut() {
                    if let Some(entry) = entry.as_object_mut() {
                        update_entry(entry, request);
                    }
                }
            }
        }
        write_json(path, &root)?;
        Ok(true)
    }
}
