use chrono::Local;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{
    home_dir, read_json, str_field, write_json, AdapterEntry, AdapterResult, AdapterState,
    ApplyRequest, ConfigAdapter,
};

/// SillyTavern splits state across a user data directory: `secrets.json`
/// holds the key ring (`api_key_custom`), `settings.json` holds connection
/// profiles that reference keys by `secret-id`. Older installs carry a single
/// `selected_proxy` block instead of profiles.
pub struct SillyTavernAdapter;

fn secrets_path(base: &str) -> String {
    format!("{}/secrets.json", base)
}

fn settings_path(base: &str) -> String {
    format!("{}/settings.json", base)
}

fn key_by_secret_id(secrets: &Value, secret_id: &str) -> String {
    secrets
        .get("api_key_custom")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .find(|k| k.get("id").and_then(Value::as_str) == Some(secret_id))
        .map(|k| str_field(k, "value"))
        .unwrap_or_default()
}

/// Profiles live either at the top level or under `extension_settings`.
fn connection_manager(settings: &Value) -> Option<&Value> {
    let top = settings
        .get("connectionManager")
        .filter(|cm| cm.as_object().is_some_and(|o| !o.is_empty()));
    top.or_else(|| {
        settings
            .get("extension_settings")
            .and_then(|e| e.get("connectionManager"))
    })
}

fn profiles_mut(settings: &mut Value) -> Option<&mut Vec<Value>> {
    let top_populated = settings
        .get("connectionManager")
        .is_some_and(|cm| cm.as_object().is_some_and(|o| !o.is_empty()));
    let cm = if top_populated {
        settings.get_mut("connectionManager")
    } else {
        settings
            .get_mut("extension_settings")
            .and_then(|e| e.get_mut("connectionManager"))
    };
    cm.and_then(|cm| cm.get_mut("profiles"))
        .and_then(Value::as_array_mut)
}

impl ConfigAdapter for SillyTavernAdapter {
    fn id(&self) -> &'static str {
        "sillytavern"
    }

    fn label(&self) -> &'static str {
        "SillyTavern"
    }

    fn default_config_path(&self) -> String {
        format!("{}/SillyTavern/data/default-user", home_dir())
    }

    fn read_current(&self, path: &str) -> AdapterResult<Option<AdapterState>> {
        let secrets = read_json(&secrets_path(path))?.unwrap_or_else(|| json!({}));
        let settings = read_json(&settings_path(path))?.unwrap_or_else(|| json!({}));

        let mut state = AdapterState::default();
        let profiles = connection_manager(&settings)
            .and_then(|cm| cm.get("profiles"))
            .and_then(Value::as_array);
        for profile in profiles.into_iter().flatten() {
            let Some(profile) = profile.as_object() else {
                continue;
            };
            let name = str_field(profile, "name");
            let secret_id = str_field(profile, "secret-id");
            let api_key = if secret_id.is_empty() {
                String::new()
            } else {
                key_by_secret_id(&secrets, &secret_id)
            };
            let mut extra = Map::new();
            for key in ["model", "preset"] {
                if let Some(value) = profile.get(key) {
                    extra.insert(key.to_string(), value.clone());
                }
            }
            state.providers.push(AdapterEntry {
                provider_name: if name.is_empty() {
                    "default".to_string()
                } else {
                    name
                },
                base_url: str_field(profile, "api-url"),
                api_key,
                extra,
            });
        }
        if !state.providers.is_empty() {
            return Ok(Some(state));
        }

        // Legacy layout: one active key plus a selected_proxy block.
        let keys = secrets.get("api_key_custom").and_then(Value::as_array);
        let api_key = keys
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .find(|k| k.get("active").and_then(Value::as_bool).unwrap_or(false))
            .or_else(|| {
                secrets
                    .get("api_key_custom")
                    .and_then(Value::as_array)
                    .and_then(|k| k.first())
                    .and_then(Value::as_object)
            })
            .map(|k| str_field(k, "value"))
            .unwrap_or_default();
        if api_key.is_empty() {
            return Ok(None);
        }
        let base_url = settings
            .get("selected_proxy")
            .and_then(|p| p.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut extra = Map::new();
        if let Some(main_api) = settings.get("main_api") {
            extra.insert("main_api".to_string(), main_api.clone());
        }
        state.providers.push(AdapterEntry {
            provider_name: "default".to_string(),
            base_url,
            api_key,
            extra,
        });
        Ok(Some(state))
    }

    /// Activates the key in `secrets.json` (inserting it when new), points the
    /// named profile at it, and always refreshes `selected_proxy` so legacy
    /// installs pick the change up too. Reports failure only when the key ring
    /// is missing.
    fn apply(&self, path: &str, request: &ApplyRequest) -> AdapterResult<bool> {
        let secrets_p = secrets_path(path);
        let mut secret_id = String::new();
        let mut ok = true;

        match read_json(&secrets_p)? {
            Some(mut secrets) => {
                let keys = secrets
                    .as_object_mut()
                    .map(|o| o.entry("api_key_custom").or_insert_with(|| json!([])))
                    .and_then(Value::as_array_mut);
                if let Some(keys) = keys {
                    for key in keys.iter_mut() {
                        if let Some(key) = key.as_object_mut() {
                            key.insert("active".to_string(), json!(false));
                        }
                    }
                    let found = keys.iter().position(|k| {
                        k.get("value").and_then(Value::as_str) == Some(request.api_key)
                    });
                    match found {
                        Some(idx) => {
                            if let Some(key) = keys[idx].as_object_mut() {
                                key.insert("active".to_string(), json!(true));
                                secret_id = str_field(key, "id");
                            }
                        }
                        None => {
                            secret_id = Uuid::new_v4().to_string();
                            keys.push(json!({
                                "id": secret_id.clone(),
                                "value": request.api_key,
                                "label": Local::now().format("%m/%d/%Y %I:%M %p").to_string(),
                                "active": true,
                            }));
                        }
                    }
                }
                write_json(&secrets_p, &secrets)?;
            }
            None => ok = false,
        }

        let settings_p = settings_path(path);
        if let Some(mut settings) = read_json(&settings_p)? {
            if let Some(target) = request.provider_name {
                if let Some(profiles) = profiles_mut(&mut settings) {
                    for profile in profiles.iter_mut() {
                        let Some(profile) = profile.as_object_mut() else {
                            continue;
                        };
                        if profile.get("name").and_then(Value::as_str) != Some(target) {
                            continue;
                        }
                        profile.insert("api-url".to_string(), json!(request.base_url));
                        if !secret_id.is_empty() {
                            profile.insert("secret-id".to_string(), json!(secret_id));
                        }
                        break;
                    }
                }
            }
            if !request.base_url.is_empty() {
                if let Some(settings) = settings.as_object_mut() {
                    settings.insert(
                        "selected_proxy".to_string(),
                        json!({
                            "name": request.provider_name.unwrap_or("api-vault"),
                            "url": request.base_url,
                            "password": request.api_key,
                        }),
                    );
                }
            }
            write_json(&settings_p, &settings)?;
        }
        Ok(ok)
    }
}
