use axum::{
    extract::Path,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapter::REGISTRY;
use crate::database::adapter::AdapterSetting;
use crate::database::DbResult;
use crate::utils::{mask_key, HttpResult};

use super::BaseError;

#[derive(Serialize)]
pub struct AdapterOut {
    pub id: String,
    pub label: String,
    pub config_path: String,
    pub icon: String,
    pub enabled: bool,
}

#[derive(Deserialize)]
struct UpdateAdapterRequest {
    config_path: Option<String>,
    icon: Option<String>,
    enabled: Option<bool>,
}

#[derive(Serialize)]
struct CurrentEntry {
    provider_name: String,
    base_url: String,
    api_key_masked: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    extra: Map<String, Value>,
}

#[derive(Serialize)]
struct CurrentState {
    providers: Vec<CurrentEntry>,
}

/// Registry is the source of truth for which adapters exist; the settings
/// table only overrides path, icon and enabled.
async fn list_adapters() -> DbResult<HttpResult<Vec<AdapterOut>>> {
    let rows: std::collections::HashMap<String, AdapterSetting> = AdapterSetting::all()?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();
    let result = REGISTRY
        .iter()
        .map(|adapter| {
            let row = rows.get(adapter.id());
            AdapterOut {
                id: adapter.id().to_string(),
                label: adapter.label().to_string(),
                config_path: row
                    .map(|r| r.config_path.clone())
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| adapter.default_config_path()),
                icon: row.map(|r| r.icon.clone()).unwrap_or_default(),
                enabled: row.map(|r| r.enabled).unwrap_or(true),
            }
        })
        .collect();
    Ok(HttpResult::new(result))
}

async fn update_adapter(
    Path(id): Path<String>,
    Json(payload): Json<UpdateAdapterRequest>,
) -> DbResult<HttpResult<AdapterOut>> {
    let adapter = REGISTRY
        .get(&id)
        .ok_or(BaseError::NotFound(Some("adapter not found".to_string())))?;
    let row = AdapterSetting::find(&id)?;
    let setting = AdapterSetting {
        id: id.clone(),
        label: adapter.label().to_string(),
        config_path: payload
            .config_path
            .or_else(|| row.as_ref().map(|r| r.config_path.clone()))
            .unwrap_or_default(),
        icon: payload
            .icon
            .or_else(|| row.as_ref().map(|r| r.icon.clone()))
            .unwrap_or_default(),
        enabled: payload
            .enabled
            .or(row.as_ref().map(|r| r.enabled))
            .unwrap_or(true),
    };
    AdapterSetting::upsert(&setting)?;
    Ok(HttpResult::new(AdapterOut {
        config_path: if setting.config_path.is_empty() {
            adapter.default_config_path()
        } else {
            setting.config_path.clone()
        },
        id: setting.id,
        label: setting.label,
        icon: setting.icon,
        enabled: setting.enabled,
    }))
}

/// What the adapter's config file currently contains, credentials masked.
async fn read_adapter_current(Path(id): Path<String>) -> DbResult<HttpResult<CurrentState>> {
    let adapter = REGISTRY
        .get(&id)
        .ok_or(BaseError::NotFound(Some("adapter not found".to_string())))?;
    let path = AdapterSetting::config_path_or_default(adapter)?;
    let state = adapter.read_current(&path)?;
    let providers = state
        .map(|s| {
            s.providers
                .into_iter()
                .map(|p| CurrentEntry {
                    provider_name: p.provider_name,
                    base_url: p.base_url,
                    api_key_masked: mask_key(&p.api_key),
                    extra: p.extra,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(HttpResult::new(CurrentState { providers }))
}

pub fn create_adapter_router() -> Router {
    Router::new()
        .route("/adapters", get(list_adapters))
        .route("/adapters/{id}", put(update_adapter))
        .route("/adapters/{id}/current", get(read_adapter_current))
}
