use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::adapter::REGISTRY;
use crate::database::binding::Binding;
use crate::database::provider::Provider;
use crate::database::DbResult;
use crate::service::sync::SyncEngine;
use crate::utils::HttpResult;

use super::BaseError;

#[derive(Serialize)]
pub struct BindingOut {
    pub id: i64,
    pub provider_id: i64,
    pub provider_name: String,
    pub adapter_id: String,
    pub adapter_label: String,
    pub target_provider_name: String,
    pub auto_sync: bool,
    pub orphaned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Deserialize)]
struct BindingsQuery {
    provider_id: Option<i64>,
    adapter_id: Option<String>,
}

#[derive(Deserialize)]
struct CreateBindingRequest {
    provider_id: i64,
    adapter_id: String,
    #[serde(default)]
    target_provider_name: String,
    #[serde(default = "default_auto_sync")]
    auto_sync: bool,
}

fn default_auto_sync() -> bool {
    true
}

#[derive(Deserialize)]
struct UpdateBindingRequest {
    auto_sync: bool,
}

fn adapter_label(adapter_id: &str) -> String {
    REGISTRY
        .get(adapter_id)
        .map(|a| a.label().to_string())
        .unwrap_or_default()
}

async fn list_bindings(
    Query(query): Query<BindingsQuery>,
) -> DbResult<HttpResult<Vec<BindingOut>>> {
    let status = SyncEngine::global()
        .bindings_with_status(query.provider_id, query.adapter_id.as_deref())?;
    let provider_names: HashMap<i64, String> = Provider::list()?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let result = status
        .into_iter()
        .map(|s| BindingOut {
            provider_name: provider_names
                .get(&s.binding.provider_id)
                .cloned()
                .unwrap_or_default(),
            adapter_label: adapter_label(&s.binding.adapter_id),
            id: s.binding.id,
            provider_id: s.binding.provider_id,
            adapter_id: s.binding.adapter_id,
            target_provider_name: s.binding.target_provider_name,
            auto_sync: s.binding.auto_sync,
            orphaned: s.orphaned,
            warning: None,
        })
        .collect();
    Ok(HttpResult::new(result))
}

async fn create_binding(
    Json(payload): Json<CreateBindingRequest>,
) -> DbResult<HttpResult<BindingOut>> {
    let provider = Provider::find(payload.provider_id)?;
    if REGISTRY.get(&payload.adapter_id).is_none() {
        return Err(BaseError::NotFound(Some("adapter not found".to_string())));
    }
    if let Some(owner) = Binding::endpoint_owner(&payload.adapter_id, &payload.target_provider_name)? {
        let holder = Provider::find(owner.provider_id)
            .map(|p| p.name)
            .unwrap_or_default();
        return Err(BaseError::Conflict(Some(format!(
            "endpoint '{}' on {} is already bound to provider '{}'",
            payload.target_provider_name, payload.adapter_id, holder
        ))));
    }

    // Soft check: warn when the target does not exist in the client config,
    // the binding is still created.
    let mut warning = None;
    if !payload.target_provider_name.is_empty() {
        if let Some(live) = SyncEngine::global().live_endpoints(&payload.adapter_id)? {
            if !live.is_empty() && !live.contains(&payload.target_provider_name) {
                warning = Some(format!(
                    "target '{}' not present in {} config; pushes may have no effect",
                    payload.target_provider_name, payload.adapter_id
                ));
            }
        }
    }

    let binding = Binding::new(
        payload.provider_id,
        &payload.adapter_id,
        &payload.target_provider_name,
        payload.auto_sync,
    );
    Binding::insert_one(&binding)?;
    Ok(HttpResult::new(BindingOut {
        id: binding.id,
        provider_id: binding.provider_id,
        provider_name: provider.name,
        adapter_label: adapter_label(&binding.adapter_id),
        adapter_id: binding.adapter_id,
        target_provider_name: binding.target_provider_name,
        auto_sync: binding.auto_sync,
        orphaned: false,
        warning,
    }))
}

async fn update_binding(
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBindingRequest>,
) -> DbResult<HttpResult<Binding>> {
    let binding = Binding::set_auto_sync(id, payload.auto_sync)?;
    Ok(HttpResult::new(binding))
}

async fn delete_binding(Path(id): Path<i64>) -> DbResult<HttpResult<()>> {
    Binding::delete_one(id)?;
    Ok(HttpResult::new(()))
}

pub fn create_binding_router() -> Router {
    Router::new()
        .route("/bindings", get(list_bindings))
        .route("/bindings", post(create_binding))
        .route("/bindings/{id}", patch(update_binding))
        .route("/bindings/{id}", delete(delete_binding))
}
