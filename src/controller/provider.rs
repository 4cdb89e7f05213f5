use axum::{
    extract::Path,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::database::provider::{Provider, ProviderUpdateFields};
use crate::database::vendor::{Vendor, VendorKey};
use crate::database::DbResult;
use crate::service::sync::{SyncEngine, SyncOutcome};
use crate::utils::HttpResult;

use super::vendor::masked_from_enc;
use super::BaseError;

#[derive(Serialize)]
pub struct ProviderOut {
    pub id: i64,
    pub vendor_id: i64,
    pub vendor_name: String,
    pub vendor_key_id: Option<i64>,
    pub vendor_key_label: String,
    pub name: String,
    pub base_url: String,
    pub api_key_masked: String,
    pub extra_config: Option<String>,
    pub notes: String,
}

#[derive(Serialize)]
struct ProviderWithSync {
    #[serde(flatten)]
    provider: ProviderOut,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sync: Vec<SyncOutcome>,
}

#[derive(Deserialize)]
struct CreateProviderRequest {
    vendor_id: i64,
    vendor_key_id: Option<i64>,
    name: String,
    base_url: String,
    extra_config: Option<String>,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct UpdateProviderRequest {
    name: Option<String>,
    vendor_key_id: Option<Option<i64>>,
    base_url: Option<String>,
    extra_config: Option<Option<String>>,
    notes: Option<String>,
}

fn build_provider_out(provider: Provider) -> Result<ProviderOut, BaseError> {
    let vendor_name = match Vendor::find(provider.vendor_id) {
        Ok(vendor) => vendor.name,
        Err(BaseError::NotFound(_)) => String::new(),
        Err(err) => return Err(err),
    };
    let (key_label, masked) = match provider.vendor_key_id {
        None => (String::new(), "****".to_string()),
        Some(kid) => match VendorKey::find(kid) {
            Ok(key) => (key.label.clone(), masked_from_enc(&key.api_key_enc)?),
            Err(BaseError::NotFound(_)) => (String::new(), "****".to_string()),
            Err(err) => return Err(err),
        },
    };
    Ok(ProviderOut {
        id: provider.id,
        vendor_id: provider.vendor_id,
        vendor_name,
        vendor_key_id: provider.vendor_key_id,
        vendor_key_label: key_label,
        name: provider.name,
        base_url: provider.base_url,
        api_key_masked: masked,
        extra_config: provider.extra_config,
        notes: provider.notes,
    })
}

async fn list_providers() -> DbResult<HttpResult<Vec<ProviderOut>>> {
    let providers = Provider::list()?;
    let result = providers
        .into_iter()
        .map(build_provider_out)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResult::new(result))
}

async fn get_provider(Path(id): Path<i64>) -> DbResult<HttpResult<ProviderOut>> {
    let provider = Provider::find(id)?;
    Ok(HttpResult::new(build_provider_out(provider)?))
}

async fn create_provider(
    Json(payload): Json<CreateProviderRequest>,
) -> DbResult<HttpResult<ProviderOut>> {
    if payload.name.trim().is_empty() {
        return Err(BaseError::ParamInvalid(Some(
            "provider name must not be empty".to_string(),
        )));
    }
    Vendor::find(payload.vendor_id)?;
    if let Some(kid) = payload.vendor_key_id {
        VendorKey::find(kid)?;
    }
    let provider = Provider::new(
        payload.vendor_id,
        payload.vendor_key_id,
        payload.name.trim(),
        &payload.base_url,
        payload.extra_config,
        &payload.notes,
    );
    Provider::insert_one(&provider)?;
    Ok(HttpResult::new(build_provider_out(provider)?))
}

async fn update_provider(
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProviderRequest>,
) -> DbResult<HttpResult<ProviderWithSync>> {
    let needs_sync = payload.base_url.is_some()
        || payload.vendor_key_id.is_some()
        || payload.extra_config.is_some();
    if let Some(Some(kid)) = payload.vendor_key_id {
        VendorKey::find(kid)?;
    }
    let provider = Provider::update_fields(
        id,
        &ProviderUpdateFields {
            name: payload.name,
            vendor_key_id: payload.vendor_key_id,
            base_url: payload.base_url,
            extra_config: payload.extra_config,
            notes: payload.notes,
        },
    )?;
    let sync = if needs_sync {
        SyncEngine::global().sync_provider_to_bindings(id)?
    } else {
        Vec::new()
    };
    Ok(HttpResult::new(ProviderWithSync {
        provider: build_provider_out(provider)?,
        sync,
    }))
}

async fn delete_provider(Path(id): Path<i64>) -> DbResult<HttpResult<()>> {
    Provider::find(id)?;
    Provider::delete_cascade(id)?;
    Ok(HttpResult::new(()))
}

pub fn create_provider_router() -> Router {
    Router::new()
        .route("/providers", get(list_providers))
        .route("/providers", post(create_provider))
        .route("/providers/{id}", get(get_provider))
        .route("/providers/{id}", put(update_provider))
        .route("/providers/{id}", delete(delete_provider))
}
