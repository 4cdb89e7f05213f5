use axum::{
    extract::Path,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::database::vendor::{Vendor, VendorKey, VendorKeyUpdateFields};
use crate::database::DbResult;
use crate::service::cipher::CIPHER;
use crate::service::sync::{SyncEngine, SyncOutcome};
use crate::utils::HttpResult;

use super::vendor::masked_from_enc;
use super::BaseError;

#[derive(Serialize)]
pub struct VendorKeyOut {
    pub id: i64,
    pub vendor_id: i64,
    pub label: String,
    pub api_key_masked: String,
    pub balance: Option<f64>,
    pub quota: Option<f64>,
    pub status: String,
    pub notes: String,
}

#[derive(Serialize)]
struct VendorKeyWithSync {
    #[serde(flatten)]
    key: VendorKeyOut,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sync: Vec<SyncOutcome>,
}

#[derive(Deserialize)]
struct CreateKeyRequest {
    vendor_id: i64,
    #[serde(default = "default_label")]
    label: String,
    api_key: String,
    #[serde(default)]
    notes: String,
}

fn default_label() -> String {
    "default".to_string()
}

#[derive(Deserialize)]
struct UpdateKeyRequest {
    label: Option<String>,
    api_key: Option<String>,
    balance: Option<f64>,
    quota: Option<f64>,
    status: Option<String>,
    notes: Option<String>,
}

#[derive(Serialize)]
struct RevealedKey {
    api_key: String,
}

fn build_key_out(key: VendorKey) -> Result<VendorKeyOut, BaseError> {
    Ok(VendorKeyOut {
        id: key.id,
        vendor_id: key.vendor_id,
        label: key.label,
        api_key_masked: masked_from_enc(&key.api_key_enc)?,
        balance: key.balance,
        quota: key.quota,
        status: key.status,
        notes: key.notes,
    })
}

async fn list_vendor_keys(Path(id): Path<i64>) -> DbResult<HttpResult<Vec<VendorKeyOut>>> {
    let keys = VendorKey::list_by_vendor(id)?;
    let result = keys
        .into_iter()
        .map(build_key_out)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResult::new(result))
}

async fn create_key(Json(payload): Json<CreateKeyRequest>) -> DbResult<HttpResult<VendorKeyOut>> {
    if payload.api_key.is_empty() {
        return Err(BaseError::ParamInvalid(Some(
            "api_key must not be empty".to_string(),
        )));
    }
    Vendor::find(payload.vendor_id)?;
    let token = CIPHER.encrypt(&payload.api_key)?;
    let key = VendorKey::new(payload.vendor_id, &payload.label, &token, &payload.notes);
    VendorKey::insert_one(&key)?;
    Ok(HttpResult::new(build_key_out(key)?))
}

async fn update_key(
    Path(id): Path<i64>,
    Json(payload): Json<UpdateKeyRequest>,
) -> DbResult<HttpResult<VendorKeyWithSync>> {
    let key_changed = payload.api_key.is_some();
    let api_key_enc = match &payload.api_key {
        Some(api_key) => Some(CIPHER.encrypt(api_key)?),
        None => None,
    };
    let key = VendorKey::update_fields(
        id,
        &VendorKeyUpdateFields {
            label: payload.label,
            api_key_enc,
            balance: payload.balance,
            quota: payload.quota,
            status: payload.status,
            notes: payload.notes,
        },
    )?;
    let sync = if key_changed {
        SyncEngine::global().sync_key_to_bindings(id)?
    } else {
        Vec::new()
    };
    Ok(HttpResult::new(VendorKeyWithSync {
        key: build_key_out(key)?,
        sync,
    }))
}

async fn delete_key(Path(id): Path<i64>) -> DbResult<HttpResult<()>> {
    VendorKey::find(id)?;
    VendorKey::delete_one(id)?;
    Ok(HttpResult::new(()))
}

async fn reveal_key(Path(id): Path<i64>) -> DbResult<HttpResult<RevealedKey>> {
    let key = VendorKey::find(id)?;
    Ok(HttpResult::new(RevealedKey {
        api_key: CIPHER.decrypt(&key.api_key_enc)?,
    }))
}

pub fn create_vendor_key_router() -> Router {
    Router::new()
        .route("/vendors/{id}/keys", get(list_vendor_keys))
        .route("/keys", post(create_key))
        .route("/keys/{id}", put(update_key))
        .route("/keys/{id}", delete(delete_key))
        .route("/keys/{id}/reveal", get(reveal_key))
}
