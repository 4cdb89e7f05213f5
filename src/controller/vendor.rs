use std::collections::HashMap;

use axum::{
    extract::Path,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::database::provider::Provider;
use crate::database::vendor::{Vendor, VendorKey, VendorUpdateFields};
use crate::database::DbResult;
use crate::service::cipher::CIPHER;
use crate::service::sync::{SyncEngine, SyncOutcome};
use crate::utils::{mask_key, HttpResult};

use super::BaseError;

#[derive(Serialize)]
pub struct VendorKeyNested {
    pub id: i64,
    pub label: String,
    pub api_key_masked: String,
    pub balance: Option<f64>,
    pub quota: Option<f64>,
    pub status: String,
    pub notes: String,
}

#[derive(Serialize)]
pub struct ProviderNested {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    pub vendor_key_id: Option<i64>,
    pub vendor_key_label: String,
    pub notes: String,
}

#[derive(Serialize)]
pub struct VendorOut {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub icon: String,
    pub notes: String,
    pub keys: Vec<VendorKeyNested>,
    pub providers: Vec<ProviderNested>,
}

#[derive(Serialize)]
struct VendorWithSync {
    #[serde(flatten)]
    vendor: VendorOut,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sync: Vec<SyncOutcome>,
}

#[derive(Deserialize)]
struct CreateVendorRequest {
    name: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    notes: String,
}

pub(super) fn masked_from_enc(api_key_enc: &str) -> Result<String, BaseError> {
    if api_key_enc.is_empty() {
        return Ok("****".to_string());
    }
    Ok(mask_key(&CIPHER.decrypt(api_key_enc)?))
}

pub(super) fn build_vendor_out(vendor: Vendor) -> Result<VendorOut, BaseError> {
    let keys = VendorKey::list_by_vendor(vendor.id)?;
    let providers = Provider::list_by_vendor(vendor.id)?;
    let key_labels: HashMap<i64, String> =
        keys.iter().map(|k| (k.id, k.label.clone())).collect();

    let keys = keys
        .into_iter()
        .map(|k| {
            Ok(VendorKeyNested {
                id: k.id,
                label: k.label,
                api_key_masked: masked_from_enc(&k.api_key_enc)?,
                balance: k.balance,
                quota: k.quota,
                status: k.status,
                notes: k.notes,
            })
        })
        .collect::<Result<Vec<_>, BaseError>>()?;
    let providers = providers
        .into_iter()
        .map(|p| ProviderNested {
            vendor_key_label: p
                .vendor_key_id
                .and_then(|kid| key_labels.get(&kid).cloned())
                .unwrap_or_default(),
            id: p.id,
            name: p.name,
            base_url: p.base_url,
            vendor_key_id: p.vendor_key_id,
            notes: p.notes,
        })
        .collect();

    Ok(VendorOut {
        id: vendor.id,
        name: vendor.name,
        domain: vendor.domain,
        icon: vendor.icon,
        notes: vendor.notes,
        keys,
        providers,
    })
}

async fn list_vendors() -> DbResult<HttpResult<Vec<VendorOut>>> {
    let vendors = Vendor::list()?;
    let result = vendors
        .into_iter()
        .map(build_vendor_out)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResult::new(result))
}

async fn get_vendor(Path(id): Path<i64>) -> DbResult<HttpResult<VendorOut>> {
    let vendor = Vendor::find(id)?;
    Ok(HttpResult::new(build_vendor_out(vendor)?))
}

async fn create_vendor(
    Json(payload): Json<CreateVendorRequest>,
) -> DbResult<HttpResult<VendorOut>> {
    if payload.name.trim().is_empty() {
        return Err(BaseError::ParamInvalid(Some(
            "vendor name must not be empty".to_string(),
        )));
    }
    let vendor = Vendor::new(
        payload.name.trim(),
        &payload.domain,
        &payload.icon,
        &payload.notes,
    );
    Vendor::insert_one(&vendor)?;
    Ok(HttpResult::new(build_vendor_out(vendor)?))
}

async fn update_vendor(
    Path(id): Path<i64>,
    Json(payload): Json<VendorUpdateFields>,
) -> DbResult<HttpResult<VendorWithSync>> {
    let domain_changed = payload.domain.is_some();
    let vendor = Vendor::update_fields(id, &payload)?;
    // A domain change can shift which endpoints downstream configs should
    // point at; refresh every auto-sync binding under this vendor.
    let sync = if domain_changed {
        SyncEngine::global().sync_vendor_to_bindings(id)?
    } else {
        Vec::new()
    };
    Ok(HttpResult::new(VendorWithSync {
        vendor: build_vendor_out(vendor)?,
        sync,
    }))
}

async fn delete_vendor(Path(id): Path<i64>) -> DbResult<HttpResult<()>> {
    Vendor::find(id)?;
    Vendor::delete_cascade(id)?;
    Ok(HttpResult::new(()))
}

pub fn create_vendor_router() -> Router {
    Router::new()
        .route("/vendors", get(list_vendors))
        .route("/vendors", post(create_vendor))
        .route("/vendors/{id}", get(get_vendor))
        .route("/vendors/{id}", put(update_vendor))
        .route("/vendors/{id}", delete(delete_vendor))
}
