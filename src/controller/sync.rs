use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::adapter::REGISTRY;
use crate::database::adapter::AdapterSetting;
use crate::database::binding::Binding;
use crate::database::provider::Provider;
use crate::database::vendor::{Vendor, VendorKey};
use crate::database::DbResult;
use crate::service::sync::{ImportedProvider, PushOutcome, SyncEngine};
use crate::utils::HttpResult;

#[derive(Deserialize)]
struct PushQuery {
    #[serde(default)]
    target_provider_name: String,
}

#[derive(Serialize)]
struct ImportResponse {
    imported: Vec<ImportedProvider>,
}

#[derive(Serialize)]
struct TopologyVendor {
    id: i64,
    name: String,
    domain: String,
    icon: String,
}

#[derive(Serialize)]
struct TopologyKey {
    id: i64,
    vendor_id: i64,
    label: String,
}

#[derive(Serialize)]
struct TopologyProvider {
    id: i64,
    vendor_id: i64,
    vendor_key_id: Option<i64>,
    name: String,
}

#[derive(Serialize)]
struct TopologyAdapter {
    id: String,
    label: String,
    icon: String,
    enabled: bool,
    services: Vec<String>,
}

#[derive(Serialize)]
struct TopologyBinding {
    id: i64,
    provider_id: i64,
    adapter_id: String,
    target_provider_name: String,
    auto_sync: bool,
    provider_name: String,
    vendor_id: Option<i64>,
    orphaned: bool,
}

#[derive(Serialize)]
struct Topology {
    vendors: Vec<TopologyVendor>,
    keys: Vec<TopologyKey>,
    providers: Vec<TopologyProvider>,
    adapters: Vec<TopologyAdapter>,
    bindings: Vec<TopologyBinding>,
}

async fn push_to_adapter(
    Path((adapter_id, provider_id)): Path<(String, i64)>,
    Query(query): Query<PushQuery>,
) -> DbResult<HttpResult<PushOutcome>> {
    let target = if query.target_provider_name.is_empty() {
        None
    } else {
        Some(query.target_provider_name.as_str())
    };
    let outcome = SyncEngine::global().push(&adapter_id, provider_id, target)?;
    Ok(HttpResult::new(outcome))
}

async fn import_from_adapter(
    Path(adapter_id): Path<String>,
) -> DbResult<HttpResult<ImportResponse>> {
    let imported = SyncEngine::global().import(&adapter_id)?;
    Ok(HttpResult::new(ImportResponse { imported }))
}

/// Everything the topology view needs in one round trip: the vault graph plus
/// what each adapter's config file currently serves.
async fn get_topology() -> DbResult<HttpResult<Topology>> {
    let vendors = Vendor::list()?;
    let keys = VendorKey::list()?;
    let providers = Provider::list()?;
    let bindings = Binding::list(None, None)?;
    let settings: HashMap<String, AdapterSetting> = AdapterSetting::all()?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    let mut adapters = Vec::new();
    let mut live: HashMap<String, HashSet<String>> = HashMap::new();
    for adapter in REGISTRY.iter() {
        let row = settings.get(adapter.id());
        let path = row
            .map(|r| r.config_path.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| adapter.default_config_path());
        let services: Vec<String> = match adapter.read_current(&path) {
            Ok(state) => state
                .map(|s| {
                    s.providers
                        .into_iter()
                        .map(|p| p.provider_name)
                        .filter(|n| !n.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            Err(err) => {
                warn!(adapter = adapter.id(), error = %err, "failed to read adapter config");
                Vec::new()
            }
        };
        live.insert(adapter.id().to_string(), services.iter().cloned().collect());
        adapters.push(TopologyAdapter {
            id: adapter.id().to_string(),
            label: adapter.label().to_string(),
            icon: row.map(|r| r.icon.clone()).unwrap_or_default(),
            enabled: row.map(|r| r.enabled).unwrap_or(true),
            services,
        });
    }

    let provider_info: HashMap<i64, (String, i64)> = providers
        .iter()
        .map(|p| (p.id, (p.name.clone(), p.vendor_id)))
        .collect();
    let bindings = bindings
        .into_iter()
        .map(|b| {
            let orphaned = !b.target_provider_name.is_empty()
                && !live
                    .get(&b.adapter_id)
                    .is_some_and(|s| s.contains(&b.target_provider_name));
            let info = provider_info.get(&b.provider_id);
            TopologyBinding {
                id: b.id,
                provider_id: b.provider_id,
                adapter_id: b.adapter_id,
                target_provider_name: b.target_provider_name,
                auto_sync: b.auto_sync,
                provider_name: info.map(|(name, _)| name.clone()).unwrap_or_default(),
                vendor_id: info.map(|(_, vid)| *vid),
                orphaned,
            }
        })
        .collect();

    Ok(HttpResult::new(Topology {
        vendors: vendors
            .into_iter()
            .map(|v| TopologyVendor {
                id: v.id,
                name: v.name,
                domain: v.domain,
                icon: v.icon,
            })
            .collect(),
        keys: keys
            .into_iter()
            .map(|k| TopologyKey {
                id: k.id,
                vendor_id: k.vendor_id,
                label: k.label,
            })
            .collect(),
        providers: providers
            .into_iter()
            .map(|p| TopologyProvider {
                id: p.id,
                vendor_id: p.vendor_id,
                vendor_key_id: p.vendor_key_id,
                name: p.name,
            })
            .collect(),
        adapters,
        bindings,
    }))
}

pub fn create_sync_router() -> Router {
    Router::new()
        .route("/push/{adapter_id}/{id}", post(push_to_adapter))
        .route("/import/{adapter_id}", post(import_from_adapter))
        .route("/topology", get(get_topology))
}
