use std::collections::HashMap;

use axum::{
    extract::Query,
    routing::get,
    Router,
};
use serde::Serialize;

use crate::database::provider::Provider;
use crate::database::request_log::{LogQueryPayload, RequestLog};
use crate::database::stat::{self, DailyUsage, GroupUsage, OverviewStats, UsageQuery};
use crate::database::vendor::{Vendor, VendorKey};
use crate::database::{DbResult, ListResult};
use crate::utils::HttpResult;

#[derive(Serialize)]
struct LogItem {
    id: i64,
    vendor_name: String,
    key_label: String,
    provider_name: String,
    adapter_id: String,
    model: String,
    input_tokens: i32,
    output_tokens: i32,
    cost: f64,
    status_code: i32,
    latency_ms: i32,
    created_at: i64,
}

async fn get_overview() -> DbResult<HttpResult<OverviewStats>> {
    Ok(HttpResult::new(stat::overview()?))
}

async fn get_usage(Query(query): Query<UsageQuery>) -> DbResult<HttpResult<Vec<DailyUsage>>> {
    Ok(HttpResult::new(stat::usage(&query)?))
}

async fn stats_by_vendor(
    Query(query): Query<UsageQuery>,
) -> DbResult<HttpResult<Vec<GroupUsage>>> {
    Ok(HttpResult::new(stat::by_vendor(&query)?))
}

async fn stats_by_model(
    Query(query): Query<UsageQuery>,
) -> DbResult<HttpResult<Vec<GroupUsage>>> {
    Ok(HttpResult::new(stat::by_model(&query)?))
}

async fn stats_by_key(Query(query): Query<UsageQuery>) -> DbResult<HttpResult<Vec<GroupUsage>>> {
    Ok(HttpResult::new(stat::by_key(&query)?))
}

async fn get_logs(
    Query(query): Query<LogQueryPayload>,
) -> DbResult<HttpResult<ListResult<LogItem>>> {
    let page = RequestLog::list(&query)?;
    let vendor_names: HashMap<i64, String> =
        Vendor::list()?.into_iter().map(|v| (v.id, v.name)).collect();
    let key_labels: HashMap<i64, String> = VendorKey::list()?
        .into_iter()
        .map(|k| (k.id, k.label))
        .collect();
    let provider_names: HashMap<i64, String> = Provider::list()?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let lookup = |map: &HashMap<i64, String>, id: Option<i64>| {
        id.and_then(|id| map.get(&id).cloned()).unwrap_or_default()
    };
    let items = page
        .list
        .into_iter()
        .map(|log| LogItem {
            vendor_name: lookup(&vendor_names, log.vendor_id),
            key_label: lookup(&key_labels, log.vendor_key_id),
            provider_name: lookup(&provider_names, log.provider_id),
            id: log.id,
            adapter_id: log.adapter_id,
            model: log.model,
            input_tokens: log.input_tokens,
            output_tokens: log.output_tokens,
            cost: log.cost,
            status_code: log.status_code,
            latency_ms: log.latency_ms,
            created_at: log.created_at,
        })
        .collect();
    Ok(HttpResult::new(ListResult::new(
        page.total,
        page.page,
        page.page_size,
        items,
    )))
}

pub fn create_stat_router() -> Router {
    Router::new()
        .route("/stats/overview", get(get_overview))
        .route("/stats/usage", get(get_usage))
        .route("/stats/by-vendor", get(stats_by_vendor))
        .route("/stats/by-model", get(stats_by_model))
        .route("/stats/by-key", get(stats_by_key))
        .route("/stats/logs", get(get_logs))
}
