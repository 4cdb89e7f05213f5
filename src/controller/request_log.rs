use axum::{routing::post, Json, Router};
use serde::Serialize;

use crate::database::request_log::{NewLogEntry, RequestLog};
use crate::database::DbResult;
use crate::utils::HttpResult;

#[derive(Serialize)]
struct IngestedBatch {
    count: usize,
}

async fn ingest_log(Json(entry): Json<NewLogEntry>) -> DbResult<HttpResult<()>> {
    RequestLog::insert_one(&RequestLog::from_entry(&entry))?;
    Ok(HttpResult::new(()))
}

async fn ingest_batch(
    Json(entries): Json<Vec<NewLogEntry>>,
) -> DbResult<HttpResult<IngestedBatch>> {
    let logs: Vec<RequestLog> = entries.iter().map(RequestLog::from_entry).collect();
    let count = RequestLog::insert_batch(&logs)?;
    Ok(HttpResult::new(IngestedBatch { count }))
}

pub fn create_log_router() -> Router {
    Router::new()
        .route("/logs/ingest", post(ingest_log))
        .route("/logs/ingest/batch", post(ingest_batch))
}
