use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;

use crate::utils::ID_GENERATOR;
use crate::{db_execute, db_object};

use super::{get_connection, DbResult, ListResult};

db_object! {
    #[derive(Queryable, Insertable, Debug)]
    #[diesel(table_name = request_logs)]
    pub struct RequestLog {
        pub id: i64,
        pub vendor_id: Option<i64>,
        pub vendor_key_id: Option<i64>,
        pub provider_id: Option<i64>,
        pub adapter_id: String,
        pub model: String,
        pub input_tokens: i32,
        pub output_tokens: i32,
        pub cost: f64,
        pub status_code: i32,
        pub latency_ms: i32,
        pub created_at: i64,
    }
}

fn default_status_code() -> i32 {
    200
}

/// Usage report posted by a downstream client or proxy.
#[derive(Debug, Deserialize)]
pub struct NewLogEntry {
    pub vendor_id: Option<i64>,
    pub vendor_key_id: Option<i64>,
    pub provider_id: Option<i64>,
    #[serde(default)]
    pub adapter_id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub input_tokens: i32,
    #[serde(default)]
    pub output_tokens: i32,
    #[serde(default)]
    pub cost: f64,
    #[serde(default = "default_status_code")]
    pub status_code: i32,
    #[serde(default)]
    pub latency_ms: i32,
}

#[derive(Debug, Deserialize)]
pub struct LogQueryPayload {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    pub vendor_id: Option<i64>,
    pub vendor_key_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub model: Option<String>,
}

impl RequestLog {
    pub fn from_entry(entry: &NewLogEntry) -> Self {
        Self {
            id: ID_GENERATOR.generate_id(),
            vendor_id: entry.vendor_id,
            vendor_key_id: entry.vendor_key_id,
            provider_id: entry.provider_id,
            adapter_id: entry.adapter_id.clone(),
            model: entry.model.clone(),
            input_tokens: entry.input_tokens,
            output_tokens: entry.output_tokens,
            cost: entry.cost,
            status_code: entry.status_code,
            latency_ms: entry.latency_ms,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn insert_one(log: &RequestLog) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::insert_into(request_logs::table)
                .values(RequestLogDb::to_db(log))
                .execute(conn)?;
            Ok(())
        })
    }

    pub fn insert_batch(logs: &[RequestLog]) -> DbResult<usize> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let rows: Vec<RequestLogDb> = logs.iter().map(RequestLogDb::to_db).collect();
            let count = diesel::insert_into(request_logs::table)
                .values(&rows)
                .execute(conn)?;
            Ok(count)
        })
    }

    pub fn list(payload: &LogQueryPayload) -> DbResult<ListResult<RequestLog>> {
        let page = payload.page.unwrap_or(1).max(1);
        let page_size = payload.limit.unwrap_or(50).clamp(1, 500);
        let conn = &mut get_connection();
        db_execute!(conn, {
            let mut query = request_logs::table.into_boxed();
            let mut count_query = request_logs::table.into_boxed();
            if let Some(vid) = payload.vendor_id {
                query = query.filter(request_logs::dsl::vendor_id.eq(vid));
                count_query = count_query.filter(request_logs::dsl::vendor_id.eq(vid));
            }
            if let Some(kid) = payload.vendor_key_id {
                query = query.filter(request_logs::dsl::vendor_key_id.eq(kid));
                count_query = count_query.filter(request_logs::dsl::vendor_key_id.eq(kid));
            }
            if let Some(pid) = payload.provider_id {
                query = query.filter(request_logs::dsl::provider_id.eq(pid));
                count_query = count_query.filter(request_logs::dsl::provider_id.eq(pid));
            }
            if let Some(model) = &payload.model {
                let pattern = format!("%{}%", model);
                query = query.filter(request_logs::dsl::model.like(pattern.clone()));
                count_query = count_query.filter(request_logs::dsl::model.like(pattern));
            }
            let total = count_query
                .select(diesel::dsl::count(request_logs::dsl::id))
                .first::<i64>(conn)?;
            let list = query
                .order(request_logs::dsl::created_at.desc())
                .offset((page - 1) * page_size)
                .limit(page_size)
                .load::<RequestLogDb>(conn)?;
            Ok(ListResult::new(
                total,
                page,
                page_size,
                list.into_iter().map(|db| db.from_db()).collect(),
            ))
        })
    }
}
