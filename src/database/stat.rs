use std::collections::{BTreeMap, HashMap};

use chrono::{TimeZone, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db_execute;

use super::{get_connection, DbResult};

// `db_execute!` glob-imports these model modules; this module defines its
// rows as plain tuples, so they are empty.
mod _postgres_model {}
mod _sqlite_model {}

#[derive(Debug, Serialize)]
pub struct OverviewStats {
    pub vendors: i64,
    pub keys: i64,
    pub keys_active: i64,
    pub providers: i64,
    pub bindings: i64,
    pub adapters: i64,
    pub total_requests: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_cost: f64,
}

#[derive(Debug, Serialize)]
pub struct DailyUsage {
    pub day: String,
    pub requests: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost: f64,
}

#[derive(Debug, Serialize)]
pub struct GroupUsage {
    pub name: String,
    pub requests: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost: f64,
}

fn default_range() -> String {
    "7d".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    #[serde(default = "default_range")]
    pub range: String,
    pub vendor_id: Option<i64>,
    pub vendor_key_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub adapter_id: Option<String>,
}

/// `"1d"`, `"7d"`, `"30d"` or `"all"`; anything else falls back to 7 days.
fn range_cutoff_millis(range: &str) -> Option<i64> {
    let days = match range {
        "all" => return None,
        "1d" => 1,
        "30d" => 30,
        _ => 7,
    };
    Some(Utc::now().timestamp_millis() - days * 86_400_000)
}

fn day_of(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d").to_string(),
        _ => "unknown".to_string(),
    }
}

// (vendor_id, vendor_key_id, provider_id, model, input, output, cost, created_at)
type LogRow = (
    Option<i64>,
    Option<i64>,
    Option<i64>,
    String,
    i32,
    i32,
    f64,
    i64,
);

fn load_rows(query: &UsageQuery) -> DbResult<Vec<LogRow>> {
    let cutoff = range_cutoff_millis(&query.range);
    let conn = &mut get_connection();
    db_execute!(conn, {
        let mut q = request_logs::table.into_boxed();
        if let Some(cutoff) = cutoff {
            q = q.filter(request_logs::dsl::created_at.ge(cutoff));
        }
        if let Some(vid) = query.vendor_id {
            q = q.filter(request_logs::dsl::vendor_id.eq(vid));
        }
        if let Some(kid) = query.vendor_key_id {
            q = q.filter(request_logs::dsl::vendor_key_id.eq(kid));
        }
        if let Some(pid) = query.provider_id {
            q = q.filter(request_logs::dsl::provider_id.eq(pid));
        }
        if let Some(aid) = &query.adapter_id {
            q = q.filter(request_logs::dsl::adapter_id.eq(aid.to_string()));
        }
        let rows = q
            .select((
                request_logs::dsl::vendor_id,
                request_logs::dsl::vendor_key_id,
                request_logs::dsl::provider_id,
                request_logs::dsl::model,
                request_logs::dsl::input_tokens,
                request_logs::dsl::output_tokens,
                request_logs::dsl::cost,
                request_logs::dsl::created_at,
            ))
            .load::<LogRow>(conn)?;
        Ok(rows)
    })
}

pub fn overview() -> DbResult<OverviewStats> {
    let conn = &mut get_connection();
    db_execute!(conn, {
        let vendors = vendors::table
            .select(diesel::dsl::count(vendors::dsl::id))
            .first::<i64>(conn)?;
        let keys = vendor_keys::table
            .select(diesel::dsl::count(vendor_keys::dsl::id))
            .first::<i64>(conn)?;
        let keys_active = vendor_keys::table
            .filter(vendor_keys::dsl::status.eq("active"))
            .select(diesel::dsl::count(vendor_keys::dsl::id))
            .first::<i64>(conn)?;
        let providers = providers::table
            .select(diesel::dsl::count(providers::dsl::id))
            .first::<i64>(conn)?;
        let bindings = bindings::table
            .select(diesel::dsl::count(bindings::dsl::id))
            .first::<i64>(conn)?;
        let adapters = adapters::table
            .filter(adapters::dsl::enabled.eq(true))
            .select(diesel::dsl::count(adapters::dsl::id))
            .first::<i64>(conn)?;
        let total_requests = request_logs::table
            .select(diesel::dsl::count(request_logs::dsl::id))
            .first::<i64>(conn)?;
        let total_input_tokens = request_logs::table
            .select(diesel::dsl::sum(request_logs::dsl::input_tokens))
            .first::<Option<i64>>(conn)?
            .unwrap_or(0);
        let total_output_tokens = request_logs::table
            .select(diesel::dsl::sum(request_logs::dsl::output_tokens))
            .first::<Option<i64>>(conn)?
            .unwrap_or(0);
        let total_cost = request_logs::table
            .select(diesel::dsl::sum(request_logs::dsl::cost))
            .first::<Option<f64>>(conn)?
            .unwrap_or(0.0);
        Ok(OverviewStats {
            vendors,
            keys,
            keys_active,
            providers,
            bindings,
            adapters,
            total_requests,
            total_input_tokens,
            total_output_tokens,
            total_cost,
        })
    })
}

pub fn usage(query: &UsageQuery) -> DbResult<Vec<DailyUsage>> {
    let rows = load_rows(query)?;
    let mut days: BTreeMap<String, DailyUsage> = BTreeMap::new();
    for (_, _, _, _, input, output, cost, created_at) in rows {
        let day = day_of(created_at);
        let entry = days.entry(day.clone()).or_insert_with(|| DailyUsage {
            day,
            requests: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost: 0.0,
        });
        entry.requests += 1;
        entry.input_tokens += input as i64;
        entry.output_tokens += output as i64;
        entry.cost += cost;
    }
    Ok(days.into_values().collect())
}

fn group_rows<K, F>(rows: Vec<LogRow>, key_of: F, names: &HashMap<K, String>) -> Vec<GroupUsage>
where
    K: std::hash::Hash + Eq + Clone,
    F: Fn(&LogRow) -> Option<K>,
{
    let mut groups: HashMap<K, GroupUsage> = HashMap::new();
    for row in rows {
        let Some(key) = key_of(&row) else { continue };
        let (_, _, _, _, input, output, cost, _) = row;
        let entry = groups.entry(key.clone()).or_insert_with(|| GroupUsage {
            name: names
                .get(&key)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string()),
            requests: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost: 0.0,
        });
        entry.requests += 1;
        entry.input_tokens += input as i64;
        entry.output_tokens += output as i64;
        entry.cost += cost;
    }
    let mut list: Vec<GroupUsage> = groups.into_values().collect();
    list.sort_by(|a, b| b.requests.cmp(&a.requests));
    list
}

pub fn by_vendor(query: &UsageQuery) -> DbResult<Vec<GroupUsage>> {
    let rows = load_rows(query)?;
    let names: HashMap<i64, String> = {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let pairs = vendors::table
                .select((vendors::dsl::id, vendors::dsl::name))
                .load::<(i64, String)>(conn)?;
            DbResult::Ok(pairs.into_iter().collect())
        })?
    };
    Ok(group_rows(rows, |row| row.0, &names))
}

pub fn by_key(query: &UsageQuery) -> DbResult<Vec<GroupUsage>> {
    let rows = load_rows(query)?;
    let names: HashMap<i64, String> = {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let pairs = vendor_keys::table
                .select((vendor_keys::dsl::id, vendor_keys::dsl::label))
                .load::<(i64, String)>(conn)?;
            DbResult::Ok(pairs.into_iter().collect())
        })?
    };
    Ok(group_rows(rows, |row| row.1, &names))
}

pub fn by_model(query: &UsageQuery) -> DbResult<Vec<GroupUsage>> {
    let rows = load_rows(query)?;
    // Models name themselves, no lookup table needed.
    let mut names: HashMap<String, String> = HashMap::new();
    for row in &rows {
        if !row.3.is_empty() {
            names.insert(row.3.clone(), row.3.clone());
        }
    }
    Ok(group_rows(
        rows,
        |row| {
            if row.3.is_empty() {
                None
            } else {
                Some(row.3.clone())
            }
        },
        &names,
    ))
}
