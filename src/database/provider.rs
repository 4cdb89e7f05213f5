use chrono::Utc;
use diesel::prelude::*;
use serde_json::{Map, Value};

use crate::controller::BaseError;
use crate::utils::ID_GENERATOR;
use crate::{db_execute, db_object};

use super::{get_connection, DbResult};

db_object! {
    #[derive(Queryable, Insertable, AsChangeset, Debug)]
    #[diesel(table_name = providers)]
    pub struct Provider {
        pub id: i64,
        pub vendor_id: i64,
        pub vendor_key_id: Option<i64>,
        pub name: String,
        pub base_url: String,
        pub notes: String,
        pub created_at: i64,
        pub updated_at: i64,
        pub extra_config: Option<String>,
    }
}

#[derive(Debug, Default)]
pub struct ProviderUpdateFields {
    pub name: Option<String>,
    pub vendor_key_id: Option<Option<i64>>,
    pub base_url: Option<String>,
    pub extra_config: Option<Option<String>>,
    pub notes: Option<String>,
}

impl Provider {
    pub fn new(
        vendor_id: i64,
        vendor_key_id: Option<i64>,
        name: &str,
        base_url: &str,
        extra_config: Option<String>,
        notes: &str,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: ID_GENERATOR.generate_id(),
            vendor_id,
            vendor_key_id,
            name: name.to_string(),
            base_url: base_url.to_string(),
            notes: notes.to_string(),
            created_at: now,
            updated_at: now,
            extra_config,
        }
    }

    pub fn insert_one(provider: &Provider) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::insert_into(providers::table)
                .values(ProviderDb::to_db(provider))
                .execute(conn)
                .map_err(|err| match err {
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => BaseError::DatabaseDup(Some(format!(
                        "provider name '{}' already exists",
                        provider.name
                    ))),
                    err => err.into(),
                })?;
            Ok(())
        })
    }

    pub fn list() -> DbResult<Vec<Provider>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let list = providers::table
                .order(providers::dsl::name.asc())
                .load::<ProviderDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    pub fn find(provider_id: i64) -> DbResult<Provider> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            providers::table
                .find(provider_id)
                .first::<ProviderDb>(conn)
                .optional()?
                .map(|db| db.from_db())
                .ok_or(BaseError::NotFound(Some("provider not found".to_string())))
        })
    }

    pub fn list_by_vendor(vendor_id: i64) -> DbResult<Vec<Provider>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let list = providers::table
                .filter(providers::dsl::vendor_id.eq(vendor_id))
                .order(providers::dsl::name.asc())
                .load::<ProviderDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    pub fn list_by_key(key_id: i64) -> DbResult<Vec<Provider>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let list = providers::table
                .filter(providers::dsl::vendor_key_id.eq(key_id))
                .order(providers::dsl::name.asc())
                .load::<ProviderDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    pub fn count_by_key(key_id: i64) -> DbResult<i64> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let count = providers::table
                .filter(providers::dsl::vendor_key_id.eq(key_id))
                .select(diesel::dsl::count(providers::dsl::id))
                .first::<i64>(conn)?;
            Ok(count)
        })
    }

    pub fn update_fields(provider_id: i64, fields: &ProviderUpdateFields) -> DbResult<Provider> {
        let mut provider = Self::find(provider_id)?;
        if let Some(name) = &fields.name {
            provider.name = name.clone();
        }
        if let Some(vendor_key_id) = fields.vendor_key_id {
            provider.vendor_key_id = vendor_key_id;
        }
        if let Some(base_url) = &fields.base_url {
            provider.base_url = base_url.clone();
        }
        if let Some(extra_config) = &fields.extra_config {
            provider.extra_config = extra_config.clone();
        }
        if let Some(notes) = &fields.notes {
            provider.notes = notes.clone();
        }
        provider.updated_at = Utc::now().timestamp_millis();

        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::update(providers::table.find(provider_id))
                .set(ProviderDb::to_db(&provider))
                .execute(conn)
                .map_err(|err| match err {
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => BaseError::DatabaseDup(Some(format!(
                        "provider name '{}' already exists",
                        provider.name
                    ))),
                    err => err.into(),
                })?;
            Ok(provider)
        })
    }

    pub fn delete_cascade(provider_id: i64) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::delete(
                    bindings::table.filter(bindings::dsl::provider_id.eq(provider_id)),
                )
                .execute(conn)?;
                diesel::delete(providers::table.find(provider_id)).execute(conn)?;
                Ok(())
            })?;
            Ok(())
        })
    }

    /// Adapter-specific fields stored as a JSON object, e.g. `{"api": "openai"}`.
    pub fn extra_map(&self) -> Option<Map<String, Value>> {
        let raw = self.extra_config.as_deref()?;
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}
