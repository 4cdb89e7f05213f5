use chrono::Utc;
use diesel::prelude::*;

use crate::controller::BaseError;
use crate::utils::ID_GENERATOR;
use crate::{db_execute, db_object};

use super::{get_connection, DbResult};

db_object! {
    #[derive(Queryable, Insertable, AsChangeset, Debug)]
    #[diesel(table_name = bindings)]
    pub struct Binding {
        pub id: i64,
        pub provider_id: i64,
        pub adapter_id: String,
        pub target_provider_name: String,
        pub auto_sync: bool,
        pub created_at: i64,
    }
}

impl Binding {
    pub fn new(
        provider_id: i64,
        adapter_id: &str,
        target_provider_name: &str,
        auto_sync: bool,
    ) -> Self {
        Self {
            id: ID_GENERATOR.generate_id(),
            provider_id,
            adapter_id: adapter_id.to_string(),
            target_provider_name: target_provider_name.to_string(),
            auto_sync,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn insert_one(binding: &Binding) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::insert_into(bindings::table)
                .values(BindingDb::to_db(binding))
                .execute(conn)
                .map_err(|err| match err {
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => BaseError::DatabaseDup(Some(
                        "binding already exists for this provider, adapter and target"
                            .to_string(),
                    )),
                    err => err.into(),
                })?;
            Ok(())
        })
    }

    /// Record the binding a push established, once. Re-pushing the same
    /// provider to the same endpoint is a no-op here.
    pub fn insert_if_absent(
        provider_id: i64,
        adapter_id: &str,
        target_provider_name: &str,
    ) -> DbResult<Binding> {
        let conn = &mut get_connection();
        let existing = db_execute!(conn, {
            let found = bindings::table
                .filter(bindings::dsl::provider_id.eq(provider_id))
                .filter(bindings::dsl::adapter_id.eq(adapter_id))
                .filter(bindings::dsl::target_provider_name.eq(target_provider_name))
                .first::<BindingDb>(conn)
                .optional()?;
            DbResult::Ok(found.map(|db| db.from_db()))
        })?;
        if let Some(binding) = existing {
            return Ok(binding);
        }
        let binding = Binding::new(provider_id, adapter_id, target_provider_name, true);
        Self::insert_one(&binding)?;
        Ok(binding)
    }

    pub fn find(binding_id: i64) -> DbResult<Binding> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            bindings::table
                .find(binding_id)
                .first::<BindingDb>(conn)
                .optional()?
                .map(|db| db.from_db())
                .ok_or(BaseError::NotFound(Some("binding not found".to_string())))
        })
    }

    pub fn list(provider_id: Option<i64>, adapter_id: Option<&str>) -> DbResult<Vec<Binding>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let mut query = bindings::table.into_boxed();
            if let Some(pid) = provider_id {
                query = query.filter(bindings::dsl::provider_id.eq(pid));
            }
            if let Some(aid) = adapter_id {
                query = query.filter(bindings::dsl::adapter_id.eq(aid.to_string()));
            }
            let list = query
                .order(bindings::dsl::id.asc())
                .load::<BindingDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    /// Which binding, if any, claims a given adapter endpoint.
    pub fn endpoint_owner(
        adapter_id: &str,
        target_provider_name: &str,
    ) -> DbResult<Option<Binding>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let found = bindings::table
                .filter(bindings::dsl::adapter_id.eq(adapter_id))
                .filter(bindings::dsl::target_provider_name.eq(target_provider_name))
                .first::<BindingDb>(conn)
                .optional()?;
            Ok(found.map(|db| db.from_db()))
        })
    }

    pub fn list_auto_sync_by_provider(provider_id: i64) -> DbResult<Vec<Binding>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let list = bindings::table
                .filter(bindings::dsl::provider_id.eq(provider_id))
                .filter(bindings::dsl::auto_sync.eq(true))
                .order(bindings::dsl::id.asc())
                .load::<BindingDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    pub fn set_auto_sync(binding_id: i64, auto_sync: bool) -> DbResult<Binding> {
        let mut binding = Self::find(binding_id)?;
        binding.auto_sync = auto_sync;
        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::update(bindings::table.find(binding_id))
                .set(bindings::dsl::auto_sync.eq(auto_sync))
                .execute(conn)?;
            Ok(binding)
        })
    }

    pub fn delete_one(binding_id: i64) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::delete(bindings::table.find(binding_id)).execute(conn)?;
            Ok(())
        })
    }
}
