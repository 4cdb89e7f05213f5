use diesel::prelude::*;

use crate::adapter::{AdapterRegistry, ConfigAdapter};
use crate::{db_execute, db_object};

use super::{get_connection, DbResult};

db_object! {
    #[derive(Queryable, Insertable, AsChangeset, Debug)]
    #[diesel(table_name = adapters)]
    pub struct AdapterSetting {
        pub id: String,
        pub label: String,
        pub config_path: String,
        pub icon: String,
        pub enabled: bool,
    }
}

impl AdapterSetting {
    pub fn upsert(setting: &AdapterSetting) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let updated = diesel::update(adapters::table.find(&setting.id))
                .set(AdapterSettingDb::to_db(setting))
                .execute(conn)?;
            if updated == 0 {
                diesel::insert_into(adapters::table)
                    .values(AdapterSettingDb::to_db(setting))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    pub fn find(adapter_id: &str) -> DbResult<Option<AdapterSetting>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let found = adapters::table
                .find(adapter_id)
                .first::<AdapterSettingDb>(conn)
                .optional()?;
            Ok(found.map(|db| db.from_db()))
        })
    }

    pub fn all() -> DbResult<Vec<AdapterSetting>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let list = adapters::table
                .order(adapters::dsl::id.asc())
                .load::<AdapterSettingDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    fn register_if_absent(id: &str, label: &str) -> DbResult<()> {
        if Self::find(id)?.is_some() {
            return Ok(());
        }
        Self::upsert(&AdapterSetting {
            id: id.to_string(),
            label: label.to_string(),
            config_path: String::new(),
            icon: String::new(),
            enabled: true,
        })
    }

    /// Seed one settings row per built-in adapter so the UI can list and
    /// configure them before any sync has happened.
    pub fn register_builtin(registry: &AdapterRegistry) -> DbResult<()> {
        for adapter in registry.iter() {
            Self::register_if_absent(adapter.id(), adapter.label())?;
        }
        Ok(())
    }

    /// The operator-configured path wins; an empty row falls back to the
    /// adapter's well-known location.
    pub fn config_path_or_default(adapter: &dyn ConfigAdapter) -> DbResult<String> {
        let path = Self::find(adapter.id())?
            .map(|s| s.config_path)
            .unwrap_or_default();
        if path.is_empty() {
            Ok(adapter.default_config_path())
        } else {
            Ok(path)
        }
    }
}
