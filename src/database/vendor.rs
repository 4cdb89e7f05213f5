use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;

use crate::controller::BaseError;
use crate::utils::ID_GENERATOR;
use crate::{db_execute, db_object};

use super::{get_connection, DbResult};

db_object! {
    #[derive(Queryable, Insertable, AsChangeset, Debug)]
    #[diesel(table_name = vendors)]
    pub struct Vendor {
        pub id: i64,
        pub name: String,
        pub domain: String,
        pub icon: String,
        pub notes: String,
        pub created_at: i64,
        pub updated_at: i64,
    }

    #[derive(Queryable, Insertable, AsChangeset, Debug)]
    #[diesel(table_name = vendor_keys)]
    pub struct VendorKey {
        pub id: i64,
        pub vendor_id: i64,
        pub label: String,
        pub api_key_enc: String,
        pub balance: Option<f64>,
        pub quota: Option<f64>,
        pub status: String,
        pub notes: String,
        pub created_at: i64,
        pub updated_at: i64,
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct VendorUpdateFields {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub icon: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct VendorKeyUpdateFields {
    pub label: Option<String>,
    pub api_key_enc: Option<String>,
    pub balance: Option<f64>,
    pub quota: Option<f64>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl Vendor {
    pub fn new(name: &str, domain: &str, icon: &str, notes: &str) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: ID_GENERATOR.generate_id(),
            name: name.to_string(),
            domain: domain.to_string(),
            icon: icon.to_string(),
            notes: notes.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn insert_one(vendor: &Vendor) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::insert_into(vendors::table)
                .values(VendorDb::to_db(vendor))
                .execute(conn)
                .map_err(|err| match err {
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => BaseError::DatabaseDup(Some(format!(
                        "vendor name '{}' already exists",
                        vendor.name
                    ))),
                    err => err.into(),
                })?;
            Ok(())
        })
    }

    pub fn list() -> DbResult<Vec<Vendor>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let list = vendors::table
                .order(vendors::dsl::name.asc())
                .load::<VendorDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    pub fn find(vendor_id: i64) -> DbResult<Vendor> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            vendors::table
                .find(vendor_id)
                .first::<VendorDb>(conn)
                .optional()?
                .map(|db| db.from_db())
                .ok_or(BaseError::NotFound(Some("vendor not found".to_string())))
        })
    }

    pub fn find_by_domain(domain: &str) -> DbResult<Option<Vendor>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let found = vendors::table
                .filter(vendors::dsl::domain.eq(domain))
                .first::<VendorDb>(conn)
                .optional()?;
            Ok(found.map(|db| db.from_db()))
        })
    }

    pub fn update_fields(vendor_id: i64, fields: &VendorUpdateFields) -> DbResult<Vendor> {
        let mut vendor = Self::find(vendor_id)?;
        if let Some(name) = &fields.name {
            vendor.name = name.clone();
        }
        if let Some(domain) = &fields.domain {
            vendor.domain = domain.clone();
        }
        if let Some(icon) = &fields.icon {
            vendor.icon = icon.clone();
        }
        if let Some(notes) = &fields.notes {
            vendor.notes = notes.clone();
        }
        vendor.updated_at = Utc::now().timestamp_millis();

        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::update(vendors::table.find(vendor_id))
                .set(VendorDb::to_db(&vendor))
                .execute(conn)?;
            Ok(vendor)
        })
    }

    /// Delete a vendor together with everything it owns: bindings of its
    /// providers, the providers, and its keys, in one transaction.
    pub fn delete_cascade(vendor_id: i64) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let provider_ids = providers::table
                    .filter(providers::dsl::vendor_id.eq(vendor_id))
                    .select(providers::dsl::id)
                    .load::<i64>(conn)?;
                diesel::delete(
                    bindings::table.filter(bindings::dsl::provider_id.eq_any(&provider_ids)),
                )
                .execute(conn)?;
                diesel::delete(providers::table.filter(providers::dsl::vendor_id.eq(vendor_id)))
                    .execute(conn)?;
                diesel::delete(
                    vendor_keys::table.filter(vendor_keys::dsl::vendor_id.eq(vendor_id)),
                )
                .execute(conn)?;
                diesel::delete(vendors::table.find(vendor_id)).execute(conn)?;
                Ok(())
            })?;
            Ok(())
        })
    }
}

impl VendorKey {
    pub fn new(vendor_id: i64, label: &str, api_key_enc: &str, notes: &str) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: ID_GENERATOR.generate_id(),
            vendor_id,
            label: label.to_string(),
            api_key_enc: api_key_enc.to_string(),
            balance: None,
            quota: None,
            status: "active".to_string(),
            notes: notes.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn insert_one(key: &VendorKey) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::insert_into(vendor_keys::table)
                .values(VendorKeyDb::to_db(key))
                .execute(conn)?;
            Ok(())
        })
    }

    pub fn find(key_id: i64) -> DbResult<VendorKey> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            vendor_keys::table
                .find(key_id)
                .first::<VendorKeyDb>(conn)
                .optional()?
                .map(|db| db.from_db())
                .ok_or(BaseError::NotFound(Some("key not found".to_string())))
        })
    }

    pub fn list_by_vendor(vendor_id: i64) -> DbResult<Vec<VendorKey>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let list = vendor_keys::table
                .filter(vendor_keys::dsl::vendor_id.eq(vendor_id))
                .order(vendor_keys::dsl::id.asc())
                .load::<VendorKeyDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    pub fn list() -> DbResult<Vec<VendorKey>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let list = vendor_keys::table
                .order(vendor_keys::dsl::id.asc())
                .load::<VendorKeyDb>(conn)?;
            Ok(list.into_iter().map(|db| db.from_db()).collect())
        })
    }

    /// Import de-duplication: identical credentials encrypt to identical
    /// tokens, so equality on the stored ciphertext is enough.
    pub fn find_by_vendor_and_token(vendor_id: i64, token: &str) -> DbResult<Option<VendorKey>> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let found = vendor_keys::table
                .filter(vendor_keys::dsl::vendor_id.eq(vendor_id))
                .filter(vendor_keys::dsl::api_key_enc.eq(token))
                .first::<VendorKeyDb>(conn)
                .optional()?;
            Ok(found.map(|db| db.from_db()))
        })
    }

    pub fn update_fields(key_id: i64, fields: &VendorKeyUpdateFields) -> DbResult<VendorKey> {
        let mut key = Self::find(key_id)?;
        if let Some(label) = &fields.label {
            key.label = label.clone();
        }
        if let Some(api_key_enc) = &fields.api_key_enc {
            key.api_key_enc = api_key_enc.clone();
        }
        if let Some(balance) = fields.balance {
            key.balance = Some(balance);
        }
        if let Some(quota) = fields.quota {
            key.quota = Some(quota);
        }
        if let Some(status) = &fields.status {
            key.status = status.clone();
        }
        if let Some(notes) = &fields.notes {
            key.notes = notes.clone();
        }
        key.updated_at = Utc::now().timestamp_millis();

        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::update(vendor_keys::table.find(key_id))
                .set(VendorKeyDb::to_db(&key))
                .execute(conn)?;
            Ok(key)
        })
    }

    /// Deletion is refused while any provider still references the key; the
    /// error names how many do.
    pub fn delete_one(key_id: i64) -> DbResult<()> {
        let conn = &mut get_connection();
        db_execute!(conn, {
            let dependents = providers::table
                .filter(providers::dsl::vendor_key_id.eq(key_id))
                .select(diesel::dsl::count(providers::dsl::id))
                .first::<i64>(conn)?;
            if dependents > 0 {
                return Err(BaseError::Conflict(Some(format!(
                    "key is still referenced by {} provider(s)",
                    dependents
                ))));
            }
            diesel::delete(vendor_keys::table.find(key_id)).execute(conn)?;
            Ok(())
        })
    }
}
