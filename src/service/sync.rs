use std::collections::{hash_map::Entry, HashMap, HashSet};

use serde::Serialize;
use tracing::warn;
use url::Url;

use crate::adapter::{AdapterRegistry, ApplyRequest, REGISTRY};
use crate::controller::BaseError;
use crate::database::adapter::AdapterSetting;
use crate::database::binding::Binding;
use crate::database::provider::Provider;
use crate::database::vendor::{Vendor, VendorKey};
use crate::database::DbResult;

use super::cipher::{SecretCipher, CIPHER};

#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub adapter_id: String,
    pub target: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PushOutcome {
    pub adapter_id: String,
    pub provider: String,
    pub target_provider_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportedProvider {
    pub id: i64,
    pub name: String,
    pub vendor_id: i64,
    /// The adapter endpoint the import bound the provider to, or `None` when
    /// that endpoint already belongs to another provider.
    pub bound_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BindingStatus {
    #[serde(flatten)]
    pub binding: Binding,
    /// The binding's target no longer exists in the client config.
    pub orphaned: bool,
}

pub struct SyncEngine<'a> {
    registry: &'a AdapterRegistry,
    cipher: &'a SecretCipher,
}

impl SyncEngine<'static> {
    pub fn global() -> Self {
        Self::new(&REGISTRY, &CIPHER)
    }
}

impl<'a> SyncEngine<'a> {
    pub fn new(registry: &'a AdapterRegistry, cipher: &'a SecretCipher) -> Self {
        Self { registry, cipher }
    }

    /// Decrypted credential for a provider. Providers without a key, or whose
    /// key row has vanished, sync with an empty credential rather than fail.
    fn resolve_api_key(&self, provider: &Provider) -> Result<String, BaseError> {
        let Some(key_id) = provider.vendor_key_id else {
            return Ok(String::new());
        };
        match VendorKey::find(key_id) {
            Ok(key) => Ok(self.cipher.decrypt(&key.api_key_enc)?),
            Err(BaseError::NotFound(_)) => Ok(String::new()),
            Err(err) => Err(err),
        }
    }

    /// Entry names currently present in an adapter's config file. `None` when
    /// the adapter id is unknown; an unreadable or missing config reads as
    /// empty.
    pub fn live_endpoints(&self, adapter_id: &str) -> DbResult<Option<HashSet<String>>> {
        let Some(adapter) = self.registry.get(adapter_id) else {
            return Ok(None);
        };
        let path = AdapterSetting::config_path_or_default(adapter)?;
        let state = match adapter.read_current(&path) {
            Ok(state) => state,
            Err(err) => {
                warn!(adapter = adapter_id, error = %err, "failed to read adapter config");
                None
            }
        };
        Ok(Some(
            state
                .map(|s| s.providers.into_iter().map(|p| p.provider_name).collect())
                .unwrap_or_default(),
        ))
    }

    /// Write one provider's credentials into one adapter and record the
    /// binding.
    pub fn push(
        &self,
        adapter_id: &str,
        provider_id: i64,
        target: Option<&str>,
    ) -> Result<PushOutcome, BaseError> {
        let adapter = self
            .registry
            .get(adapter_id)
            .ok_or(BaseError::NotFound(Some("adapter not found".to_string())))?;
        let provider = Provider::find(provider_id)?;
        let path = AdapterSetting::config_path_or_default(adapter)?;
        let api_key = self.resolve_api_key(&provider)?;
        let pname = match target {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => provider.name.clone(),
        };

        // Surface drift early: the config already has entries but none named
        // like ours, so the write will create or miss rather than update.
        let mut warning = None;
        if let Some(state) = adapter.read_current(&path)? {
            if !state.providers.is_empty()
                && !state.providers.iter().any(|p| p.provider_name == pname)
            {
                warning = Some(format!(
                    "target '{}' not present in {} config",
                    pname, adapter_id
                ));
            }
        }

        let extra = provider.extra_map();
        let applied = adapter.apply(
            &path,
            &ApplyRequest {
                base_url: &provider.base_url,
                api_key: &api_key,
                provider_name: Some(&pname),
                extra_fields: extra.as_ref(),
            },
        )?;
        if !applied {
            return Err(BaseError::AdapterFailure(Some(format!(
                "failed to apply config to {}",
                adapter_id
            ))));
        }

        // The write has already happened at this point; the conflict check
        // only blocks recording a binding over someone else's endpoint.
        if let Some(owner) = Binding::endpoint_owner(adapter_id, &pname)? {
            if owner.provider_id != provider.id {
                return Err(BaseError::Conflict(Some(format!(
                    "endpoint '{}' on {} is already bound to another provider",
                    pname, adapter_id
                ))));
            }
        }
        Binding::insert_if_absent(provider.id, adapter_id, &pname)?;

        Ok(PushOutcome {
            adapter_id: adapter_id.to_string(),
            provider: provider.name,
            target_provider_name: pname,
            warning,
        })
    }

    /// Re-apply a provider to every auto-sync binding it has. Failures are
    /// reported per binding instead of aborting the batch.
    pub fn sync_provider_to_bindings(&self, provider_id: i64) -> DbResult<Vec<SyncOutcome>> {
        let provider = match Provider::find(provider_id) {
            Ok(provider) => provider,
            Err(BaseError::NotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let bindings = Binding::list_auto_sync_by_provider(provider_id)?;
        if bindings.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self.resolve_api_key(&provider)?;
        let extra = provider.extra_map();

        let mut results = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let outcome = match self.registry.get(&binding.adapter_id) {
                None => SyncOutcome {
                    adapter_id: binding.adapter_id.clone(),
                    target: binding.target_provider_name.clone(),
                    ok: false,
                    detail: Some("unknown adapter".to_string()),
                },
                Some(adapter) => {
                    let applied = AdapterSetting::config_path_or_default(adapter)
                        .and_then(|path| {
                            adapter
                                .apply(
                                    &path,
                                    &ApplyRequest {
                                        base_url: &provider.base_url,
                                        api_key: &api_key,
                                        provider_name: Some(&binding.target_provider_name),
                                        extra_fields: extra.as_ref(),
                                    },
                                )
                                .map_err(BaseError::from)
                        });
                    match applied {
                        Ok(ok) => SyncOutcome {
                            adapter_id: binding.adapter_id.clone(),
                            target: binding.target_provider_name.clone(),
                            ok,
                            detail: None,
                        },
                        Err(err) => SyncOutcome {
                            adapter_id: binding.adapter_id.clone(),
                            target: binding.target_provider_name.clone(),
                            ok: false,
                            detail: Some(err.to_string()),
                        },
                    }
                }
            };
            results.push(outcome);
        }
        Ok(results)
    }

    /// A key changed; refresh every provider that uses it.
    pub fn sync_key_to_bindings(&self, key_id: i64) -> DbResult<Vec<SyncOutcome>> {
        let mut results = Vec::new();
        for provider in Provider::list_by_key(key_id)? {
            results.extend(self.sync_provider_to_bindings(provider.id)?);
        }
        Ok(results)
    }

    /// A vendor changed; refresh every provider under it.
    pub fn sync_vendor_to_bindings(&self, vendor_id: i64) -> DbResult<Vec<SyncOutcome>> {
        let mut results = Vec::new();
        for provider in Provider::list_by_vendor(vendor_id)? {
            results.extend(self.sync_provider_to_bindings(provider.id)?);
        }
        Ok(results)
    }

    fn find_or_create_vendor(
        &self,
        domain: &str,
        fallback_name: &str,
        adapter_id: &str,
        adapter_label: &str,
    ) -> DbResult<Vendor> {
        if !domain.is_empty() {
            if let Some(vendor) = Vendor::find_by_domain(domain)? {
                return Ok(vendor);
            }
        }
        let vname = if domain.is_empty() {
            fallback_name.to_string()
        } else {
            domain.split('.').next().unwrap_or(fallback_name).to_string()
        };
        let notes = format!("Imported from {}", adapter_label);
        let vendor = Vendor::new(&vname, domain, "", &notes);
        match Vendor::insert_one(&vendor) {
            Ok(()) => Ok(vendor),
            // Same leading label under a different domain; qualify the name.
            Err(BaseError::DatabaseDup(_)) => {
                let vendor = Vendor::new(&format!("{}-{}", adapter_id, vname), domain, "", &notes);
                Vendor::insert_one(&vendor)?;
                Ok(vendor)
            }
            Err(err) => Err(err),
        }
    }

    /// Pull every credential-bearing entry out of an adapter's config into
    /// the vault, creating vendors, keys, providers and bindings as needed.
    /// Entries that already exist are skipped; importing nothing is an error.
    pub fn import(&self, adapter_id: &str) -> Result<Vec<ImportedProvider>, BaseError> {
        let adapter = self
            .registry
            .get(adapter_id)
            .ok_or(BaseError::NotFound(Some("adapter not found".to_string())))?;
        let path = AdapterSetting::config_path_or_default(adapter)?;
        let state = adapter
            .read_current(&path)?
            .ok_or(BaseError::NotFound(Some(format!(
                "no config found in {}",
                adapter_id
            ))))?;

        let mut imported = Vec::new();
        for entry in state.providers {
            if entry.api_key.is_empty() {
                continue;
            }
            let domain = Url::parse(&entry.base_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default();
            let pname = if entry.provider_name.is_empty() {
                "default".to_string()
            } else {
                entry.provider_name.clone()
            };
            let notes = format!("Imported from {}", adapter.label());

            let vendor = self.find_or_create_vendor(&domain, &pname, adapter_id, adapter.label())?;

            let token = self.cipher.encrypt(&entry.api_key)?;
            let key = match VendorKey::find_by_vendor_and_token(vendor.id, &token)? {
                Some(key) => key,
                None => {
                    let key = VendorKey::new(vendor.id, &pname, &token, &notes);
                    VendorKey::insert_one(&key)?;
                    key
                }
            };

            let extra_config = if entry.extra.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&entry.extra).unwrap_or_default())
            };
            let provider_name = format!("{}-{}", adapter_id, pname);
            let provider = Provider::new(
                vendor.id,
                Some(key.id),
                &provider_name,
                &entry.base_url,
                extra_config,
                &notes,
            );
            match Provider::insert_one(&provider) {
                Ok(()) => {}
                Err(BaseError::DatabaseDup(_)) => continue,
                Err(err) => return Err(err),
            }

            let bound_to = match Binding::endpoint_owner(adapter_id, &pname)? {
                Some(owner) if owner.provider_id != provider.id => None,
                _ => {
                    Binding::insert_if_absent(provider.id, adapter_id, &pname)?;
                    Some(pname)
                }
            };
            imported.push(ImportedProvider {
                id: provider.id,
                name: provider_name,
                vendor_id: vendor.id,
                bound_to,
            });
        }

        if imported.is_empty() {
            return Err(BaseError::ImportEmpty(Some(
                "no new providers imported (they may already exist)".to_string(),
            )));
        }
        Ok(imported)
    }

    /// Bindings annotated with whether their target still exists in the
    /// client config. Computed on read, never stored.
    pub fn bindings_with_status(
        &self,
        provider_id: Option<i64>,
        adapter_id: Option<&str>,
    ) -> DbResult<Vec<BindingStatus>> {
        let bindings = Binding::list(provider_id, adapter_id)?;
        let mut live: HashMap<String, Option<HashSet<String>>> = HashMap::new();
        let mut result = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let endpoints = match live.entry(binding.adapter_id.clone()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let endpoints = self.live_endpoints(e.key())?;
                    e.insert(endpoints)
                }
            };
            let orphaned = match endpoints {
                Some(set) => !set.contains(&binding.target_provider_name),
                None => true,
            };
            result.push(BindingStatus { binding, orphaned });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex, Once};

    use super::*;
    use crate::adapter::{
        AdapterEntry, AdapterResult, AdapterState, ConfigAdapter,
    };
    use crate::database::{self, get_connection};
    use crate::db_execute;
    use diesel::prelude::*;

    // `db_execute!` glob-imports these model modules; the tests only touch
    // tables directly, so they are empty.
    mod _postgres_model {}
    mod _sqlite_model {}

    static TEST_DB: Once = Once::new();
    static DB_LOCK: Mutex<()> = Mutex::new(());

    fn db_guard() -> std::sync::MutexGuard<'static, ()> {
        TEST_DB.call_once(|| {
            std::env::set_var("VAULT_DB", "file:api_vault_test?mode=memory&cache=shared");
            database::init();
        });
        let guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_tables();
        guard
    }

    fn reset_tables() {
        let conn = &mut get_connection();
        db_execute!(conn, {
            diesel::delete(bindings::table).execute(conn).unwrap();
            diesel::delete(providers::table).execute(conn).unwrap();
            diesel::delete(vendor_keys::table).execute(conn).unwrap();
            diesel::delete(vendors::table).execute(conn).unwrap();
            diesel::delete(adapters::table).execute(conn).unwrap();
            diesel::delete(request_logs::table).execute(conn).unwrap();
        });
    }

    type FakeState = Arc<Mutex<HashMap<String, (String, String)>>>;

    /// In-memory stand-in for a client config file: name -> (base_url, key).
    struct FakeAdapter {
        state: FakeState,
    }

    impl ConfigAdapter for FakeAdapter {
        fn id(&self) -> &'static str {
            "fake"
        }

        fn label(&self) -> &'static str {
            "Fake"
        }

        fn default_config_path(&self) -> String {
            String::new()
        }

        fn read_current(&self, _path: &str) -> AdapterResult<Option<AdapterState>> {
            let state = self.state.lock().unwrap();
            if state.is_empty() {
                return Ok(None);
            }
            let providers = state
                .iter()
                .map(|(name, (base_url, api_key))| AdapterEntry {
                    provider_name: name.clone(),
                    base_url: base_url.clone(),
                    api_key: api_key.clone(),
                    extra: serde_json::Map::new(),
                })
                .collect();
            Ok(Some(AdapterState { providers }))
        }

        fn apply(&self, _path: &str, request: &ApplyRequest) -> AdapterResult<bool> {
            let mut state = self.state.lock().unwrap();
            match request.provider_name {
                Some(name) => {
                    state.insert(
                        name.to_string(),
                        (request.base_url.to_string(), request.api_key.to_string()),
                    );
                    Ok(true)
                }
                None => {
                    if state.is_empty() {
                        return Ok(false);
                    }
                    for value in state.values_mut() {
                        *value = (request.base_url.to_string(), request.api_key.to_string());
                    }
                    Ok(true)
                }
            }
        }
    }

    struct Harness {
        registry: AdapterRegistry,
        cipher: SecretCipher,
        fake: FakeState,
    }

    impl Harness {
        fn new() -> Self {
            let fake: FakeState = Arc::new(Mutex::new(HashMap::new()));
            let mut registry = AdapterRegistry::empty();
            registry.register(Box::new(FakeAdapter { state: fake.clone() }));
            Self {
                registry,
                cipher: SecretCipher::from_key_bytes([7u8; 32]),
                fake,
            }
        }

        fn engine(&self) -> SyncEngine<'_> {
            SyncEngine::new(&self.registry, &self.cipher)
        }

        fn seed_provider(&self, name: &str, base_url: &str, plaintext_key: &str) -> Provider {
            let vendor = Vendor::new(&format!("vendor-{}", name), "", "", "");
            Vendor::insert_one(&vendor).unwrap();
            let token = self.cipher.encrypt(plaintext_key).unwrap();
            let key = VendorKey::new(vendor.id, "default", &token, "");
            VendorKey::insert_one(&key).unwrap();
            let provider = Provider::new(vendor.id, Some(key.id), name, base_url, None, "");
            Provider::insert_one(&provider).unwrap();
            provider
        }
    }

    #[test]
    fn push_applies_and_records_binding_once() {
        let _guard = db_guard();
        let h = Harness::new();
        let provider = h.seed_provider("p-main", "https://api.test/v1", "sk-push");

        let first = h.engine().push("fake", provider.id, None).unwrap();
        assert_eq!(first.target_provider_name, "p-main");
        assert!(first.warning.is_none());
        let second = h.engine().push("fake", provider.id, None).unwrap();
        assert_eq!(second.target_provider_name, "p-main");

        let bindings = Binding::list(Some(provider.id), None).unwrap();
        assert_eq!(bindings.len(), 1);
        assert!(bindings[0].auto_sync);

        let state = h.fake.lock().unwrap();
        assert_eq!(
            state.get("p-main"),
            Some(&("https://api.test/v1".to_string(), "sk-push".to_string()))
        );
    }

    #[test]
    fn push_rejects_endpoint_owned_by_another_provider() {
        let _guard = db_guard();
        let h = Harness::new();
        let owner = h.seed_provider("p-owner", "https://a.test", "sk-a");
        let intruder = h.seed_provider("p-intruder", "https://b.test", "sk-b");

        h.engine().push("fake", owner.id, Some("shared")).unwrap();
        let err = h.engine().push("fake", intruder.id, Some("shared"));
        assert!(matches!(err, Err(BaseError::Conflict(_))));
        // Only the owner's binding exists.
        let bindings = Binding::list(None, Some("fake")).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].provider_id, owner.id);
    }

    #[test]
    fn push_warns_when_target_absent_from_populated_config() {
        let _guard = db_guard();
        let h = Harness::new();
        h.fake.lock().unwrap().insert(
            "existing".to_string(),
            ("https://old.test".to_string(), "sk-old".to_string()),
        );
        let provider = h.seed_provider("p-new", "https://new.test", "sk-new");

        let outcome = h.engine().push("fake", provider.id, None).unwrap();
        let warning = outcome.warning.expect("expected a drift warning");
        assert!(warning.contains("p-new"));
    }

    #[test]
    fn push_unknown_adapter_is_not_found() {
        let _guard = db_guard();
        let h = Harness::new();
        let provider = h.seed_provider("p-x", "https://x.test", "sk-x");
        let err = h.engine().push("ghost", provider.id, None);
        assert!(matches!(err, Err(BaseError::NotFound(_))));
    }

    #[test]
    fn import_builds_vendor_key_provider_and_binding() {
        let _guard = db_guard();
        let h = Harness::new();
        h.fake.lock().unwrap().insert(
            "p1".to_string(),
            ("https://api.example.com/v1".to_string(), "sk-abc123".to_string()),
        );

        let imported = h.engine().import("fake").unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].name, "fake-p1");
        assert_eq!(imported[0].bound_to.as_deref(), Some("p1"));

        let vendor = Vendor::find(imported[0].vendor_id).unwrap();
        assert_eq!(vendor.domain, "api.example.com");
        assert_eq!(vendor.name, "api");

        let keys = VendorKey::list_by_vendor(vendor.id).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].api_key_enc, h.cipher.encrypt("sk-abc123").unwrap());

        let bindings = Binding::list(Some(imported[0].id), None).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].target_provider_name, "p1");
    }

    #[test]
    fn reimport_creates_nothing_and_reports_empty() {
        let _guard = db_guard();
        let h = Harness::new();
        h.fake.lock().unwrap().insert(
            "p1".to_string(),
            ("https://api.example.com/v1".to_string(), "sk-abc123".to_string()),
        );
        let imported = h.engine().import("fake").unwrap();
        let vendor_id = imported[0].vendor_id;

        let err = h.engine().import("fake");
        assert!(matches!(err, Err(BaseError::ImportEmpty(_))));
        // Still exactly one of each.
        assert_eq!(Vendor::list().unwrap().len(), 1);
        assert_eq!(VendorKey::list_by_vendor(vendor_id).unwrap().len(), 1);
        assert_eq!(Provider::list().unwrap().len(), 1);
    }

    #[test]
    fn import_with_empty_config_is_not_found() {
        let _guard = db_guard();
        let h = Harness::new();
        let err = h.engine().import("fake");
        assert!(matches!(err, Err(BaseError::NotFound(_))));
    }

    #[test]
    fn key_change_cascades_to_every_dependent_provider() {
        let _guard = db_guard();
        let h = Harness::new();
        let vendor = Vendor::new("cascade-vendor", "", "", "");
        Vendor::insert_one(&vendor).unwrap();
        let token = h.cipher.encrypt("sk-rotated").unwrap();
        let key = VendorKey::new(vendor.id, "default", &token, "");
        VendorKey::insert_one(&key).unwrap();
        for name in ["c-one", "c-two"] {
            let provider =
                Provider::new(vendor.id, Some(key.id), name, "https://c.test", None, "");
            Provider::insert_one(&provider).unwrap();
            h.engine().push("fake", provider.id, None).unwrap();
        }

        let outcomes = h.engine().sync_key_to_bindings(key.id).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.ok));
        let targets: HashSet<&str> = outcomes.iter().map(|o| o.target.as_str()).collect();
        assert_eq!(targets, HashSet::from(["c-one", "c-two"]));

        let state = h.fake.lock().unwrap();
        assert_eq!(state.get("c-one").unwrap().1, "sk-rotated");
        assert_eq!(state.get("c-two").unwrap().1, "sk-rotated");
    }

    #[test]
    fn auto_sync_off_excludes_a_binding_from_cascades() {
        let _guard = db_guard();
        let h = Harness::new();
        let provider = h.seed_provider("p-quiet", "https://q.test", "sk-q");
        h.engine().push("fake", provider.id, None).unwrap();
        let binding = &Binding::list(Some(provider.id), None).unwrap()[0];
        Binding::set_auto_sync(binding.id, false).unwrap();

        let outcomes = h.engine().sync_provider_to_bindings(provider.id).unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn binding_goes_orphaned_when_config_entry_disappears() {
        let _guard = db_guard();
        let h = Harness::new();
        let provider = h.seed_provider("p-orphan", "https://o.test", "sk-o");
        h.engine().push("fake", provider.id, None).unwrap();

        let status = h.engine().bindings_with_status(None, None).unwrap();
        assert_eq!(status.len(), 1);
        assert!(!status[0].orphaned);

        h.fake.lock().unwrap().remove("p-orphan");
        let status = h.engine().bindings_with_status(None, None).unwrap();
        assert!(status[0].orphaned);
    }

    #[test]
    fn key_deletion_refused_while_providers_reference_it() {
        let _guard = db_guard();
        let h = Harness::new();
        let provider = h.seed_provider("p-dep", "https://d.test", "sk-d");
        let key_id = provider.vendor_key_id.unwrap();

        let err = VendorKey::delete_one(key_id);
        match err {
            Err(BaseError::Conflict(Some(msg))) => assert!(msg.contains("1 provider")),
            other => panic!("expected conflict, got {:?}", other.map(|_| ())),
        }

        Provider::delete_cascade(provider.id).unwrap();
        VendorKey::delete_one(key_id).unwrap();
    }

    #[test]
    fn vendor_cascade_removes_keys_providers_and_bindings() {
        let _guard = db_guard();
        let h = Harness::new();
        let provider = h.seed_provider("p-gone", "https://g.test", "sk-g");
        h.engine().push("fake", provider.id, None).unwrap();

        Vendor::delete_cascade(provider.vendor_id).unwrap();
        assert!(Vendor::list().unwrap().is_empty());
        assert!(Provider::list().unwrap().is_empty());
        assert!(Binding::list(None, None).unwrap().is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let _guard = db_guard();
        let h = Harness::new();
        h.seed_provider("p-unique", "https://u.test", "sk-u");

        let vendor = Vendor::new("vendor-p-unique", "", "", "");
        assert!(matches!(
            Vendor::insert_one(&vendor),
            Err(BaseError::DatabaseDup(_))
        ));

        let other = Vendor::new("vendor-other", "", "", "");
        Vendor::insert_one(&other).unwrap();
        let dup = Provider::new(other.id, None, "p-unique", "https://u2.test", None, "");
        assert!(matches!(
            Provider::insert_one(&dup),
            Err(BaseError::DatabaseDup(_))
        ));
    }
}
