//! The service instance: store handle, configuration, per-patient
//! serialization of read-modify-write cycles, and the scanner lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::config::AdapterConfig;
use crate::models::{IndexEntry, PatientDoc};
use crate::scanner::{self, ScannerHandle};
use crate::store::{StateStore, StoreError};

pub struct MedPlanService {
    store: Arc<dyn StateStore>,
    config: AdapterConfig,
    /// One mutex per patient address. Commands and scanner passes both
    /// rewrite whole documents; interleaving two cycles on the same patient
    /// would silently drop the earlier patch.
    patient_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    scanner: Mutex<Option<ScannerHandle>>,
}

impl MedPlanService {
    pub fn new(store: Arc<dyn StateStore>, config: AdapterConfig) -> Arc<MedPlanService> {
        Arc::new(MedPlanService {
            store,
            config,
            patient_locks: Mutex::new(HashMap::new()),
            scanner: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    /// Start the periodic missed-intake scanner. Calling it again while the
    /// scanner runs is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut guard = self
            .scanner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.is_some() {
            tracing::debug!("Missed-intake scanner already running");
            return;
        }
        *guard = Some(scanner::start_scanner(Arc::clone(self)));
    }

    /// Stop the scanner and wait for its thread. Safe to call when it is
    /// not running.
    pub fn stop(&self) {
        let handle = self
            .scanner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.shutdown();
            drop(handle); // joins the thread
        }
    }

    /// Run `f` inside this patient's exclusive critical section.
    pub fn with_patient<R>(&self, address: &str, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut locks = self
                .patient_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(address.to_string()).or_default())
        };
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }

    /// Serialize and store a whole patient document.
    pub fn save_patient(&self, address: &str, doc: &PatientDoc) -> Result<(), StoreError> {
        let raw = serde_json::to_string(doc)?;
        self.store.set(address, &raw)
    }

    /// Addresses of all known patients of this instance.
    ///
    /// The index may contain full entries or bare address strings; anything
    /// else, and anything outside the namespace, is skipped. Read failures
    /// yield an empty list (the scan simply has nothing to do).
    pub fn patient_addresses(&self) -> Vec<String> {
        let raw = match self.store.get(&self.config.patients_index_address()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read patients index");
                return Vec::new();
            }
        };

        let entries: Vec<Value> = serde_json::from_str(&raw).unwrap_or_default();
        entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(address) => Some(address),
                entry @ Value::Object(_) => serde_json::from_value::<IndexEntry>(entry)
                    .ok()
                    .map(|parsed| parsed.address),
                _ => None,
            })
            .filter(|address| self.config.owns(address))
            .collect()
    }
}
