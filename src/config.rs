use std::path::PathBuf;

use crate::models::Slot;

/// Application-level constants
pub const APP_NAME: &str = "med-plan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Well-known state id of the patients index, relative to the namespace.
pub const PATIENTS_INDEX_STATE: &str = "_patients";

/// Well-known state id of the medication catalog, relative to the namespace.
pub const MEDICATION_LIST_STATE: &str = "_medication";

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", APP_NAME.replace('-', "_"))
}

/// Get the application data directory (~/med-plan/ on all platforms).
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(APP_NAME)
}

/// Path of the backing state database.
pub fn state_db_path() -> PathBuf {
    app_data_dir().join("state.db")
}

/// Local time of day at which a slot's dose is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTime {
    pub hour: u32,
    pub minute: u32,
}

/// Due times for the four slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTimes {
    pub morning: SlotTime,
    pub noon: SlotTime,
    pub evening: SlotTime,
    pub night: SlotTime,
}

impl SlotTimes {
    pub fn get(&self, slot: Slot) -> SlotTime {
        match slot {
            Slot::Morning => self.morning,
            Slot::Noon => self.noon,
            Slot::Evening => self.evening,
            Slot::Night => self.night,
        }
    }
}

impl Default for SlotTimes {
    fn default() -> Self {
        SlotTimes {
            morning: SlotTime { hour: 8, minute: 0 },
            noon: SlotTime { hour: 12, minute: 30 },
            evening: SlotTime { hour: 18, minute: 30 },
            night: SlotTime { hour: 22, minute: 30 },
        }
    }
}

/// Runtime configuration of one adapter instance.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Namespace prefix of every state this instance owns, e.g. "med-plan.0".
    pub namespace: String,
    /// How many past days the startup backfill covers (excluding today).
    pub backfill_days: u32,
    /// Minutes after a slot's due time before it is auto-marked missed.
    pub grace_minutes: i64,
    /// Period of the missed-intake scan.
    pub scan_interval_secs: u64,
    pub slot_times: SlotTimes,
}

impl AdapterConfig {
    /// Fully-qualified address of the patients index state.
    pub fn patients_index_address(&self) -> String {
        format!("{}.{}", self.namespace, PATIENTS_INDEX_STATE)
    }

    /// Fully-qualified address of the medication catalog state.
    pub fn medication_list_address(&self) -> String {
        format!("{}.{}", self.namespace, MEDICATION_LIST_STATE)
    }

    /// Whether an address belongs to this instance.
    pub fn owns(&self, address: &str) -> bool {
        address.starts_with(&format!("{}.", self.namespace))
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            namespace: "med-plan.0".to_string(),
            backfill_days: 7,
            grace_minutes: 120,
            scan_interval_secs: 60,
            slot_times: SlotTimes::default(),
        }
    }
}
