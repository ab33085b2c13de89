//! Plan-side types of the patient document: medication plan entries,
//! repeat rules, dose configuration and physical packages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::{DoseMode, RepeatKind, Slot};
use super::lenient;

/// Which of the four intake slots are active for a medication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotFlags {
    pub morning: bool,
    pub noon: bool,
    pub evening: bool,
    pub night: bool,
}

impl SlotFlags {
    pub fn is_active(&self, slot: Slot) -> bool {
        match slot {
            Slot::Morning => self.morning,
            Slot::Noon => self.noon,
            Slot::Evening => self.evening,
            Slot::Night => self.night,
        }
    }
}

/// Recurrence rule: due every `every` days counted from the anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repeat {
    #[serde(rename = "type")]
    pub kind: RepeatKind,
    pub every: u32,
}

impl Repeat {
    /// The interval in days, clamped to at least one.
    pub fn interval(&self) -> i64 {
        i64::from(self.every.max(1))
    }
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat {
            kind: RepeatKind::Daily,
            every: 1,
        }
    }
}

/// Per-slot dose quantities, used when `Dose.mode` is `PerSlot`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotDoses {
    pub morning: f64,
    pub noon: f64,
    pub evening: f64,
    pub night: f64,
}

impl SlotDoses {
    pub fn get(&self, slot: Slot) -> f64 {
        match slot {
            Slot::Morning => self.morning,
            Slot::Noon => self.noon,
            Slot::Evening => self.evening,
            Slot::Night => self.night,
        }
    }
}

/// Dose configuration: quantity consumed per administration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dose {
    pub mode: DoseMode,
    pub unit: String,
    pub fixed: f64,
    #[serde(rename = "perSlot")]
    pub per_slot: SlotDoses,
}

/// A physical package of medication units.
///
/// `created_ts` orders packages for the oldest-first ledger; a package
/// without one sorts after every dated package and never anchors a
/// recurrence. Invariant at rest: `0 <= current <= total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    pub id: String,
    #[serde(rename = "createdTs", skip_serializing_if = "Option::is_none")]
    pub created_ts: Option<i64>,
    pub total: f64,
    pub current: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Plan-entry metadata; `start_date` is an explicit recurrence anchor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanMeta {
    #[serde(rename = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlanMeta {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.extra.is_empty()
    }
}

/// One entry of `plan.meds`: everything the tracker knows about a
/// medication for one patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicationPlan {
    #[serde(deserialize_with = "lenient")]
    pub times: SlotFlags,
    #[serde(deserialize_with = "lenient")]
    pub repeat: Repeat,
    #[serde(deserialize_with = "lenient")]
    pub dose: Dose,
    #[serde(deserialize_with = "lenient")]
    pub packages: Vec<Package>,
    #[serde(rename = "_meta", deserialize_with = "lenient", skip_serializing_if = "PlanMeta::is_empty")]
    pub meta: PlanMeta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
