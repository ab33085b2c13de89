//! The per-patient document and its intake subtree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::{IntakeState, Slot};
use super::lenient;
use super::plan::MedicationPlan;

/// One recorded intake cell.
///
/// Three generations of encodings exist in stored documents: the current
/// `{state, ts}` object, a bare `0|1|2` number, and an old boolean flag.
/// All reads go through [`IntakeCell::value`]; no call site interprets the
/// raw shape itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntakeCell {
    Record {
        state: i64,
        #[serde(default)]
        ts: i64,
    },
    Legacy(i64),
    Flag(bool),
    Other(Value),
}

impl IntakeCell {
    pub fn record(state: IntakeState, ts: i64) -> IntakeCell {
        IntakeCell::Record {
            state: state.code(),
            ts,
        }
    }

    /// Normalized logical state; anything unrecognised reads as pending.
    pub fn value(&self) -> IntakeState {
        match self {
            IntakeCell::Record { state, .. } => IntakeState::from_code(*state),
            IntakeCell::Legacy(n) => IntakeState::from_code(*n),
            IntakeCell::Flag(true) => IntakeState::Taken,
            IntakeCell::Flag(false) | IntakeCell::Other(_) => IntakeState::Pending,
        }
    }
}

/// Intake records of one day: medication id -> slot -> cell.
pub type IntakeDay = BTreeMap<String, BTreeMap<Slot, IntakeCell>>;

/// The sparse `plan.intake` subtree: date key -> day records.
pub type IntakeTree = BTreeMap<String, IntakeDay>;

/// The `plan` subtree of a patient document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    #[serde(deserialize_with = "lenient")]
    pub meds: BTreeMap<String, MedicationPlan>,
    #[serde(deserialize_with = "lenient")]
    pub intake: IntakeTree,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A whole patient document, stored as one JSON value per patient address.
///
/// Every mutation re-reads, patches and rewrites the full document, so
/// fields this service does not know about are kept in `extra` and written
/// back untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientDoc {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub plan: Plan,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the patients index state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexEntry {
    pub id: String,
    pub name: String,
    pub key: String,
    pub address: String,
}
