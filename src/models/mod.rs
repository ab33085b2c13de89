pub mod enums;
pub mod patient;
pub mod plan;

pub use enums::{DoseMode, IntakeState, RepeatKind, Slot};
pub use patient::{IndexEntry, IntakeCell, IntakeDay, IntakeTree, PatientDoc, Plan};
pub use plan::{Dose, MedicationPlan, Package, PlanMeta, Repeat, SlotDoses, SlotFlags};

use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use serde_json::Value;

/// Deserialize a field that may have the wrong shape in stored documents.
///
/// Patient documents are written by several generations of admin surfaces;
/// a subtree that does not parse (array where a map is expected, bare
/// string, ...) is replaced by the type's default instead of rejecting the
/// whole document.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
