//! Access to the sparse `plan.intake` tree.
//!
//! Cells are addressed by (day key, medication id, slot). Writes create the
//! intermediate maps they need; clearing a cell prunes maps that became
//! empty, so a day without records does not linger in the document.

use crate::models::{IntakeCell, IntakeState, IntakeTree, Slot};

pub fn cell<'a>(
    tree: &'a IntakeTree,
    date_key: &str,
    medication_id: &str,
    slot: Slot,
) -> Option<&'a IntakeCell> {
    tree.get(date_key)?.get(medication_id)?.get(&slot)
}

/// Normalized state of a cell; absence reads as pending.
pub fn cell_state(tree: &IntakeTree, date_key: &str, medication_id: &str, slot: Slot) -> IntakeState {
    cell(tree, date_key, medication_id, slot).map_or(IntakeState::Pending, IntakeCell::value)
}

/// Write a cell, creating the day and medication maps as needed.
pub fn set_cell(
    tree: &mut IntakeTree,
    date_key: &str,
    medication_id: &str,
    slot: Slot,
    value: IntakeCell,
) {
    tree.entry(date_key.to_string())
        .or_default()
        .entry(medication_id.to_string())
        .or_default()
        .insert(slot, value);
}

/// Remove a cell and prune now-empty parent maps (medication, then day).
pub fn clear_cell(tree: &mut IntakeTree, date_key: &str, medication_id: &str, slot: Slot) {
    let Some(day) = tree.get_mut(date_key) else {
        return;
    };
    if let Some(per_med) = day.get_mut(medication_id) {
        per_med.remove(&slot);
        if per_med.is_empty() {
            day.remove(medication_id);
        }
    }
    if day.is_empty() {
        tree.remove(date_key);
    }
}
