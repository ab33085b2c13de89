//! Medication catalog commands.
//!
//! The catalog is an opaque list authored elsewhere; this service stores
//! and returns it without interpreting the entries.

use serde_json::Value;

use super::{read_json, GetByIdRequest, ListValue, SetListRequest};
use crate::service::MedPlanService;

/// Store the medication catalog at the given state id.
pub fn set_medication_list(
    service: &MedPlanService,
    request: SetListRequest,
) -> Result<bool, String> {
    service
        .store()
        .ensure_exists(&request.id, "Medication list")
        .map_err(|e| e.to_string())?;

    let value = if request.value.is_null() {
        Value::Array(Vec::new())
    } else {
        request.value
    };
    let raw = serde_json::to_string(&value).map_err(|e| e.to_string())?;
    service.store().set(&request.id, &raw).map_err(|e| e.to_string())?;
    Ok(true)
}

/// Read the medication catalog; always an array, empty on absence or
/// parse failure.
pub fn get_medication_list(
    service: &MedPlanService,
    request: GetByIdRequest,
) -> Result<ListValue, String> {
    let id = match request.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err("id missing".to_string()),
    };

    let value = match read_json(service, &id)? {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    Ok(ListValue { value })
}
