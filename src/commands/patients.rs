//! Patient index and patient document commands, plus the key derivation
//! used when a patient state id is built from a display name.

use serde::Deserialize;
use serde_json::Value;

use super::{read_json, DocValue, GetByIdRequest, ListValue, SetListRequest};
use crate::service::MedPlanService;

#[derive(Debug, Clone, Deserialize)]
pub struct SetPatientDataRequest {
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletePatientDataRequest {
    pub id: String,
}

/// Store the patients index at the given state id.
pub fn set_patients_index(
    service: &MedPlanService,
    request: SetListRequest,
) -> Result<bool, String> {
    service
        .store()
        .ensure_exists(&request.id, "Patients index")
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

/// Read the patients index; always an array, empty on absence or parse
/// failure.
pub fn get_patients_index(
    service: &MedPlanService,
    request: GetByIdRequest,
) -> Result<ListValue, String> {
    let id = match request.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err("id missing".to_string()),
    };

    let value = match read_json(service, &id)? {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };
    Ok(ListValue { value })
}

/// Store one whole patient document.
pub fn set_patient_data(
    service: &MedPlanService,
    request: SetPatientDataRequest,
) -> Result<bool, String> {
    let label = request
        .display_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .or(request.key.as_deref())
        .unwrap_or_default();
    service
        .store()
        .ensure_exists(&request.id, &format!("Patient {label}"))
        .map_err(|e| e.to_string())?;

    let value = if request.value.is_null() {
        Value::Array(Vec::new())
    } else {
        request.value
    };
    let raw = serde_json::to_string(&value).map_err(|e| e.to_string())?;

    service.with_patient(&request.id, || {
        service.store().set(&request.id, &raw).map_err(|e| e.to_string())
    })?;
    Ok(true)
}

/// Read one patient document; the parsed object or null.
pub fn get_patient_data(
    service: &MedPlanService,
    request: GetByIdRequest,
) -> Result<DocValue, String> {
    let id = match request.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return Err("id missing".to_string()),
    };

    let value = match read_json(service, &id)? {
        Some(doc @ Value::Object(_)) => doc,
        _ => Value::Null,
    };
    Ok(DocValue { value })
}

/// Remove a patient state entirely.
pub fn delete_patient_data(
    service: &MedPlanService,
    request: DeletePatientDataRequest,
) -> Result<bool, String> {
    service.with_patient(&request.id, || {
        service.store().delete(&request.id).map_err(|e| e.to_string())
    })?;
    tracing::info!(patient = %request.id, "Patient state deleted");
    Ok(true)
}

/// Derive the state key for a patient display name: fold German umlauts to
/// ASCII, drop everything else that is not alphanumeric, and join the
/// remaining words CamelCased ("Max Müller-Lüdenscheidt" ->
/// "MaxMuellerLuedenscheidt").
pub fn patient_key(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut folded = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            'ä' => folded.push_str("ae"),
            'ö' => folded.push_str("oe"),
            'ü' => folded.push_str("ue"),
            'Ä' => folded.push_str("Ae"),
            'Ö' => folded.push_str("Oe"),
            'Ü' => folded.push_str("Ue"),
            'ß' => folded.push_str("ss"),
            _ => folded.push(ch),
        }
    }

    folded
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
