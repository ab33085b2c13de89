//! The request/response command surface of the adapter.
//!
//! Commands are plain functions over the service; transports hand the
//! command name and JSON payload to [`dispatch`]. Every failure — input
//! validation or storage — is reported as a plain string describing the
//! first problem encountered, and a failed command leaves no partial
//! writes behind.

pub mod intake;
pub mod medications;
pub mod patients;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::service::MedPlanService;

/// Request addressing one state by id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GetByIdRequest {
    pub id: Option<String>,
}

/// Request writing one list-valued state.
#[derive(Debug, Clone, Deserialize)]
pub struct SetListRequest {
    pub id: String,
    #[serde(default)]
    pub value: Value,
}

/// List responses always carry an array, empty on absence or bad data.
#[derive(Debug, Clone, Serialize)]
pub struct ListValue {
    pub value: Vec<Value>,
}

/// Document responses carry the parsed object or null.
#[derive(Debug, Clone, Serialize)]
pub struct DocValue {
    pub value: Value,
}

/// Route one inbound request to its handler.
pub fn dispatch(service: &MedPlanService, command: &str, payload: Value) -> Result<Value, String> {
    tracing::debug!(command, "Dispatching command");
    match command {
        "setMedicationList" => {
            respond(medications::set_medication_list(service, parse(payload)?))
        }
        "getMedicationList" => {
            respond(medications::get_medication_list(service, parse(payload)?))
        }
        "setPatientsIndex" => respond(patients::set_patients_index(service, parse(payload)?)),
        "getPatientsIndex" => respond(patients::get_patients_index(service, parse(payload)?)),
        "setPatientData" => respond(patients::set_patient_data(service, parse(payload)?)),
        "getPatientData" => respond(patients::get_patient_data(service, parse(payload)?)),
        "deletePatientData" => respond(patients::delete_patient_data(service, parse(payload)?)),
        "setIntakeState" => respond(intake::set_intake_state(service, parse(payload)?)),
        _ => Err(format!("Unknown command: {command}")),
    }
}

fn parse<T: DeserializeOwned>(payload: Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|e| e.to_string())
}

/// Read and parse a JSON state. Absent or unparsable values yield `None`;
/// only storage failures surface as errors.
fn read_json(service: &MedPlanService, id: &str) -> Result<Option<Value>, String> {
    let raw = service.store().get(id).map_err(|e| e.to_string())?;
    Ok(raw.and_then(|raw| serde_json::from_str(&raw).ok()))
}

fn respond<T: Serialize>(result: Result<T, String>) -> Result<Value, String> {
    result.and_then(|value| serde_json::to_value(value).map_err(|e| e.to_string()))
}
