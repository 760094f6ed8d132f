use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{errors::Error, Result};

pub const REBOOT_COMMAND: &str = "reboot";

/// Body of `POST /public_api/pc/manage`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManageRequest {
    pub club_id: i64,
    pub command: String,
    #[serde(rename = "type")]
    pub pc_type: String,
    /// `None` targets every device matching `pc_type`.
    pub uuids: Option<Vec<String>>,
}

impl ManageRequest {
    pub fn reboot(club_id: i64, pc_type: impl Into<String>) -> Self {
        Self {
            club_id,
            command: REBOOT_COMMAND.to_string(),
            pc_type: pc_type.into(),
            uuids: None,
        }
    }
}

/// Response of the manage endpoint: per-device outcome arrays keyed by device id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ManageResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: BTreeMap<String, Vec<bool>>,
}

impl ManageResponse {
    pub fn has_data(&self) -> bool {
        self.status && !self.data.is_empty()
    }
}

/// One row of the device directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeviceEntry {
    #[serde(alias = "id", alias = "pc_uuid", deserialize_with = "string_or_number")]
    pub uuid: String,
    #[serde(default, alias = "pc_name", alias = "title")]
    pub name: Option<String>,
}

impl DeviceEntry {
    /// Human-readable name, or the raw id when the directory has none.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.uuid,
        }
    }
}

/// Device id -> display name.
pub type DeviceDirectory = HashMap<String, String>;

pub fn build_directory(entries: &[DeviceEntry]) -> DeviceDirectory {
    entries
        .iter()
        .map(|e| (e.uuid.clone(), e.display_name().to_string()))
        .collect()
}

pub fn parse_manage_response(body: &str) -> Result<ManageResponse> {
    serde_json::from_str(body).map_err(|e| Error::Decode(format!("manage response: {e}")))
}

/// Parse the device listing.
///
/// Accepted shapes, tried in order: a bare array, an object holding the array
/// under a `data` key of any case, and finally direct deserialization of the
/// body. Failing all of them is an error rather than an empty list.
pub fn parse_device_list(body: &str) -> Result<Vec<DeviceEntry>> {
    if let Ok(root) = serde_json::from_str::<Value>(body) {
        if root.is_array() {
            if let Ok(list) = Vec::<DeviceEntry>::deserialize(&root) {
                return Ok(list);
            }
        }

        if let Some(obj) = root.as_object() {
            for (key, value) in obj {
                if !key.eq_ignore_ascii_case("data") || !value.is_array() {
                    continue;
                }
                if let Ok(list) = Vec::<DeviceEntry>::deserialize(value) {
                    return Ok(list);
                }
            }
        }
    }

    serde_json::from_str::<Vec<DeviceEntry>>(body)
        .map_err(|e| Error::Decode(format!("device list: {e}")))
}

fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn string_or_number<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number device id, got {other}"
        ))),
    }
}
