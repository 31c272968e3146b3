use super::DeviceId;
use horizon_api::{AssignedDevice, RegionSettings};
use serde::{Deserialize, Serialize};

/// A set-top box assigned to the household
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub friendly_name: String,
    pub hardware_hash: Option<String>,
    pub platform_type: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>, friendly_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            friendly_name: friendly_name.into(),
            hardware_hash: None,
            platform_type: String::new(),
            manufacturer: None,
            model: None,
        }
    }

    /// Build from the personalization record; hardware names come from the region table
    pub fn from_assigned(assigned: &AssignedDevice, region: Option<&RegionSettings>) -> Self {
        let hardware = region.and_then(|r| r.hardware(&assigned.platform_type));
        Self {
            id: DeviceId::new(assigned.device_id.clone()),
            friendly_name: assigned
                .settings
                .device_friendly_name
                .clone()
                .unwrap_or_else(|| assigned.device_id.clone()),
            hardware_hash: assigned.hashed_cpe_id.clone(),
            platform_type: assigned.platform_type.clone(),
            manufacturer: hardware.map(|h| h.manufacturer.to_string()),
            model: hardware.map(|h| h.model.to_string()),
        }
    }
}
