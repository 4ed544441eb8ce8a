//! Hosts (machines driving devices under test) and their devices.

use serde::{Deserialize, Serialize};

/// A device attached to a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub device_model: String,
}

/// A host machine reachable over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub host_name: String,
    pub host_url: String,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Host {
    pub fn new(host_name: impl Into<String>, host_url: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            host_url: host_url.into(),
            devices: Vec::new(),
        }
    }

    /// Two hosts are the same when both name and URL match.
    pub fn same_identity(&self, other: &Host) -> bool {
        self.host_name == other.host_name && self.host_url == other.host_url
    }

    pub fn device(&self, device_id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }
}
