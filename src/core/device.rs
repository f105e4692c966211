//! Drive and media description types

use serde::{Deserialize, Serialize};

/// An optical drive as listed by xorriso
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub path: String,
    pub vendor: String,
    pub model: String,
    #[serde(default)]
    pub profiles: Vec<MediaProfile>,
}

/// A media type the drive can handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaProfile {
    pub name: String,
    /// True for the profile of the loaded medium
    pub current: bool,
}

/// One write speed offered by drive and medium
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedDescriptor {
    /// Speed in kB/s
    pub write_speed: f64,
    /// Label like `BD 2x`
    pub display_name: String,
}

/// State of the medium in a drive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub device_path: String,
    pub media_type: String,
    pub media_status: String,
    /// Free space in bytes
    pub free_space: u64,
    pub erasable: bool,
}
