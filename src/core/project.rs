//! Burn project description
//!
//! A project is what the user assembled for one disc: the source-to-image
//! path mapping plus the ISO and write options. Projects are plain data and
//! round-trip through JSON so front ends can save them.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A file or directory placed on the disc
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Path on the local filesystem
    pub source_path: String,
    /// Path inside the ISO image
    pub dest_path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
}

impl FileEntry {
    /// Map `source` to the image root under its own file name
    pub fn at_root(source: &str) -> Self {
        let name = Path::new(source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source_path: source.to_string(),
            dest_path: format!("/{}", name),
            name,
            ..Default::default()
        }
    }
}

/// ISO 9660 image options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IsoOptions {
    pub rock_ridge: bool,
    pub joliet: bool,
    pub md5: bool,
    pub backup_mode: bool,
}

impl Default for IsoOptions {
    fn default() -> Self {
        Self {
            rock_ridge: true,
            joliet: true,
            md5: true,
            backup_mode: false,
        }
    }
}

/// Write options for one burn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BurnOptions {
    /// Drive speed; empty or `auto` leaves the choice to xorriso
    pub speed: String,
    pub dummy_mode: bool,
    pub verify: bool,
    pub close_disc: bool,
    pub stream_recording: bool,
    pub eject: bool,
}

impl Default for BurnOptions {
    fn default() -> Self {
        Self {
            speed: "auto".to_string(),
            dummy_mode: false,
            verify: true,
            close_disc: true,
            stream_recording: false,
            eject: true,
        }
    }
}

impl BurnOptions {
    /// Speed to pass to `-speed`, if any
    pub fn explicit_speed(&self) -> Option<&str> {
        match self.speed.trim() {
            "" | "auto" => None,
            s => Some(s),
        }
    }
}

/// Everything needed to burn one disc
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub entries: Vec<FileEntry>,
    #[serde(default)]
    pub iso_options: IsoOptions,
    #[serde(default)]
    pub burn_options: BurnOptions,
}

impl Project {
    /// Load a project saved as JSON
    pub fn load(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read project file: {}", e))?;

        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse project file: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_speed() {
        let mut opts = BurnOptions::default();
        assert_eq!(opts.explicit_speed(), None);

        opts.speed = String::new();
        assert_eq!(opts.explicit_speed(), None);

        opts.speed = "8".into();
        assert_eq!(opts.explicit_speed(), Some("8"));
    }

    #[test]
    fn test_entry_at_root() {
        let entry = FileEntry::at_root("/home/me/photos");
        assert_eq!(entry.dest_path, "/photos");
        assert_eq!(entry.name, "photos");
    }

    #[test]
    fn test_load_partial_project() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(
            &path,
            r#"{"volumeId":"BACKUP","entries":[{"sourcePath":"/a","destPath":"/a"}],
                "burnOptions":{"speed":"4","verify":false}}"#,
        )
        .unwrap();

        let project = Project::load(&path).unwrap();
        assert_eq!(project.volume_id, "BACKUP");
        assert_eq!(project.entries.len(), 1);
        assert_eq!(project.burn_options.speed, "4");
        assert!(!project.burn_options.verify);
        // Missing fields fall back to defaults
        assert!(project.burn_options.close_disc);
        assert!(project.iso_options.rock_ridge);
    }

    #[test]
    fn test_load_missing_project() {
        let err = Project::load(Path::new("/nonexistent/project.json")).unwrap_err();
        assert!(err.contains("Failed to read"));
    }
}
