//! Longform plugin settings.
//!
//! Stored by the plugin in `<vault>/.obsidian/plugins/longform/data.json`.
//! Only the keys used here are modelled; everything else in the file is
//! preserved on save.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::VAULT_MARKER;

/// Environment override for [`LongformSettings::write_property`].
pub const WRITE_PROPERTY_ENV: &str = "LONGFORM_WRITE_PROPERTY";

/// Plugin settings relevant to the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LongformSettings {
    /// Index path of the selected draft.
    pub selected_draft_vault_path: Option<String>,
    /// Write scene order and number properties onto scene notes.
    pub write_property: bool,
    /// Default template for new scenes.
    pub scene_template: Option<String>,
}

/// Settings file path inside a vault.
#[must_use]
pub fn settings_path(vault_root: &Path) -> PathBuf {
    vault_root
        .join(VAULT_MARKER)
        .join("plugins")
        .join("longform")
        .join("data.json")
}

/// Load settings, falling back to defaults when the file is absent.
///
/// # Errors
///
/// Returns a config error if the file exists but cannot be read or parsed.
pub fn load_settings(vault_root: &Path) -> Result<LongformSettings> {
    let path = settings_path(vault_root);

    if !path.exists() {
        return Ok(LongformSettings::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read settings file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse settings file: {e}")))
}

/// Save settings, merging into any existing JSON object.
///
/// # Errors
///
/// Returns a config error if the file cannot be read, parsed or written.
pub fn save_settings(vault_root: &Path, settings: &LongformSettings) -> Result<()> {
    let path = settings_path(vault_root);

    let mut existing = if path.exists() {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read settings file: {e}")))?;
        serde_json::from_str::<serde_json::Value>(&content)
            .map_err(|e| Error::Config(format!("Failed to parse settings file: {e}")))?
    } else {
        serde_json::Value::Object(serde_json::Map::new())
    };

    let serde_json::Value::Object(object) = &mut existing else {
        return Err(Error::Config(
            "Settings file must contain a JSON object".to_string(),
        ));
    };
    if let serde_json::Value::Object(ours) = serde_json::to_value(settings)? {
        object.extend(ours);
    }

    // Ensure directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create settings directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(&existing)
        .map_err(|e| Error::Config(format!("Failed to serialize settings: {e}")))?;

    fs::write(&path, content)
        .map_err(|e| Error::Config(format!("Failed to write settings file: {e}")))?;

    Ok(())
}

/// Resolve whether scene number properties are written.
///
/// Priority: env var > settings file > off.
#[must_use]
pub fn resolve_write_property(settings: &LongformSettings) -> bool {
    if let Ok(value) = std::env::var(WRITE_PROPERTY_ENV) {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => return true,
            "0" | "false" | "no" | "off" => return false,
            _ => {}
        }
    }

    settings.write_property
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_settings(temp.path()).unwrap(), LongformSettings::default());
    }

    #[test]
    fn test_reads_plugin_file_and_ignores_unknown_keys() {
        let temp = TempDir::new().unwrap();
        let path = settings_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"version":3,"selectedDraftVaultPath":"Novel/Index.md","writeProperty":true,"workflows":{}}"#,
        )
        .unwrap();

        let settings = load_settings(temp.path()).unwrap();
        assert_eq!(settings.selected_draft_vault_path.as_deref(), Some("Novel/Index.md"));
        assert!(settings.write_property);
        assert_eq!(settings.scene_template, None);
    }

    #[test]
    fn test_save_preserves_foreign_keys() {
        let temp = TempDir::new().unwrap();
        let path = settings_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"version":3,"workflows":{"Default":{}}}"#).unwrap();

        let settings = LongformSettings {
            selected_draft_vault_path: Some("Essay.md".to_string()),
            ..LongformSettings::default()
        };
        save_settings(temp.path(), &settings).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 3);
        assert!(raw["workflows"]["Default"].is_object());
        assert_eq!(raw["selectedDraftVaultPath"], "Essay.md");
        assert_eq!(load_settings(temp.path()).unwrap(), settings);
    }

    #[test]
    fn test_save_creates_plugin_folder() {
        let temp = TempDir::new().unwrap();
        save_settings(temp.path(), &LongformSettings::default()).unwrap();
        assert!(settings_path(temp.path()).exists());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = settings_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_settings(temp.path()), Err(Error::Config(_))));
    }
}
