//! Loading and saving `Settings` as YAML.

use std::path::{Path, PathBuf};

use crate::error::TerminalError;
use crate::types::config::Settings;


pub const SETTINGS_FILE: &str = "terminal.yaml";


/// Path of the settings file inside a config directory.
pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE)
}


/// Load settings from `<config_dir>/terminal.yaml`. A missing file yields the
/// defaults; an unreadable or malformed one is an error.
pub fn load_dir(config_dir: &Path) -> Result<Settings, TerminalError> {
    let path = settings_path(config_dir);
    if !path.exists() {
        return Ok(Settings::default());
    }
    load(&path)
}


pub fn load(path: &Path) -> Result<Settings, TerminalError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TerminalError::io("reading settings", path, e))?;
    parse(&content, path)
}


/// Parse settings text. `origin` is only used in error messages.
pub fn parse(content: &str, origin: &Path) -> Result<Settings, TerminalError> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(content).map_err(|source| TerminalError::Settings {
        path: origin.to_path_buf(),
        source,
    })
}


pub fn save(path: &Path, settings: &Settings) -> Result<(), TerminalError> {
    let content = serde_yaml::to_string(settings).map_err(|source| TerminalError::Settings {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content).map_err(|e| TerminalError::io("writing settings", path, e))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::UserConfig;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_dir(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn empty_file_gives_defaults() {
        let settings = parse("\n   \n", Path::new("terminal.yaml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn malformed_file_is_error() {
        let err = parse("help_page_size: [oops", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, TerminalError::Settings { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn wrong_type_is_error() {
        assert!(parse("help_page_size: many", Path::new("t.yaml")).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.help_page_size = 3;
        settings.users.push(UserConfig {
            name: "sysop".into(),
            roles: vec!["Administrator".into(), "User".into()],
            aliases: Default::default(),
        });
        save(&settings_path(dir.path()), &settings).unwrap();
        let loaded = load_dir(dir.path()).unwrap();
        assert_eq!(loaded, settings);
    }
}
