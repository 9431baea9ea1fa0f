use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ScantrackError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub backend: BackendConfig,
    pub supabase: SupabaseConfig,
    pub covers: CoverConfig,
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
    pub log_to_file: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    Supabase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub table: String,
    pub redirect_port: u16,
}

impl SupabaseConfig {
    /// Both the project URL and the anon key are set.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    pub base_url: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    Search,
    ScanManga,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    pub link_style: LinkStyle,
    pub search_url: String,
    pub chapter_keyword: String,
}

impl AppConfig {
    /// Load config: user file (if it exists) merged over built-in defaults.
    ///
    /// `path` overrides the platform config location.
    pub fn load(path: Option<&Path>) -> Result<Self, ScantrackError> {
        let mut merged: toml::Table =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| ScantrackError::Config(e.to_string()))?;

        let user_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if user_path.exists() {
            let user_str = std::fs::read_to_string(&user_path)?;
            let user: toml::Table = toml::from_str(&user_str)
                .map_err(|e| ScantrackError::Config(format!("{}: {e}", user_path.display())))?;
            merge_tables(&mut merged, user);
            tracing::debug!(path = %user_path.display(), "Loaded user config");
        } else if path.is_some() {
            return Err(ScantrackError::Config(format!(
                "config file not found: {}",
                user_path.display()
            )));
        }

        let config: AppConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ScantrackError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save current config to `path`, or the user config file.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ScantrackError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ScantrackError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Reject combinations the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ScantrackError> {
        if self.backend.kind == BackendKind::Supabase && !self.supabase.is_configured() {
            return Err(ScantrackError::Config(
                "backend.kind is \"supabase\" but supabase.url / supabase.anon_key are empty"
                    .into(),
            ));
        }
        url::Url::parse(&self.covers.base_url)
            .map_err(|e| ScantrackError::Config(format!("covers.base_url: {e}")))?;
        url::Url::parse(&self.navigation.search_url)
            .map_err(|e| ScantrackError::Config(format!("navigation.search_url: {e}")))?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory for the database and log files.
    pub fn data_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Path to the database file.
    pub fn db_path() -> PathBuf {
        Self::data_dir().join("scantrack.db")
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, ScantrackError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "scantrack")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// Recursively overlay `overlay` onto `base`; non-table values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.backend.kind, BackendKind::Local);
        assert_eq!(config.supabase.table, "mangas");
        assert_eq!(config.navigation.link_style, LinkStyle::Search);
        assert!(config.covers.placeholder.starts_with("https://placehold.co/"));
        assert!(!config.general.log_to_file);
    }

    #[test]
    fn test_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.supabase.redirect_port, config.supabase.redirect_port);
    }

    #[test]
    fn test_partial_user_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[navigation]\nlink_style = \"scan_manga\"\n\n[supabase]\ntable = \"reading_list\"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.navigation.link_style, LinkStyle::ScanManga);
        assert_eq!(config.navigation.chapter_keyword, "chapter");
        assert_eq!(config.supabase.table, "reading_list");
        assert_eq!(config.supabase.redirect_port, 19743);
    }

    #[test]
    fn test_supabase_backend_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend]\nkind = \"supabase\"\n").unwrap();

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ScantrackError::Config(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.navigation.chapter_keyword = "capitulo".into();

        let written = config.save(Some(&path)).unwrap();
        assert_eq!(written, path);
        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.navigation.chapter_keyword, "capitulo");
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(AppConfig::load(Some(&path)).is_err());
    }
}
