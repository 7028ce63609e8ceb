use crate::app::error::{AppError, Result};
use crate::app::models::EnumerationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

pub const DEFAULT_SETTINGS_PATH: &str = "settings.toml";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_BASE_DIR: &str = "../";
pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_MAX_FILES: usize = 1000;
pub const DEFAULT_IGNORE_EXTENSIONS: &[&str] = &[".tmp", ".log", ".bak"];
pub const DEFAULT_QA_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_QA_TIMEOUT_SECS: u64 = 120;

/// On-disk settings record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_ignore_extensions")]
    pub ignore_extensions: Vec<String>,
    #[serde(default = "default_qa_endpoint")]
    pub qa_endpoint: String,
    #[serde(default = "default_qa_timeout_secs")]
    pub qa_timeout_secs: u64,
}

fn default_base_dir() -> String {
    DEFAULT_BASE_DIR.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

fn default_ignore_extensions() -> Vec<String> {
    DEFAULT_IGNORE_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_qa_endpoint() -> String {
    DEFAULT_QA_ENDPOINT.to_string()
}

fn default_qa_timeout_secs() -> u64 {
    DEFAULT_QA_TIMEOUT_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            max_depth: default_max_depth(),
            max_files: default_max_files(),
            ignore_extensions: default_ignore_extensions(),
            qa_endpoint: default_qa_endpoint(),
            qa_timeout_secs: default_qa_timeout_secs(),
        }
    }
}

impl Settings {
    fn read_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No settings at {:?}, writing defaults", path);
            let settings = Settings::default();
            write_settings(path, &settings)?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path).map_err(|source| AppError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| AppError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    let content = toml::to_string_pretty(settings).map_err(|e| AppError::SettingsWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, content).map_err(|e| AppError::SettingsWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Expands a leading `~` and makes the path absolute, canonicalizing when it exists.
pub fn resolve_dir(raw: &str) -> Result<PathBuf> {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
            let home = dirs::home_dir().ok_or_else(|| {
                AppError::InvalidDirectory("Could not determine home directory".to_string())
            })?;
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        _ => PathBuf::from(raw),
    };

    match expanded.canonicalize() {
        Ok(path) => Ok(path),
        Err(_) => Ok(std::path::absolute(&expanded)?),
    }
}

fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext == "." {
        return None;
    }
    if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{}", ext))
    }
}

struct StoreState {
    settings: Settings,
    base_dir: PathBuf,
}

/// Owns the settings file and the process-wide base directory.
///
/// Readers take snapshots; `update_base_dir` is the only writer. No snapshot
/// isolation is promised to in-flight readers: the last writer wins.
pub struct SettingsStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl SettingsStore {
    /// Loads settings from `path`, creating the file with defaults if absent.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Settings::read_or_create(&path)?;
        let base_dir = resolve_dir(&settings.base_dir)?;
        log::debug!("Loaded settings from {:?}, base dir {:?}", path, base_dir);

        Ok(Self {
            path,
            state: RwLock::new(StoreState { settings, base_dir }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Settings {
        self.read(|state| state.settings.clone())
    }

    pub fn base_dir(&self) -> PathBuf {
        self.read(|state| state.base_dir.clone())
    }

    pub fn enumeration_config(&self) -> EnumerationConfig {
        self.read(|state| EnumerationConfig {
            base_dir: state.base_dir.clone(),
            max_depth: state.settings.max_depth,
            max_files: state.settings.max_files,
            ignored_extensions: state
                .settings
                .ignore_extensions
                .iter()
                .filter_map(|ext| normalize_extension(ext))
                .collect(),
        })
    }

    /// Points the process at a different base directory for this run only.
    pub fn override_base_dir(&self, raw: &str) -> Result<PathBuf> {
        let new_dir = validated_dir(raw)?;
        self.write(|state| state.base_dir = new_dir.clone());
        Ok(new_dir)
    }

    /// Validates `raw`, persists it, then swaps it in. On any failure the
    /// in-memory state is left untouched.
    pub fn update_base_dir(&self, raw: &str) -> Result<PathBuf> {
        let new_dir = validated_dir(raw)?;
        self.persist(&new_dir)?;
        log::info!("Base directory updated to {:?}", new_dir);
        Ok(new_dir)
    }

    /// Writes the full settings back with only `base_dir` replaced, then
    /// makes it current.
    pub fn persist(&self, base_dir: &Path) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut settings = state.settings.clone();
        settings.base_dir = base_dir.to_string_lossy().into_owned();
        write_settings(&self.path, &settings)?;
        state.settings = settings;
        state.base_dir = base_dir.to_path_buf();
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn write(&self, f: impl FnOnce(&mut StoreState)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

fn validated_dir(raw: &str) -> Result<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidDirectory(
            "No directory was provided.".to_string(),
        ));
    }
    let path = resolve_dir(raw)?;
    if !path.is_dir() {
        return Err(AppError::InvalidDirectory(
            "The specified path is not a valid directory.".to_string(),
        ));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_default_settings_when_missing() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("settings.toml");

        let store = SettingsStore::load(&path).expect("load");

        assert!(path.is_file());
        assert_eq!(store.settings(), Settings::default());
        let config = store.enumeration_config();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_files, DEFAULT_MAX_FILES);
        assert!(config.ignored_extensions.contains(".log"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("settings.toml");
        let base = temp.path().join("project");
        fs::create_dir(&base).expect("mkdir");
        fs::write(
            &path,
            format!(
                "base_dir = {:?}\nmax_depth = 1\nignore_extensions = [\"LOG\", \".Bak\"]\n",
                base.to_string_lossy()
            ),
        )
        .expect("write");

        let store = SettingsStore::load(&path).expect("load");
        let config = store.enumeration_config();

        assert_eq!(config.base_dir, base.canonicalize().expect("canonical"));
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.max_files, DEFAULT_MAX_FILES);
        assert!(config.ignored_extensions.contains(".log"));
        assert!(config.ignored_extensions.contains(".bak"));
        assert_eq!(store.settings().qa_timeout_secs, DEFAULT_QA_TIMEOUT_SECS);
    }

    #[test]
    fn update_base_dir_persists_and_reloads() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("settings.toml");
        let target = temp.path().join("target_dir");
        fs::create_dir(&target).expect("mkdir");

        let store = SettingsStore::load(&path).expect("load");
        let updated = store
            .update_base_dir(&target.to_string_lossy())
            .expect("update");

        assert_eq!(store.base_dir(), updated);
        let reloaded = SettingsStore::load(&path).expect("reload");
        assert_eq!(reloaded.base_dir(), updated);
        assert_eq!(reloaded.settings().max_files, DEFAULT_MAX_FILES);
    }

    #[test]
    fn persist_rewrites_only_base_dir() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("settings.toml");
        fs::write(&path, "max_depth = 7\nmax_files = 12\n").expect("write");
        let store = SettingsStore::load(&path).expect("load");

        store.persist(temp.path()).expect("persist");

        let reloaded = SettingsStore::load(&path).expect("reload");
        assert_eq!(
            reloaded.base_dir(),
            temp.path().canonicalize().expect("canonical")
        );
        assert_eq!(reloaded.settings().max_depth, 7);
        assert_eq!(reloaded.settings().max_files, 12);
    }

    #[test]
    fn invalid_directory_leaves_state_untouched() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("settings.toml");
        let store = SettingsStore::load(&path).expect("load");
        let before = store.base_dir();
        let on_disk = fs::read_to_string(&path).expect("read");

        let file = temp.path().join("plain.txt");
        fs::write(&file, "x").expect("write");
        let err = store
            .update_base_dir(&file.to_string_lossy())
            .expect_err("file is not a directory");

        assert!(matches!(err, AppError::InvalidDirectory(_)));
        assert_eq!(store.base_dir(), before);
        assert_eq!(fs::read_to_string(&path).expect("read"), on_disk);
    }

    #[test]
    fn override_does_not_touch_settings_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("settings.toml");
        let store = SettingsStore::load(&path).expect("load");
        let on_disk = fs::read_to_string(&path).expect("read");

        let overridden = store
            .override_base_dir(&temp.path().to_string_lossy())
            .expect("override");

        assert_eq!(store.base_dir(), overridden);
        assert_eq!(fs::read_to_string(&path).expect("read"), on_disk);
    }

    #[test]
    fn extensions_are_normalized() {
        assert_eq!(normalize_extension("LOG"), Some(".log".to_string()));
        assert_eq!(normalize_extension(".Tmp"), Some(".tmp".to_string()));
        assert_eq!(normalize_extension(" "), None);
    }
}
