//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use diary_core::util::{is_http_url, normalize_text_option};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";
pub const PROFILE_ENV_VAR: &str = "DIARY_PROFILE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub auth_anon_key: Option<String>,
    #[serde(default)]
    pub sync_token_endpoint: Option<String>,
    #[serde(default)]
    pub media_api_base_url: Option<String>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("diary")
        .join(CONFIG_FILE_NAME)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(str::to_string))
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// `--profile`, then `DIARY_PROFILE`, then the active profile, then `default`.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        self.resolve_profile_name_with_env(
            explicit,
            std::env::var(PROFILE_ENV_VAR).ok().as_deref(),
        )
    }

    fn resolve_profile_name_with_env(&self, explicit: Option<&str>, env: Option<&str>) -> String {
        normalize_profile_name(explicit)
            .or_else(|| normalize_profile_name(env))
            .or_else(|| normalize_profile_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| "default".to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn auth_url(&self) -> Option<String> {
        normalize_text_option(self.auth_url.clone())
    }

    pub fn auth_anon_key(&self) -> Option<String> {
        normalize_text_option(self.auth_anon_key.clone())
    }

    pub fn sync_token_endpoint(&self) -> Option<String> {
        normalize_text_option(self.sync_token_endpoint.clone())
    }

    pub fn media_api_base_url(&self) -> Option<String> {
        normalize_text_option(self.media_api_base_url.clone())
    }

    /// Names of configured URL fields that lack an http(s) scheme
    pub fn invalid_url_fields(&self) -> Vec<&'static str> {
        [
            ("auth_url", self.auth_url()),
            ("sync_token_endpoint", self.sync_token_endpoint()),
            ("media_api_base_url", self.media_api_base_url()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.filter(|url| !is_http_url(url)).map(|_| name))
        .collect()
    }

    /// Names of fields still needed for managed sync
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("auth_url", self.auth_url().is_none()),
            ("auth_anon_key", self.auth_anon_key().is_none()),
            ("sync_token_endpoint", self.sync_token_endpoint().is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }

    fn normalize(&mut self) {
        self.auth_url = self.auth_url();
        self.auth_anon_key = self.auth_anon_key();
        self.sync_token_endpoint = self.sync_token_endpoint();
        self.media_api_base_url = self.media_api_base_url();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
        assert_eq!(normalize_profile_name(Some(" work ")), Some("work".to_string()));
    }

    #[test]
    fn config_save_and_load_normalizes_profiles() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" default ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "default".to_string(),
            CliProfile {
                auth_url: Some(" https://project.example.co ".to_string()),
                auth_anon_key: Some(" anon-key ".to_string()),
                sync_token_endpoint: Some(" https://api.example.com/v1/sync/token ".to_string()),
                media_api_base_url: Some("   ".to_string()),
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("default"));
        assert_eq!(
            loaded.profile("default").unwrap(),
            &CliProfile {
                auth_url: Some("https://project.example.co".to_string()),
                auth_anon_key: Some("anon-key".to_string()),
                sync_token_endpoint: Some("https://api.example.com/v1/sync/token".to_string()),
                media_api_base_url: None,
            }
        );
    }

    #[test]
    fn missing_config_file_loads_default() {
        let tmp = tempdir().unwrap();
        let loaded = CliProfilesConfig::load_from_path(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliProfilesConfig::default());
    }

    #[test]
    fn resolve_profile_name_order() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(
            config.resolve_profile_name_with_env(Some("mobile"), Some("env")),
            "mobile"
        );
        assert_eq!(config.resolve_profile_name_with_env(None, Some("env")), "env");
        assert_eq!(config.resolve_profile_name_with_env(None, None), "work");
        assert_eq!(
            CliProfilesConfig::default().resolve_profile_name_with_env(None, Some("  ")),
            "default"
        );
    }

    #[test]
    fn profile_reports_missing_and_invalid_fields() {
        let profile = CliProfile {
            auth_url: Some("project.example.co".to_string()),
            auth_anon_key: None,
            sync_token_endpoint: None,
            media_api_base_url: Some("https://media.example.com".to_string()),
        };
        assert_eq!(profile.invalid_url_fields(), vec!["auth_url"]);
        assert_eq!(
            profile.missing_fields(),
            vec!["auth_anon_key", "sync_token_endpoint"]
        );
    }
}
