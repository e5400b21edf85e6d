use std::env;

use diary_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values for one profile from flags, falling back to environment variables.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfileValues {
    pub auth_url: Option<String>,
    pub auth_anon_key: Option<String>,
    pub sync_token_endpoint: Option<String>,
    pub media_api_base_url: Option<String>,
}

impl ProfileValues {
    fn with_env_fallback(self) -> Self {
        let env_value = |key: &str| normalize_text_option(env::var(key).ok());
        Self {
            auth_url: normalize_text_option(self.auth_url)
                .or_else(|| env_value("DIARY_AUTH_URL")),
            auth_anon_key: normalize_text_option(self.auth_anon_key)
                .or_else(|| env_value("DIARY_AUTH_ANON_KEY")),
            sync_token_endpoint: normalize_text_option(self.sync_token_endpoint)
                .or_else(|| env_value("DIARY_SYNC_TOKEN_ENDPOINT")),
            media_api_base_url: normalize_text_option(self.media_api_base_url)
                .or_else(|| env_value("DIARY_MEDIA_API_BASE_URL")),
        }
    }
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            auth_url,
            auth_anon_key,
            sync_token_endpoint,
            media_api_base_url,
            no_activate,
        } => {
            let values = ProfileValues {
                auth_url,
                auth_anon_key,
                sync_token_endpoint,
                media_api_base_url,
            }
            .with_env_fallback();

            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name =
                apply_profile_values(&mut config, profile.as_deref().or(global_profile), values, no_activate)?;
            let path = config.save().map_err(CliError::Config)?;
            println!("Profile '{}' initialized at {}", profile_name, path.display());

            let missing = config
                .profile(&profile_name)
                .map(CliProfile::missing_fields)
                .unwrap_or_default();
            if missing.is_empty() {
                println!(
                    "Profile '{profile_name}' is ready. Run `diary auth login --email <email> --password <password>`."
                );
            } else {
                println!("Profile '{}' is missing: {}", profile_name, missing.join(", "));
            }
            Ok(())
        }
    }
}

/// Merge `values` over the existing profile and validate the result.
///
/// Returns the resolved profile name. `config` is left untouched on error.
pub fn apply_profile_values(
    config: &mut CliProfilesConfig,
    explicit_profile: Option<&str>,
    values: ProfileValues,
    no_activate: bool,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(explicit_profile);
    let mut profile = config.profile(&profile_name).cloned().unwrap_or_default();

    if let Some(value) = values.auth_url {
        profile.auth_url = Some(value);
    }
    if let Some(value) = values.auth_anon_key {
        profile.auth_anon_key = Some(value);
    }
    if let Some(value) = values.sync_token_endpoint {
        profile.sync_token_endpoint = Some(value);
    }
    if let Some(value) = values.media_api_base_url {
        profile.media_api_base_url = Some(value);
    }

    let invalid = profile.invalid_url_fields();
    if !invalid.is_empty() {
        return Err(CliError::Config(format!(
            "{} must include http:// or https://",
            invalid.join(", ")
        )));
    }

    *config.profile_mut_or_default(&profile_name) = profile;
    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }
    Ok(profile_name)
}
