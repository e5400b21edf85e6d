use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use diary_core::auth::Identity;
use diary_core::db::SyncConfig;
use diary_core::sync::{SyncToken, SyncTokenClient};
use diary_core::{
    ClientOptions, Diary, DiaryClient, DiaryGroups, DiaryId, PendingImageUpload, RequestState,
};
use futures::StreamExt;
use serde::Serialize;

use crate::auth::{clear_stored_session, load_stored_session, AuthSession, ProfileAuthService};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub const DB_PATH_ENV_VAR: &str = "DIARY_DB_PATH";

/// Client whose identity is the profile's restored session.
pub type CliClient = DiaryClient<Option<AuthSession>>;

/// The resolved profile and its signed-in session, if any.
pub struct ProfileContext {
    pub name: String,
    pub profile: Option<CliProfile>,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Serialize)]
pub struct DayItem {
    pub date: String,
    pub diaries: Vec<Diary>,
}

#[derive(Clone, Copy)]
pub enum OpenClientMode {
    Standard,
    RequireSync,
}

impl OpenClientMode {
    const fn requires_sync(self) -> bool {
        matches!(self, Self::RequireSync)
    }
}

pub async fn resolve_profile_context(explicit: Option<&str>) -> Result<ProfileContext, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let name = config.resolve_profile_name(explicit);
    let profile = config.profile(&name).cloned();
    let session = restore_profile_session(&name, profile.as_ref()).await?;

    Ok(ProfileContext {
        name,
        profile,
        session,
    })
}

/// Restore through the auth service when configured; otherwise fall back to
/// the stored session, dropping it once expired.
pub async fn restore_profile_session(
    profile_name: &str,
    profile: Option<&CliProfile>,
) -> Result<Option<AuthSession>, CliError> {
    let service = match profile {
        Some(profile) => ProfileAuthService::new_for_profile(profile_name, profile)
            .map_err(|error| CliError::Auth(error.to_string()))?,
        None => None,
    };

    if let Some(service) = service {
        return service
            .restore_session()
            .await
            .map_err(|error| CliError::Auth(error.to_string()));
    }

    let session =
        load_stored_session(profile_name).map_err(|error| CliError::Auth(error.to_string()))?;
    match session {
        Some(session) if session.is_expired() => {
            clear_stored_session(profile_name)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            Ok(None)
        }
        session => Ok(session),
    }
}

pub async fn open_client(
    db_path: &Path,
    context: &ProfileContext,
    mode: OpenClientMode,
) -> Result<CliClient, CliError> {
    let mut options = ClientOptions::local(db_path);
    if let Some(sync) = sync_config_for(context, mode).await? {
        options = options.with_sync(sync);
    }
    Ok(DiaryClient::connect(options, context.session.clone()).await?)
}

async fn sync_config_for(
    context: &ProfileContext,
    mode: OpenClientMode,
) -> Result<Option<SyncConfig>, CliError> {
    let endpoint = context
        .profile
        .as_ref()
        .and_then(CliProfile::sync_token_endpoint);
    let (Some(endpoint), Some(session)) = (endpoint, context.session.as_ref()) else {
        if mode.requires_sync() {
            return Err(CliError::SyncNotConfigured);
        }
        return Ok(None);
    };

    let client =
        SyncTokenClient::new(endpoint).map_err(|error| CliError::ManagedSync(error.to_string()))?;
    let token = client
        .exchange_token(&session.access_token)
        .await
        .map_err(|error| CliError::ManagedSync(error.to_string()))?;
    let config = sync_config_from_token(&token)?;

    tracing::info!("Managed sync enabled via profile '{}'", context.name);
    Ok(Some(config))
}

/// Replica settings for a freshly exchanged token.
pub fn sync_config_from_token(token: &SyncToken) -> Result<SyncConfig, CliError> {
    if token.is_expired() {
        return Err(CliError::ManagedSync(format!(
            "Issued sync token already expired at {}; check the system clock",
            token.expires_at
        )));
    }
    token.to_sync_config(None).ok_or_else(|| {
        CliError::ManagedSync("Response did not include database_url".to_string())
    })
}

/// Drop queue rows pushed for a write that did not land.
pub async fn discard_queued<I: Identity>(client: &DiaryClient<I>, queued: &[PendingImageUpload]) {
    for item in queued {
        if let Err(error) = client.clear_upload(item.id).await {
            tracing::warn!(
                "Failed to drop queued upload {}: {}",
                item.remote_path,
                error
            );
        }
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(DB_PATH_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("diary")
        .join("diary.db")
}

/// Unwrap a finished request, surfacing its error kind.
pub fn into_cli_result<T>(state: RequestState<T>) -> Result<T, CliError> {
    match state {
        RequestState::Success(value) => Ok(value),
        RequestState::Error(error) => Err(error.into()),
        RequestState::Idle | RequestState::Loading => Err(CliError::Core(
            diary_core::Error::Database("Request did not complete".to_string()),
        )),
    }
}

/// First snapshot of the live listing.
pub async fn current_groups<I, Tz>(client: &DiaryClient<I>, tz: Tz) -> Result<DiaryGroups, CliError>
where
    I: Identity,
    Tz: TimeZone + Send + Sync + 'static,
{
    let mut listing = Box::pin(client.observe_diaries_in(tz));
    match listing.next().await {
        Some(state) => into_cli_result(state),
        None => Err(CliError::Core(diary_core::Error::Closed)),
    }
}

pub fn normalize_diary_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyDiaryId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Find a diary by full ID or by a unique ID prefix.
pub async fn resolve_diary<I: Identity>(
    client: &DiaryClient<I>,
    query: &str,
) -> Result<Diary, CliError> {
    let query = normalize_diary_identifier(query)?;

    if let Ok(id) = query.parse::<DiaryId>() {
        match client.get_diary(&id).await {
            RequestState::Error(diary_core::Error::NotFound(_)) => {}
            state => return into_cli_result(state),
        }
    }

    let groups = current_groups(client, Utc).await?;
    let mut matching = groups
        .iter()
        .flat_map(|(_, diaries)| diaries)
        .filter(|diary| diary.id.to_string().starts_with(&query))
        .take(3)
        .cloned()
        .collect::<Vec<_>>();

    match matching.len() {
        0 => Err(CliError::DiaryNotFound(query)),
        1 => Ok(matching.remove(0)),
        _ => {
            let options = matching
                .iter()
                .map(|diary| short_id(&diary.id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousDiaryId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| CliError::InvalidDate(raw.to_string()))
}

pub fn short_id(id: &DiaryId) -> String {
    id.to_string().chars().take(13).collect()
}

pub fn format_group_lines<Tz>(groups: &DiaryGroups, tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = Vec::new();
    for (date, diaries) in groups.iter() {
        lines.push(date.format("%a %Y-%m-%d").to_string());
        for diary in diaries {
            let time = diary.date.with_timezone(tz).format("%H:%M");
            let title = title_preview(&diary.title, 40);
            let mood = diary.mood.name();
            let images = match diary.images.len() {
                0 => String::new(),
                1 => "  [1 image]".to_string(),
                count => format!("  [{count} images]"),
            };
            lines.push(format!(
                "  {:<13}  {time}  {mood:<12}  {title}{images}",
                short_id(&diary.id)
            ));
        }
    }
    lines
}

pub fn format_diary_detail<Tz>(diary: &Diary, tz: &Tz, now_ms: i64) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = vec![
        format!("id:     {}", diary.id),
        format!("title:  {}", diary.title),
        format!("mood:   {}", diary.mood),
        format!(
            "date:   {} ({})",
            diary.date.with_timezone(tz).format("%Y-%m-%d %H:%M"),
            format_relative_time(diary.date.timestamp_millis(), now_ms)
        ),
    ];
    for image in &diary.images {
        lines.push(format!("image:  {image}"));
    }
    if !diary.description.is_empty() {
        lines.push(String::new());
        lines.push(diary.description.clone());
    }
    lines
}

pub fn group_items(groups: &DiaryGroups) -> Vec<DayItem> {
    groups
        .iter()
        .map(|(date, diaries)| DayItem {
            date: date.to_string(),
            diaries: diaries.clone(),
        })
        .collect()
}

pub fn title_preview(title: &str, max_chars: usize) -> String {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "(untitled)".to_string();
    }

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
