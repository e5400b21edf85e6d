use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Utc};
use diary_core::auth::AuthUser;
use diary_core::storage::ImageStorage;
use diary_core::sync::SyncToken;
use diary_core::{Diary, DiaryClient, ImageLink, Mood, RequestState, UploadReport};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::auth::{load_stored_session, store_session_for_test, AuthSession};
use crate::commands::add::{run_add, AddArgs};
use crate::commands::attach::{attach_and_save, run_attach};
use crate::commands::common::{
    current_groups, format_diary_detail, format_group_lines, format_relative_time,
    into_cli_result, normalize_diary_identifier, parse_date, resolve_diary,
    restore_profile_session, sync_config_from_token, title_preview, ProfileContext,
};
use crate::commands::config::{apply_profile_values, ProfileValues};
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, EditArgs};
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::commands::uploads::{media_client_for, run_uploads_flush};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

async fn client() -> DiaryClient<AuthUser> {
    DiaryClient::open_in_memory(AuthUser {
        id: "U".to_string(),
        email: None,
    })
    .await
    .unwrap()
}

fn at(rfc3339: &str) -> DateTime<Utc> {
    parse_date(rfc3339).unwrap()
}

async fn insert(client: &DiaryClient<AuthUser>, title: &str) -> Diary {
    into_cli_result(
        client
            .insert_diary(&Diary::new(title, "", Mood::Calm))
            .await,
    )
    .unwrap()
}

#[derive(Default)]
struct RecordingStorage {
    uploaded: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl ImageStorage for RecordingStorage {
    async fn upload(
        &self,
        remote_path: &str,
        _content_type: &str,
        _bytes: &[u8],
    ) -> diary_core::Result<()> {
        self.uploaded.lock().unwrap().push(remote_path.to_string());
        Ok(())
    }

    async fn download_url(&self, remote_path: &str) -> diary_core::Result<String> {
        Ok(format!("https://media.example.com/{remote_path}"))
    }

    async fn delete(&self, remote_path: &str) -> diary_core::Result<()> {
        self.deleted.lock().unwrap().push(remote_path.to_string());
        Ok(())
    }
}

#[test]
fn title_preview_truncates_with_ellipsis() {
    assert_eq!(
        title_preview("A very long   title that should be shortened", 20),
        "A very long title..."
    );
    assert_eq!(title_preview("  ", 20), "(untitled)");
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn parse_date_accepts_offsets_and_rejects_garbage() {
    assert_eq!(
        at("2024-01-02T01:00:00+02:00"),
        at("2024-01-01T23:00:00Z")
    );
    assert!(matches!(parse_date("yesterday"), Err(CliError::InvalidDate(_))));
}

#[test]
fn normalize_diary_identifier_rejects_empty() {
    assert!(matches!(
        normalize_diary_identifier("   "),
        Err(CliError::EmptyDiaryId)
    ));
    assert_eq!(normalize_diary_identifier(" abc ").unwrap(), "abc");
}

#[test]
fn into_cli_result_rejects_unfinished_request() {
    let idle: RequestState<u32> = RequestState::Idle;
    assert!(into_cli_result(idle).is_err());

    let missing: RequestState<u32> =
        RequestState::Error(diary_core::Error::NotFound("x".to_string()));
    assert!(matches!(
        into_cli_result(missing),
        Err(CliError::Core(diary_core::Error::NotFound(_)))
    ));
}

#[test]
fn format_diary_detail_lists_fields_and_images() {
    let diary = Diary::new("Trip", "Went to the sea.", Mood::Happy)
        .with_date(at("2024-05-01T10:00:00Z"))
        .with_images(vec!["images/U/sea-1.jpg".to_string()]);
    let now = at("2024-05-01T12:00:00Z").timestamp_millis();

    let lines = format_diary_detail(&diary, &Utc, now);
    assert!(lines.contains(&"title:  Trip".to_string()));
    assert!(lines.contains(&"mood:   Happy".to_string()));
    assert!(lines.contains(&"date:   2024-05-01 10:00 (2h ago)".to_string()));
    assert!(lines.contains(&"image:  images/U/sea-1.jpg".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("Went to the sea."));
}

#[tokio::test(flavor = "multi_thread")]
async fn format_group_lines_uses_local_day_headers() {
    let client = client().await;
    for date in ["2024-01-01T23:00:00Z", "2024-01-02T01:00:00Z"] {
        into_cli_result(
            client
                .insert_diary(&Diary::new(date, "", Mood::Tense).with_date(at(date)))
                .await,
        )
        .unwrap();
    }

    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    let groups = current_groups(&client, plus_two).await.unwrap();
    let lines = format_group_lines(&groups, &plus_two);

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Tue 2024-01-02");
    assert!(lines[1].contains("03:00  Tense"));
    assert!(lines[2].contains("01:00  Tense"));
}

#[tokio::test(flavor = "multi_thread")]
async fn resolve_diary_supports_exact_and_prefix_id() {
    let client = client().await;
    let stored = insert(&client, "A").await;
    let id = stored.id.to_string();

    assert_eq!(resolve_diary(&client, &id).await.unwrap(), stored);
    assert_eq!(resolve_diary(&client, &id[..13]).await.unwrap(), stored);
}

#[tokio::test(flavor = "multi_thread")]
async fn resolve_diary_rejects_ambiguous_and_missing() {
    let client = client().await;
    let first = insert(&client, "A").await;
    insert(&client, "B").await;

    let shared_prefix = &first.id.to_string()[..4];
    assert!(matches!(
        resolve_diary(&client, shared_prefix).await,
        Err(CliError::AmbiguousDiaryId(_))
    ));
    assert!(matches!(
        resolve_diary(&client, "ffffffff").await,
        Err(CliError::DiaryNotFound(_))
    ));
    assert!(matches!(
        resolve_diary(&client, &diary_core::DiaryId::new().to_string()).await,
        Err(CliError::DiaryNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_add_queues_images_with_entry() {
    let tmp = tempdir().unwrap();
    let image = tmp.path().join("beach.jpg");
    std::fs::write(&image, b"jpeg").unwrap();

    let client = client().await;
    let stored = run_add(
        &client,
        AddArgs {
            title: "Beach".to_string(),
            description: "Sunny".to_string(),
            mood: Mood::Happy,
            date: Some("2024-07-01T09:00:00Z".to_string()),
            images: vec![image],
        },
    )
    .await
    .unwrap();

    assert_eq!(stored.owner_id, "U");
    assert_eq!(stored.date, at("2024-07-01T09:00:00Z"));
    assert_eq!(stored.images.len(), 1);
    let pending = client.pending_uploads().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].remote_path, stored.images[0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn run_edit_keeps_omitted_fields() {
    let client = client().await;
    let stored = into_cli_result(
        client
            .insert_diary(&Diary::new("A", "body", Mood::Calm))
            .await,
    )
    .unwrap();

    let updated = run_edit(
        &client,
        &stored.id.to_string(),
        EditArgs {
            mood: Some(Mood::Angry),
            ..EditArgs::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(
        updated,
        Diary {
            mood: Mood::Angry,
            ..stored
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn run_delete_removes_by_prefix() {
    let client = client().await;
    let stored = insert(&client, "A").await;

    let deleted = run_delete::<_, RecordingStorage>(&client, &stored.id.to_string()[..13], None)
        .await
        .unwrap();
    assert_eq!(deleted, stored);
    assert!(current_groups(&client, Utc).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_attach_persists_remote_path_and_flush_drains_queue() {
    let tmp = tempdir().unwrap();
    let image = tmp.path().join("cat.png");
    std::fs::write(&image, b"png").unwrap();

    let client = client().await;
    let stored = insert(&client, "A").await;
    let updated = run_attach(&client, &stored.id.to_string(), &image)
        .await
        .unwrap();
    assert_eq!(updated.images.len(), 1);

    let storage = RecordingStorage::default();
    let report = run_uploads_flush(&client, &storage).await.unwrap();
    assert_eq!(report, UploadReport { uploaded: 1, failed: 0 });
    assert_eq!(*storage.uploaded.lock().unwrap(), updated.images);
    assert!(client.pending_uploads().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_add_leaves_nothing_queued_when_an_image_is_missing() {
    let tmp = tempdir().unwrap();
    let present = tmp.path().join("present.jpg");
    std::fs::write(&present, b"jpeg").unwrap();

    let client = client().await;
    let result = run_add(
        &client,
        AddArgs {
            title: "Beach".to_string(),
            description: String::new(),
            mood: Mood::Happy,
            date: None,
            images: vec![present, tmp.path().join("missing.jpg")],
        },
    )
    .await;

    assert!(matches!(result, Err(CliError::Core(_))));
    assert!(client.pending_uploads().await.unwrap().is_empty());
    assert!(current_groups(&client, Utc).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn attach_to_vanished_entry_leaves_nothing_queued() {
    let tmp = tempdir().unwrap();
    let image = tmp.path().join("cat.png");
    std::fs::write(&image, b"png").unwrap();

    let client = client().await;
    let stored = insert(&client, "A").await;
    into_cli_result(client.delete_diary(&stored.id).await).unwrap();

    let result = attach_and_save(&client, stored, &image).await;

    assert!(matches!(result, Err(CliError::Core(diary_core::Error::NotFound(_)))));
    assert!(client.pending_uploads().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_show_resolves_image_urls_through_storage() {
    let client = client().await;
    let stored = into_cli_result(
        client
            .insert_diary(
                &Diary::new("A", "", Mood::Calm)
                    .with_images(vec!["images/U/a-1.jpg".to_string()]),
            )
            .await,
    )
    .unwrap();
    let storage = RecordingStorage::default();

    let links = run_show(&client, &stored.id.to_string(), false, Some(&storage))
        .await
        .unwrap();
    assert_eq!(
        links,
        vec![ImageLink {
            remote_path: "images/U/a-1.jpg".to_string(),
            url: Some("https://media.example.com/images/U/a-1.jpg".to_string()),
        }]
    );

    let without_storage = run_show::<_, RecordingStorage>(&client, &stored.id.to_string(), true, None)
        .await
        .unwrap();
    assert!(without_storage.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_delete_purges_uploaded_images_and_unqueues_pending_ones() {
    let tmp = tempdir().unwrap();
    let image = tmp.path().join("new.jpg");
    std::fs::write(&image, b"jpeg").unwrap();

    let client = client().await;
    let stored = into_cli_result(
        client
            .insert_diary(
                &Diary::new("A", "", Mood::Calm)
                    .with_images(vec!["images/U/old-1.jpg".to_string()]),
            )
            .await,
    )
    .unwrap();
    let updated = run_attach(&client, &stored.id.to_string(), &image)
        .await
        .unwrap();

    let storage = RecordingStorage::default();
    let deleted = run_delete(&client, &stored.id.to_string(), Some(&storage))
        .await
        .unwrap();

    assert_eq!(deleted, updated);
    assert_eq!(
        *storage.deleted.lock().unwrap(),
        vec!["images/U/old-1.jpg".to_string()]
    );
    assert!(client.pending_uploads().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_delete_without_storage_still_unqueues_pending_images() {
    let tmp = tempdir().unwrap();
    let image = tmp.path().join("new.jpg");
    std::fs::write(&image, b"jpeg").unwrap();

    let client = client().await;
    let stored = insert(&client, "A").await;
    run_attach(&client, &stored.id.to_string(), &image)
        .await
        .unwrap();

    run_delete::<_, RecordingStorage>(&client, &stored.id.to_string(), None)
        .await
        .unwrap();
    assert!(client.pending_uploads().await.unwrap().is_empty());
}

#[test]
fn sync_config_from_token_rejects_expired_or_urlless_tokens() {
    let token = SyncToken {
        token: "replica-token".to_string(),
        expires_at: i64::MAX,
        database_url: Some("libsql://diary.turso.io".to_string()),
    };
    let config = sync_config_from_token(&token).unwrap();
    assert_eq!(config.url, "libsql://diary.turso.io");

    let expired = SyncToken {
        expires_at: 0,
        ..token.clone()
    };
    assert!(matches!(
        sync_config_from_token(&expired),
        Err(CliError::ManagedSync(_))
    ));

    let urlless = SyncToken {
        database_url: None,
        ..token
    };
    assert!(matches!(
        sync_config_from_token(&urlless),
        Err(CliError::ManagedSync(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_sync_requires_sync_configuration() {
    let client = client().await;
    assert!(matches!(
        run_sync(&client).await,
        Err(CliError::SyncNotConfigured)
    ));
}

#[test]
fn media_client_requires_base_url_and_session() {
    let context = ProfileContext {
        name: "default".to_string(),
        profile: Some(CliProfile {
            media_api_base_url: Some("https://media.example.com".to_string()),
            ..CliProfile::default()
        }),
        session: None,
    };
    assert!(matches!(
        media_client_for(&context),
        Err(CliError::UploadsNotConfigured)
    ));

    let signed_in = ProfileContext {
        session: Some(session(i64::MAX)),
        ..context
    };
    assert!(media_client_for(&signed_in).is_ok());
}

#[test]
fn apply_profile_values_merges_and_activates() {
    let mut config = CliProfilesConfig {
        version: 1,
        active_profile: None,
        profiles: BTreeMap::from([(
            "work".to_string(),
            CliProfile {
                auth_anon_key: Some("anon".to_string()),
                ..CliProfile::default()
            },
        )]),
    };

    let name = apply_profile_values(
        &mut config,
        Some("work"),
        ProfileValues {
            auth_url: Some("https://auth.example.com".to_string()),
            ..ProfileValues::default()
        },
        false,
    )
    .unwrap();

    assert_eq!(name, "work");
    assert_eq!(config.active_profile.as_deref(), Some("work"));
    let profile = config.profile("work").unwrap();
    assert_eq!(profile.auth_anon_key.as_deref(), Some("anon"));
    assert_eq!(profile.auth_url.as_deref(), Some("https://auth.example.com"));
}

#[test]
fn apply_profile_values_rejects_urls_without_scheme() {
    let mut config = CliProfilesConfig::default();
    let result = apply_profile_values(
        &mut config,
        Some("default"),
        ProfileValues {
            sync_token_endpoint: Some("api.example.com/v1/sync/token".to_string()),
            ..ProfileValues::default()
        },
        false,
    );

    assert!(matches!(result, Err(CliError::Config(message)) if message.contains("sync_token_endpoint")));
    assert!(config.profiles.is_empty());
    assert!(config.active_profile.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn restore_profile_session_drops_expired_stored_session() {
    store_session_for_test("cli-test-fresh", &session(i64::MAX));
    store_session_for_test("cli-test-expired", &session(0));

    let fresh = restore_profile_session("cli-test-fresh", None).await.unwrap();
    assert_eq!(fresh.map(|session| session.user.id), Some("U".to_string()));

    let expired = restore_profile_session("cli-test-expired", None)
        .await
        .unwrap();
    assert!(expired.is_none());
    assert!(load_stored_session("cli-test-expired").unwrap().is_none());
}

fn session(expires_at: i64) -> AuthSession {
    AuthSession {
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at,
        user: AuthUser {
            id: "U".to_string(),
            email: None,
        },
    }
}
