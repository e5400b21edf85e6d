//! Owner-scoped diary client shared by the front ends.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{Local, TimeZone};
use futures::stream::{self, Stream};
use libsql::Connection;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::auth::{AuthUser, Identity};
use crate::db::{
    Database, DiaryRepository, LibSqlDiaryRepository, LibSqlUploadQueue, SyncConfig, UploadQueue,
};
use crate::error::{Error, Result};
use crate::models::{Diary, DiaryGroups, DiaryId, PendingImageUpload};
use crate::state::RequestState;
use crate::storage::image_remote_path;

const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Where and how a `DiaryClient` opens its store.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Database file; `None` keeps everything in memory
    pub db_path: Option<PathBuf>,
    /// Replica settings; requires `db_path`
    pub sync: Option<SyncConfig>,
    /// How often to look for commits made outside this client; `None` only
    /// reacts to this client's own writes
    pub refresh_interval: Option<Duration>,
}

impl ClientOptions {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn local(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(db_path.into()),
            sync: None,
            refresh_interval: Some(DEFAULT_REFRESH_INTERVAL),
        }
    }

    #[must_use]
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = Some(sync);
        self
    }

    #[must_use]
    pub const fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }
}

/// Open stores. In replica mode writes go to the remote, so the upload queue
/// lives in a local-only sidecar file next to the replica.
struct Stores {
    diaries: Database,
    queue: Option<Database>,
}

impl Stores {
    fn diaries(&self) -> &Connection {
        self.diaries.connection()
    }

    fn queue(&self) -> &Connection {
        self.queue.as_ref().unwrap_or(&self.diaries).connection()
    }
}

struct Inner<I> {
    stores: Mutex<Option<Stores>>,
    identity: I,
    sync_enabled: bool,
    revision: watch::Sender<u64>,
}

/// Authenticated handle to the diary store.
///
/// Cloning shares the same store. Every diary operation resolves the signed-in
/// user from the injected identity first and fails with `Unauthenticated`
/// before touching the store when there is none.
pub struct DiaryClient<I: Identity> {
    inner: Arc<Inner<I>>,
}

impl<I: Identity> Clone for DiaryClient<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: Identity> DiaryClient<I> {
    /// Open (and migrate) the store described by `options`.
    ///
    /// With a refresh interval set, a background task re-checks the store on
    /// that cadence and wakes live listings when another connection committed
    /// to the file or, in replica mode, when a periodic pull applied frames.
    pub async fn connect(options: ClientOptions, identity: I) -> Result<Self> {
        let sync_enabled = options.sync.is_some();
        let pull_every = options.sync.as_ref().and_then(|sync| sync.sync_interval);
        let refresh_interval = options.refresh_interval;
        let stores = open_stores(options).await?;
        let seen_version = stores.diaries.data_version().await.ok();
        let (revision, _) = watch::channel(0);

        let client = Self {
            inner: Arc::new(Inner {
                stores: Mutex::new(Some(stores)),
                identity,
                sync_enabled,
                revision,
            }),
        };
        if let Some(period) = refresh_interval {
            spawn_change_watcher(
                Arc::downgrade(&client.inner),
                ChangeWatch {
                    period,
                    pull_every,
                    seen_version,
                },
            );
        }
        Ok(client)
    }

    /// Open an in-memory client (primarily for tests).
    pub async fn open_in_memory(identity: I) -> Result<Self> {
        Self::connect(ClientOptions::in_memory(), identity).await
    }

    /// Push a final sync when enabled and release the store.
    ///
    /// Other handles to this client fail with `Error::Closed` afterwards and
    /// live listings end.
    pub async fn close(self) -> Result<()> {
        let stores = self.inner.stores.lock().await.take();
        self.notify();

        let Some(stores) = stores else {
            return Ok(());
        };
        if self.inner.sync_enabled {
            stores.diaries.sync().await?;
        }
        tracing::info!("Diary client closed");
        Ok(())
    }

    /// Pull remote changes into the local replica; a no-op without sync.
    pub async fn sync(&self) -> Result<()> {
        {
            let guard = self.inner.stores.lock().await;
            let stores = guard.as_ref().ok_or(Error::Closed)?;
            stores.diaries.sync().await?;
        }
        self.notify();
        Ok(())
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.inner.sync_enabled
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<AuthUser> {
        self.inner
            .identity
            .current_user()
            .filter(|user| !user.id.trim().is_empty())
    }

    /// Live listing grouped by calendar date in the local timezone.
    pub fn observe_diaries(
        &self,
    ) -> impl Stream<Item = RequestState<DiaryGroups>> + Send + 'static {
        self.observe_diaries_in(Local)
    }

    /// Live listing of the signed-in user's diaries grouped by date in `tz`.
    ///
    /// Yields a snapshot on subscription and after every change; only the
    /// latest snapshot matters, intermediate changes may be coalesced. With no
    /// signed-in user a single `Unauthenticated` error is yielded and the
    /// stream ends. The stream also ends when the client is closed.
    pub fn observe_diaries_in<Tz>(
        &self,
        tz: Tz,
    ) -> impl Stream<Item = RequestState<DiaryGroups>> + Send + 'static
    where
        Tz: TimeZone + Send + Sync + 'static,
    {
        let observer = Observer {
            client: self.clone(),
            revisions: self.inner.revision.subscribe(),
            tz,
            primed: false,
            finished: false,
        };

        stream::unfold(observer, |mut observer| async move {
            if observer.finished {
                return None;
            }
            if observer.primed {
                observer.revisions.changed().await.ok()?;
            }
            observer.primed = true;
            observer.revisions.borrow_and_update();

            let Some(user) = observer.client.current_user() else {
                observer.finished = true;
                return Some((RequestState::Error(Error::Unauthenticated), observer));
            };

            let snapshot = match observer.client.snapshot(&user.id, &observer.tz).await {
                Err(Error::Closed) => return None,
                Err(error) => {
                    tracing::warn!("Diary snapshot failed: {}", error);
                    RequestState::Error(error)
                }
                Ok(groups) => RequestState::Success(groups),
            };
            Some((snapshot, observer))
        })
    }

    pub async fn get_diary(&self, id: &DiaryId) -> RequestState<Diary> {
        self.try_get_diary(id).await.into()
    }

    /// Persist a new diary owned by the signed-in user under a fresh ID.
    pub async fn insert_diary(&self, diary: &Diary) -> RequestState<Diary> {
        self.try_insert_diary(diary).await.into()
    }

    /// Overwrite every field of the signed-in user's diary with `diary.id`.
    pub async fn update_diary(&self, diary: &Diary) -> RequestState<Diary> {
        self.try_update_diary(diary).await.into()
    }

    /// Delete the signed-in user's diary and return its last value.
    pub async fn delete_diary(&self, id: &DiaryId) -> RequestState<Diary> {
        self.try_delete_diary(id).await.into()
    }

    /// Pending image uploads, oldest first
    pub async fn pending_uploads(&self) -> Result<Vec<PendingImageUpload>> {
        let guard = self.inner.stores.lock().await;
        let stores = guard.as_ref().ok_or(Error::Closed)?;
        LibSqlUploadQueue::new(stores.queue()).list_pending().await
    }

    pub async fn enqueue_upload(&self, item: &PendingImageUpload) -> Result<()> {
        let guard = self.inner.stores.lock().await;
        let stores = guard.as_ref().ok_or(Error::Closed)?;
        LibSqlUploadQueue::new(stores.queue()).enqueue(item).await
    }

    pub async fn clear_upload(&self, id: i64) -> Result<()> {
        let guard = self.inner.stores.lock().await;
        let stores = guard.as_ref().ok_or(Error::Closed)?;
        LibSqlUploadQueue::new(stores.queue()).clear(id).await
    }

    /// Attach a local image to `diary` and queue it for upload.
    ///
    /// Appends the image's remote path to `diary.images`; the diary itself is
    /// not persisted here.
    pub async fn attach_image(
        &self,
        diary: &mut Diary,
        local_path: &Path,
    ) -> Result<PendingImageUpload> {
        let user = self.require_user()?;
        let metadata = tokio::fs::metadata(local_path).await?;
        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!(
                "Not a file: {}",
                local_path.display()
            )));
        }

        let remote_path = image_remote_path(
            &user.id,
            local_path,
            chrono::Utc::now().timestamp_millis(),
        )?;

        let queued = {
            let guard = self.inner.stores.lock().await;
            let stores = guard.as_ref().ok_or(Error::Closed)?;
            LibSqlUploadQueue::new(stores.queue())
                .push(&remote_path, &local_path.to_string_lossy())
                .await?
        };

        diary.images.push(remote_path);
        Ok(queued)
    }

    fn require_user(&self) -> Result<AuthUser> {
        self.current_user().ok_or(Error::Unauthenticated)
    }

    fn notify(&self) {
        self.inner
            .revision
            .send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    /// Whether the store changed underneath this client since the last check.
    async fn detect_external_change(
        &self,
        pull: bool,
        seen_version: &mut Option<i64>,
    ) -> Result<bool> {
        let guard = self.inner.stores.lock().await;
        let stores = guard.as_ref().ok_or(Error::Closed)?;
        if stores.diaries.is_sync_enabled() {
            // Outside writes reach a replica through the remote
            let pulled = if pull { stores.diaries.sync().await? } else { 0 };
            return Ok(pulled > 0);
        }
        let version = stores.diaries.data_version().await?;
        Ok(seen_version
            .replace(version)
            .is_some_and(|previous| previous != version))
    }

    async fn snapshot<Tz: TimeZone>(&self, owner_id: &str, tz: &Tz) -> Result<DiaryGroups> {
        let guard = self.inner.stores.lock().await;
        let stores = guard.as_ref().ok_or(Error::Closed)?;
        let diaries = LibSqlDiaryRepository::new(stores.diaries())
            .list(owner_id)
            .await?;
        Ok(DiaryGroups::group(diaries, tz))
    }

    async fn try_get_diary(&self, id: &DiaryId) -> Result<Diary> {
        let user = self.require_user()?;
        let guard = self.inner.stores.lock().await;
        let stores = guard.as_ref().ok_or(Error::Closed)?;
        LibSqlDiaryRepository::new(stores.diaries())
            .get(&user.id, id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn try_insert_diary(&self, diary: &Diary) -> Result<Diary> {
        let user = self.require_user()?;
        let stored = {
            let guard = self.inner.stores.lock().await;
            let stores = guard.as_ref().ok_or(Error::Closed)?;
            LibSqlDiaryRepository::new(stores.diaries())
                .insert(&user.id, diary)
                .await?
        };
        self.notify();
        Ok(stored)
    }

    async fn try_update_diary(&self, diary: &Diary) -> Result<Diary> {
        let user = self.require_user()?;
        let updated = {
            let guard = self.inner.stores.lock().await;
            let stores = guard.as_ref().ok_or(Error::Closed)?;
            LibSqlDiaryRepository::new(stores.diaries())
                .update(&user.id, diary)
                .await?
        };
        self.notify();
        Ok(updated)
    }

    async fn try_delete_diary(&self, id: &DiaryId) -> Result<Diary> {
        let user = self.require_user()?;
        let deleted = {
            let guard = self.inner.stores.lock().await;
            let stores = guard.as_ref().ok_or(Error::Closed)?;
            LibSqlDiaryRepository::new(stores.diaries())
                .delete(&user.id, id)
                .await?
        };
        self.notify();
        Ok(deleted)
    }
}

struct Observer<I: Identity, Tz> {
    client: DiaryClient<I>,
    revisions: watch::Receiver<u64>,
    tz: Tz,
    primed: bool,
    finished: bool,
}

struct ChangeWatch {
    period: Duration,
    pull_every: Option<Duration>,
    seen_version: Option<i64>,
}

/// Poll for commits made outside this client until it is closed or dropped.
fn spawn_change_watcher<I: Identity>(inner: Weak<Inner<I>>, mut state: ChangeWatch) {
    tokio::spawn(async move {
        let mut last_pull = Instant::now();
        loop {
            tokio::time::sleep(state.period).await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let client = DiaryClient { inner };

            let pull = state
                .pull_every
                .is_some_and(|every| last_pull.elapsed() >= every);
            if pull {
                last_pull = Instant::now();
            }
            match client
                .detect_external_change(pull, &mut state.seen_version)
                .await
            {
                Ok(true) => {
                    tracing::debug!("Store changed outside this client");
                    client.notify();
                }
                Ok(false) => {}
                Err(Error::Closed) => break,
                Err(error) => tracing::warn!("Diary change check failed: {}", error),
            }
        }
        tracing::debug!("Diary change watcher stopped");
    });
}

async fn open_stores(options: ClientOptions) -> Result<Stores> {
    let Some(db_path) = options.db_path else {
        if options.sync.is_some() {
            return Err(Error::InvalidInput(
                "Sync requires an on-disk database path".into(),
            ));
        }
        return Ok(Stores {
            diaries: Database::open_in_memory().await?,
            queue: None,
        });
    };

    if let Some(parent) = db_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    match options.sync {
        None => {
            tracing::info!("Running in local-only mode at {}", db_path.display());
            Ok(Stores {
                diaries: Database::open(&db_path).await?,
                queue: None,
            })
        }
        Some(config) => {
            tracing::info!("Sync enabled with {}", config.url);
            let diaries = open_replica_with_recovery(&db_path, &config).await?;
            let queue = Database::open(upload_queue_path(&db_path)).await?;
            Ok(Stores {
                diaries,
                queue: Some(queue),
            })
        }
    }
}

async fn open_replica_with_recovery(db_path: &Path, config: &SyncConfig) -> Result<Database> {
    match Database::open_with_sync(db_path, config).await {
        Ok(db) => Ok(db),
        Err(error) if is_recoverable_replica_error(&error) => {
            tracing::warn!(
                "Inconsistent local replica at {}: {}. Resetting local replica files and retrying once.",
                db_path.display(),
                error
            );
            quarantine_replica_files(db_path)?;
            Database::open_with_sync(db_path, config).await
        }
        Err(error) => Err(error),
    }
}

/// Local-only file holding the upload queue when the diaries file is a replica.
fn upload_queue_path(db_path: &Path) -> PathBuf {
    db_path.with_extension("queue.db")
}

fn is_recoverable_replica_error(error: &Error) -> bool {
    let message = error.to_string().to_ascii_lowercase();
    message.contains("file is not a database")
        || message.contains("invalid local state")
        || message.contains("metadata file exists but db file does not")
}

/// Move the replica file aside and drop its sidecar files so the next open
/// bootstraps from the remote.
fn quarantine_replica_files(db_path: &Path) -> Result<()> {
    if db_path.exists() {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let base_name = db_path
            .file_name()
            .map_or_else(|| "diary.db".into(), |name| name.to_string_lossy());
        let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));
        std::fs::rename(db_path, &backup_path)?;
        tracing::warn!(
            "Moved corrupted replica from {} to {}",
            db_path.display(),
            backup_path.display()
        );
    }

    let (Some(parent), Some(base_name)) = (
        db_path.parent(),
        db_path.file_name().and_then(|name| name.to_str()),
    ) else {
        return Ok(());
    };
    let sidecar_prefix = format!("{base_name}-");

    for entry in std::fs::read_dir(parent)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(&sidecar_prefix) {
            let path = entry.path();
            std::fs::remove_file(&path)?;
            tracing::warn!("Removed stale replica file {}", path.display());
        }
    }
    Ok(())
}
