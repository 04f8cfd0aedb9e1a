//! Per-login session context
//!
//! A `SessionContext` is created when a user logs in and destroyed on logout.
//! It owns everything an import needs:
//! - the authenticated remote writer
//! - a private temporary workspace directory
//! - the uploaded source dataset (raw export on disk, parsed copy in memory)
//! - the selection artifacts it has issued handles for
//!
//! Selection handles are only honoured by the session that issued them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ImportError;
use crate::models::{DatasetError, SelectionHandle, SourceDataset};
use crate::types::{RecordWriter, RemoteAccount};

/// Session identifier carried in the session cookie
pub type SessionId = Uuid;

const EXPORT_DIR: &str = "export";
const SELECTIONS_DIR: &str = "selections";
const DEFAULT_EXPORT_NAME: &str = "tweets.js";

/// Uploaded export held by a session
struct StoredExport {
    filename: String,
    path: PathBuf,
    dataset: Arc<SourceDataset>,
}

/// Everything scoped to one logged-in user
pub struct SessionContext {
    id: SessionId,
    writer: Arc<dyn RecordWriter>,
    workspace: TempDir,
    export: RwLock<Option<StoredExport>>,
    selections: RwLock<HashMap<SelectionHandle, PathBuf>>,
    import_active: AtomicBool,
}

impl SessionContext {
    /// Create a session with a fresh workspace under `temp_root` (system temp dir if None)
    pub fn new(writer: Arc<dyn RecordWriter>, temp_root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("skyport-session-");

        let workspace = match temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        let session = Self {
            id: Uuid::new_v4(),
            writer,
            workspace,
            export: RwLock::new(None),
            selections: RwLock::new(HashMap::new()),
            import_active: AtomicBool::new(false),
        };

        debug!(
            session_id = %session.id,
            workspace = %session.workspace.path().display(),
            "Session workspace created"
        );

        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn account(&self) -> &RemoteAccount {
        self.writer.account()
    }

    pub fn writer(&self) -> Arc<dyn RecordWriter> {
        self.writer.clone()
    }

    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    /// Store and parse an uploaded export, replacing any previous one
    ///
    /// Previously issued selection handles are revoked: their positions were
    /// resolved against the old dataset.
    pub async fn store_dataset(&self, filename: &str, content: &[u8]) -> Result<usize, DatasetError> {
        let text = std::str::from_utf8(content)?;
        let dataset = SourceDataset::from_export(text)?;
        let count = dataset.len();

        let filename = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_EXPORT_NAME)
            .to_string();

        let export_dir = self.workspace.path().join(EXPORT_DIR);
        tokio::fs::create_dir_all(&export_dir).await?;

        // Drop the previous export before writing the new one
        self.discard_dataset().await;

        let path = export_dir.join(&filename);
        tokio::fs::write(&path, content).await?;

        *self.export.write().await = Some(StoredExport {
            filename: filename.clone(),
            path,
            dataset: Arc::new(dataset),
        });
        self.revoke_selections().await;

        info!(session_id = %self.id, filename = %filename, count, "Stored uploaded export");
        Ok(count)
    }

    /// Current dataset snapshot
    pub async fn dataset(&self) -> Option<Arc<SourceDataset>> {
        self.export
            .read()
            .await
            .as_ref()
            .map(|export| export.dataset.clone())
    }

    /// Name of the uploaded export file
    pub async fn export_filename(&self) -> Option<String> {
        self.export
            .read()
            .await
            .as_ref()
            .map(|export| export.filename.clone())
    }

    /// Persist resolved positions and issue a handle for them
    pub async fn persist_selection(&self, positions: &[i64]) -> Result<SelectionHandle, ImportError> {
        let dir = self.workspace.path().join(SELECTIONS_DIR);
        let handle = SelectionHandle::new();
        let path = dir.join(format!("{}.json", handle));

        let json = serde_json::to_vec(positions)
            .map_err(|e| ImportError::PersistFailure(e.to_string()))?;

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ImportError::PersistFailure(e.to_string()))?;
        tokio::fs::write(&path, json).await.map_err(|e| {
            warn!(session_id = %self.id, error = %e, "Failed to write selection artifact");
            ImportError::PersistFailure(e.to_string())
        })?;

        self.selections.write().await.insert(handle, path);

        info!(
            session_id = %self.id,
            selection = %handle,
            count = positions.len(),
            "Selection persisted"
        );
        Ok(handle)
    }

    /// Whether this session issued `handle` and has not released it
    pub async fn is_issued(&self, handle: SelectionHandle) -> bool {
        self.selections.read().await.contains_key(&handle)
    }

    /// Read back a persisted selection
    pub async fn load_selection(&self, handle: SelectionHandle) -> Result<Vec<i64>, ImportError> {
        let path = self
            .selections
            .read()
            .await
            .get(&handle)
            .cloned()
            .ok_or_else(|| ImportError::ArtifactIo(format!("unknown selection {}", handle)))?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ImportError::ArtifactIo(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| ImportError::ArtifactIo(e.to_string()))
    }

    /// Release everything an import used: its selection artifact and the dataset
    ///
    /// `used` is the dataset the job ran against. An export uploaded after the
    /// job started is a different dataset and is left alone.
    pub async fn release_import_artifacts(
        &self,
        handle: SelectionHandle,
        used: Option<&Arc<SourceDataset>>,
    ) {
        if let Some(path) = self.selections.write().await.remove(&handle) {
            remove_file_logged(&path).await;
        }
        if let Some(used) = used {
            self.discard_dataset_if(used).await;
        }

        info!(session_id = %self.id, selection = %handle, "Import artifacts released");
    }

    /// Claim the session's single import slot
    ///
    /// Returns `None` while another import in this session is running.
    pub fn try_begin_import(self: &Arc<Self>) -> Option<ImportGuard> {
        self.import_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ImportGuard {
                session: self.clone(),
            })
    }

    pub fn import_active(&self) -> bool {
        self.import_active.load(Ordering::Acquire)
    }

    async fn discard_dataset(&self) {
        if let Some(export) = self.export.write().await.take() {
            remove_file_logged(&export.path).await;
        }
    }

    async fn discard_dataset_if(&self, used: &Arc<SourceDataset>) {
        let mut export = self.export.write().await;
        if export
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(&current.dataset, used))
        {
            if let Some(stale) = export.take() {
                remove_file_logged(&stale.path).await;
            }
        } else {
            debug!(session_id = %self.id, "Dataset replaced during import, keeping it");
        }
    }

    async fn revoke_selections(&self) {
        let revoked: Vec<PathBuf> = self.selections.write().await.drain().map(|(_, p)| p).collect();
        for path in revoked {
            remove_file_logged(&path).await;
        }
    }
}

async fn remove_file_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Error cleaning up temporary file");
        }
    }
}

/// Holds a session's import slot; released on drop
pub struct ImportGuard {
    session: Arc<SessionContext>,
}

impl Drop for ImportGuard {
    fn drop(&mut self) {
        self.session.import_active.store(false, Ordering::Release);
    }
}

/// All live sessions, keyed by session id
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionContext>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: SessionContext) -> Arc<SessionContext> {
        let session = Arc::new(session);
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        session
    }

    pub async fn get(&self, id: SessionId) -> Option<Arc<SessionContext>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Remove a session; its workspace is deleted once the last user drops it
    pub async fn remove(&self, id: SessionId) -> Option<Arc<SessionContext>> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::ScriptedWriter;

    const EXPORT: &str = r#"window.YTD.tweets.part0 = [
        {"tweet": {"full_text": "a", "created_at": "Wed Oct 10 20:19:24 +0000 2018"}},
        {"tweet": {"full_text": "b", "created_at": "Wed Oct 10 20:19:25 +0000 2018"}}
    ]"#;

    fn session(root: &Path) -> Arc<SessionContext> {
        Arc::new(SessionContext::new(Arc::new(ScriptedWriter::always_ok()), Some(root)).unwrap())
    }

    #[tokio::test]
    async fn test_store_dataset_writes_and_parses() {
        let root = tempfile::tempdir().unwrap();
        let session = session(root.path());

        let count = session.store_dataset("../evil/tweets.js", EXPORT.as_bytes()).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(session.export_filename().await.as_deref(), Some("tweets.js"));
        assert!(session.workspace().join("export/tweets.js").exists());
        assert_eq!(session.dataset().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_dataset_rejects_garbage_and_keeps_previous() {
        let root = tempfile::tempdir().unwrap();
        let session = session(root.path());
        session.store_dataset("tweets.js", EXPORT.as_bytes()).await.unwrap();

        let result = session.store_dataset("tweets.js", b"not json").await;
        assert!(matches!(result, Err(DatasetError::Malformed(_))));
        assert_eq!(session.dataset().await.unwrap().len(), 2);

        let result = session.store_dataset("tweets.js", &[0xff, 0xfe]).await;
        assert!(matches!(result, Err(DatasetError::Encoding(_))));
    }

    #[tokio::test]
    async fn test_selection_round_trip_and_release() {
        let root = tempfile::tempdir().unwrap();
        let session = session(root.path());
        session.store_dataset("tweets.js", EXPORT.as_bytes()).await.unwrap();

        let used = session.dataset().await;
        let handle = session.persist_selection(&[1, 0]).await.unwrap();
        assert!(session.is_issued(handle).await);
        assert_eq!(session.load_selection(handle).await.unwrap(), vec![1, 0]);

        let artifact = session.workspace().join(format!("selections/{}.json", handle));
        assert!(artifact.exists());

        session.release_import_artifacts(handle, used.as_ref()).await;
        assert!(!artifact.exists());
        assert!(!session.is_issued(handle).await);
        assert!(session.dataset().await.is_none());
        assert!(!session.workspace().join("export/tweets.js").exists());
    }

    #[tokio::test]
    async fn test_release_keeps_export_uploaded_after_job_started() {
        let root = tempfile::tempdir().unwrap();
        let session = session(root.path());
        session.store_dataset("tweets.js", EXPORT.as_bytes()).await.unwrap();
        let used = session.dataset().await;
        let handle = session.persist_selection(&[0]).await.unwrap();

        let replacement = r#"window.YTD.tweets.part0 = [
            {"tweet": {"full_text": "c", "created_at": "Wed Oct 10 20:19:26 +0000 2018"}}
        ]"#;
        session.store_dataset("tweets.js", replacement.as_bytes()).await.unwrap();

        session.release_import_artifacts(handle, used.as_ref()).await;
        assert_eq!(session.dataset().await.unwrap().len(), 1);
        assert!(session.workspace().join("export/tweets.js").exists());
    }

    #[tokio::test]
    async fn test_foreign_handle_is_not_loadable() {
        let root = tempfile::tempdir().unwrap();
        let first = session(root.path());
        let second = session(root.path());

        let handle = first.persist_selection(&[0]).await.unwrap();
        assert!(!second.is_issued(handle).await);
        assert!(matches!(
            second.load_selection(handle).await,
            Err(ImportError::ArtifactIo(_))
        ));
    }

    #[tokio::test]
    async fn test_new_upload_revokes_selections() {
        let root = tempfile::tempdir().unwrap();
        let session = session(root.path());
        session.store_dataset("tweets.js", EXPORT.as_bytes()).await.unwrap();
        let handle = session.persist_selection(&[0]).await.unwrap();

        session.store_dataset("tweets.js", EXPORT.as_bytes()).await.unwrap();
        assert!(!session.is_issued(handle).await);
    }

    #[tokio::test]
    async fn test_single_import_slot() {
        let root = tempfile::tempdir().unwrap();
        let session = session(root.path());

        let guard = session.try_begin_import().expect("slot should be free");
        assert!(session.import_active());
        assert!(session.try_begin_import().is_none());

        drop(guard);
        assert!(!session.import_active());
        assert!(session.try_begin_import().is_some());
    }

    #[tokio::test]
    async fn test_store_remove_drops_workspace() {
        let root = tempfile::tempdir().unwrap();
        let store = SessionStore::new();
        let writer = Arc::new(ScriptedWriter::always_ok());
        let session = store
            .insert(SessionContext::new(writer, Some(root.path())).unwrap())
            .await;
        let workspace = session.workspace().to_path_buf();
        let id = session.id();
        drop(session);

        assert_eq!(store.len().await, 1);
        assert!(store.get(id).await.is_some());
        assert!(workspace.exists());

        assert!(store.remove(id).await.is_some());
        assert!(store.is_empty().await);
        assert!(!workspace.exists());
    }
}
