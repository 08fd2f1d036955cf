//! Persisted state: the bound channel, join/leave history, and operator
//! edits to the moderation lists.
//!
//! The relay reads these once at startup. Afterwards it only writes:
//! the binding on a bind command, the lists on an edit, and one history
//! entry per real join or leave. A failed write is logged and never
//! stops the relay.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use realmrelay_protocol::{ChannelId, Device};
use realmrelay_router::{HistoryEvent, HistoryRecord, ModerationLists};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Errors from a [`StateStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One line of the join/leave history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub event: HistoryEvent,
    pub username: String,
    pub device: Device,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Stamps a router record with `timestamp`.
    pub fn from_record(record: HistoryRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            event: record.event,
            username: record.name,
            device: record.device,
            timestamp,
        }
    }
}

/// Where the relay keeps state across restarts.
///
/// Methods return `impl Future + Send` so the engine can call them from
/// spawned tasks; implementors may write `async fn`.
pub trait StateStore: Send + Sync + 'static {
    /// The last bound channel, if any.
    fn load_binding(
        &self,
    ) -> impl Future<Output = Result<Option<ChannelId>, StoreError>> + Send;

    fn save_binding(
        &self,
        channel: &ChannelId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends to the history. Existing entries are never rewritten.
    fn append_history(
        &self,
        entry: &HistoryEntry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Operator-edited lists, if any were ever saved.
    fn load_moderation(
        &self,
    ) -> impl Future<Output = Result<Option<ModerationLists>, StoreError>> + Send;

    fn save_moderation(
        &self,
        lists: &ModerationLists,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Lets a caller keep a reference to the store it hands the engine.
impl<T: StateStore> StateStore for std::sync::Arc<T> {
    fn load_binding(
        &self,
    ) -> impl Future<Output = Result<Option<ChannelId>, StoreError>> + Send {
        (**self).load_binding()
    }

    fn save_binding(
        &self,
        channel: &ChannelId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).save_binding(channel)
    }

    fn append_history(
        &self,
        entry: &HistoryEntry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).append_history(entry)
    }

    fn load_moderation(
        &self,
    ) -> impl Future<Output = Result<Option<ModerationLists>, StoreError>> + Send {
        (**self).load_moderation()
    }

    fn save_moderation(
        &self,
        lists: &ModerationLists,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).save_moderation(lists)
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Binding file contents.
#[derive(Serialize, Deserialize)]
struct BindingFile {
    #[serde(rename = "channelId")]
    channel_id: ChannelId,
}

/// Keeps each kind of state in its own JSON file.
///
/// - binding: `{"channelId": "..."}`
/// - history: a pretty-printed array of [`HistoryEntry`]
/// - moderation: a [`ModerationLists`] document
///
/// A missing file reads as "nothing saved yet".
#[derive(Debug)]
pub struct JsonFileStore {
    binding_path: PathBuf,
    history_path: PathBuf,
    moderation_path: PathBuf,
    /// Serializes read-modify-write of the history file.
    history_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(
        binding_path: impl Into<PathBuf>,
        history_path: impl Into<PathBuf>,
        moderation_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binding_path: binding_path.into(),
            history_path: history_path.into(),
            moderation_path: moderation_path.into(),
            history_lock: Mutex::new(()),
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    // Write beside the target, then rename, so readers never see a torn file.
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, raw)
        .await
        .map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

impl StateStore for JsonFileStore {
    async fn load_binding(&self) -> Result<Option<ChannelId>, StoreError> {
        let file: Option<BindingFile> = read_json(&self.binding_path).await?;
        Ok(file.map(|f| f.channel_id))
    }

    async fn save_binding(&self, channel: &ChannelId) -> Result<(), StoreError> {
        let file = BindingFile {
            channel_id: channel.clone(),
        };
        write_json(&self.binding_path, &file).await
    }

    async fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        let _guard = self.history_lock.lock().await;
        let mut entries: Vec<HistoryEntry> =
            read_json(&self.history_path).await?.unwrap_or_default();
        entries.push(entry.clone());
        write_json(&self.history_path, &entries).await
    }

    async fn load_moderation(&self) -> Result<Option<ModerationLists>, StoreError> {
        read_json(&self.moderation_path).await
    }

    async fn save_moderation(&self, lists: &ModerationLists) -> Result<(), StoreError> {
        write_json(&self.moderation_path, lists).await
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    binding: Option<ChannelId>,
    history: Vec<HistoryEntry>,
    moderation: Option<ModerationLists>,
}

/// Keeps everything in memory. Used in tests and for throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already has a bound channel.
    pub fn with_binding(channel: ChannelId) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                binding: Some(channel),
                ..MemoryState::default()
            }),
        }
    }

    pub async fn binding(&self) -> Option<ChannelId> {
        self.state.lock().await.binding.clone()
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.history.clone()
    }

    pub async fn moderation(&self) -> Option<ModerationLists> {
        self.state.lock().await.moderation.clone()
    }
}

impl StateStore for MemoryStore {
    async fn load_binding(&self) -> Result<Option<ChannelId>, StoreError> {
        Ok(self.binding().await)
    }

    async fn save_binding(&self, channel: &ChannelId) -> Result<(), StoreError> {
        self.state.lock().await.binding = Some(channel.clone());
        Ok(())
    }

    async fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.state.lock().await.history.push(entry.clone());
        Ok(())
    }

    async fn load_moderation(&self) -> Result<Option<ModerationLists>, StoreError> {
        Ok(self.moderation().await)
    }

    async fn save_moderation(&self, lists: &ModerationLists) -> Result<(), StoreError> {
        self.state.lock().await.moderation = Some(lists.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "realmrelay-store-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn file_store(dir: &Path) -> JsonFileStore {
        JsonFileStore::new(
            dir.join("relayChannel.json"),
            dir.join("player-log.json"),
            dir.join("moderation.json"),
        )
    }

    fn entry(event: HistoryEvent, name: &str) -> HistoryEntry {
        HistoryEntry {
            event,
            username: name.into(),
            device: Device::Android,
            timestamp: "2024-05-01T12:00:00Z".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_json_store_missing_files_read_as_empty() {
        let dir = temp_dir("missing");
        let store = file_store(&dir);
        assert_eq!(store.load_binding().await.unwrap(), None);
        assert_eq!(store.load_moderation().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_store_binding_uses_channel_id_key() {
        let dir = temp_dir("binding");
        let store = file_store(&dir);
        store.save_binding(&ChannelId::new("123")).await.unwrap();

        let raw = std::fs::read_to_string(dir.join("relayChannel.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["channelId"], "123");
        assert_eq!(
            store.load_binding().await.unwrap(),
            Some(ChannelId::new("123"))
        );
    }

    #[tokio::test]
    async fn test_json_store_history_appends_in_order() {
        let dir = temp_dir("history");
        let store = file_store(&dir);
        store.append_history(&entry(HistoryEvent::Join, "Steve")).await.unwrap();
        store.append_history(&entry(HistoryEvent::Leave, "Steve")).await.unwrap();

        let raw = std::fs::read_to_string(dir.join("player-log.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["event"], "join");
        assert_eq!(entries[1]["event"], "leave");
        assert_eq!(entries[0]["username"], "Steve");
        assert_eq!(entries[0]["device"], "Android");
        assert_eq!(entries[0]["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_json_store_corrupt_history_reports_json_error() {
        let dir = temp_dir("corrupt");
        std::fs::write(dir.join("player-log.json"), "{not json").unwrap();
        let store = file_store(&dir);

        let err = store
            .append_history(&entry(HistoryEvent::Join, "Steve"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[tokio::test]
    async fn test_json_store_history_write_replaces_file_atomically() {
        let dir = temp_dir("atomic");
        let store = file_store(&dir);
        for name in ["A", "B", "C"] {
            store.append_history(&entry(HistoryEvent::Join, name)).await.unwrap();
        }

        assert!(!dir.join("player-log.json.tmp").exists());
        let raw = std::fs::read_to_string(dir.join("player-log.json")).unwrap();
        let entries: Vec<HistoryEntry> = serde_json::from_str(&raw).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_json_store_history_ignores_stale_temp_file() {
        let dir = temp_dir("stale-tmp");
        std::fs::write(dir.join("player-log.json.tmp"), "[{\"torn\":").unwrap();
        let store = file_store(&dir);
        store.append_history(&entry(HistoryEvent::Join, "Steve")).await.unwrap();

        let raw = std::fs::read_to_string(dir.join("player-log.json")).unwrap();
        let entries: Vec<HistoryEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!dir.join("player-log.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_store_moderation_survives_reload() {
        let dir = temp_dir("moderation");
        let lists = ModerationLists {
            banned_devices: [Device::Linux].into(),
            ..ModerationLists::default()
        };
        file_store(&dir).save_moderation(&lists).await.unwrap();

        let reloaded = file_store(&dir).load_moderation().await.unwrap();
        assert_eq!(reloaded, Some(lists));
    }

    #[tokio::test]
    async fn test_memory_store_records_everything() {
        let store = MemoryStore::new();
        store.save_binding(&ChannelId::new("c")).await.unwrap();
        store.append_history(&entry(HistoryEvent::Join, "A")).await.unwrap();

        assert_eq!(store.binding().await, Some(ChannelId::new("c")));
        assert_eq!(store.history().await.len(), 1);
    }
}
