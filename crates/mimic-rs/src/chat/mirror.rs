//! Durable mirror of the in-memory message sequence.
//!
//! The [`MessageStore`](super::store::MessageStore) writes every append and
//! every splice through to a [`Mirror`]. [`JsonFileMirror`] keeps one JSON
//! file per session:
//!
//! ```text
//! {
//!   "session_info": { "id": "...", "date-time": "...", "user_data": { ... } },
//!   "messages": [ { "message": { "role": "...", "content": "..." }, "message_id": 0 } ]
//! }
//! ```
//!
//! Writes are atomic: serialize to a temp file, then rename into place.

use crate::Message;
use crate::error::MirrorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// A key(index)-addressable record of the conversation.
///
/// Implementations must report a missing backing record as
/// [`MirrorError::NotInitialized`], distinct from write failures.
pub trait Mirror: Send {
    /// Append a new record for the message at `index`.
    fn append(&mut self, index: usize, message: &Message) -> Result<(), MirrorError>;

    /// Overwrite the record at `index`. If no record exists for `index`
    /// (an earlier append was lost), it is inserted in index order.
    fn overwrite(&mut self, index: usize, message: &Message) -> Result<(), MirrorError>;
}

/// A mirror that stores nothing. Useful for ephemeral sessions and tests.
pub struct NullMirror;

impl Mirror for NullMirror {
    fn append(&mut self, _index: usize, _message: &Message) -> Result<(), MirrorError> {
        Ok(())
    }

    fn overwrite(&mut self, _index: usize, _message: &Message) -> Result<(), MirrorError> {
        Ok(())
    }
}

// ── Persisted layout ───────────────────────────────────────────────

/// Session metadata stored at the top of a chat log.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    #[serde(rename = "date-time")]
    pub date_time: String,
    pub user_data: serde_json::Value,
}

/// One mirrored message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub message: Message,
    pub message_id: usize,
}

/// The full contents of a chat log file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatLog {
    pub session_info: SessionInfo,
    pub messages: Vec<MessageRecord>,
}

impl ChatLog {
    fn upsert(&mut self, index: usize, message: &Message) {
        let record = MessageRecord {
            message: message.clone(),
            message_id: index,
        };
        if let Some(existing) = self.messages.iter_mut().find(|r| r.message_id == index) {
            *existing = record;
        } else {
            let pos = self.messages.partition_point(|r| r.message_id < index);
            self.messages.insert(pos, record);
        }
    }
}

// ── JsonFileMirror ─────────────────────────────────────────────────

/// File-backed [`Mirror`] writing one pretty-printed JSON chat log.
pub struct JsonFileMirror {
    path: PathBuf,
}

impl JsonFileMirror {
    /// Create the chat log at `path` with no messages, creating parent
    /// directories as needed. An existing file is replaced.
    pub fn create(path: impl Into<PathBuf>, info: SessionInfo) -> Result<Self, MirrorError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| MirrorError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mirror = Self { path };
        mirror.save(&ChatLog {
            session_info: info,
            messages: Vec::new(),
        })?;
        Ok(mirror)
    }

    /// Attach to an existing chat log without touching it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the chat log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the chat log.
    pub fn load(&self) -> Result<ChatLog, MirrorError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MirrorError::NotInitialized(self.path.clone()));
            }
            Err(source) => {
                return Err(MirrorError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&json).map_err(|source| MirrorError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    fn save(&self, log: &ChatLog) -> Result<(), MirrorError> {
        let json = serde_json::to_string_pretty(log).map_err(MirrorError::Serialize)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|source| MirrorError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| MirrorError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl Mirror for JsonFileMirror {
    fn append(&mut self, index: usize, message: &Message) -> Result<(), MirrorError> {
        let mut log = self.load()?;
        log.messages.push(MessageRecord {
            message: message.clone(),
            message_id: index,
        });
        self.save(&log)
    }

    fn overwrite(&mut self, index: usize, message: &Message) -> Result<(), MirrorError> {
        let mut log = self.load()?;
        log.upsert(index, message);
        self.save(&log)
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Generate a 16-character chat id from the clock and a process counter.
pub fn generate_chat_id() -> String {
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let id = format!("{:012x}{:04x}", ts & 0xffff_ffff_ffff, count & 0xffff);
    id.chars().take(16).collect()
}

/// Chat log filename for session `chat_id` started at `timestamp`
/// (`YYYY-mm-dd_HH-MM-SS`).
pub fn chat_log_filename(timestamp: &str, chat_id: &str) -> String {
    format!("chat_{timestamp}_{chat_id}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_info() -> SessionInfo {
        SessionInfo {
            id: "abc123".into(),
            date_time: "2026-01-01_00-00-00".into(),
            user_data: serde_json::json!({"name": "Ada"}),
        }
    }

    #[test]
    fn create_writes_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = JsonFileMirror::create(dir.path().join("logs/chat.json"), test_info()).unwrap();

        let log = mirror.load().unwrap();
        assert_eq!(log.session_info.id, "abc123");
        assert!(log.messages.is_empty());

        let raw = std::fs::read_to_string(mirror.path()).unwrap();
        assert!(raw.contains("\"date-time\""));
        assert!(raw.contains("\"session_info\""));
    }

    #[test]
    fn append_then_overwrite_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut mirror = JsonFileMirror::create(dir.path().join("chat.json"), test_info()).unwrap();

        mirror.append(0, &Message::system("sys")).unwrap();
        mirror.append(1, &Message::user("long text")).unwrap();
        mirror.overwrite(1, &Message::user("short")).unwrap();

        let log = mirror.load().unwrap();
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.messages[1].message_id, 1);
        assert_eq!(log.messages[1].message.content, "short");
        assert_eq!(log.messages[0].message.content, "sys");
    }

    #[test]
    fn overwrite_missing_record_inserts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut mirror = JsonFileMirror::create(dir.path().join("chat.json"), test_info()).unwrap();

        mirror.append(0, &Message::system("a")).unwrap();
        mirror.append(2, &Message::user("c")).unwrap();
        mirror.overwrite(1, &Message::assistant("b")).unwrap();

        let ids: Vec<usize> = mirror.load().unwrap().messages.iter().map(|r| r.message_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn missing_file_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let mut mirror = JsonFileMirror::open(dir.path().join("never-created.json"));

        let err = mirror.append(0, &Message::user("hi")).unwrap_err();
        assert!(matches!(err, MirrorError::NotInitialized(_)));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut mirror = JsonFileMirror::open(&path);
        let err = mirror.overwrite(0, &Message::user("hi")).unwrap_err();
        assert!(matches!(err, MirrorError::Corrupt { .. }));
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut mirror = JsonFileMirror::create(dir.path().join("chat.json"), test_info()).unwrap();
        mirror.append(0, &Message::user("hi")).unwrap();
        assert!(!dir.path().join("chat.json.tmp").exists());
    }

    #[test]
    fn chat_ids_are_sixteen_chars_and_unique() {
        let a = generate_chat_id();
        let b = generate_chat_id();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn log_filename_format() {
        assert_eq!(
            chat_log_filename("2026-10-18_09-30-00", "0123456789abcdef"),
            "chat_2026-10-18_09-30-00_0123456789abcdef.json"
        );
    }
}
