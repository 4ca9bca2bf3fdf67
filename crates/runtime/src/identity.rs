//! Session identity storage.
//!
//! The identity store remembers which session the client believes is active,
//! so that a restarted client (the equivalent of a page reload) asks the
//! kernel host to resume it. It is cleared only by an explicit "new session"
//! action; disconnects and kernel restarts leave it alone.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use nb_protocol::SessionId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Injected source of the active session id.
pub trait SessionIdentityStore: Send + Sync {
	fn get(&self) -> Option<SessionId>;
	fn set(&self, id: &SessionId) -> Result<()>;
	fn clear(&self) -> Result<()>;
}

/// Process-lifetime identity store.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
	current: Mutex<Option<SessionId>>,
}

impl MemoryIdentityStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_session(id: SessionId) -> Self {
		Self {
			current: Mutex::new(Some(id)),
		}
	}
}

impl SessionIdentityStore for MemoryIdentityStore {
	fn get(&self) -> Option<SessionId> {
		self.current.lock().clone()
	}

	fn set(&self, id: &SessionId) -> Result<()> {
		*self.current.lock() = Some(id.clone());
		Ok(())
	}

	fn clear(&self) -> Result<()> {
		*self.current.lock() = None;
		Ok(())
	}
}

/// On-disk schema version for the identity file.
pub const IDENTITY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityFile {
	#[serde(default)]
	schema: u32,
	#[serde(default)]
	sessions: BTreeMap<String, IdentityEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityEntry {
	session_id: SessionId,
	/// Unix epoch seconds.
	updated_at: u64,
}

/// File-backed identity store, keyed by kernel endpoint.
///
/// Several notebooks can share one file; each endpoint gets its own entry.
/// Unreadable files and unknown schema versions read as "no session".
#[derive(Debug)]
pub struct FileIdentityStore {
	path: PathBuf,
	key: String,
	lock: Mutex<()>,
}

impl FileIdentityStore {
	pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			key: key.into(),
			lock: Mutex::new(()),
		}
	}

	/// Store at the default location (`$XDG_CACHE_HOME/nb/sessions.json`).
	pub fn at_default_location(key: impl Into<String>) -> Self {
		Self::new(default_identity_path(), key)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	fn load(&self) -> IdentityFile {
		let Ok(content) = fs::read_to_string(&self.path) else {
			return IdentityFile::default();
		};
		match serde_json::from_str::<IdentityFile>(&content) {
			Ok(file) if file.schema == IDENTITY_SCHEMA_VERSION => file,
			Ok(file) => {
				tracing::debug!(target = "nb.identity", path = %self.path.display(), schema = file.schema, "ignoring identity file with unknown schema");
				IdentityFile::default()
			}
			Err(e) => {
				tracing::warn!(target = "nb.identity", path = %self.path.display(), error = %e, "ignoring unreadable identity file");
				IdentityFile::default()
			}
		}
	}

	fn save(&self, mut file: IdentityFile) -> Result<()> {
		file.schema = IDENTITY_SCHEMA_VERSION;
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		let tmp = self.path.with_extension("json.tmp");
		fs::write(&tmp, serde_json::to_string_pretty(&file)?)?;
		fs::rename(&tmp, &self.path)?;
		Ok(())
	}
}

impl SessionIdentityStore for FileIdentityStore {
	fn get(&self) -> Option<SessionId> {
		let _guard = self.lock.lock();
		self.load().sessions.get(&self.key).map(|e| e.session_id.clone())
	}

	fn set(&self, id: &SessionId) -> Result<()> {
		let _guard = self.lock.lock();
		let mut file = self.load();
		file.sessions.insert(
			self.key.clone(),
			IdentityEntry {
				session_id: id.clone(),
				updated_at: now_ts(),
			},
		);
		tracing::debug!(target = "nb.identity", key = %self.key, session = %id, "persisted session id");
		self.save(file)
	}

	fn clear(&self) -> Result<()> {
		let _guard = self.lock.lock();
		let mut file = self.load();
		if file.sessions.remove(&self.key).is_none() {
			return Ok(());
		}
		tracing::debug!(target = "nb.identity", key = %self.key, "cleared session id");
		self.save(file)
	}
}

/// Default identity file path.
///
/// Uses `$XDG_CACHE_HOME/nb/sessions.json`, falling back to `~/.cache`.
pub fn default_identity_path() -> PathBuf {
	let cache_home = std::env::var_os("XDG_CACHE_HOME")
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))
		.unwrap_or_else(|| PathBuf::from("."));
	cache_home.join("nb").join("sessions.json")
}

fn now_ts() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn memory_store_round_trip() {
		let store = MemoryIdentityStore::new();
		assert_eq!(store.get(), None);
		store.set(&SessionId::new("a")).unwrap();
		assert_eq!(store.get(), Some(SessionId::new("a")));
		store.clear().unwrap();
		assert_eq!(store.get(), None);
	}

	#[test]
	fn file_store_survives_new_instance() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("sessions.json");

		FileIdentityStore::new(&path, "ws://localhost:2718/ws").set(&SessionId::new("s-1")).unwrap();

		let reloaded = FileIdentityStore::new(&path, "ws://localhost:2718/ws");
		assert_eq!(reloaded.get(), Some(SessionId::new("s-1")));
	}

	#[test]
	fn file_store_keys_are_independent() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("sessions.json");
		let a = FileIdentityStore::new(&path, "a");
		let b = FileIdentityStore::new(&path, "b");

		a.set(&SessionId::new("one")).unwrap();
		b.set(&SessionId::new("two")).unwrap();
		a.clear().unwrap();

		assert_eq!(a.get(), None);
		assert_eq!(b.get(), Some(SessionId::new("two")));
	}

	#[test]
	fn corrupt_file_reads_as_absent() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("sessions.json");
		std::fs::write(&path, "{not json").unwrap();

		let store = FileIdentityStore::new(&path, "k");
		assert_eq!(store.get(), None);
		store.set(&SessionId::new("fresh")).unwrap();
		assert_eq!(store.get(), Some(SessionId::new("fresh")));
	}

	#[test]
	fn unknown_schema_reads_as_absent() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("sessions.json");
		std::fs::write(&path, r#"{"schema":99,"sessions":{"k":{"sessionId":"old","updatedAt":1}}}"#).unwrap();

		assert_eq!(FileIdentityStore::new(&path, "k").get(), None);
	}

	#[test]
	fn clearing_missing_entry_does_not_create_file() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("nested").join("sessions.json");

		FileIdentityStore::new(&path, "k").clear().unwrap();
		assert!(!path.exists());
	}
}
