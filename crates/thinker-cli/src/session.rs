//! Session management for saving and loading conversation state
//!
//! Each session is one JSON file holding a [`ConversationState`]. Every save
//! rotates the state's anti-forgery token, and a save is refused when the
//! token presented by the caller no longer matches the one on disk. Two
//! processes working on the same session therefore cannot silently
//! overwrite each other.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thinker_chain::ConversationState;
use thiserror::Error;

/// Result type alias using SessionError
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised by the session store
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    NotFound(String),

    /// The presented token is stale: the session was saved elsewhere since
    /// it was loaded
    #[error("Session token mismatch; the session was changed by another request")]
    TokenMismatch,

    #[error("Could not generate session token: {0}")]
    Random(String),
}

/// A loaded session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: i64,
    pub state: ConversationState,
}

#[derive(Serialize, Deserialize)]
struct SessionFile {
    id: String,
    created_at: i64,
    updated_at: i64,
    state: ConversationState,
}

/// File-backed store for conversation state
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Get the default sessions directory
    pub fn sessions_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("THINKER_SESSIONS_DIR") {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("thinker")
            .join("sessions")
    }

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve a session id to its file. Ids are UUIDs; anything else,
    /// including path separators, is treated as unknown.
    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Create and persist a new session holding `state`
    pub fn create(&self, mut state: ConversationState) -> Result<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        Self::rotate_token(&mut state)?;
        let session = Session {
            id,
            created_at: chrono::Utc::now().timestamp_millis(),
            state,
        };
        self.write(&session)?;
        tracing::debug!(id = %session.id, "created session");
        Ok(session)
    }

    /// Load an existing session
    pub fn load(&self, id: &str) -> Result<Session> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        let file = read_file(&path)?;
        Ok(Session {
            id: file.id,
            created_at: file.created_at,
            state: file.state,
        })
    }

    /// Persist a session after a state-changing operation.
    ///
    /// The token currently held by `session.state` is checked against the
    /// stored one; on success a fresh token is installed and written.
    pub fn save(&self, session: &mut Session) -> Result<()> {
        let path = self.path_for(&session.id)?;
        if path.exists() {
            let stored = read_file(&path)?;
            if !tokens_match(stored.state.csrf_token(), session.state.csrf_token()) {
                tracing::warn!(id = %session.id, "refusing save with stale session token");
                return Err(SessionError::TokenMismatch);
            }
        }
        Self::rotate_token(&mut session.state)?;
        self.write(session)
    }

    /// Install a fresh anti-forgery token in `state`, returning it
    pub fn rotate_token(state: &mut ConversationState) -> Result<String> {
        let token = generate_token()?;
        state.replace_token(token.clone());
        Ok(token)
    }

    fn write(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&session.id)?;
        let file = SessionFile {
            id: session.id.clone(),
            created_at: session.created_at,
            updated_at: chrono::Utc::now().timestamp_millis(),
            state: session.state.clone(),
        };

        // Write then rename so a crash never leaves a half-written session.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&file)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// List all sessions, newest first
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match read_file(&path) {
                Ok(file) => sessions.push(SessionInfo {
                    id: file.id,
                    updated_at: file.updated_at,
                    model: file.state.selected_model.clone(),
                    message_count: file.state.history().len(),
                }),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable session"),
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    /// Delete a session
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<SessionFile> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// 32 random bytes, hex encoded
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes).map_err(|e| SessionError::Random(e.to_string()))?;
    Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Compare tokens without short-circuiting on the first differing byte
fn tokens_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

/// Information about a saved session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub updated_at: i64,
    pub model: String,
    pub message_count: usize,
}

impl SessionInfo {
    /// Format the updated_at timestamp for display
    pub fn updated_at_display(&self) -> String {
        use chrono::{TimeZone, Utc};
        Utc.timestamp_millis_opt(self.updated_at)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thinker_ai::Message;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        (dir, store)
    }

    #[test]
    fn test_create_then_load() {
        let (_dir, store) = store();
        let mut state = ConversationState::new("be helpful", "grok-4");
        state.set_max_wit(true);

        let created = store.create(state).unwrap();
        let loaded = store.load(&created.id).unwrap();

        assert_eq!(loaded.state, created.state);
        assert_eq!(loaded.state.system_prompt(), "be helpful");
        assert_eq!(loaded.state.selected_model, "grok-4");
        assert!(loaded.state.max_wit);
        assert_eq!(loaded.state.csrf_token().len(), 64);
        assert!(loaded.state.csrf_token().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_save_rotates_token() {
        let (_dir, store) = store();
        let mut session = store.create(ConversationState::default()).unwrap();
        let first = session.state.csrf_token().to_string();

        session.state.toggle_wit();
        store.save(&mut session).unwrap();

        assert_ne!(session.state.csrf_token(), first);
        let reloaded = store.load(&session.id).unwrap();
        assert_eq!(reloaded.state.csrf_token(), session.state.csrf_token());
        assert!(reloaded.state.max_wit);
    }

    #[test]
    fn test_stale_token_is_rejected() {
        let (_dir, store) = store();
        let created = store.create(ConversationState::default()).unwrap();

        let mut first = store.load(&created.id).unwrap();
        let mut second = store.load(&created.id).unwrap();

        first.state.select_model("grok-4").unwrap();
        store.save(&mut first).unwrap();

        second.state.clear_history();
        let err = store.save(&mut second).unwrap_err();
        assert!(matches!(err, SessionError::TokenMismatch));

        let on_disk = store.load(&created.id).unwrap();
        assert_eq!(on_disk.state.selected_model, "grok-4");
    }

    #[test]
    fn test_history_survives_round_trip() {
        let (_dir, store) = store();
        let mut session = store.create(ConversationState::default()).unwrap();
        session.state.replace_system_prompt("short answers").unwrap();
        store.save(&mut session).unwrap();

        let loaded = store.load(&session.id).unwrap();
        assert_eq!(loaded.state.history(), &[Message::system("short answers")]);
    }

    #[test]
    fn test_load_missing_and_invalid_ids() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load("00000000-0000-0000-0000-000000000000"),
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(store.load("../etc/passwd"), Err(SessionError::NotFound(_))));
        assert!(matches!(store.load(""), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_file_reports_json_error() {
        let (_dir, store) = store();
        let session = store.create(ConversationState::default()).unwrap();
        let path = store.path_for(&session.id).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(store.load(&session.id), Err(SessionError::Json(_))));
    }

    #[test]
    fn test_list_and_delete() {
        let (_dir, store) = store();
        assert!(store.list().unwrap().is_empty());

        let a = store.create(ConversationState::default()).unwrap();
        let b = store.create(ConversationState::new("x", "grok-3-mini")).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|s| s.id == a.id));
        let info_b = listed.iter().find(|s| s.id == b.id).unwrap();
        assert_eq!(info_b.model, "grok-3-mini");
        assert_eq!(info_b.message_count, 1);
        assert_ne!(info_b.updated_at_display(), "unknown");

        store.delete(&a.id).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(matches!(store.delete(&a.id), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "ab"));
        assert!(tokens_match("", ""));
    }
}
