//! Chat session management
//!
//! A session owns the conversation history between pipeline invocations.
//! The pipeline only reads the history; exchanges are appended here after
//! each answer and persisted as one JSON file per session.
use crate::error::{IarisError, Result};
use crate::rag::ConversationTurn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A chat session and its history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier
    pub id: Uuid,

    /// Human-readable session name
    pub name: String,

    /// When the session was started
    pub started_at: DateTime<Utc>,

    /// When the last exchange was recorded
    pub updated_at: DateTime<Utc>,

    /// Conversation turns, oldest first
    #[serde(default)]
    pub turns: Vec<ConversationTurn>,
}

impl ChatSession {
    /// Create a new session
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            started_at: now,
            updated_at: now,
            turns: Vec::new(),
        }
    }

    /// Create a new session with generated name based on timestamp
    pub fn new_with_timestamp() -> Self {
        let name = format!("chat_{}", Utc::now().format("%Y%m%d_%H%M%S"));
        Self::new(name)
    }

    /// Append a question and its answer, user turn first
    pub fn record_exchange(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn::user(query));
        self.turns.push(ConversationTurn::assistant(answer));
        self.updated_at = Utc::now();
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Number of completed question/answer exchanges
    pub fn exchange_count(&self) -> usize {
        self.turns.len() / 2
    }
}

/// Stores sessions as `<sessions_dir>/<uuid>.json`
pub struct SessionManager {
    sessions_dir: PathBuf,
}

impl SessionManager {
    pub fn new(sessions_dir: PathBuf) -> Self {
        Self { sessions_dir }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_file(&self, id: &Uuid) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", id))
    }

    /// Create and persist a new session
    pub fn create_session(&self, name: Option<String>) -> Result<ChatSession> {
        let session = match name {
            Some(n) => ChatSession::new(n),
            None => ChatSession::new_with_timestamp(),
        };

        self.save_session(&session)?;
        tracing::info!("Created session '{}' ({})", session.name, session.id);

        Ok(session)
    }

    /// Write a session to disk
    pub fn save_session(&self, session: &ChatSession) -> Result<()> {
        std::fs::create_dir_all(&self.sessions_dir).map_err(|e| IarisError::Io {
            source: e,
            context: format!(
                "Failed to create sessions directory: {}",
                self.sessions_dir.display()
            ),
        })?;

        let file = self.session_file(&session.id);
        let content = serde_json::to_string_pretty(session).map_err(|e| IarisError::Json {
            source: e,
            context: "Failed to serialize session".to_string(),
        })?;
        std::fs::write(&file, content).map_err(|e| IarisError::Io {
            source: e,
            context: format!("Failed to write session file: {}", file.display()),
        })?;

        Ok(())
    }

    /// Load a session by ID
    pub fn load_session(&self, id: &Uuid) -> Result<ChatSession> {
        let file = self.session_file(id);

        if !file.exists() {
            return Err(IarisError::SessionNotFound { id: id.to_string() });
        }

        let content = std::fs::read_to_string(&file).map_err(|e| IarisError::Io {
            source: e,
            context: format!("Failed to read session file: {}", file.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| IarisError::Json {
            source: e,
            context: format!("Failed to deserialize session {}", id),
        })
    }

    /// List all sessions, most recently updated first
    pub fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        if !self.sessions_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.sessions_dir).map_err(|e| IarisError::Io {
            source: e,
            context: format!(
                "Failed to read sessions directory: {}",
                self.sessions_dir.display()
            ),
        })?;

        let mut sessions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| IarisError::Io {
                source: e,
                context: "Failed to read directory entry".to_string(),
            })?;
            let path = entry.path();

            let id = path
                .file_stem()
                .filter(|_| path.extension().is_some_and(|ext| ext == "json"))
                .and_then(|stem| Uuid::parse_str(&stem.to_string_lossy()).ok());

            if let Some(id) = id {
                match self.load_session(&id) {
                    Ok(session) => sessions.push(session),
                    Err(e) => tracing::warn!("Skipping unreadable session {}: {}", id, e),
                }
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(sessions)
    }

    /// Find a session by ID or name
    pub fn find(&self, key: &str) -> Result<Option<ChatSession>> {
        if let Ok(id) = Uuid::parse_str(key) {
            if self.session_file(&id).exists() {
                return self.load_session(&id).map(Some);
            }
        }

        let sessions = self.list_sessions()?;
        Ok(sessions.into_iter().find(|s| s.name == key))
    }

    /// Resume the named session, or start it when it does not exist
    pub fn open_or_create(&self, name: Option<&str>) -> Result<ChatSession> {
        match name {
            Some(name) => match self.find(name)? {
                Some(session) => {
                    tracing::info!(
                        "Resuming session '{}' with {} exchanges",
                        session.name,
                        session.exchange_count()
                    );
                    Ok(session)
                }
                None => self.create_session(Some(name.to_string())),
            },
            None => self.create_session(None),
        }
    }

    /// Delete a session
    pub fn delete_session(&self, id: &Uuid) -> Result<()> {
        let file = self.session_file(id);

        if !file.exists() {
            return Err(IarisError::SessionNotFound { id: id.to_string() });
        }

        std::fs::remove_file(&file).map_err(|e| IarisError::Io {
            source: e,
            context: format!("Failed to delete session file: {}", file.display()),
        })?;
        Ok(())
    }
}
