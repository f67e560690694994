//! Persistence layer
//!
//! Users, sessions, records and chat exchanges live in one JSON document.
//! The document is loaded once and written back wholesale on every
//! mutation. Mutations hold the write lock across modify + file write, so
//! two concurrent additions can never overwrite each other.

use crate::error::CashflowError;
use crate::models::{ChatExchange, RecordDraft, Session, TransactionRecord, User};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Source of a user's transaction records
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<TransactionRecord>>;
    async fn add(
        &self,
        owner_id: Uuid,
        draft: RecordDraft,
        now: DateTime<Utc>,
    ) -> Result<TransactionRecord>;
    async fn delete(&self, owner_id: Uuid, record_id: Uuid) -> Result<()>;
}

/// Append-only log of CFO chat exchanges
#[async_trait::async_trait]
pub trait ChatLog: Send + Sync {
    async fn append(&self, exchange: ChatExchange) -> Result<()>;
    async fn history(&self, owner_id: Uuid) -> Result<Vec<ChatExchange>>;
}

/// On-disk document layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub records: Vec<TransactionRecord>,
    #[serde(default)]
    pub chats: Vec<ChatExchange>,
}

/// JSON-file store; `path = None` keeps everything in memory
pub struct JsonStore {
    path: Option<PathBuf>,
    db: RwLock<Database>,
}

impl JsonStore {
    /// Open (or create) the document at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let db = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Database::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                CashflowError::StorageError(format!(
                    "Failed to parse {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Creating new data file");
                let db = Database::default();
                write_document(&path, &db).await?;
                db
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            users = db.users.len(),
            records = db.records.len(),
            chats = db.chats.len(),
            "Data file loaded"
        );

        Ok(Self {
            path: Some(path),
            db: RwLock::new(db),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            db: RwLock::new(Database::default()),
        }
    }

    /// Read-only access to the document
    pub async fn read<T>(&self, f: impl FnOnce(&Database) -> T) -> T {
        let db = self.db.read().await;
        f(&db)
    }

    /// Apply `f` to a copy of the document, persist it, then swap it in.
    ///
    /// If `f` or the file write fails, the in-memory document is untouched.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut db = self.db.write().await;

        let mut next = db.clone();
        let out = f(&mut next)?;

        if let Some(path) = &self.path {
            write_document(path, &next).await?;
        }

        *db = next;
        Ok(out)
    }

    //
    // ================= Accounts =================
    //

    pub async fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.read(|db| {
            db.users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned()
        })
        .await
    }

    pub async fn find_user(&self, user_id: Uuid) -> Option<User> {
        self.read(|db| db.users.iter().find(|u| u.id == user_id).cloned())
            .await
    }

    /// Insert a new user; emails are unique ignoring ASCII case
    pub async fn insert_user(&self, user: User) -> Result<User> {
        self.mutate(|db| {
            if db.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
                return Err(CashflowError::Conflict(
                    "Email already registered".to_string(),
                ));
            }
            db.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    /// Store a session, dropping expired sessions and the owner's oldest
    /// ones so at most `max_per_user` stay live for that user.
    pub async fn insert_session(&self, session: Session, max_per_user: usize) -> Result<()> {
        self.mutate(|db| {
            let now = session.created_at;
            db.sessions.retain(|s| s.is_live(now));

            let existing = db
                .sessions
                .iter()
                .filter(|s| s.user_id == session.user_id)
                .count();
            // sessions are appended in creation order, so the first ones are the oldest
            let mut excess = (existing + 1).saturating_sub(max_per_user.max(1));
            db.sessions.retain(|s| {
                if excess > 0 && s.user_id == session.user_id {
                    excess -= 1;
                    false
                } else {
                    true
                }
            });

            db.sessions.push(session);
            Ok(())
        })
        .await
    }

    /// Owner of the live session with this token digest
    pub async fn session_user(&self, token_digest: &str, now: DateTime<Utc>) -> Option<Uuid> {
        self.read(|db| {
            db.sessions
                .iter()
                .find(|s| s.token_digest == token_digest && s.is_live(now))
                .map(|s| s.user_id)
        })
        .await
    }

    /// Add several records in one write
    pub async fn add_many(
        &self,
        owner_id: Uuid,
        drafts: Vec<RecordDraft>,
        now: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        let records = drafts
            .into_iter()
            .map(|draft| draft.into_record(owner_id, now))
            .collect::<Result<Vec<_>>>()?;

        self.mutate(|db| {
            db.records.extend(records.iter().cloned());
            Ok(records)
        })
        .await
    }
}

#[async_trait::async_trait]
impl RecordStore for JsonStore {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .read(|db| {
                db.records
                    .iter()
                    .filter(|r| r.owner_id == owner_id)
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn add(
        &self,
        owner_id: Uuid,
        draft: RecordDraft,
        now: DateTime<Utc>,
    ) -> Result<TransactionRecord> {
        let record = draft.into_record(owner_id, now)?;

        debug!(
            record_id = %record.id,
            owner_id = %owner_id,
            kind = %record.kind,
            "Adding record"
        );

        self.mutate(|db| {
            db.records.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn delete(&self, owner_id: Uuid, record_id: Uuid) -> Result<()> {
        self.mutate(|db| {
            let index = db
                .records
                .iter()
                .position(|r| r.id == record_id && r.owner_id == owner_id)
                .ok_or_else(|| CashflowError::NotFound("Record not found".to_string()))?;
            db.records.remove(index);
            Ok(())
        })
        .await
    }
}

#[async_trait::async_trait]
impl ChatLog for JsonStore {
    async fn append(&self, exchange: ChatExchange) -> Result<()> {
        self.mutate(|db| {
            db.chats.push(exchange);
            Ok(())
        })
        .await
    }

    async fn history(&self, owner_id: Uuid) -> Result<Vec<ChatExchange>> {
        Ok(self
            .read(|db| {
                db.chats
                    .iter()
                    .filter(|c| c.owner_id == owner_id)
                    .cloned()
                    .collect()
            })
            .await)
    }
}

/// Write the whole document through a temp file + rename
async fn write_document(path: &Path, db: &Database) -> Result<()> {
    let json = serde_json::to_vec_pretty(db)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
