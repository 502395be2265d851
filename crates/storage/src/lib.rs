#![forbid(unsafe_code)]

pub mod refs;
mod scan;

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::{Path, PathBuf};

use tt_core::ids::WorkspaceId;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    UnknownId,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownId => write!(f, "unknown id"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

#[derive(Clone, Debug)]
pub enum GraphOp {
    PageUpsert {
        uid: String,
        title: String,
    },
    PageDelete {
        uid: String,
    },
    BlockUpsert {
        uid: String,
        page_uid: Option<String>,
        text: Option<String>,
    },
    BlockDelete {
        uid: String,
    },
}

#[derive(Clone, Debug, Default)]
pub struct GraphApplyResult {
    pub pages_upserted: usize,
    pub pages_deleted: usize,
    pub blocks_upserted: usize,
    pub blocks_deleted: usize,
    pub ts_ms: i64,
}

#[derive(Debug)]
pub struct SqliteStore {
    storage_dir: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;
        let db_path = storage_dir.join("tagtree.db");
        let conn = Connection::open(db_path)?;
        let store = Self { storage_dir, conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS meta (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS workspaces (
              workspace TEXT PRIMARY KEY,
              created_at_ms INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS pages (
              workspace TEXT NOT NULL,
              uid TEXT NOT NULL,
              title TEXT NOT NULL,
              created_at_ms INTEGER NOT NULL,
              updated_at_ms INTEGER NOT NULL,
              PRIMARY KEY (workspace, uid),
              UNIQUE (workspace, title)
            );

            CREATE TABLE IF NOT EXISTS blocks (
              workspace TEXT NOT NULL,
              uid TEXT NOT NULL,
              page_uid TEXT,
              text TEXT,
              created_at_ms INTEGER NOT NULL,
              updated_at_ms INTEGER NOT NULL,
              PRIMARY KEY (workspace, uid)
            );

            CREATE TABLE IF NOT EXISTS block_refs (
              workspace TEXT NOT NULL,
              block_uid TEXT NOT NULL,
              page_uid TEXT NOT NULL,
              PRIMARY KEY (workspace, block_uid, page_uid)
            );

            CREATE INDEX IF NOT EXISTS idx_block_refs_page ON block_refs(workspace, page_uid);
            CREATE INDEX IF NOT EXISTS idx_blocks_page ON blocks(workspace, page_uid);
            "#,
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            params!["schema_version", "v0"],
        )?;
        Ok(())
    }

    /// Applies a batch of note-graph writes in one transaction. Reference
    /// rows are re-derived for every touched block, and for every block in
    /// the workspace when a page title appears or changes.
    pub fn graph_apply(
        &mut self,
        workspace: &WorkspaceId,
        ops: Vec<GraphOp>,
    ) -> Result<GraphApplyResult, StoreError> {
        if ops.is_empty() {
            return Err(StoreError::InvalidInput("ops must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        ensure_workspace_tx(&tx, workspace, now_ms)?;

        let mut result = GraphApplyResult {
            ts_ms: now_ms,
            ..Default::default()
        };

        for op in ops {
            match op {
                GraphOp::PageUpsert { uid, title } => {
                    let uid = clean_uid(&uid)?;
                    let title = clean_title(&title)?;
                    page_upsert_tx(&tx, workspace.as_str(), uid, title, now_ms)?;
                    result.pages_upserted += 1;
                }
                GraphOp::PageDelete { uid } => {
                    let uid = clean_uid(&uid)?;
                    page_delete_tx(&tx, workspace.as_str(), uid, now_ms)?;
                    result.pages_deleted += 1;
                }
                GraphOp::BlockUpsert {
                    uid,
                    page_uid,
                    text,
                } => {
                    let uid = clean_uid(&uid)?;
                    let page_uid = match page_uid.as_deref() {
                        Some(value) => Some(clean_uid(value)?),
                        None => None,
                    };
                    block_upsert_tx(
                        &tx,
                        workspace.as_str(),
                        uid,
                        page_uid,
                        text.as_deref(),
                        now_ms,
                    )?;
                    result.blocks_upserted += 1;
                }
                GraphOp::BlockDelete { uid } => {
                    let uid = clean_uid(&uid)?;
                    block_delete_tx(&tx, workspace.as_str(), uid)?;
                    result.blocks_deleted += 1;
                }
            }
        }

        tx.commit()?;
        Ok(result)
    }

    pub fn page_count(&self, workspace: &WorkspaceId) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE workspace=?1",
            params![workspace.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn block_count(&self, workspace: &WorkspaceId) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM blocks WHERE workspace=?1",
            params![workspace.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn workspace_exists(&self, workspace: &WorkspaceId) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM workspaces WHERE workspace=?1",
                params![workspace.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis() as i64
}

fn ensure_workspace_tx(
    tx: &Transaction<'_>,
    workspace: &WorkspaceId,
    now_ms: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT OR IGNORE INTO workspaces(workspace, created_at_ms) VALUES (?1, ?2)",
        params![workspace.as_str(), now_ms],
    )?;
    Ok(())
}

fn clean_uid(value: &str) -> Result<&str, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::InvalidInput("uid must not be empty"));
    }
    if value.len() > 256 {
        return Err(StoreError::InvalidInput("uid is too long"));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(StoreError::InvalidInput("uid contains control characters"));
    }
    Ok(value)
}

fn clean_title(value: &str) -> Result<&str, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::InvalidInput("title must not be empty"));
    }
    if value.len() > 512 {
        return Err(StoreError::InvalidInput("title is too long"));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(StoreError::InvalidInput("title contains control characters"));
    }
    Ok(value)
}

fn page_exists_tx(tx: &Transaction<'_>, workspace: &str, uid: &str) -> Result<bool, StoreError> {
    let found: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM pages WHERE workspace=?1 AND uid=?2",
            params![workspace, uid],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn page_upsert_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    uid: &str,
    title: &str,
    now_ms: i64,
) -> Result<(), StoreError> {
    let title_taken: Option<String> = tx
        .query_row(
            "SELECT uid FROM pages WHERE workspace=?1 AND title=?2 AND uid<>?3",
            params![workspace, title, uid],
            |row| row.get(0),
        )
        .optional()?;
    if title_taken.is_some() {
        return Err(StoreError::InvalidInput("page title already in use"));
    }

    let old_title: Option<String> = tx
        .query_row(
            "SELECT title FROM pages WHERE workspace=?1 AND uid=?2",
            params![workspace, uid],
            |row| row.get(0),
        )
        .optional()?;

    tx.execute(
        r#"
        INSERT INTO pages(workspace, uid, title, created_at_ms, updated_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(workspace, uid) DO UPDATE SET
          title=excluded.title,
          updated_at_ms=excluded.updated_at_ms
        "#,
        params![workspace, uid, title, now_ms, now_ms],
    )?;

    // A new or renamed title changes which blocks reference this page.
    if old_title.as_deref() != Some(title) {
        rederive_page_refs_tx(tx, workspace, uid, title)?;
    }
    Ok(())
}

fn page_delete_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    uid: &str,
    now_ms: i64,
) -> Result<(), StoreError> {
    if !page_exists_tx(tx, workspace, uid)? {
        return Err(StoreError::UnknownId);
    }
    tx.execute(
        "UPDATE blocks SET page_uid=NULL, updated_at_ms=?3 WHERE workspace=?1 AND page_uid=?2",
        params![workspace, uid, now_ms],
    )?;
    tx.execute(
        "DELETE FROM block_refs WHERE workspace=?1 AND page_uid=?2",
        params![workspace, uid],
    )?;
    tx.execute(
        "DELETE FROM pages WHERE workspace=?1 AND uid=?2",
        params![workspace, uid],
    )?;
    Ok(())
}

fn block_upsert_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    uid: &str,
    page_uid: Option<&str>,
    text: Option<&str>,
    now_ms: i64,
) -> Result<(), StoreError> {
    if let Some(page_uid) = page_uid
        && !page_exists_tx(tx, workspace, page_uid)?
    {
        return Err(StoreError::InvalidInput("page not found for block"));
    }
    tx.execute(
        r#"
        INSERT INTO blocks(workspace, uid, page_uid, text, created_at_ms, updated_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(workspace, uid) DO UPDATE SET
          page_uid=excluded.page_uid,
          text=excluded.text,
          updated_at_ms=excluded.updated_at_ms
        "#,
        params![workspace, uid, page_uid, text, now_ms, now_ms],
    )?;
    rederive_block_refs_tx(tx, workspace, uid, text)?;
    Ok(())
}

fn block_delete_tx(tx: &Transaction<'_>, workspace: &str, uid: &str) -> Result<(), StoreError> {
    let found: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM blocks WHERE workspace=?1 AND uid=?2",
            params![workspace, uid],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(StoreError::UnknownId);
    }
    tx.execute(
        "DELETE FROM block_refs WHERE workspace=?1 AND block_uid=?2",
        params![workspace, uid],
    )?;
    tx.execute(
        "DELETE FROM blocks WHERE workspace=?1 AND uid=?2",
        params![workspace, uid],
    )?;
    Ok(())
}

fn rederive_block_refs_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    block_uid: &str,
    text: Option<&str>,
) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM block_refs WHERE workspace=?1 AND block_uid=?2",
        params![workspace, block_uid],
    )?;
    let Some(text) = text else {
        return Ok(());
    };
    for title in refs::referenced_titles(text) {
        let page_uid: Option<String> = tx
            .query_row(
                "SELECT uid FROM pages WHERE workspace=?1 AND title=?2",
                params![workspace, title],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(page_uid) = page_uid {
            tx.execute(
                "INSERT OR IGNORE INTO block_refs(workspace, block_uid, page_uid) VALUES (?1, ?2, ?3)",
                params![workspace, block_uid, page_uid],
            )?;
        }
    }
    Ok(())
}

fn rederive_page_refs_tx(
    tx: &Transaction<'_>,
    workspace: &str,
    page_uid: &str,
    title: &str,
) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM block_refs WHERE workspace=?1 AND page_uid=?2",
        params![workspace, page_uid],
    )?;
    let mut stmt =
        tx.prepare("SELECT uid, text FROM blocks WHERE workspace=?1 AND text IS NOT NULL")?;
    let rows = stmt.query_map(params![workspace], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (block_uid, text) = row?;
        if refs::referenced_titles(&text).contains(title) {
            tx.execute(
                "INSERT OR IGNORE INTO block_refs(workspace, block_uid, page_uid) VALUES (?1, ?2, ?3)",
                params![workspace, block_uid, page_uid],
            )?;
        }
    }
    Ok(())
}
