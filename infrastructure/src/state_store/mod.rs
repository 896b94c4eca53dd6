//! rusqlite-backed State Store adapter
//!
//! Persists `EnsembleSession`s and their `ModeAssignment`s across process
//! restarts. WAL mode trades a little durability for concurrent-reader
//! throughput, matching the `EventPersistence` pattern this is modeled
//! on. `save` replaces all of a session's assignments in a single
//! transaction so a partial write can never leave stale assignment rows
//! behind.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ensemble_application::ports::state_store::{StateStore, StateStoreError};
use ensemble_domain::pane::AgentKind;
use ensemble_domain::session::{AssignmentStatus, EnsembleSession, ModeAssignment, SessionStatus};
use rusqlite::{params, Connection};

pub struct SqliteStateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStateStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StateStoreError> {
        let conn = Connection::open(db_path)
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
        // `PRAGMA journal_mode` always returns the resulting mode as a row,
        // even when setting it, so `execute` (which rejects result rows)
        // can't be used here.
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_row| Ok(()))
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
        conn.execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn in_memory() -> Result<Self, StateStoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    session_name TEXT PRIMARY KEY,
    question TEXT NOT NULL,
    preset_used TEXT,
    status TEXT NOT NULL,
    synthesis_strategy TEXT NOT NULL,
    created_at TEXT NOT NULL,
    synthesized_at TEXT,
    synthesis_output TEXT,
    error TEXT
);
CREATE TABLE IF NOT EXISTS mode_assignments (
    session_name TEXT NOT NULL REFERENCES sessions(session_name),
    mode_id TEXT NOT NULL,
    pane_name TEXT NOT NULL,
    agent_type TEXT NOT NULL,
    status TEXT NOT NULL,
    output_path TEXT,
    assigned_at TEXT NOT NULL,
    completed_at TEXT,
    error TEXT,
    PRIMARY KEY (session_name, mode_id)
);
"#;

fn status_to_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Complete => "complete",
        SessionStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> SessionStatus {
    match s {
        "complete" => SessionStatus::Complete,
        "failed" => SessionStatus::Failed,
        _ => SessionStatus::Active,
    }
}

fn assignment_status_to_str(status: AssignmentStatus) -> &'static str {
    match status {
        AssignmentStatus::Pending => "pending",
        AssignmentStatus::Active => "active",
        AssignmentStatus::Done => "done",
        AssignmentStatus::Error => "error",
    }
}

fn assignment_status_from_str(s: &str) -> AssignmentStatus {
    match s {
        "active" => AssignmentStatus::Active,
        "done" => AssignmentStatus::Done,
        "error" => AssignmentStatus::Error,
        _ => AssignmentStatus::Pending,
    }
}

fn agent_kind_from_str(s: &str) -> AgentKind {
    match s {
        "claude-code" => AgentKind::ClaudeCode,
        "codex" => AgentKind::Codex,
        "gemini" => AgentKind::Gemini,
        "aider" => AgentKind::Aider,
        _ => AgentKind::Generic,
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn save(&self, session: &EnsembleSession) -> Result<(), StateStoreError> {
        let conn = Arc::clone(&self.conn);
        let session = session.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StateStoreError::Unavailable("poisoned lock".into()))?;
            let tx = conn.transaction().map_err(|e| StateStoreError::Unavailable(e.to_string()))?;

            let synthesis_json = session
                .synthesis_output
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;

            tx.execute(
                "INSERT INTO sessions (session_name, question, preset_used, status, synthesis_strategy, created_at, synthesized_at, synthesis_output, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(session_name) DO UPDATE SET
                   question = excluded.question,
                   preset_used = excluded.preset_used,
                   status = excluded.status,
                   synthesis_strategy = excluded.synthesis_strategy,
                   synthesized_at = excluded.synthesized_at,
                   synthesis_output = excluded.synthesis_output,
                   error = excluded.error",
                params![
                    session.session_name,
                    session.question,
                    session.preset_used,
                    status_to_str(session.status),
                    session.synthesis_strategy,
                    session.created_at.to_rfc3339(),
                    session.synthesized_at.map(|t| t.to_rfc3339()),
                    synthesis_json,
                    session.error,
                ],
            )
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;

            tx.execute("DELETE FROM mode_assignments WHERE session_name = ?1", params![session.session_name])
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;

            for assignment in &session.assignments {
                tx.execute(
                    "INSERT INTO mode_assignments (session_name, mode_id, pane_name, agent_type, status, output_path, assigned_at, completed_at, error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        session.session_name,
                        assignment.mode_id,
                        assignment.pane_name,
                        assignment.agent_type.to_string(),
                        assignment_status_to_str(assignment.status),
                        assignment.output_path,
                        assignment.assigned_at.to_rfc3339(),
                        assignment.completed_at.map(|t| t.to_rfc3339()),
                        assignment.error,
                    ],
                )
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            }

            tx.commit().map_err(|e| StateStoreError::Unavailable(e.to_string()))
        })
        .await
        .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
    }

    async fn load(&self, session_name: &str) -> Result<EnsembleSession, StateStoreError> {
        let conn = Arc::clone(&self.conn);
        let session_name = session_name.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StateStoreError::Unavailable("poisoned lock".into()))?;

            let mut stmt = conn
                .prepare("SELECT question, preset_used, status, synthesis_strategy, created_at, synthesized_at, synthesis_output, error FROM sessions WHERE session_name = ?1")
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;

            let row = stmt
                .query_row(params![session_name], |row| {
                    let question: String = row.get(0)?;
                    let preset_used: Option<String> = row.get(1)?;
                    let status: String = row.get(2)?;
                    let synthesis_strategy: String = row.get(3)?;
                    let created_at: String = row.get(4)?;
                    let synthesized_at: Option<String> = row.get(5)?;
                    let synthesis_output: Option<String> = row.get(6)?;
                    let error: Option<String> = row.get(7)?;
                    Ok((question, preset_used, status, synthesis_strategy, created_at, synthesized_at, synthesis_output, error))
                })
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => StateStoreError::NotFound(session_name.clone()),
                    other => StateStoreError::Unavailable(other.to_string()),
                })?;

            let (question, preset_used, status, synthesis_strategy, created_at, synthesized_at, synthesis_output, error) = row;

            let mut session = EnsembleSession::new(session_name.clone(), question, synthesis_strategy);
            session.preset_used = preset_used;
            session.status = status_from_str(&status);
            session.created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
                .with_timezone(&chrono::Utc);
            session.synthesized_at = synthesized_at
                .map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|t| t.with_timezone(&chrono::Utc)))
                .transpose()
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            session.synthesis_output = synthesis_output
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            session.error = error;

            let mut assign_stmt = conn
                .prepare("SELECT mode_id, pane_name, agent_type, status, output_path, assigned_at, completed_at, error FROM mode_assignments WHERE session_name = ?1")
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            let rows = assign_stmt
                .query_map(params![session_name], |row| {
                    let mode_id: String = row.get(0)?;
                    let pane_name: String = row.get(1)?;
                    let agent_type: String = row.get(2)?;
                    let status: String = row.get(3)?;
                    let output_path: Option<String> = row.get(4)?;
                    let assigned_at: String = row.get(5)?;
                    let completed_at: Option<String> = row.get(6)?;
                    let error: Option<String> = row.get(7)?;
                    Ok((mode_id, pane_name, agent_type, status, output_path, assigned_at, completed_at, error))
                })
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;

            for row in rows {
                let (mode_id, pane_name, agent_type, status, output_path, assigned_at, completed_at, error) =
                    row.map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
                let mut assignment = ModeAssignment::new(mode_id, pane_name, agent_kind_from_str(&agent_type));
                assignment.status = assignment_status_from_str(&status);
                assignment.output_path = output_path;
                assignment.assigned_at = chrono::DateTime::parse_from_rfc3339(&assigned_at)
                    .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
                    .with_timezone(&chrono::Utc);
                assignment.completed_at = completed_at
                    .map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|t| t.with_timezone(&chrono::Utc)))
                    .transpose()
                    .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
                assignment.error = error;
                session.assignments.push(assignment);
            }

            Ok(session)
        })
        .await
        .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
    }

    async fn list(&self) -> Result<Vec<String>, StateStoreError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StateStoreError::Unavailable("poisoned lock".into()))?;
            let mut stmt = conn
                .prepare("SELECT session_name FROM sessions ORDER BY created_at")
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            Ok(names)
        })
        .await
        .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
    }

    async fn delete(&self, session_name: &str) -> Result<(), StateStoreError> {
        let conn = Arc::clone(&self.conn);
        let session_name = session_name.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StateStoreError::Unavailable("poisoned lock".into()))?;
            conn.execute("DELETE FROM mode_assignments WHERE session_name = ?1", params![session_name])
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            conn.execute("DELETE FROM sessions WHERE session_name = ?1", params![session_name])
                .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
    }

    async fn update_status(&self, session_name: &str, status: SessionStatus) -> Result<(), StateStoreError> {
        let conn = Arc::clone(&self.conn);
        let session_name = session_name.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StateStoreError::Unavailable("poisoned lock".into()))?;
            conn.execute(
                "UPDATE sessions SET status = ?1 WHERE session_name = ?2",
                params![status_to_str(status), session_name],
            )
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
    }

    async fn update_assignment_status(
        &self,
        session_name: &str,
        mode_id: &str,
        status: AssignmentStatus,
    ) -> Result<(), StateStoreError> {
        let conn = Arc::clone(&self.conn);
        let session_name = session_name.to_string();
        let mode_id = mode_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StateStoreError::Unavailable("poisoned lock".into()))?;
            conn.execute(
                "UPDATE mode_assignments SET status = ?1 WHERE session_name = ?2 AND mode_id = ?3",
                params![assignment_status_to_str(status), session_name, mode_id],
            )
            .map_err(|e| StateStoreError::Unavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| StateStoreError::Unavailable(e.to_string()))?
    }
}
