use anyhow::Result;
use serde_json::{Value, json};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Flat-JSONL store: `<home>/projects/<slug>/<session>.jsonl`.
///
/// The slug encoding mirrors the adapter: absolute project path with
/// separators replaced by dashes.
pub struct FlatLogStore {
    home: PathBuf,
}

impl FlatLogStore {
    pub fn new(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn project_dir(&self, project_root: &str) -> PathBuf {
        let slug = project_root.replace(['/', '\\'], "-");
        self.home.join("projects").join(slug)
    }

    pub fn session_path(&self, project_root: &str, session_id: &str) -> PathBuf {
        self.project_dir(project_root)
            .join(format!("{}.jsonl", session_id))
    }

    pub fn write_session(
        &self,
        project_root: &str,
        session_id: &str,
        records: &[Value],
    ) -> Result<PathBuf> {
        let path = self.session_path(project_root, session_id);
        fs::create_dir_all(path.parent().unwrap())?;
        let mut file = fs::File::create(&path)?;
        for record in records {
            writeln!(file, "{}", record)?;
        }
        Ok(path)
    }

    pub fn append_record(&self, project_root: &str, session_id: &str, record: &Value) -> Result<()> {
        let path = self.session_path(project_root, session_id);
        let mut file = OpenOptions::new().append(true).open(path)?;
        writeln!(file, "{}", record)?;
        Ok(())
    }

    pub fn append_raw(&self, project_root: &str, session_id: &str, line: &str) -> Result<()> {
        let path = self.session_path(project_root, session_id);
        let mut file = OpenOptions::new().append(true).open(path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    pub fn user_line(uuid: &str, timestamp: &str, text: &str) -> Value {
        json!({
            "type": "user",
            "uuid": uuid,
            "timestamp": timestamp,
            "message": {"role": "user", "content": text},
        })
    }

    pub fn user_line_with_header(
        uuid: &str,
        timestamp: &str,
        text: &str,
        cwd: &str,
        git_branch: &str,
        slug: &str,
    ) -> Value {
        json!({
            "type": "user",
            "uuid": uuid,
            "timestamp": timestamp,
            "cwd": cwd,
            "version": "1.0.40",
            "git_branch": git_branch,
            "slug": slug,
            "message": {"role": "user", "content": text},
        })
    }

    pub fn assistant_text_line(
        uuid: &str,
        timestamp: &str,
        model: &str,
        text: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Value {
        json!({
            "type": "assistant",
            "uuid": uuid,
            "timestamp": timestamp,
            "message": {
                "role": "assistant",
                "model": model,
                "content": [{"type": "text", "text": text}],
                "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens},
            },
        })
    }

    pub fn assistant_tool_use_line(
        uuid: &str,
        timestamp: &str,
        tool_use_id: &str,
        tool_name: &str,
        input: Value,
    ) -> Value {
        json!({
            "type": "assistant",
            "uuid": uuid,
            "timestamp": timestamp,
            "message": {
                "role": "assistant",
                "model": "claude-sonnet-4",
                "content": [{"type": "tool_use", "id": tool_use_id, "name": tool_name, "input": input}],
            },
        })
    }

    pub fn tool_result_line(
        uuid: &str,
        timestamp: &str,
        tool_use_id: &str,
        content: &str,
        is_error: bool,
    ) -> Value {
        json!({
            "type": "user",
            "uuid": uuid,
            "timestamp": timestamp,
            "message": {
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": tool_use_id,
                    "content": content,
                    "is_error": is_error,
                }],
            },
        })
    }
}

/// Dir-YAML+JSONL store: `<home>/session-state/<id>/{workspace.yaml,
/// events.jsonl}`.
pub struct SessionStateStore {
    home: PathBuf,
}

impl SessionStateStore {
    pub fn new(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.home.join("session-state").join(session_id)
    }

    pub fn events_path(&self, session_id: &str) -> PathBuf {
        self.session_dir(session_id).join("events.jsonl")
    }

    #[allow(clippy::too_many_arguments)]
    pub fn write_workspace(
        &self,
        session_id: &str,
        cwd: &str,
        git_root: &str,
        branch: &str,
        summary: &str,
        created_at: &str,
        updated_at: &str,
    ) -> Result<()> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir)?;
        let yaml = format!(
            "id: {session_id}\ncwd: {cwd}\ngit_root: {git_root}\nbranch: {branch}\nsummary: {summary}\ncreated_at: {created_at}\nupdated_at: {updated_at}\n",
        );
        fs::write(dir.join("workspace.yaml"), yaml)?;
        Ok(())
    }

    pub fn write_events(&self, session_id: &str, events: &[Value]) -> Result<PathBuf> {
        let path = self.events_path(session_id);
        fs::create_dir_all(path.parent().unwrap())?;
        let mut file = fs::File::create(&path)?;
        for event in events {
            writeln!(file, "{}", event)?;
        }
        Ok(path)
    }

    pub fn append_event(&self, session_id: &str, event: &Value) -> Result<()> {
        let path = self.events_path(session_id);
        let mut file = OpenOptions::new().append(true).create(true).open(path)?;
        writeln!(file, "{}", event)?;
        Ok(())
    }

    pub fn user_event(id: &str, timestamp: &str, content: &str) -> Value {
        json!({
            "type": "user.message",
            "id": id,
            "timestamp": timestamp,
            "data": {"content": content},
        })
    }

    pub fn assistant_event(id: &str, timestamp: &str, content: &str) -> Value {
        json!({
            "type": "assistant.message",
            "id": id,
            "timestamp": timestamp,
            "data": {"content": content},
        })
    }

    pub fn assistant_tool_event(
        id: &str,
        timestamp: &str,
        content: &str,
        tool_call_id: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Value {
        json!({
            "type": "assistant.message",
            "id": id,
            "timestamp": timestamp,
            "data": {
                "content": content,
                "toolRequests": [
                    {"toolCallId": tool_call_id, "name": tool_name, "arguments": arguments},
                ],
            },
        })
    }

    pub fn tool_complete_event(id: &str, timestamp: &str, tool_call_id: &str, content: &str) -> Value {
        json!({
            "type": "tool.execution_complete",
            "id": id,
            "timestamp": timestamp,
            "data": {"toolCallId": tool_call_id, "result": {"content": content}},
        })
    }
}

/// SQLite + JSON-fragment store: `<data>/opencode.db` and
/// `<data>/storage/{project,session,message,part}`.
pub struct OpencodeStore {
    data_dir: PathBuf,
}

impl OpencodeStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("opencode.db")
    }

    fn storage(&self, kind: &str) -> PathBuf {
        self.data_dir.join("storage").join(kind)
    }

    pub fn write_project_fragment(&self, project_id: &str, worktree: &str) -> Result<()> {
        let dir = self.storage("project");
        fs::create_dir_all(&dir)?;
        let value = json!({"id": project_id, "worktree": worktree});
        fs::write(dir.join(format!("{}.json", project_id)), value.to_string())?;
        Ok(())
    }

    pub fn write_session_fragment(
        &self,
        project_id: &str,
        session_id: &str,
        title: &str,
        parent_id: Option<&str>,
        time_created: i64,
        time_updated: i64,
    ) -> Result<()> {
        let dir = self.storage("session").join(project_id);
        fs::create_dir_all(&dir)?;
        let value = json!({
            "id": session_id,
            "title": title,
            "parent_id": parent_id,
            "project_id": project_id,
            "time_created": time_created,
            "time_updated": time_updated,
        });
        fs::write(dir.join(format!("{}.json", session_id)), value.to_string())?;
        Ok(())
    }

    pub fn write_message_fragment(
        &self,
        session_id: &str,
        message_id: &str,
        role: &str,
        time_created: i64,
    ) -> Result<()> {
        let dir = self.storage("message").join(session_id);
        fs::create_dir_all(&dir)?;
        let value = json!({
            "id": message_id,
            "session_id": session_id,
            "role": role,
            "time_created": time_created,
        });
        fs::write(dir.join(format!("{}.json", message_id)), value.to_string())?;
        Ok(())
    }

    pub fn write_part_fragment(&self, message_id: &str, part_id: &str, part: &Value) -> Result<()> {
        let dir = self.storage("part").join(message_id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{}.json", part_id)), part.to_string())?;
        Ok(())
    }

    pub fn text_part(text: &str) -> Value {
        json!({"type": "text", "text": text})
    }

    /// Create the database with the upstream schema. Returns a handle for
    /// inserting rows.
    pub fn create_database(&self) -> Result<OpencodeDatabase> {
        fs::create_dir_all(&self.data_dir)?;
        let conn = rusqlite::Connection::open(self.db_path())?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS project (
                id TEXT PRIMARY KEY,
                worktree TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session (
                id TEXT PRIMARY KEY,
                title TEXT,
                parent_id TEXT,
                project_id TEXT NOT NULL,
                time_created INTEGER NOT NULL,
                time_updated INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS message (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                time_created INTEGER NOT NULL,
                time_updated INTEGER,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS part (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                data TEXT NOT NULL
            );
            "#,
        )?;
        Ok(OpencodeDatabase { conn })
    }

    pub fn remove_database(&self) -> Result<()> {
        let path = self.db_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

pub struct OpencodeDatabase {
    conn: rusqlite::Connection,
}

impl OpencodeDatabase {
    pub fn insert_project(&self, project_id: &str, worktree: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO project (id, worktree) VALUES (?1, ?2)",
            rusqlite::params![project_id, worktree],
        )?;
        Ok(())
    }

    pub fn insert_session(
        &self,
        session_id: &str,
        title: &str,
        parent_id: Option<&str>,
        project_id: &str,
        time_created: i64,
        time_updated: i64,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO session
            (id, title, parent_id, project_id, time_created, time_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            rusqlite::params![session_id, title, parent_id, project_id, time_created, time_updated],
        )?;
        Ok(())
    }

    pub fn insert_message(
        &self,
        message_id: &str,
        session_id: &str,
        role: &str,
        time_created: i64,
    ) -> Result<()> {
        let data = json!({
            "id": message_id,
            "session_id": session_id,
            "role": role,
            "time_created": time_created,
        });
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO message (id, session_id, time_created, time_updated, data)
            VALUES (?1, ?2, ?3, ?3, ?4)
            "#,
            rusqlite::params![message_id, session_id, time_created, data.to_string()],
        )?;
        Ok(())
    }

    pub fn insert_part(
        &self,
        part_id: &str,
        message_id: &str,
        session_id: &str,
        part: &Value,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO part (id, message_id, session_id, data) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![part_id, message_id, session_id, part.to_string()],
        )?;
        Ok(())
    }
}
