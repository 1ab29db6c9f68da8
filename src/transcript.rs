use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL log of what happened in one run
pub struct Transcript {
    pub path: PathBuf,
    session_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, session_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn login(&mut self, username: &str, ok: bool) -> Result<()> {
        self.log(
            "login",
            serde_json::json!({ "username": username, "ok": ok }),
        )
    }

    pub fn signup(&mut self, username: Option<&str>, errors: &[String]) -> Result<()> {
        self.log(
            "signup",
            serde_json::json!({
                "ok": errors.is_empty(),
                "username": username,
                "errors": errors,
            }),
        )
    }

    pub fn logout(&mut self, username: &str) -> Result<()> {
        self.log("logout", serde_json::json!({ "username": username }))
    }

    pub fn avatar_update(&mut self, avatar: &str) -> Result<()> {
        self.log("avatar_update", serde_json::json!({ "avatar": avatar }))
    }

    /// Persisted state that could not be restored and was reset
    pub fn restore_error(&mut self, store: &str, error: &str) -> Result<()> {
        self.log(
            "restore_error",
            serde_json::json!({ "store": store, "error": error }),
        )
    }

    pub fn favorite(&mut self, movie_id: u64, added: bool) -> Result<()> {
        let event_type = if added {
            "favorite_add"
        } else {
            "favorite_remove"
        };
        self.log(event_type, serde_json::json!({ "movie_id": movie_id }))
    }

    pub fn navigate(&mut self, destination: &str, generation: u64) -> Result<()> {
        self.log(
            "navigate",
            serde_json::json!({ "destination": destination, "generation": generation }),
        )
    }

    pub fn page_loaded(&mut self, destination: &str, movies: usize) -> Result<()> {
        self.log(
            "page_loaded",
            serde_json::json!({ "destination": destination, "movies": movies }),
        )
    }

    /// A catalog call failed and was replaced by an empty result
    pub fn fetch_error(&mut self, context: &str, error: &str) -> Result<()> {
        self.log(
            "fetch_error",
            serde_json::json!({ "context": context, "error": error }),
        )
    }

    pub fn play(&mut self, movie_id: u64, video_url: &str) -> Result<()> {
        self.log(
            "play",
            serde_json::json!({ "movie_id": movie_id, "video_url": video_url }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_events_are_jsonl() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("run.jsonl");
        let mut transcript = Transcript::new(&path, "abc").unwrap();
        transcript.login("alice", true).unwrap();
        transcript.favorite(42, false).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "login");
        assert_eq!(lines[0]["username"], "alice");
        assert_eq!(lines[0]["session_id"], "abc");
        assert_eq!(lines[1]["type"], "favorite_remove");
        assert_eq!(lines[1]["movie_id"], 42);
    }
}
