// src/state.rs
// Persistent cursor store: the single source of truth for what has already
// been notified, keyed by monitor ID. Loaded once per run, mutated in
// memory, saved once at the end.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ENV_STATE_PATH: &str = "MONITOR_STATE_PATH";
pub const DEFAULT_STATE_PATH: &str = "state/monitors.json";

/// Cursor for a forum-section monitor. Replaced wholesale on each update:
/// `seen_thread_ids` is exactly the set observed in the last completed
/// fetch, so threads paginated out of the listing are dropped and may
/// resurface as "new" later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumCursor {
    pub seen_thread_ids: BTreeSet<String>,
    pub last_checked_at: DateTime<Utc>,
    pub total_threads: usize,
}

/// Cursor for a single-thread monitor. `last_post_id` is `None` only
/// before the first successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadCursor {
    pub last_post_id: Option<String>,
    pub last_checked_at: DateTime<Utc>,
    pub total_posts_seen: usize,
}

/// The two cursor shapes are disjoint per monitor ID. Untagged so the
/// persisted file keeps the plain per-record shape; the field sets do not
/// overlap, so deserialization is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cursor {
    Forum(ForumCursor),
    Thread(ThreadCursor),
}

#[derive(Debug)]
pub struct CursorStore {
    path: PathBuf,
    cursors: BTreeMap<String, Cursor>,
}

impl CursorStore {
    /// Load the store from `path`. A missing file means a first run and an
    /// unparseable file is discarded with a warning; neither fails the run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cursors = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<BTreeMap<String, Cursor>>(&s) {
                Ok(map) => {
                    tracing::info!(monitors = map.len(), path = %path.display(), "loaded cursor state");
                    map
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cursor state unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "no cursor state yet, starting empty");
                BTreeMap::new()
            }
        };
        Self { path, cursors }
    }

    /// Load from `$MONITOR_STATE_PATH`, falling back to `state/monitors.json`.
    pub fn load_default() -> Self {
        let path = std::env::var(ENV_STATE_PATH).unwrap_or_else(|_| DEFAULT_STATE_PATH.to_string());
        Self::load(path)
    }

    /// Persist the whole map as pretty-printed JSON, creating parent
    /// directories as needed. Returns `false` on failure so the caller can
    /// log it without rolling back notifications already sent.
    pub fn save(&self) -> bool {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(dir) {
                    tracing::warn!(dir = %dir.display(), error = %e, "cannot create state dir");
                    return false;
                }
            }
        }
        let body = match serde_json::to_string_pretty(&self.cursors) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "cursor state serialization failed");
                return false;
            }
        };
        match fs::write(&self.path, body) {
            Ok(()) => {
                tracing::info!(monitors = self.cursors.len(), path = %self.path.display(), "cursor state saved");
                true
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cursor state save failed");
                false
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn forum_cursor(&self, monitor_id: &str) -> Option<&ForumCursor> {
        match self.cursors.get(monitor_id) {
            Some(Cursor::Forum(c)) => Some(c),
            _ => None,
        }
    }

    pub fn last_post_id(&self, monitor_id: &str) -> Option<&str> {
        match self.cursors.get(monitor_id) {
            Some(Cursor::Thread(c)) => c.last_post_id.as_deref(),
            _ => None,
        }
    }

    /// Replace the thread cursor for `monitor_id` wholesale, stamped now.
    pub fn update_thread_state(&mut self, monitor_id: &str, last_post_id: &str, total_posts: usize) {
        self.cursors.insert(
            monitor_id.to_string(),
            Cursor::Thread(ThreadCursor {
                last_post_id: Some(last_post_id.to_string()),
                last_checked_at: Utc::now(),
                total_posts_seen: total_posts,
            }),
        );
        tracing::debug!(monitor = monitor_id, last_post = last_post_id, total = total_posts, "thread cursor updated");
    }

    /// Replace the forum cursor for `monitor_id` wholesale with the IDs
    /// observed in the just-completed fetch.
    pub fn update_forum_state<I, S>(&mut self, monitor_id: &str, thread_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let seen: BTreeSet<String> = thread_ids.into_iter().map(Into::into).collect();
        let total = seen.len();
        self.cursors.insert(
            monitor_id.to_string(),
            Cursor::Forum(ForumCursor {
                seen_thread_ids: seen,
                last_checked_at: Utc::now(),
                total_threads: total,
            }),
        );
        tracing::debug!(monitor = monitor_id, threads = total, "forum cursor updated");
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Per-monitor digest for end-of-run logging.
    pub fn summary(&self) -> Vec<(String, String)> {
        self.cursors
            .iter()
            .map(|(id, c)| {
                let line = match c {
                    Cursor::Forum(f) => format!(
                        "forum: {} thread(s) tracked, checked {}",
                        f.total_threads, f.last_checked_at
                    ),
                    Cursor::Thread(t) => format!(
                        "thread: last post {}, {} seen, checked {}",
                        t.last_post_id.as_deref().unwrap_or("-"),
                        t.total_posts_seen,
                        t.last_checked_at
                    ),
                };
                (id.clone(), line)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> CursorStore {
        CursorStore::load(dir.join("nested").join("monitors.json"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("monitors.json");
        fs::write(&path, "{ not json").unwrap();
        let store = CursorStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.update_forum_state("general", ["t1", "t2"]);
        store.update_thread_state("announcements", "p9", 12);
        assert!(store.save());

        let reloaded = CursorStore::load(store.path());
        assert_eq!(reloaded.len(), 2);
        let forum = reloaded.forum_cursor("general").unwrap();
        assert_eq!(forum.total_threads, 2);
        assert!(forum.seen_thread_ids.contains("t1"));
        assert!(forum.seen_thread_ids.contains("t2"));
        assert_eq!(reloaded.last_post_id("announcements"), Some("p9"));
    }

    #[test]
    fn forum_update_replaces_wholesale() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.update_forum_state("general", ["t1", "t2", "t3"]);
        store.update_forum_state("general", ["t2", "t4"]);
        let forum = store.forum_cursor("general").unwrap();
        assert_eq!(forum.total_threads, 2);
        assert!(!forum.seen_thread_ids.contains("t1"));
        assert!(forum.seen_thread_ids.contains("t4"));
    }

    #[test]
    fn forum_update_is_idempotent_and_order_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.update_forum_state("general", ["t2", "t1"]);
        let first = store.forum_cursor("general").unwrap().seen_thread_ids.clone();
        store.update_forum_state("general", ["t1", "t2"]);
        let second = store.forum_cursor("general").unwrap().seen_thread_ids.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn cursor_kinds_do_not_cross_answer() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.update_forum_state("general", ["t1"]);
        assert_eq!(store.last_post_id("general"), None);
        assert!(store.forum_cursor("missing").is_none());
    }

    #[test]
    fn persisted_shape_stays_flat() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.update_thread_state("announcements", "p3", 3);
        assert!(store.save());
        let raw = fs::read_to_string(store.path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        // No enum tag wrapper: fields sit directly under the monitor ID.
        assert_eq!(v["announcements"]["last_post_id"], "p3");
        assert_eq!(v["announcements"]["total_posts_seen"], 3);
    }
}
