// src/detect.rs
// Pure delta computation between a fresh snapshot and a stored cursor.
// No I/O here; callers commit cursor updates separately.

use crate::model::{PostRecord, ThreadRecord};
use crate::state::ForumCursor;

/// Result of a post delta. `rebaselined` is set when the stored last-post
/// ID was not found in the snapshot (thread pruned or reorganized) and
/// tracking was reset to the latest post; callers must log it as a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDelta {
    pub posts: Vec<PostRecord>,
    pub rebaselined: bool,
}

impl PostDelta {
    fn empty() -> Self {
        Self { posts: Vec::new(), rebaselined: false }
    }

    fn baseline(posts: &[PostRecord], rebaselined: bool) -> Self {
        Self {
            posts: posts.last().cloned().into_iter().collect(),
            rebaselined,
        }
    }
}

/// Threads whose ID is absent from the stored seen set, in snapshot order.
///
/// With no cursor (first run) every listed thread is new. Thread listings
/// are bounded, so unlike posts there is no first-run suppression.
pub fn new_threads(cursor: Option<&ForumCursor>, all_threads: &[ThreadRecord]) -> Vec<ThreadRecord> {
    match cursor {
        None => all_threads.to_vec(),
        Some(c) => all_threads
            .iter()
            .filter(|t| !c.seen_thread_ids.contains(&t.id))
            .cloned()
            .collect(),
    }
}

/// Posts strictly after the stored last-seen post, in snapshot order.
///
/// First run (no stored ID) establishes a baseline by reporting only the
/// latest post instead of flooding with thread history. A stored ID that
/// no longer appears in the snapshot re-baselines the same way, flagged.
pub fn new_posts(last_post_id: Option<&str>, all_posts: &[PostRecord]) -> PostDelta {
    if all_posts.is_empty() {
        return PostDelta::empty();
    }
    let Some(last_id) = last_post_id else {
        return PostDelta::baseline(all_posts, false);
    };
    match all_posts.iter().position(|p| p.id == last_id) {
        Some(k) => PostDelta {
            posts: all_posts[k + 1..].to_vec(),
            rebaselined: false,
        },
        None => PostDelta::baseline(all_posts, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn thread(id: &str) -> ThreadRecord {
        ThreadRecord {
            id: id.into(),
            title: format!("Thread {id}"),
            author: "alice".into(),
            url: format!("https://forum.example/{id}-thread"),
            last_post_date: "Today".into(),
        }
    }

    fn post(id: &str) -> PostRecord {
        PostRecord {
            id: id.into(),
            author: "bob".into(),
            content: "hello".into(),
            timestamp: "12:00".into(),
            url: format!("https://forum.example/t1-thread#{id}"),
        }
    }

    fn forum_cursor(ids: &[&str]) -> ForumCursor {
        ForumCursor {
            seen_thread_ids: ids.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            last_checked_at: Utc::now(),
            total_threads: ids.len(),
        }
    }

    #[test]
    fn no_cursor_reports_every_thread() {
        let threads = vec![thread("t1"), thread("t2"), thread("t3")];
        let out = new_threads(None, &threads);
        assert_eq!(out, threads);
    }

    #[test]
    fn seen_threads_are_filtered_in_order() {
        let cursor = forum_cursor(&["t2"]);
        let threads = vec![thread("t1"), thread("t2"), thread("t3")];
        let out = new_threads(Some(&cursor), &threads);
        assert_eq!(out.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["t1", "t3"]);
    }

    #[test]
    fn second_fetch_reports_only_the_newcomer() {
        // [A,B,C] seen, next fetch lists [B,C,D] -> only D.
        let first = vec![thread("A"), thread("B"), thread("C")];
        assert_eq!(new_threads(None, &first), first);
        let cursor = forum_cursor(&["A", "B", "C"]);
        let second = vec![thread("B"), thread("C"), thread("D")];
        let out = new_threads(Some(&cursor), &second);
        assert_eq!(out.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["D"]);
    }

    #[test]
    fn empty_posts_yield_empty_delta() {
        let delta = new_posts(None, &[]);
        assert!(delta.posts.is_empty());
        assert!(!delta.rebaselined);
        let delta = new_posts(Some("p1"), &[]);
        assert!(delta.posts.is_empty());
    }

    #[test]
    fn first_run_reports_only_the_latest_post() {
        let posts = vec![post("p1"), post("p2"), post("p3")];
        let delta = new_posts(None, &posts);
        assert_eq!(delta.posts, vec![post("p3")]);
        assert!(!delta.rebaselined);
    }

    #[test]
    fn posts_after_the_marker_are_returned_in_order() {
        let posts = vec![post("p3"), post("p4"), post("p5"), post("p6"), post("p7")];
        let delta = new_posts(Some("p5"), &posts);
        assert_eq!(delta.posts, vec![post("p6"), post("p7")]);
        assert!(!delta.rebaselined);
    }

    #[test]
    fn marker_at_the_end_means_nothing_new() {
        let posts = vec![post("p1"), post("p2")];
        let delta = new_posts(Some("p2"), &posts);
        assert!(delta.posts.is_empty());
        assert!(!delta.rebaselined);
    }

    #[test]
    fn stale_marker_rebaselines_to_latest() {
        // p2 was pruned upstream; only the latest post is reported, flagged.
        let posts = vec![post("p10"), post("p11")];
        let delta = new_posts(Some("p2"), &posts);
        assert_eq!(delta.posts, vec![post("p11")]);
        assert!(delta.rebaselined);
    }
}
