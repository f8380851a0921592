// src/notify/mod.rs

pub mod discord;

use async_trait::async_trait;
use std::time::Duration;

use crate::model::{PostRecord, ThreadRecord};

/// Pause after this many sends in a batch, to stay under webhook limits.
const BATCH_PACE_EVERY: usize = 4;
const BATCH_PACE_PAUSE: Duration = Duration::from_secs(2);

/// Outbound notification channel. Single sends report success as `bool`;
/// batch helpers return the success count and pace themselves. Errors never
/// propagate past the notifier.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_thread(&self, thread: &ThreadRecord, context: &str) -> bool;
    async fn notify_post(&self, post: &PostRecord, context: &str) -> bool;
    async fn notify_error(&self, message: &str, context: &str) -> bool;

    async fn notify_threads_batch(&self, threads: &[ThreadRecord], context: &str) -> usize {
        let mut sent = 0;
        for (i, thread) in threads.iter().enumerate() {
            if self.notify_thread(thread, context).await {
                sent += 1;
            }
            pace_batch(i, threads.len()).await;
        }
        tracing::info!(context, sent, total = threads.len(), "thread notifications sent");
        sent
    }

    async fn notify_posts_batch(&self, posts: &[PostRecord], context: &str) -> usize {
        let mut sent = 0;
        for (i, post) in posts.iter().enumerate() {
            if self.notify_post(post, context).await {
                sent += 1;
            }
            pace_batch(i, posts.len()).await;
        }
        tracing::info!(context, sent, total = posts.len(), "post notifications sent");
        sent
    }
}

async fn pace_batch(index: usize, total: usize) {
    let done = index + 1;
    if done % BATCH_PACE_EVERY == 0 && done < total {
        tracing::debug!(done, total, "pausing between notification bursts");
        tokio::time::sleep(BATCH_PACE_PAUSE).await;
    }
}
