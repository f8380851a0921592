// src/notify/discord.rs
// Discord webhook channel. One embed per item; a 429 answer is retried
// exactly once after the server-specified backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::Notifier;
use crate::model::{truncate_chars, PostRecord, ThreadRecord};

const COLOR_NEW_THREAD: u32 = 0x57F287; // green
const COLOR_NEW_REPLY: u32 = 0x5865F2; // blurple
const COLOR_ERROR: u32 = 0xED4245; // red
const FOOTER_TEXT: &str = "threadwatch";

/// Embed description cap for reply previews.
const DESCRIPTION_PREVIEW_CHARS: usize = 200;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
    footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

impl Embed {
    fn footer() -> EmbedFooter {
        EmbedFooter { text: FOOTER_TEXT.to_string() }
    }

    fn for_thread(thread: &ThreadRecord, forum_name: &str) -> Self {
        let mut fields = vec![EmbedField {
            name: "Author".into(),
            value: or_unknown(&thread.author),
            inline: true,
        }];
        if !thread.last_post_date.is_empty() {
            fields.push(EmbedField {
                name: "Posted".into(),
                value: thread.last_post_date.clone(),
                inline: true,
            });
        }
        Self {
            title: format!("🆕 New Thread in {forum_name}"),
            description: format!("**{}**", or_untitled(&thread.title)),
            color: COLOR_NEW_THREAD,
            url: some_nonempty(&thread.url),
            fields,
            footer: Self::footer(),
        }
    }

    fn for_post(post: &PostRecord, thread_name: &str) -> Self {
        let preview = truncate_chars(&post.content, DESCRIPTION_PREVIEW_CHARS);
        let mut fields = vec![EmbedField {
            name: "Author".into(),
            value: or_unknown(&post.author),
            inline: true,
        }];
        if !post.timestamp.is_empty() {
            fields.push(EmbedField {
                name: "Posted".into(),
                value: post.timestamp.clone(),
                inline: true,
            });
        }
        Self {
            title: format!("New Reply in {thread_name}"),
            description: if preview.is_empty() {
                "*No content preview available*".to_string()
            } else {
                preview
            },
            color: COLOR_NEW_REPLY,
            url: some_nonempty(&post.url),
            fields,
            footer: Self::footer(),
        }
    }

    fn for_error(message: &str, context: &str) -> Self {
        Self {
            title: format!("⚠️ Monitor Error - {context}"),
            description: message.to_string(),
            color: COLOR_ERROR,
            url: None,
            fields: Vec::new(),
            footer: Self::footer(),
        }
    }

    fn for_webhook_check() -> Self {
        Self {
            title: "✅ Webhook Test".to_string(),
            description: "Webhook connection successful!".to_string(),
            color: COLOR_NEW_THREAD,
            url: None,
            fields: Vec::new(),
            footer: Self::footer(),
        }
    }
}

fn or_unknown(s: &str) -> String {
    if s.is_empty() { "Unknown".to_string() } else { s.to_string() }
}

fn or_untitled(s: &str) -> String {
    if s.is_empty() { "Untitled".to_string() } else { s.to_string() }
}

fn some_nonempty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self { webhook, http: Client::new() }
    }

    /// Send a test embed; used by the `webhook_check` binary.
    pub async fn check_webhook(&self) -> bool {
        self.send_embed(Embed::for_webhook_check()).await
    }

    async fn send_embed(&self, embed: Embed) -> bool {
        let payload = WebhookPayload { embeds: vec![embed] };
        match self.post_once(&payload).await {
            SendOutcome::Sent => true,
            SendOutcome::Failed => false,
            SendOutcome::RateLimited(wait) => {
                tracing::warn!(wait_secs = wait.as_secs_f64(), "webhook rate limited, retrying once");
                tokio::time::sleep(wait).await;
                matches!(self.post_once(&payload).await, SendOutcome::Sent)
            }
        }
    }

    async fn post_once(&self, payload: &WebhookPayload) -> SendOutcome {
        let rsp = match self
            .http
            .post(&self.webhook)
            .timeout(SEND_TIMEOUT)
            .json(payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "webhook request failed");
                return SendOutcome::Failed;
            }
        };

        let status = rsp.status();
        if status.is_success() {
            return SendOutcome::Sent;
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = rsp
                .json::<RateLimitBody>()
                .await
                .ok()
                .and_then(|b| b.retry_after)
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return SendOutcome::RateLimited(wait);
        }
        let body = rsp.text().await.unwrap_or_default();
        tracing::warn!(%status, %body, "webhook rejected notification");
        SendOutcome::Failed
    }
}

enum SendOutcome {
    Sent,
    Failed,
    RateLimited(Duration),
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify_thread(&self, thread: &ThreadRecord, context: &str) -> bool {
        let ok = self.send_embed(Embed::for_thread(thread, context)).await;
        if ok {
            tracing::info!(thread = %thread.id, context, "thread notification sent");
        }
        ok
    }

    async fn notify_post(&self, post: &PostRecord, context: &str) -> bool {
        let ok = self.send_embed(Embed::for_post(post, context)).await;
        if ok {
            tracing::info!(post = %post.id, context, "post notification sent");
        }
        ok
    }

    async fn notify_error(&self, message: &str, context: &str) -> bool {
        self.send_embed(Embed::for_error(message, context)).await
    }
}
