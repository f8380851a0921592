// src/client/mod.rs
// Forum access behind a trait seam so the monitor pipeline can run against
// a stub in tests. The HTTP implementation keeps a cookie session and
// degrades to empty lists on transport or parse trouble, per the monitor
// contract (an empty snapshot is "nothing to do", not an abort).

pub mod parse;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::model::{PostRecord, ThreadRecord};

#[async_trait]
pub trait ForumClient: Send + Sync {
    /// Authenticate the session. `false` means the monitor cannot proceed.
    async fn login(&self) -> bool;

    /// All threads listed on a forum section page, page order. Empty on failure.
    async fn section_threads(&self, section_url: &str) -> Vec<ThreadRecord>;

    /// All posts of a thread, chronological order. Empty on failure.
    async fn thread_posts(&self, thread_url: &str) -> Vec<PostRecord>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpForumClient {
    base_url: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl HttpForumClient {
    /// Build a client with a cookie session and browser-like headers. A
    /// client without those could not hold a login, so a build failure is
    /// an error rather than a degraded client.
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building forum HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    async fn get_page(&self, url: &str) -> Option<String> {
        let rsp = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url, error = %e, "page fetch failed");
                return None;
            }
        };
        if let Err(e) = rsp.error_for_status_ref() {
            tracing::warn!(url, error = %e, "page fetch returned error status");
            return None;
        }
        match rsp.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(url, error = %e, "page body read failed");
                None
            }
        }
    }
}

#[async_trait]
impl ForumClient for HttpForumClient {
    async fn login(&self) -> bool {
        let login_url = format!("{}/login", self.base_url);
        let Some(login_page) = self.get_page(&login_url).await else {
            return false;
        };

        let Some(action) = parse::login_form_action(&login_page, &login_url) else {
            tracing::warn!(url = %login_url, "no login form found");
            return false;
        };

        let form = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("login", "Log in"),
            ("autologin", "on"),
            ("redirect", ""),
        ];

        let rsp = match self.http.post(&action).form(&form).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %action, error = %e, "login submit failed");
                return false;
            }
        };
        let body = match rsp.text().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "login response read failed");
                return false;
            }
        };

        if parse::has_logout_link(&body) {
            tracing::info!(user = %self.username, "logged in");
            return true;
        }
        // Some themes place the session marker elsewhere; the username
        // showing up in the page is accepted as a weaker signal.
        if body.to_lowercase().contains(&self.username.to_lowercase()) {
            tracing::info!(user = %self.username, "logged in (no logout link, username present)");
            return true;
        }
        tracing::warn!(user = %self.username, "login not confirmed");
        false
    }

    async fn section_threads(&self, section_url: &str) -> Vec<ThreadRecord> {
        let Some(body) = self.get_page(section_url).await else {
            return Vec::new();
        };
        let threads = parse::parse_section_threads(&body, section_url);
        if threads.is_empty() {
            tracing::warn!(url = section_url, "no threads extracted from section page");
        } else {
            tracing::debug!(url = section_url, count = threads.len(), "section threads fetched");
        }
        threads
    }

    async fn thread_posts(&self, thread_url: &str) -> Vec<PostRecord> {
        let Some(body) = self.get_page(thread_url).await else {
            return Vec::new();
        };
        let posts = parse::parse_thread_posts(&body, thread_url);
        if posts.is_empty() {
            tracing::warn!(url = thread_url, "no posts extracted from thread page");
        } else {
            tracing::debug!(url = thread_url, count = posts.len(), "thread posts fetched");
        }
        posts
    }
}
