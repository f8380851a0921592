// src/client/parse.rs
// HTML extraction for Foroactivo-style forums. Two listing layouts are
// handled: the custom theme (div.unr-wtp rows) and the stock phpBB-style
// markup as a fallback. Parsing is lenient: rows that do not yield an ID
// are skipped rather than failing the page.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::model::{truncate_chars, PostRecord, ThreadRecord};

/// Post preview cap, in characters.
const CONTENT_PREVIEW_CHARS: usize = 500;

static RE_THREAD_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/t(\d+)-").unwrap());
static RE_POST_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^p\d+$").unwrap());
static RE_AUTHOR_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:by|par|por)\s+(.+?)\s*$").unwrap());

fn sel(s: &str) -> Selector {
    Selector::parse(s).expect("static selector")
}

static SEL_CUSTOM_ROW: Lazy<Selector> = Lazy::new(|| sel("div.unr-wtp"));
static SEL_CUSTOM_TOPIC: Lazy<Selector> = Lazy::new(|| sel("div.unr-listopic-topic"));
static SEL_CUSTOM_INFO: Lazy<Selector> = Lazy::new(|| sel("div.unr-listopic-info"));
static SEL_PHPBB_ROW: Lazy<Selector> = Lazy::new(|| sel(r#"dl[class*="topic"]"#));
static SEL_TOPIC_TITLE: Lazy<Selector> = Lazy::new(|| sel("a.topictitle"));
static SEL_ANCHOR: Lazy<Selector> = Lazy::new(|| sel("a"));
static SEL_STRONG: Lazy<Selector> = Lazy::new(|| sel("strong"));
static SEL_DIV: Lazy<Selector> = Lazy::new(|| sel("div"));
static SEL_DT: Lazy<Selector> = Lazy::new(|| sel("dt"));
static SEL_DD: Lazy<Selector> = Lazy::new(|| sel("dd"));

static SEL_POST_ROW: Lazy<Selector> =
    Lazy::new(|| sel(r#"div[class~="post"], div.postbody, div[class~="message"]"#));
static SEL_POST_ROW_ALT: Lazy<Selector> =
    Lazy::new(|| sel(r#"td[class*="post"], td[class*="message"]"#));
static SEL_POST_ANCHOR_ID: Lazy<Selector> = Lazy::new(|| sel("a[id]"));
static SEL_POST_AUTHOR: Lazy<Selector> = Lazy::new(|| {
    sel(r#"[class*="author"], [class*="username"], [class*="postername"]"#)
});
static SEL_POST_CONTENT: Lazy<Selector> =
    Lazy::new(|| sel(r#"[class*="content"], [class*="postbody"], [class*="message-text"]"#));
static SEL_POST_TIME: Lazy<Selector> =
    Lazy::new(|| sel(r#"[class*="time"], [class*="date"]"#));

static SEL_LOGIN_FORM: Lazy<Selector> = Lazy::new(|| sel(r#"form[method="post" i]"#));
static SEL_LOGOUT_LINK: Lazy<Selector> = Lazy::new(|| sel(r#"a[href*="/logout"]"#));

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn absolutize(href: &str, base_url: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(base_url).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Thread ID from the `/t<digits>-` URL segment, e.g. "/t31-welcome" -> "t31".
pub fn thread_id_from_url(url: &str) -> Option<String> {
    RE_THREAD_ID.captures(url).map(|c| format!("t{}", &c[1]))
}

/// Extract the thread listing of a forum section page, in page order.
pub fn parse_section_threads(html: &str, page_url: &str) -> Vec<ThreadRecord> {
    let doc = Html::parse_document(html);

    let mut threads: Vec<ThreadRecord> = doc
        .select(&SEL_CUSTOM_ROW)
        .filter_map(|row| parse_custom_row(row, page_url))
        .collect();

    if threads.is_empty() {
        threads = doc
            .select(&SEL_PHPBB_ROW)
            .filter_map(|row| parse_phpbb_row(row, page_url))
            .collect();
    }

    threads
}

fn parse_custom_row(row: ElementRef<'_>, page_url: &str) -> Option<ThreadRecord> {
    let topic = row.select(&SEL_CUSTOM_TOPIC).next()?;

    // Pinned note rows carry a <strong>Nota:</strong> marker; skip them.
    if let Some(strong) = topic.select(&SEL_STRONG).next() {
        if text_of(strong).contains("Nota") {
            return None;
        }
    }

    let link = topic.select(&SEL_ANCHOR).next()?;
    let title = text_of(link);
    let url = absolutize(link.value().attr("href").unwrap_or_default(), page_url);
    let id = thread_id_from_url(&url)?;

    let info = row.select(&SEL_CUSTOM_INFO).next();
    let author = info
        .and_then(|i| i.select(&SEL_ANCHOR).next())
        .map(text_of)
        .unwrap_or_else(|| "Unknown".to_string());

    // Third info div holds the last-post date, trailed by "por <user>".
    let last_post_date = info
        .map(|i| i.select(&SEL_DIV).collect::<Vec<_>>())
        .filter(|divs| divs.len() >= 3)
        .map(|divs| {
            let raw = text_of(divs[2]);
            match raw.split_once("por") {
                Some((date, _)) => date.trim().to_string(),
                None => raw,
            }
        })
        .unwrap_or_default();

    Some(ThreadRecord { id, title, author, url, last_post_date })
}

fn parse_phpbb_row(row: ElementRef<'_>, page_url: &str) -> Option<ThreadRecord> {
    let link = row.select(&SEL_TOPIC_TITLE).next()?;
    let title = text_of(link);
    let url = absolutize(link.value().attr("href").unwrap_or_default(), page_url);
    let id = thread_id_from_url(&url)?;

    let author = row
        .select(&SEL_DT)
        .next()
        .and_then(|dt| {
            let text = text_of(dt);
            RE_AUTHOR_BY.captures(&text).map(|c| c[1].trim().to_string())
        })
        .unwrap_or_else(|| "Unknown".to_string());

    let last_post_date = row
        .select(&SEL_DD)
        .next()
        .map(|dd| {
            dd.select(&SEL_POST_TIME)
                .next()
                .map(text_of)
                .unwrap_or_else(|| text_of(dd))
        })
        .unwrap_or_default();

    Some(ThreadRecord { id, title, author, url, last_post_date })
}

/// Extract the posts of a thread page, in page (chronological) order.
pub fn parse_thread_posts(html: &str, thread_url: &str) -> Vec<PostRecord> {
    let doc = Html::parse_document(html);

    let mut posts: Vec<PostRecord> = doc
        .select(&SEL_POST_ROW)
        .filter_map(|el| parse_post(el, thread_url))
        .collect();

    if posts.is_empty() {
        posts = doc
            .select(&SEL_POST_ROW_ALT)
            .filter_map(|el| parse_post(el, thread_url))
            .collect();
    }

    posts
}

fn parse_post(el: ElementRef<'_>, thread_url: &str) -> Option<PostRecord> {
    let id = post_id_of(el)?;

    let author = el
        .select(&SEL_POST_AUTHOR)
        .next()
        .map(text_of)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let content = el
        .select(&SEL_POST_CONTENT)
        .next()
        .map(text_of)
        .map(|c| truncate_chars(&c, CONTENT_PREVIEW_CHARS))
        .unwrap_or_default();

    let timestamp = el.select(&SEL_POST_TIME).next().map(text_of).unwrap_or_default();

    let url = format!("{thread_url}#{id}");
    Some(PostRecord { id, author, content, timestamp, url })
}

fn post_id_of(el: ElementRef<'_>) -> Option<String> {
    if let Some(id) = el.value().attr("id") {
        if RE_POST_ID.is_match(id) {
            return Some(id.to_string());
        }
    }
    el.select(&SEL_POST_ANCHOR_ID)
        .filter_map(|a| a.value().attr("id"))
        .find(|id| RE_POST_ID.is_match(id))
        .map(str::to_string)
}

/// Action URL of the login form, resolved against the page URL.
pub fn login_form_action(html: &str, page_url: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let form = doc.select(&SEL_LOGIN_FORM).next()?;
    let action = form.value().attr("action").unwrap_or("/login");
    Some(absolutize(action, page_url))
}

/// Heuristic for a logged-in page: a logout link is present.
pub fn has_logout_link(html: &str) -> bool {
    let doc = Html::parse_document(html);
    doc.select(&SEL_LOGOUT_LINK).next().is_some()
}
