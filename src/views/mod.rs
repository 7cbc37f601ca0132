//! HTML rendering for the watch page
//!
//! Every function here is pure: it takes resolved data and returns markup.
//! All interpolated text goes through [`escape`].

pub mod components;
pub mod watch;

use crate::models::PlaybackMode;

pub use watch::{render_not_found, render_watch_page, WatchPage};

/// Escape text for HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Link to the watch page with the given selection
pub fn watch_href(
    anime_id: &str,
    provider: &str,
    episode_id: Option<&str>,
    mode: PlaybackMode,
) -> String {
    let mut href = format!(
        "/watch/{}?provider={}",
        urlencoding::encode(anime_id),
        urlencoding::encode(provider)
    );
    if let Some(episode_id) = episode_id {
        href.push_str("&episode=");
        href.push_str(&urlencoding::encode(episode_id));
    }
    if mode == PlaybackMode::Iframe {
        href.push_str("&mode=iframe");
    }
    href
}

/// Head metadata for social previews and the browser tab
pub struct Meta<'a> {
    pub title: String,
    pub image: Option<&'a str>,
    pub description: String,
}

pub fn meta(meta: &Meta<'_>) -> String {
    let mut head = format!(
        "<title>{title}</title>\n\
         <meta name=\"description\" content=\"{description}\">\n\
         <meta property=\"og:title\" content=\"{title}\">\n\
         <meta property=\"og:description\" content=\"{description}\">\n",
        title = escape(&meta.title),
        description = escape(&meta.description),
    );
    if let Some(image) = meta.image {
        head.push_str(&format!(
            "<meta property=\"og:image\" content=\"{}\">\n",
            escape(image)
        ));
    }
    head
}

pub fn footer(site_name: &str) -> String {
    format!(
        "<footer class=\"footer\"><p>{} does not store any files on its server. \
         All contents are provided by non-affiliated third parties.</p></footer>",
        escape(site_name)
    )
}

/// Full HTML document around a body
pub fn document(head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         {head}</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}
