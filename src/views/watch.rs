use super::components;
use super::{document, escape, footer, meta, Meta};
use crate::models::PlayerArea;
use crate::services::watch::{StreamStatus, WatchController};

const PAGE_STYLE: &str = "<style>\
body{margin:0;background:#0b0b0b;color:#eee;font-family:system-ui,sans-serif}\
a{color:inherit}\
.layout{display:flex;flex-wrap:wrap}\
.main{flex:1 1 640px;min-width:0}\
.player-area{background:#111;aspect-ratio:16/9;display:flex;align-items:center;justify-content:center}\
.player,.player video,.player-frame{width:100%;height:100%;border:0}\
.panel{padding:16px}\
.episode-list ul{display:grid;grid-template-columns:repeat(auto-fill,minmax(110px,1fr));gap:6px;list-style:none;padding:0}\
.episode a{display:block;padding:6px;background:#222;text-decoration:none}\
.episode.active a,.source.active,.mode.active{background:#f00}\
.source,.mode{margin-right:8px;padding:4px 8px;background:#222;text-decoration:none}\
.more-like-this{flex:0 0 320px;padding:16px}\
.card{display:block;margin-bottom:10px;text-decoration:none}\
.card img{width:100%}\
</style>\n";

/// Data needed to render the watch page
pub struct WatchPage<'a> {
    pub site_name: &'a str,
    pub controller: &'a WatchController,
    pub area: &'a PlayerArea,
}

pub fn render_watch_page(page: &WatchPage<'_>) -> String {
    let controller = page.controller;
    let info = controller.info();
    let provider = controller.provider();
    let current = controller.current_episode();
    let episode_id = current.map(|e| e.id.as_str());
    let mode = controller.requested_mode();

    let head = format!(
        "{}{}",
        meta(&Meta {
            title: format!("{} - {} - Watch", page.site_name, info.title.display()),
            image: info.preview_image(),
            description: format!(
                "{} is a free anime watch website built using Consumet API",
                page.site_name
            ),
        }),
        PAGE_STYLE
    );

    let mut panel = String::new();
    panel.push_str(&components::select_source(&info.id, provider));

    // The toggle only makes sense when the provider gave us an embed page
    let has_embed = matches!(
        controller.status(),
        StreamStatus::Loaded(data) if data.iframe_url().is_some()
    );
    if has_embed {
        panel.push_str(&components::select_iframe(&info.id, provider, episode_id, mode));
    }

    panel.push_str(&components::next_episode_link(
        &info.id,
        provider,
        controller.next_episode(),
        mode,
    ));
    panel.push_str(&components::episode_list(
        &info.id,
        provider,
        &info.episodes,
        controller.current_index(),
        mode,
    ));
    panel.push_str(components::note());
    if let (Some(episode), Some(index)) = (current, controller.current_index()) {
        panel.push_str(&components::episode_info(episode, index));
    }
    panel.push_str(&components::anime_info(info));

    let body = format!(
        "<header class=\"header\"><a href=\"/\">{site}</a></header>\n\
         <div class=\"layout\">\n\
         <main class=\"main\">{player}<div class=\"panel\">{panel}</div></main>\n\
         {aside}\n\
         </div>\n{footer}",
        site = escape(page.site_name),
        player = components::player_area(page.area),
        panel = panel,
        aside = components::more_like_this(info, provider),
        footer = footer(page.site_name),
    );

    document(&head, &body)
}

/// Page returned when the anime cannot be loaded
pub fn render_not_found(site_name: &str) -> String {
    let head = format!(
        "{}{}",
        meta(&Meta {
            title: format!("{} - Not Found", site_name),
            image: None,
            description: "This page could not be found.".to_string(),
        }),
        PAGE_STYLE
    );
    let body = format!(
        "<main class=\"not-found\"><h1>404</h1><p>This page could not be found.</p>\
         <a href=\"/\">Back to home</a></main>\n{}",
        footer(site_name)
    );
    document(&head, &body)
}
