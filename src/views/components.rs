use chrono::{TimeZone, Utc};

use super::{escape, watch_href};
use crate::config::KNOWN_PROVIDERS;
use crate::models::{PlaybackMode, PlayerArea, PlayerView};
use crate::services::consumet::{AnimeInfo, Episode, NextAiringEpisode};

/// Player box: inline message or the player itself
pub fn player_area(area: &PlayerArea) -> String {
    let inner = match area {
        PlayerArea::Ready { player } => match player.mode {
            PlaybackMode::Iframe => iframe_player(player),
            PlaybackMode::Native => native_player(player),
        },
        _ => format!(
            "<h5 class=\"player-message\">{}</h5>",
            escape(area.message().unwrap_or_default())
        ),
    };
    format!("<div class=\"player-area\">{}</div>", inner)
}

fn iframe_player(player: &PlayerView) -> String {
    let src = player.iframe_url.as_deref().unwrap_or_default();
    format!(
        "<iframe src=\"{}\" class=\"player-frame\" allowfullscreen></iframe>",
        escape(src)
    )
}

/// Native `<video>` element; hls.js picks up `player-data` for m3u8 sources
fn native_player(player: &PlayerView) -> String {
    let mut html = String::from("<div class=\"player\">");

    html.push_str(&format!(
        "<video id=\"player\" controls playsinline crossorigin=\"anonymous\"{}>",
        player
            .poster
            .as_deref()
            .map(|p| format!(" poster=\"{}\"", escape(p)))
            .unwrap_or_default()
    ));
    for track in &player.subtitles {
        html.push_str(&format!(
            "<track kind=\"subtitles\" label=\"{lang}\" srclang=\"{lang}\" src=\"{url}\">",
            lang = escape(&track.lang),
            url = escape(&track.url)
        ));
    }
    html.push_str("</video>");

    if player.sources.len() > 1 {
        html.push_str("<select id=\"quality\" class=\"quality\">");
        for (i, source) in player.sources.iter().enumerate() {
            html.push_str(&format!(
                "<option value=\"{}\">{}</option>",
                i,
                escape(&source.label)
            ));
        }
        html.push_str("</select>");
    }

    if let Some(intro) = player.intro {
        html.push_str(&format!(
            "<button id=\"skip-intro\" data-start=\"{}\" data-end=\"{}\" hidden>Skip intro</button>",
            intro.start, intro.end
        ));
    }

    // Embedded JSON must not close the script element early
    let data = serde_json::to_string(player)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");
    html.push_str(&format!(
        "<script type=\"application/json\" id=\"player-data\">{}</script>",
        data
    ));
    html.push_str(PLAYER_SCRIPT);
    html.push_str("</div>");
    html
}

const PLAYER_SCRIPT: &str = r#"<script src="https://cdn.jsdelivr.net/npm/hls.js@1"></script>
<script>
(function () {
  var data = JSON.parse(document.getElementById("player-data").textContent);
  var video = document.getElementById("player");
  var hls = null;
  function load(i) {
    var src = data.sources[i] && data.sources[i].url;
    if (!src) return;
    if (hls) { hls.destroy(); hls = null; }
    if (src.indexOf(".m3u8") !== -1 && window.Hls && Hls.isSupported()) {
      hls = new Hls(); hls.loadSource(src); hls.attachMedia(video);
    } else { video.src = src; }
  }
  load(0);
  var quality = document.getElementById("quality");
  if (quality) quality.addEventListener("change", function () {
    var t = video.currentTime; load(+quality.value); video.currentTime = t;
  });
  var skip = document.getElementById("skip-intro");
  if (skip) {
    video.addEventListener("timeupdate", function () {
      var s = +skip.dataset.start, e = +skip.dataset.end;
      skip.hidden = !(video.currentTime >= s && video.currentTime < e);
    });
    skip.addEventListener("click", function () { video.currentTime = +skip.dataset.end; });
  }
  video.addEventListener("ended", function () {
    var next = document.getElementById("next-episode");
    if (data.hasNext && next) window.location.href = next.href;
  });
})();
</script>"#;

/// Provider switcher; switching always starts again from the first episode
pub fn select_source(anime_id: &str, current: &str) -> String {
    let mut html = String::from("<div class=\"select-source\"><span>Source:</span>");
    for provider in KNOWN_PROVIDERS {
        let href = watch_href(anime_id, provider, None, PlaybackMode::Native);
        let class = if *provider == current { "source active" } else { "source" };
        html.push_str(&format!(
            "<a class=\"{}\" href=\"{}\">{}</a>",
            class,
            escape(&href),
            escape(provider)
        ));
    }
    html.push_str("</div>");
    html
}

/// Native/iframe toggle for the current episode
pub fn select_iframe(
    anime_id: &str,
    provider: &str,
    episode_id: Option<&str>,
    mode: PlaybackMode,
) -> String {
    let link = |target: PlaybackMode, label: &str| {
        let class = if target == mode { "mode active" } else { "mode" };
        format!(
            "<a class=\"{}\" href=\"{}\">{}</a>",
            class,
            escape(&watch_href(anime_id, provider, episode_id, target)),
            label
        )
    };
    format!(
        "<div class=\"select-iframe\">{}{}</div>",
        link(PlaybackMode::Native, "Default player"),
        link(PlaybackMode::Iframe, "Embedded player")
    )
}

pub fn episode_list(
    anime_id: &str,
    provider: &str,
    episodes: &[Episode],
    current: Option<usize>,
    mode: PlaybackMode,
) -> String {
    if episodes.is_empty() {
        return "<div class=\"episode-list\"><p>No episodes available</p></div>".to_string();
    }

    let mut html = String::from("<div class=\"episode-list\"><h3>Episodes</h3><ul>");
    for (i, episode) in episodes.iter().enumerate() {
        let href = watch_href(anime_id, provider, Some(&episode.id), mode);
        let class = if Some(i) == current { "episode active" } else { "episode" };
        html.push_str(&format!(
            "<li class=\"{}\"><a href=\"{}\">{}</a></li>",
            class,
            escape(&href),
            escape(&episode.label(i))
        ));
    }
    html.push_str("</ul></div>");
    html
}

/// "Next episode" link consumed by the player script when playback ends
pub fn next_episode_link(
    anime_id: &str,
    provider: &str,
    next: Option<&Episode>,
    mode: PlaybackMode,
) -> String {
    match next {
        Some(episode) => format!(
            "<a id=\"next-episode\" class=\"next-episode\" href=\"{}\">Next episode</a>",
            escape(&watch_href(anime_id, provider, Some(&episode.id), mode))
        ),
        None => String::new(),
    }
}

pub fn note() -> &'static str {
    "<p class=\"note\">If the current source does not play, try another source or switch to the embedded player.</p>"
}

pub fn episode_info(episode: &Episode, index: usize) -> String {
    let mut html = format!(
        "<div class=\"episode-info\"><h4>{}</h4>",
        escape(&episode.label(index))
    );
    if let Some(title) = episode.title.as_deref().filter(|t| !t.is_empty()) {
        html.push_str(&format!("<h5>{}</h5>", escape(title)));
    }
    if let Some(description) = episode.description.as_deref().filter(|d| !d.is_empty()) {
        html.push_str(&format!("<p>{}</p>", escape(description)));
    }
    if let Some(air_date) = episode.air_date.as_deref() {
        html.push_str(&format!("<p class=\"air-date\">Aired: {}</p>", escape(air_date)));
    }
    html.push_str("</div>");
    html
}

/// "Airs in 2d 3h (2024-01-01 12:00 UTC)"
pub fn format_next_airing(next: &NextAiringEpisode) -> Option<String> {
    let episode = next
        .episode
        .map(|n| format!("Episode {} ", n))
        .unwrap_or_default();

    let countdown = next.time_until_airing.filter(|s| *s > 0).map(|secs| {
        let days = secs / 86_400;
        let hours = (secs % 86_400) / 3600;
        let minutes = (secs % 3600) / 60;
        if days > 0 {
            format!("in {}d {}h", days, hours)
        } else if hours > 0 {
            format!("in {}h {}m", hours, minutes)
        } else {
            format!("in {}m", minutes.max(1))
        }
    });

    let date = next
        .airing_time
        .and_then(|t| Utc.timestamp_opt(t, 0).single())
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string());

    match (countdown, date) {
        (Some(c), Some(d)) => Some(format!("{}airs {} ({})", episode, c, d)),
        (Some(c), None) => Some(format!("{}airs {}", episode, c)),
        (None, Some(d)) => Some(format!("{}airs {}", episode, d)),
        (None, None) => None,
    }
}

pub fn anime_info(info: &AnimeInfo) -> String {
    let mut html = String::from("<div class=\"anime-info\">");
    if let Some(image) = info.image.as_deref() {
        html.push_str(&format!(
            "<img class=\"poster\" src=\"{}\" alt=\"{}\">",
            escape(image),
            escape(info.title.display())
        ));
    }
    html.push_str(&format!("<h2>{}</h2><ul class=\"facts\">", escape(info.title.display())));

    if let Some(kind) = info.kind.as_deref() {
        html.push_str(&format!("<li>Type: {}</li>", escape(kind)));
    }
    if let Some(year) = info.release_date {
        html.push_str(&format!("<li>Released: {}</li>", year));
    }
    if let Some(duration) = info.duration {
        html.push_str(&format!("<li>Duration: {} min</li>", duration));
    }
    if let Some(status) = info.status.as_deref() {
        html.push_str(&format!("<li>Status: {}</li>", escape(status)));
    }
    if let Some(next) = info.next_airing_episode.as_ref().and_then(format_next_airing) {
        html.push_str(&format!("<li class=\"next-airing\">{}</li>", escape(&next)));
    }
    html.push_str("</ul>");

    // Upstream descriptions carry markup; render them as text
    if let Some(description) = info.description.as_deref() {
        html.push_str(&format!("<p class=\"description\">{}</p>", escape(description)));
    }
    html.push_str("</div>");
    html
}

fn card(href: &str, title: &str, image: Option<&str>, caption: &str) -> String {
    format!(
        "<a class=\"card\" href=\"{}\">{}<span class=\"card-title\">{}</span><span class=\"card-caption\">{}</span></a>",
        escape(href),
        image
            .map(|i| format!("<img src=\"{}\" alt=\"{}\" loading=\"lazy\">", escape(i), escape(title)))
            .unwrap_or_default(),
        escape(title),
        escape(caption)
    )
}

pub fn more_like_this(info: &AnimeInfo, provider: &str) -> String {
    let mut html = String::from("<aside class=\"more-like-this\">");

    if !info.relations.is_empty() {
        html.push_str("<h3>Relations</h3>");
        for relation in &info.relations {
            let caption = relation
                .relation_type
                .as_deref()
                .map(|t| t.replace('_', " ").to_lowercase())
                .unwrap_or_default();
            html.push_str(&card(
                &watch_href(&relation.id, provider, None, PlaybackMode::Native),
                relation.title.display(),
                relation.image.as_deref(),
                &caption,
            ));
        }
    }

    if !info.recommendations.is_empty() {
        html.push_str("<h3>More like this</h3>");
        for rec in &info.recommendations {
            let caption = match (rec.kind.as_deref(), rec.episodes) {
                (Some(kind), Some(n)) => format!("{} · {} eps", kind, n),
                (Some(kind), None) => kind.to_string(),
                (None, Some(n)) => format!("{} eps", n),
                (None, None) => String::new(),
            };
            html.push_str(&card(
                &watch_href(&rec.id, provider, None, PlaybackMode::Native),
                rec.title.display(),
                rec.image.as_deref(),
                &caption,
            ));
        }
    }

    html.push_str("</aside>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerSource, PlayerSubtitle};
    use crate::services::consumet::{AnimeTitle, Recommendation, Relation};
    use crate::services::watch::tests::anime;

    fn view(mode: PlaybackMode) -> PlayerView {
        PlayerView {
            mode,
            sources: vec![
                PlayerSource { label: "1080p".into(), url: "https://cdn.test/1080.m3u8".into() },
                PlayerSource { label: "720p".into(), url: "https://cdn.test/720.m3u8".into() },
            ],
            subtitles: vec![PlayerSubtitle {
                lang: "English".into(),
                url: "/api/subtitles?url=x".into(),
            }],
            poster: Some("https://img.test/p.jpg".into()),
            intro: None,
            iframe_url: Some("https://embed.test/1?a=1&b=2".into()),
            has_next: false,
            next_episode_id: None,
        }
    }

    #[test]
    fn test_player_area_messages() {
        assert!(player_area(&PlayerArea::NoEpisode).contains("Please select the episode"));
        assert!(player_area(&PlayerArea::Failed { message: "x".into() })
            .contains("Failed to load episode sources"));
        assert!(player_area(&PlayerArea::NoSources).contains("No sources available"));
    }

    #[test]
    fn test_native_player_markup() {
        let html = player_area(&PlayerArea::Ready { player: view(PlaybackMode::Native) });
        assert!(html.contains("<video id=\"player\""));
        assert!(html.contains("poster=\"https://img.test/p.jpg\""));
        assert!(html.contains("<track kind=\"subtitles\" label=\"English\""));
        assert!(html.contains("<option value=\"1\">720p</option>"));
        assert!(!html.contains("<iframe"));
    }

    #[test]
    fn test_iframe_player_markup() {
        let html = player_area(&PlayerArea::Ready { player: view(PlaybackMode::Iframe) });
        assert!(html.contains("<iframe src=\"https://embed.test/1?a=1&amp;b=2\""));
        assert!(!html.contains("<video"));
    }

    #[test]
    fn test_player_data_cannot_break_out_of_script() {
        let mut player = view(PlaybackMode::Native);
        player.sources[0].label = "</script><script>alert(1)</script>".into();
        let html = player_area(&PlayerArea::Ready { player });
        assert!(!html.contains("</script><script>alert(1)"));
    }

    #[test]
    fn test_episode_list_highlights_current() {
        let info = anime("naruto", 3);
        let html = episode_list("naruto", "zoro", &info.episodes, Some(1), PlaybackMode::Native);
        assert!(html.contains(
            "<li class=\"episode active\"><a href=\"/watch/naruto?provider=zoro&amp;episode=naruto-episode-2\">Episode 2</a></li>"
        ));
        assert_eq!(html.matches("episode active").count(), 1);

        let empty = episode_list("naruto", "zoro", &[], None, PlaybackMode::Native);
        assert!(empty.contains("No episodes available"));
    }

    #[test]
    fn test_select_source_marks_current_provider() {
        let html = select_source("21", "zoro");
        assert!(html.contains("<a class=\"source active\" href=\"/watch/21?provider=zoro\">zoro</a>"));
        assert!(html.contains("/watch/21?provider=gogoanime"));
    }

    #[test]
    fn test_anime_info_escapes_description() {
        let html = anime_info(&anime("naruto", 1));
        assert!(html.contains("A &lt;b&gt;bold&lt;/b&gt; story"));
        assert!(html.contains("<li>Duration: 24 min</li>"));
        assert!(html.contains("<li>Released: 2020</li>"));
    }

    #[test]
    fn test_format_next_airing() {
        let next = NextAiringEpisode {
            episode: Some(12),
            airing_time: Some(1_700_000_000),
            time_until_airing: Some(2 * 86_400 + 3 * 3600),
        };
        assert_eq!(
            format_next_airing(&next).unwrap(),
            "Episode 12 airs in 2d 3h (2023-11-14 22:13 UTC)"
        );

        let empty = NextAiringEpisode {
            episode: Some(1),
            airing_time: None,
            time_until_airing: None,
        };
        assert_eq!(format_next_airing(&empty), None);
    }

    #[test]
    fn test_more_like_this() {
        let mut info = anime("naruto", 1);
        info.recommendations.push(Recommendation {
            id: "1735".into(),
            title: AnimeTitle::Plain("Naruto Shippuden".into()),
            image: None,
            kind: Some("TV".into()),
            episodes: Some(500),
            rating: Some(82),
        });
        info.relations.push(Relation {
            id: "442".into(),
            relation_type: Some("SIDE_STORY".into()),
            title: AnimeTitle::Plain("Naruto Movie".into()),
            image: None,
            kind: Some("MOVIE".into()),
            episodes: Some(1),
        });

        let html = more_like_this(&info, "gogoanime");
        assert!(html.contains("/watch/1735?provider=gogoanime"));
        assert!(html.contains("TV · 500 eps"));
        assert!(html.contains("side story"));
    }
}
