use anyhow::Context as _;
use chrono::{DateTime, Datelike as _, Utc};
use kuchiki::traits::TendrilSink as _;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use url::Url;

use crate::board::{BoardSnapshot, Post};
use crate::builtin;
use crate::login::oauth_login_url;
use crate::menu::{PostMenu, build_menu};

pub struct RenderedPost {
    pub id: String,
    pub author: Option<Author>,
    pub created: String,
    pub last_edited: Option<String>,
    pub content_html: String,
    pub menu: Option<PostMenu>,
}

pub struct Author {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

pub fn render_posts(snapshot: &BoardSnapshot, now: DateTime<Utc>) -> anyhow::Result<Vec<RenderedPost>> {
    let discussion = &snapshot.discussion;
    let viewer = snapshot.current_user.as_ref();

    let mut rendered = Vec::with_capacity(discussion.posts.len());
    for post in &discussion.posts {
        let content_html = sanitize_post_html(&post.html_content)
            .with_context(|| format!("sanitize content of post {}", post.id))?;
        rendered.push(RenderedPost {
            id: post.id.clone(),
            author: post.user.as_ref().map(|u| Author {
                display_name: u.display_name.clone(),
                avatar_url: u.avatar_url.clone(),
            }),
            created: format_created_date(post.created_at),
            last_edited: last_edited(post, now),
            content_html,
            menu: build_menu(discussion, post, viewer),
        });
    }
    Ok(rendered)
}

fn last_edited(post: &Post, now: DateTime<Utc>) -> Option<String> {
    if !post.is_edited {
        return None;
    }
    let at = post.last_updated_at.unwrap_or(post.created_at);
    Some(relative_from_now(at, now))
}

/// Strips executable content from stored post HTML.
///
/// Scripts and plugin embeds are dropped, frames become plain links (or vanish when
/// their source is not a web URL), event handlers are removed, and URL attributes
/// carrying a script or data scheme are cleared. Inline `data:image/` sources on
/// `<img>` survive.
pub fn sanitize_post_html(content: &str) -> anyhow::Result<String> {
    let document = kuchiki::parse_html().one(content);

    for selector in ["script", "object", "embed", "applet"] {
        // Collect first: detaching mid-traversal ends the walk.
        if let Ok(nodes) = document.select(selector) {
            for node in nodes.collect::<Vec<_>>() {
                node.as_node().detach();
            }
        }
    }

    // Embedded frames become plain links.
    for selector in ["iframe", "frame"] {
        if let Ok(nodes) = document.select(selector) {
            for node in nodes.collect::<Vec<_>>() {
                let href = node
                    .attributes
                    .borrow()
                    .get("src")
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                if is_web_link(&href) {
                    if let Some(link) = make_link_node(&href) {
                        node.as_node().insert_before(link);
                    }
                }
                node.as_node().detach();
            }
        }
    }

    if let Ok(nodes) = document.select("*") {
        for node in nodes {
            let is_img = &*node.name.local == "img";
            let mut attrs = node.attributes.borrow_mut();
            let unsafe_attrs: Vec<_> = attrs
                .map
                .iter()
                .filter(|(name, attr)| {
                    let name = &*name.local;
                    if name.starts_with("on") {
                        return true;
                    }
                    if !URL_ATTRIBUTES.contains(&name) {
                        return false;
                    }
                    let keep_inline_image = is_img && name == "src" && is_inline_image(&attr.value);
                    !keep_inline_image && has_unsafe_scheme(&attr.value)
                })
                .map(|(name, _)| name.clone())
                .collect();
            for name in unsafe_attrs {
                attrs.map.remove(&name);
            }
        }
    }

    let body = document
        .select_first("body")
        .ok()
        .map(|n| n.as_node().clone());

    let mut out = Vec::new();
    if let Some(body) = body {
        for child in body.children() {
            child
                .serialize(&mut out)
                .context("serialize post content")?;
        }
    } else {
        document.serialize(&mut out).context("serialize post content")?;
    }
    String::from_utf8(out).context("post content not utf-8")
}

const URL_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "srcset",
    "data",
    "action",
    "formaction",
    "poster",
    "background",
];

/// Lowercased value with the whitespace and control characters browsers skip removed.
fn normalized_url(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn has_unsafe_scheme(value: &str) -> bool {
    let v = normalized_url(value);
    ["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|scheme| v.starts_with(scheme))
}

fn is_inline_image(value: &str) -> bool {
    let v = normalized_url(value);
    v.starts_with("data:image/") && !v.starts_with("data:image/svg")
}

/// http(s), protocol-relative or relative URLs; anything with another scheme is refused.
fn is_web_link(value: &str) -> bool {
    let v = normalized_url(value);
    if v.is_empty() {
        return false;
    }
    if v.starts_with("http://") || v.starts_with("https://") || v.starts_with("//") {
        return true;
    }
    match v.find(':') {
        Some(colon) => v[..colon].contains(['/', '?', '#']),
        None => true,
    }
}

fn make_link_node(href: &str) -> Option<kuchiki::NodeRef> {
    let safe = href.trim();
    let frag = html! {
        p { a href=(safe) rel="noreferrer noopener" { (safe) } }
    };
    let doc = kuchiki::parse_html().one(frag.into_string());
    doc.select_first("p").ok().map(|n| n.as_node().clone())
}

/// `Jan 30th 2026`.
pub fn format_created_date(at: DateTime<Utc>) -> String {
    let day = at.day();
    format!("{} {}{} {}", at.format("%b"), day, ordinal_suffix(day), at.year())
}

fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Humanized distance between `at` and `now`, e.g. `3 days ago` or `in an hour`.
pub fn relative_from_now(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(at).num_seconds();
    let secs = delta.unsigned_abs() as f64;

    let minutes = (secs / 60.0).round() as u64;
    let hours = (secs / 3600.0).round() as u64;
    let days = (secs / 86_400.0).round() as u64;
    let months = (secs / 86_400.0 / 30.4).round() as u64;
    let years = (secs / 86_400.0 / 365.0).round() as u64;

    let span = if secs < 45.0 {
        "a few seconds".to_string()
    } else if minutes < 45 {
        plural(minutes, "a minute", "minutes")
    } else if hours < 22 {
        plural(hours, "an hour", "hours")
    } else if days < 26 {
        plural(days, "a day", "days")
    } else if months < 11 {
        plural(months, "a month", "months")
    } else {
        plural(years, "a year", "years")
    };

    if delta < 0 {
        format!("in {span}")
    } else {
        format!("{span} ago")
    }
}

fn plural(n: u64, one: &str, many: &str) -> String {
    if n <= 1 {
        one.to_string()
    } else {
        format!("{n} {many}")
    }
}

/// Page shell shared by every rendered page.
pub fn build_document(title: &str, body_class: &str, body: Markup) -> String {
    let markup: Markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="google" content="notranslate";
                meta name="theme-color" content=(builtin::THEME_COLOR);
                title { (title) }
                link rel="shortcut icon" href=(builtin::FAVICON_URL);
                @for href in builtin::EXTERNAL_STYLESHEETS {
                    link rel="stylesheet" href=(href);
                }
                style { (PreEscaped(builtin::BUILTIN_CSS)) }
            }
            body class=(body_class) {
                div id="__board" {
                    (body)
                }
            }
        }
    };
    markup.into_string()
}

pub fn build_discussion_html(snapshot: &BoardSnapshot, posts: &[RenderedPost], is_mobile: bool) -> String {
    let title = snapshot.discussion.name.as_str();
    let body_class = if is_mobile { "pb pb-mobile" } else { "pb" };
    let body = html! {
        main class="pb-container" {
            h1 class="pb-discussion-title" { (title) }
            @for p in posts {
                (render_post(p))
            }
        }
    };
    build_document(title, body_class, body)
}

fn render_post(p: &RenderedPost) -> Markup {
    let post_id = format!("post-{}", p.id);
    let by = p
        .author
        .as_ref()
        .map(|a| a.display_name.as_str())
        .unwrap_or("User");

    html! {
        article class="pb-post" {
            @if let Some(menu) = &p.menu {
                (render_menu(menu))
            }
            div id=(post_id) {
                @if let Some(author) = &p.author {
                    img class="pb-avatar"
                        src=(author.avatar_url.as_deref().unwrap_or(""))
                        alt=(author.display_name)
                        title=(author.display_name);
                }
                div class="pb-post-body" {
                    span class="pb-post-meta" {
                        "By: " (by)
                        span class="pb-sep" { "|" }
                        "Created: " (p.created)
                        @if let Some(edited) = &p.last_edited {
                            span class="pb-sep" { "|" }
                            "Last edited: " (edited)
                        }
                    }
                    div class="pb-post-content" {
                        (PreEscaped(&p.content_html))
                    }
                }
            }
        }
    }
}

fn render_menu(menu: &PostMenu) -> Markup {
    html! {
        details class="pb-menu" id=(menu.id) data-id=(menu.data_id) {
            summary aria-label="Post actions" { "\u{22ee}" }
            ul {
                @for item in &menu.items {
                    li data-id=(item.data_id) data-action=(item.action.slug()) { (item.text) }
                }
            }
        }
    }
}

pub fn build_login_html(api_base: &Url, invitation_token: Option<&str>) -> anyhow::Result<String> {
    let google_url = oauth_login_url(api_base, invitation_token)?;
    let form_action = crate::api::endpoint(api_base, crate::api::EMAIL_LOGIN_LINK_PATH)?;

    let body = html! {
        main class="pb-container pb-login" {
            h2 { "Log in" }
            a class="pb-btn pb-btn-secondary" href=(google_url.as_str()) {
                img src=(builtin::GOOGLE_LOGO_URL) alt="Log in with Google";
                (PreEscaped("&nbsp;&nbsp;&nbsp;")) " Log in with Google"
            }
            p {}
            br;
            hr; " " h4 { "OR" } " " hr;
            p {}
            br;
            div {
                form autocomplete="off" data-endpoint=(form_action.as_str()) {
                    input type="email" name="email" required placeholder="Email address";
                    @if let Some(token) = invitation_token.filter(|t| !t.is_empty()) {
                        input type="hidden" name="invitationToken" value=(token);
                    }
                    p {}
                    button class="pb-btn pb-btn-primary" type="submit" { "Log in with email" }
                }
                p {}
                br;
            }
        }
    };
    Ok(build_document("Log in", "pb", body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::fixtures::{discussion, post, user};

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn created_date_uses_ordinals() {
        assert_eq!(format_created_date(at("2026-01-30T10:00:00Z")), "Jan 30th 2026");
        assert_eq!(format_created_date(at("2026-03-01T00:00:00Z")), "Mar 1st 2026");
        assert_eq!(format_created_date(at("2026-03-02T00:00:00Z")), "Mar 2nd 2026");
        assert_eq!(format_created_date(at("2026-03-23T00:00:00Z")), "Mar 23rd 2026");
        assert_eq!(format_created_date(at("2026-03-12T00:00:00Z")), "Mar 12th 2026");
    }

    #[test]
    fn relative_times() {
        let now = at("2026-10-19T12:00:00Z");
        assert_eq!(relative_from_now(at("2026-10-19T11:59:30Z"), now), "a few seconds ago");
        assert_eq!(relative_from_now(at("2026-10-19T11:59:00Z"), now), "a minute ago");
        assert_eq!(relative_from_now(at("2026-10-19T11:50:00Z"), now), "10 minutes ago");
        assert_eq!(relative_from_now(at("2026-10-19T11:00:00Z"), now), "an hour ago");
        assert_eq!(relative_from_now(at("2026-10-19T07:00:00Z"), now), "5 hours ago");
        assert_eq!(relative_from_now(at("2026-10-18T12:00:00Z"), now), "a day ago");
        assert_eq!(relative_from_now(at("2026-10-16T12:00:00Z"), now), "3 days ago");
        assert_eq!(relative_from_now(at("2026-08-19T12:00:00Z"), now), "2 months ago");
        assert_eq!(relative_from_now(at("2023-10-19T12:00:00Z"), now), "3 years ago");
        assert_eq!(relative_from_now(at("2026-10-19T13:00:00Z"), now), "in an hour");
    }

    #[test]
    fn sanitize_drops_scripts_and_frames() {
        let out = sanitize_post_html(
            r#"<p onclick="x()">Hi</p><script>alert(1)</script><iframe src="https://v.example.com/e"></iframe>"#,
        )
        .unwrap();
        assert!(out.contains("<p>Hi</p>"));
        assert!(!out.contains("script"));
        assert!(!out.contains("onclick"));
        assert!(!out.contains("<iframe"));
        assert!(out.contains(r#"href="https://v.example.com/e""#));
    }

    #[test]
    fn sanitize_neutralizes_script_urls_and_embeds() {
        let out = sanitize_post_html(
            r#"<iframe src="javascript:alert(document.cookie)"></iframe><a href="javascript:steal()">x</a><a href=" JaVa&#x09;Script:go()">y</a><object data="javascript:alert(2)"></object><embed src="https://x.example.com/a.swf"><a href="data:text/html;base64,PHNjcmlwdD4=">z</a><img src="data:image/png;base64,iVBORw0KGgo="><a href="/t/1">ok</a>"#,
        )
        .unwrap();
        assert!(!out.to_ascii_lowercase().contains("javascript"));
        assert!(!out.contains("data:text/html"));
        assert!(!out.contains("<object"));
        assert!(!out.contains("<embed"));
        assert!(!out.contains("<iframe"));
        assert!(out.contains(">x</a>"));
        assert!(out.contains(r#"src="data:image/png;base64,iVBORw0KGgo=""#));
        assert!(out.contains(r#"<a href="/t/1">ok</a>"#));
    }

    #[test]
    fn sanitize_removes_every_script() {
        let out = sanitize_post_html(
            "<script>a()</script><p>one</p><script>b()</script><div><script>c()</script><iframe src=\"/e/1\"></iframe><iframe src=\"/e/2\"></iframe></div>",
        )
        .unwrap();
        assert!(!out.contains("<script"));
        assert!(!out.contains("<iframe"));
        assert!(out.contains(r#"href="/e/1""#));
        assert!(out.contains(r#"href="/e/2""#));
        assert!(out.contains("<p>one</p>"));
    }

    #[test]
    fn only_web_urls_become_links() {
        assert!(is_web_link("https://v.example.com/e"));
        assert!(is_web_link("//v.example.com/e"));
        assert!(is_web_link("/embed/1?t=a:b"));
        assert!(!is_web_link("javascript:alert(1)"));
        assert!(!is_web_link("data:text/html,hi"));
        assert!(!is_web_link(""));
    }

    #[test]
    fn menu_only_rendered_for_signed_in_viewer() {
        let now = at("2026-10-19T12:00:00Z");
        let mut snapshot = BoardSnapshot {
            current_user: Some(user("a")),
            discussion: discussion(vec![post("p1", "b"), post("p2", "a")]),
        };

        let posts = render_posts(&snapshot, now).unwrap();
        let page = build_discussion_html(&snapshot, &posts, false);
        assert!(page.contains(r#"id="post-menu-p1""#));
        assert!(page.contains(r#"data-action="show-markdown""#));
        assert!(page.contains(r#"data-action="delete""#));

        snapshot.current_user = None;
        let posts = render_posts(&snapshot, now).unwrap();
        let page = build_discussion_html(&snapshot, &posts, false);
        assert!(!page.contains("post-menu-"));
        assert!(page.contains("By: User a"));
    }

    #[test]
    fn edited_posts_show_relative_time() {
        let now = at("2026-10-19T12:00:00Z");
        let mut p = post("p1", "a");
        p.is_edited = true;
        p.last_updated_at = Some(at("2026-10-16T12:00:00Z"));
        let snapshot = BoardSnapshot {
            current_user: None,
            discussion: discussion(vec![p]),
        };
        let posts = render_posts(&snapshot, now).unwrap();
        assert_eq!(posts[0].last_edited.as_deref(), Some("3 days ago"));
        assert_eq!(posts[0].created, "Jan 30th 2026");
    }

    #[test]
    fn login_page_links_oauth_with_token() {
        let base = Url::parse("https://api.example.com").unwrap();
        let page = build_login_html(&base, Some("inv1")).unwrap();
        assert!(page.contains("https://api.example.com/auth/google?invitationToken=inv1"));
        assert!(page.contains(r#"name="invitationToken" value="inv1""#));
        assert!(page.contains("Log in with email"));
        assert!(page.contains(r##"<meta name="theme-color" content="#303030">"##));
    }
}
