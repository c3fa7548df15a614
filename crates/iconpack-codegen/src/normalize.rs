use regex::{NoExpand, Regex};
use std::ops::Range;
use std::sync::LazyLock;
use tracing::debug;

/// View box written onto every root element. All source assets are drawn on a
/// 512x512 grid; assets drawn on any other grid will scale incorrectly.
pub const CANONICAL_VIEW_BOX: &str = "0 0 512 512";

/// Root `color`; callers override it through component props.
pub const FORCED_COLOR: &str = "black";

static ROOT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<svg(?:\s[^>]*)?/?>").expect("valid root tag pattern"));

static ID_ATTR: LazyLock<Regex> = LazyLock::new(|| attribute("id"));
static HEIGHT_ATTR: LazyLock<Regex> = LazyLock::new(|| attribute("height"));
static WIDTH_ATTR: LazyLock<Regex> = LazyLock::new(|| attribute("width"));
static VIEW_BOX_ATTR: LazyLock<Regex> = LazyLock::new(|| attribute("viewBox"));
static ENABLE_BACKGROUND_ATTR: LazyLock<Regex> = LazyLock::new(|| attribute("enable-background"));
static COLOR_ATTR: LazyLock<Regex> = LazyLock::new(|| attribute("color"));

/// Matches ` name="..."` or ` name='...'`. The leading whitespace keeps
/// `stroke-width` or `data-id` from matching `width` or `id`.
fn attribute(name: &str) -> Regex {
    Regex::new(&format!(
        r#"\s{}\s*=\s*(?:"[^"]*"|'[^']*')"#,
        regex::escape(name)
    ))
    .expect("valid attribute pattern")
}

/// Byte range of the first `<svg ...>` opening tag, if any.
pub(crate) fn root_tag_span(markup: &str) -> Option<Range<usize>> {
    ROOT_TAG.find(markup).map(|m| m.range())
}

/// Rewrite the root `<svg>` element into embeddable form.
///
/// In order: drop `id`, drop `height` and `width`, force
/// `viewBox="0 0 512 512"`, drop `enable-background`, force `color="black"`.
/// Only the first opening root tag is touched; nested elements and all other
/// attributes are left byte-identical. Markup without a recognizable root
/// element is returned unchanged.
pub fn normalize(markup: &str) -> String {
    let Some(span) = root_tag_span(markup) else {
        debug!("no <svg> root element found, leaving markup unchanged");
        return markup.to_owned();
    };

    let root = rewrite_root(&markup[span.clone()]);
    let mut out = String::with_capacity(markup.len() + 48);
    out.push_str(&markup[..span.start]);
    out.push_str(&root);
    out.push_str(&markup[span.end..]);
    out
}

fn rewrite_root(tag: &str) -> String {
    let tag = ID_ATTR.replace(tag, "");
    let tag = HEIGHT_ATTR.replace(&tag, "");
    let tag = WIDTH_ATTR.replace(&tag, "");
    let tag = force_attribute(&tag, &VIEW_BOX_ATTR, "viewBox", CANONICAL_VIEW_BOX);
    let tag = ENABLE_BACKGROUND_ATTR.replace(&tag, "");
    force_attribute(&tag, &COLOR_ATTR, "color", FORCED_COLOR)
}

/// Replace the attribute in place, or append it when the tag lacks it.
fn force_attribute(tag: &str, pattern: &Regex, name: &str, value: &str) -> String {
    let attr = format!("{name}=\"{value}\"");
    if pattern.is_match(tag) {
        pattern
            .replace(tag, NoExpand(&format!(" {attr}")))
            .into_owned()
    } else {
        insert_before_close(tag, &attr)
    }
}

/// Split an opening tag into everything before its closing `>` (or `/>`)
/// and the closer itself.
fn split_close(tag: &str) -> (&str, &str) {
    match tag.strip_suffix("/>") {
        Some(head) => (head, "/>"),
        None => (tag.strip_suffix('>').unwrap_or(tag), ">"),
    }
}

/// Insert ` attr` just before the closing `>` (or `/>`) of an opening tag,
/// collapsing whitespace left behind by removed attributes.
fn insert_before_close(tag: &str, attr: &str) -> String {
    let (head, close) = split_close(tag);
    format!("{} {attr}{close}", head.trim_end())
}

/// Insert ` text` just before the closing `>` (or `/>`) of an opening tag.
/// Every existing byte of the tag is kept.
pub(crate) fn append_to_open_tag(tag: &str, text: &str) -> String {
    let (head, close) = split_close(tag);
    format!("{head} {text}{close}")
}
