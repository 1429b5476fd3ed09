//! Lazy-load image rewriting.
//!
//! # Responsibilities
//! - Select `img` and `source` elements not yet marked `lazyload`
//! - Wrap media-hosted images in a `picture` offering a WebP source
//! - Convert everything else in place to `data-*` attributes
//!
//! # Design Decisions
//! - The `lazyload` class doubles as the "already rewritten" marker, so the
//!   output of a rewrite is a fixed point
//! - The WebP source precedes the fallback so browsers pick it first
//! - Parsing is lenient and serialization preserves untouched markup, so
//!   rewriting never fails

use crate::html::dom::{Document, Element, NodeId};

/// Class that triggers client-side lazy loading and marks rewritten elements.
pub const LAZYLOAD_CLASS: &str = "lazyload";

/// Query appended to media URLs for the WebP variant when none is configured.
pub const DEFAULT_WEBP_QUERY: &str = "format=webp&quality=70";

/// Media prefix used when none is configured.
pub const DEFAULT_MEDIA_PREFIX: &str = "/media/";

const CONTAINER_TAG: &str = "picture";

/// Attributes that move to `data-*` for in-place conversion.
const LAZY_ATTRIBUTES: [(&str, &str); 3] = [
    ("src", "data-src"),
    ("srcset", "data-srcset"),
    ("sizes", "data-sizes"),
];

/// Attributes not copied from an `img` onto its `picture`.
const CONTAINER_EXCLUDED: &[&str] = &[
    "src", "srcset", "sizes", "ratio", "data-src", "data-srcset", "data-sizes", "data-ratio",
];

/// Rewrites buffered page markup.
pub trait MarkupRewriter: Send + Sync {
    /// Rewrite `markup`. Must not fail; malformed input is rewritten best-effort.
    fn rewrite(&self, markup: &str) -> String;
}

/// What a rewrite pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Images replaced by a responsive `picture`.
    pub wrapped: usize,
    /// Elements converted in place.
    pub converted: usize,
    /// Elements already marked `lazyload`.
    pub skipped: usize,
}

/// The HTML rewriter.
#[derive(Debug, Clone)]
pub struct HtmlRewriter {
    media_prefix: String,
    webp_query: String,
}

impl Default for HtmlRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_PREFIX, DEFAULT_WEBP_QUERY)
    }
}

impl HtmlRewriter {
    pub fn new(media_prefix: impl Into<String>, webp_query: impl Into<String>) -> Self {
        Self {
            media_prefix: media_prefix.into(),
            webp_query: webp_query.into(),
        }
    }

    /// Rewrite a parsed document in place.
    pub fn rewrite_document(&self, doc: &mut Document) -> RewriteStats {
        let mut stats = RewriteStats::default();

        for id in doc.select_by_tag(&["img", "source"]) {
            let Some(element) = doc.element(id) else {
                continue;
            };
            if element.has_class(LAZYLOAD_CLASS) {
                stats.skipped += 1;
                continue;
            }

            if self.should_wrap(doc, id, element) {
                if self.wrap_in_picture(doc, id) {
                    stats.wrapped += 1;
                }
            } else if let Some(element) = doc.element_mut(id) {
                convert_in_place(element);
                stats.converted += 1;
            }
        }
        stats
    }

    fn should_wrap(&self, doc: &Document, id: NodeId, element: &Element) -> bool {
        if !element.is("img") {
            return false;
        }
        let in_container = doc
            .parent(id)
            .and_then(|p| doc.element(p))
            .map(|p| p.is(CONTAINER_TAG))
            .unwrap_or(false);
        if in_container {
            return false;
        }
        effective(element, "src", "data-src")
            .map(|src| starts_with_ignore_ascii_case(src, &self.media_prefix))
            .unwrap_or(false)
    }

    /// Replace `img` with a `picture` holding a WebP `source` and a fallback `img`.
    fn wrap_in_picture(&self, doc: &mut Document, img_id: NodeId) -> bool {
        let Some(img) = doc.element(img_id) else {
            return false;
        };
        let src = effective(img, "src", "data-src").unwrap_or_default().to_string();
        let srcset = effective(img, "srcset", "data-srcset").unwrap_or_default().to_string();
        let sizes = effective(img, "sizes", "data-sizes").unwrap_or_default().to_string();
        let self_closing = img.is_self_closing();

        let mut picture = Element::new(CONTAINER_TAG);
        for attribute in img.attributes() {
            let excluded = CONTAINER_EXCLUDED
                .iter()
                .any(|name| attribute.name.eq_ignore_ascii_case(name));
            if !excluded && !picture.has_attribute(&attribute.name) {
                picture.set_attribute(&attribute.name, attribute.value.clone().unwrap_or_default());
            }
        }

        let webp_src = (!src.is_empty()).then(|| self.webp_url(&src));
        let webp = picture_source("source", Some("image/webp"), webp_src, &srcset, &sizes, self_closing);
        let fallback_src = (!src.is_empty()).then_some(src);
        let fallback = picture_source("img", None, fallback_src, &srcset, &sizes, self_closing);

        let picture_id = doc.create_element(picture);
        let webp_id = doc.create_element(webp);
        let fallback_id = doc.create_element(fallback);
        doc.append_child(picture_id, webp_id);
        doc.append_child(picture_id, fallback_id);
        doc.replace_child(img_id, picture_id)
    }

    fn webp_url(&self, src: &str) -> String {
        let separator = if src.contains('?') { '&' } else { '?' };
        format!("{src}{separator}{}", self.webp_query)
    }
}

impl MarkupRewriter for HtmlRewriter {
    fn rewrite(&self, markup: &str) -> String {
        let mut doc = Document::parse(markup);
        let stats = self.rewrite_document(&mut doc);
        tracing::trace!(
            wrapped = stats.wrapped,
            converted = stats.converted,
            skipped = stats.skipped,
            "Images rewritten"
        );
        crate::observability::metrics::record_images(stats.wrapped, stats.converted);
        doc.to_html()
    }
}

/// `primary` if present, otherwise `fallback`.
fn effective<'a>(element: &'a Element, primary: &str, fallback: &str) -> Option<&'a str> {
    element.attribute(primary).or_else(|| element.attribute(fallback))
}

/// One child of the responsive construct. An explicit srcset always wins
/// over the single-URL value derived from `src`.
fn picture_source(
    tag: &str,
    mime_type: Option<&str>,
    src_derived: Option<String>,
    srcset: &str,
    sizes: &str,
    self_closing: bool,
) -> Element {
    let mut element = Element::new(tag);
    if let Some(mime_type) = mime_type {
        element.set_attribute("type", mime_type);
    }
    element.add_class(LAZYLOAD_CLASS);
    if let Some(url) = src_derived {
        element.set_attribute("data-srcset", url);
    }
    if !srcset.is_empty() {
        element.set_attribute("data-srcset", srcset);
    }
    if !sizes.is_empty() {
        element.set_attribute("data-sizes", sizes);
    }
    element.set_self_closing(self_closing);
    element
}

fn convert_in_place(element: &mut Element) {
    for (from, to) in LAZY_ATTRIBUTES {
        if let Some(value) = element.attribute(from).map(str::to_string) {
            element.set_attribute(to, value);
            element.remove_attribute(from);
        }
    }
    element.add_class(LAZYLOAD_CLASS);
}

fn starts_with_ignore_ascii_case(haystack: &str, prefix: &str) -> bool {
    haystack.len() >= prefix.len()
        && haystack.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(markup: &str) -> String {
        HtmlRewriter::default().rewrite(markup)
    }

    #[test]
    fn test_media_image_is_wrapped() {
        let out = rewrite(r#"<img src="/media/a.png">"#);
        assert_eq!(
            out,
            r#"<picture><source type="image/webp" class="lazyload" data-srcset="/media/a.png?format=webp&quality=70"><img class="lazyload" data-srcset="/media/a.png"></picture>"#
        );
        assert!(!out.contains(" src="));
    }

    #[test]
    fn test_existing_query_uses_ampersand() {
        let out = rewrite(r#"<img src="/media/c.png?x=1">"#);
        assert!(out.contains(r#"data-srcset="/media/c.png?x=1&format=webp&quality=70""#));
        assert!(out.contains(r#"<img class="lazyload" data-srcset="/media/c.png?x=1">"#));
    }

    #[test]
    fn test_non_media_image_is_converted_in_place() {
        assert_eq!(
            rewrite(r#"<img src="/static/b.png">"#),
            r#"<img data-src="/static/b.png" class="lazyload">"#
        );
    }

    #[test]
    fn test_source_elements_are_converted_in_place() {
        let out = rewrite(r#"<video><source src="/media/v.mp4" type="video/mp4"></video>"#);
        assert_eq!(
            out,
            r#"<video><source type="video/mp4" data-src="/media/v.mp4" class="lazyload"></video>"#
        );
    }

    #[test]
    fn test_srcset_and_sizes_move_to_data_attributes() {
        let out = rewrite(r#"<img src="/a.png" srcset="/a.png 1x, /a@2x.png 2x" sizes="100vw" alt="A">"#);
        assert_eq!(
            out,
            r#"<img alt="A" data-src="/a.png" data-srcset="/a.png 1x, /a@2x.png 2x" data-sizes="100vw" class="lazyload">"#
        );
    }

    #[test]
    fn test_container_copies_attributes_and_srcset_wins() {
        let out = rewrite(
            r#"<img data-src="/MEDIA/a.jpg" srcset="/media/a-400.jpg 400w" sizes="50vw" alt="Alt" class="hero" data-ratio="1.5">"#,
        );
        assert_eq!(
            out,
            concat!(
                r#"<picture alt="Alt" class="hero">"#,
                r#"<source type="image/webp" class="lazyload" data-srcset="/media/a-400.jpg 400w" data-sizes="50vw">"#,
                r#"<img class="lazyload" data-srcset="/media/a-400.jpg 400w" data-sizes="50vw">"#,
                r#"</picture>"#
            )
        );
    }

    #[test]
    fn test_media_image_inside_picture_is_not_rewrapped() {
        let input = r#"<picture><source srcset="/media/a.webp" type="image/webp"><img src="/media/a.png"></picture>"#;
        let out = rewrite(input);
        assert_eq!(out.matches("<picture").count(), 1);
        assert!(out.contains(r#"<img data-src="/media/a.png" class="lazyload">"#));
        assert!(out.contains(r#"<source type="image/webp" data-srcset="/media/a.webp" class="lazyload">"#));
    }

    #[test]
    fn test_lazyload_elements_are_left_alone() {
        let input = r#"<img src="/media/x.png" class="lazyload"><source src="/a" class="big lazyload">"#;
        assert_eq!(rewrite(input), input);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let inputs = [
            r#"<img src="/media/a.png">"#,
            r#"<p>Hi<img src=/static/b.png /><img src="/media/c.png?x=1" alt="c"/></p>"#,
            r#"<picture><source srcset="/media/a.webp"><img src="/media/a.png"></picture>"#,
            r#"<img data-src="/media/lazy.png"><img src="">"#,
            "<div><img src=/media/broken",
            "no images at all",
        ];
        for input in inputs {
            let once = rewrite(input);
            assert_eq!(rewrite(&once), once, "not a fixed point for {input}");
        }
    }

    #[test]
    fn test_stats_and_data_src_fallback() {
        let mut doc = Document::parse(r#"<div><img src="/media/a.png"></div>"#);
        let img = doc.select_by_tag(&["img"])[0];
        doc.element_mut(img).unwrap().set_attribute("srcset", "/media/s.png 2x");
        let rewriter = HtmlRewriter::default();
        let stats = rewriter.rewrite_document(&mut doc);
        assert_eq!(stats, RewriteStats { wrapped: 1, converted: 0, skipped: 0 });

        let out = HtmlRewriter::new("/", DEFAULT_WEBP_QUERY).rewrite(r#"<img data-src="/" sizes="10px">"#);
        assert!(out.contains(r#"<source type="image/webp" class="lazyload" data-srcset="/?format=webp&quality=70" data-sizes="10px">"#));
    }

    #[test]
    fn test_empty_effective_src_sets_no_derived_srcset() {
        let rewriter = HtmlRewriter::new("", DEFAULT_WEBP_QUERY);
        let out = rewriter.rewrite(r#"<img src="" srcset="/x.png 2x">"#);
        assert_eq!(
            out,
            r#"<picture><source type="image/webp" class="lazyload" data-srcset="/x.png 2x"><img class="lazyload" data-srcset="/x.png 2x"></picture>"#
        );

        let out = rewriter.rewrite(r#"<img src="">"#);
        assert_eq!(
            out,
            r#"<picture><source type="image/webp" class="lazyload"><img class="lazyload"></picture>"#
        );
    }

    #[test]
    fn test_self_closing_style_is_kept() {
        let out = rewrite(r#"<img src="/media/a.png" />"#);
        assert!(out.contains(r#"<img class="lazyload" data-srcset="/media/a.png" />"#));
    }

    #[test]
    fn test_custom_media_prefix() {
        let rewriter = HtmlRewriter::new("/uploads/", DEFAULT_WEBP_QUERY);
        assert!(rewriter.rewrite(r#"<img src="/uploads/a.png">"#).starts_with("<picture>"));
        assert!(rewriter.rewrite(r#"<img src="/media/a.png">"#).starts_with("<img data-src"));
    }
}
