//! Lenient HTML parser.
//!
//! Builds a `Document` from arbitrary input without ever failing:
//! - a `<` that does not start valid markup is text
//! - unterminated tags are text, unterminated comments run to the end
//! - an end tag closes the nearest open element with the same name and
//!   implicitly closes everything opened after it
//! - stray end tags are kept verbatim
//! - `script`, `style`, `textarea` and `title` contents are opaque text
//!
//! No insertion-mode fixups are applied; the tree mirrors the source
//! nesting so serialization reproduces the input.

use crate::html::dom::{Attribute, Closing, Document, Element, NodeId, NodeKind, is_void_element};

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// Elements whose content is never parsed as markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug)]
enum Token<'a> {
    StartTag {
        name: &'a str,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag {
        name: &'a str,
    },
    Comment,
    Doctype,
    Raw,
}

pub(crate) fn parse(input: &str) -> Document {
    let mut builder = TreeBuilder::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut text_start = 0;

    // Slice endpoints are only ever taken at ASCII bytes, so they are always
    // char boundaries.
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let Some((token, end)) = scan_markup(input, i) else {
            i += 1;
            continue;
        };

        builder.text(&input[text_start..i]);
        let source = &input[i..end];
        i = end;
        text_start = end;

        match token {
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let raw_text = !self_closing && is_raw_text_element(name);
                builder.start_tag(name, attributes, self_closing, source);
                if raw_text {
                    let close = find_close_tag(input, i, name).unwrap_or(input.len());
                    builder.text(&input[i..close]);
                    i = close;
                    text_start = close;
                }
            }
            Token::EndTag { name } => builder.end_tag(name, source),
            Token::Comment => builder.leaf(NodeKind::Comment(source.to_string())),
            Token::Doctype => builder.leaf(NodeKind::Doctype(source.to_string())),
            Token::Raw => builder.leaf(NodeKind::Raw(source.to_string())),
        }
    }
    builder.text(&input[text_start..]);
    builder.finish()
}

struct TreeBuilder {
    doc: Document,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        let doc = Document::new();
        let root = doc.root();
        Self {
            doc,
            open: vec![root],
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn leaf(&mut self, kind: NodeKind) {
        let id = self.doc.create(kind);
        let parent = self.current();
        self.doc.append_child(parent, id);
    }

    fn text(&mut self, text: &str) {
        if !text.is_empty() {
            self.leaf(NodeKind::Text(text.to_string()));
        }
    }

    fn start_tag(&mut self, name: &str, attributes: Vec<Attribute>, self_closing: bool, source: &str) {
        let element = Element::parsed(name.to_string(), attributes, self_closing, source.to_string());
        let id = self.doc.create_element(element);
        let parent = self.current();
        self.doc.append_child(parent, id);
        if !self_closing && !is_void_element(name) {
            self.open.push(id);
        }
    }

    fn end_tag(&mut self, name: &str, source: &str) {
        // Index 0 is the document root and never matches.
        let found = self
            .open
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, id)| self.doc.element(**id).map(|e| e.is(name)).unwrap_or(false))
            .map(|(pos, _)| pos);

        match found {
            Some(pos) => {
                let id = self.open[pos];
                if let Some(element) = self.doc.element_mut(id) {
                    element.closing = Closing::Source(source.to_string());
                }
                self.open.truncate(pos);
            }
            None => self.leaf(NodeKind::Raw(source.to_string())),
        }
    }

    fn finish(self) -> Document {
        self.doc
    }
}

fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn starts_with_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Position of `</name` (followed by a delimiter) at or after `from`.
fn find_close_tag(input: &str, from: usize, name: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let name = name.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        let rel = bytes[i..].iter().position(|&b| b == b'<')?;
        i += rel;
        let after = i + 2 + name.len();
        if bytes.get(i + 1) == Some(&b'/')
            && starts_with_ignore_ascii_case(&bytes[i + 2..], name)
            && bytes
                .get(after)
                .map(|&b| b == b'>' || b == b'/' || b.is_ascii_whitespace())
                .unwrap_or(true)
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Try to read one piece of markup starting at the `<` at `start`.
/// Returns the token and the end offset, or `None` if this `<` is text.
fn scan_markup(input: &str, start: usize) -> Option<(Token<'_>, usize)> {
    let bytes = input.as_bytes();
    let rest = &bytes[start..];

    if rest.starts_with(COMMENT_START.as_bytes()) {
        let body = start + COMMENT_START.len();
        let end = input[body..]
            .find(COMMENT_END)
            .map(|pos| body + pos + COMMENT_END.len())
            .unwrap_or(input.len());
        return Some((Token::Comment, end));
    }

    match rest.get(1).copied() {
        Some(b'!') | Some(b'?') => {
            let end = start + rest.iter().position(|&b| b == b'>')? + 1;
            let token = if starts_with_ignore_ascii_case(rest, b"<!doctype") {
                Token::Doctype
            } else {
                Token::Raw
            };
            Some((token, end))
        }
        Some(b'/') => {
            if !rest.get(2).map(u8::is_ascii_alphabetic).unwrap_or(false) {
                return None;
            }
            let name_start = start + 2;
            let name_end = scan_name(bytes, name_start);
            let end = name_end + bytes[name_end..].iter().position(|&b| b == b'>')? + 1;
            Some((
                Token::EndTag {
                    name: &input[name_start..name_end],
                },
                end,
            ))
        }
        Some(b) if b.is_ascii_alphabetic() => scan_start_tag(input, start),
        _ => None,
    }
}

fn scan_name(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'/' && bytes[i] != b'>' {
        i += 1;
    }
    i
}

fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn scan_start_tag(input: &str, start: usize) -> Option<(Token<'_>, usize)> {
    let bytes = input.as_bytes();
    let name_start = start + 1;
    let name_end = scan_name(bytes, name_start);
    let name = &input[name_start..name_end];

    let mut attributes = Vec::new();
    let mut self_closing = false;
    let mut i = name_end;

    loop {
        i = skip_whitespace(bytes, i);
        match *bytes.get(i)? {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    self_closing = true;
                    i += 2;
                    break;
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        // A leading '=' belongs to the name.
        let attr_start = i;
        i += 1;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let attr_name = &input[attr_start..i];

        let after_name = skip_whitespace(bytes, i);
        let value = if bytes.get(after_name) == Some(&b'=') {
            let value_start = skip_whitespace(bytes, after_name + 1);
            match *bytes.get(value_start)? {
                quote @ (b'"' | b'\'') => {
                    let close = value_start + 1 + bytes[value_start + 1..].iter().position(|&b| b == quote)?;
                    i = close + 1;
                    Some(input[value_start + 1..close].to_string())
                }
                b'>' => {
                    i = value_start;
                    Some(String::new())
                }
                _ => {
                    let mut end = value_start;
                    while end < bytes.len() && !bytes[end].is_ascii_whitespace() && bytes[end] != b'>' {
                        end += 1;
                    }
                    i = end;
                    Some(input[value_start..end].to_string())
                }
            }
        } else {
            None
        };

        attributes.push(Attribute {
            name: attr_name.to_string(),
            value,
        });
    }

    Some((
        Token::StartTag {
            name,
            attributes,
            self_closing,
        },
        i,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_element(doc: &Document, tag: &str) -> Element {
        let ids = doc.select_by_tag(&[tag]);
        assert_eq!(ids.len(), 1, "expected one <{tag}>");
        doc.element(ids[0]).cloned().unwrap()
    }

    #[test]
    fn test_attributes() {
        let doc = parse(r#"<img SRC="/a.png" alt='it"s' width=10 hidden data-x = "y">"#);
        let img = only_element(&doc, "img");
        assert_eq!(img.attribute("src"), Some("/a.png"));
        assert_eq!(img.attribute("alt"), Some("it\"s"));
        assert_eq!(img.attribute("width"), Some("10"));
        assert_eq!(img.attribute("hidden"), Some(""));
        assert_eq!(img.attribute("data-x"), Some("y"));
        assert!(!img.is_self_closing());
    }

    #[test]
    fn test_self_closing_and_unquoted_slash() {
        let doc = parse(r#"<img src=/media/a.png />"#);
        let img = only_element(&doc, "img");
        assert_eq!(img.attribute("src"), Some("/media/a.png"));
        assert!(img.is_self_closing());
    }

    #[test]
    fn test_nesting_and_parent() {
        let doc = parse("<div><picture><img src=x></picture></div>");
        let img = doc.select_by_tag(&["img"])[0];
        let parent = doc.parent(img).unwrap();
        assert!(doc.element(parent).unwrap().is("picture"));
    }

    #[test]
    fn test_unclosed_elements_are_implicitly_closed() {
        let doc = parse("<div><p>one<p>two</div><img src=a>");
        let img = doc.select_by_tag(&["img"])[0];
        assert_eq!(doc.parent(img), Some(doc.root()));
    }

    #[test]
    fn test_raw_text_is_opaque() {
        let doc = parse(r#"<script>var s = "<img src=/media/x.png>";</script><img src=y>"#);
        assert_eq!(doc.select_by_tag(&["img"]).len(), 1);
        assert_eq!(only_element(&doc, "img").attribute("src"), Some("y"));
    }

    #[test]
    fn test_comments_hide_markup() {
        let doc = parse("<!-- <img src=a> --><img src=b><!-- unterminated <img src=c>");
        assert_eq!(only_element(&doc, "img").attribute("src"), Some("b"));
    }

    #[test]
    fn test_garbage_becomes_text() {
        let doc = parse("a < b <> c <1 <img src=\"unterminated");
        assert!(doc.select_by_tag(&["img"]).is_empty());
    }

    #[test]
    fn test_stray_end_tag_is_raw() {
        let doc = parse("</span><b>x</b>");
        let first = doc.children(doc.root())[0];
        assert!(matches!(doc.kind(first), NodeKind::Raw(s) if s == "</span>"));
    }

    #[test]
    fn test_close_tag_search() {
        let input = "<style>a{}</styles></STYLE >";
        assert_eq!(find_close_tag(input, 7, "style"), Some(19));
    }
}
