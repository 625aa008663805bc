//! Text extraction from catalog pages.
//!
//! The pages are HTML rather than XML, so the reader runs with end-name checks
//! off and unmatched closing tags allowed. `<script>` and `<style>` bodies are
//! cut out before parsing since their contents are not markup. Markup the
//! reader still cannot make sense of is skipped; whatever was read up to that
//! point is kept.

use std::borrow::Cow;

use quick_xml::{
  Reader,
  escape::{resolve_predefined_entity, unescape_with},
  events::{BytesStart, Event},
};
use quire_core::fetch::{FetchError, RosterListing};
use reqwest::Url;
use tracing::{debug, warn};

/// `name` attribute of the portal's main content container.
const MAIN_CONTAINER: &str = "ibmMainContainer";
/// Class of the column holding a subject page's text.
const CONTENT_CLASS: &str = "right-col";
/// Id of the print/share widget inside the content column.
const SHARE_WIDGET_ID: &str = "print-share-desktop";

const RAW_TEXT_TAGS: [&str; 2] = ["script", "style"];

const BLOCK_TAGS: &[&[u8]] = &[
  b"address", b"article", b"br", b"dd", b"div", b"dl", b"dt", b"footer",
  b"h1", b"h2", b"h3", b"h4", b"h5", b"h6", b"header", b"hr", b"li", b"ol",
  b"p", b"section", b"table", b"tr", b"ul",
];

// ─── Directory page ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Entry {
  text: String,
  href: Option<String>,
}

/// Read the roster from a directory page.
///
/// The first `<ul>` inside the main container (or the whole document when the
/// page has no such container) supplies one entry per `<li>`: its text, minus
/// `suffix`, is the name and its first link is the locator, resolved against
/// `base`.
pub fn parse_directory(html: &str, base: &Url, suffix: &str) -> RosterListing {
  let html = strip_raw_text(html);
  let scoped = html.contains(MAIN_CONTAINER);
  let mut reader = lenient_reader(&html);

  let mut container: Option<Open> = None;
  let mut list: Option<Open> = None;
  let mut entry: Option<Entry> = None;
  let mut listing = RosterListing::new();

  while let Some(event) = next_event(&mut reader, "directory page") {
    match event {
      Event::Start(e) => {
        let tag = tag_name(&e);
        if let Some(c) = container.as_mut() {
          c.start(&tag);
        } else if scoped && attr(&e, b"name").as_deref() == Some(MAIN_CONTAINER) {
          container = Some(Open::new(tag));
          continue;
        }

        match list.as_mut() {
          Some(l) => {
            l.start(&tag);
            if tag == b"li" && l.depth == 1 {
              if let Some(done) = entry.take() {
                push_entry(&mut listing, done, base, suffix);
              }
              entry = Some(Entry::default());
            } else if tag == b"a" {
              take_href(entry.as_mut(), &e);
            }
          }
          None if tag == b"ul" && (!scoped || container.is_some()) => {
            list = Some(Open::new(tag));
          }
          None => {}
        }
      }
      Event::Empty(e) => {
        if tag_name(&e) == b"a" {
          take_href(entry.as_mut(), &e);
        }
      }
      Event::Text(t) => {
        if let Some(open) = entry.as_mut() {
          open.text.push_str(&decode(&t));
        }
      }
      Event::End(e) => {
        let tag = e.local_name().as_ref().to_ascii_lowercase();
        if let Some(l) = list.as_mut() {
          let closes_item = tag == b"li" && l.depth == 1;
          if l.end(&tag) {
            if let Some(done) = entry.take() {
              push_entry(&mut listing, done, base, suffix);
            }
            break;
          }
          if closes_item && let Some(done) = entry.take() {
            push_entry(&mut listing, done, base, suffix);
          }
        }
        if let Some(c) = container.as_mut()
          && c.end(&tag)
        {
          container = None;
        }
      }
      _ => {}
    }
  }

  if let Some(done) = entry.take() {
    push_entry(&mut listing, done, base, suffix);
  }
  listing
}

fn take_href(entry: Option<&mut Entry>, e: &BytesStart<'_>) {
  if let Some(entry) = entry
    && entry.href.is_none()
  {
    entry.href = attr(e, b"href");
  }
}

fn push_entry(listing: &mut RosterListing, entry: Entry, base: &Url, suffix: &str) {
  let text = collapse_whitespace(&entry.text);
  if text.is_empty() {
    return;
  }

  let name = if !suffix.is_empty() && text.contains(suffix) {
    text.replace(suffix, "").trim().to_owned()
  } else {
    warn!("{text:?} does not match the expected name structure");
    text
  };

  let Some(href) = entry.href else {
    warn!("roster entry {name:?} has no link, ignoring");
    return;
  };
  match base.join(href.trim()) {
    Ok(url) => {
      listing.insert(name, url.to_string());
    }
    Err(e) => warn!("roster entry {name:?} has an unusable link {href:?}: {e}"),
  }
}

// ─── Subject page ────────────────────────────────────────────────────────────

/// Reduce a subject page to its plain text, one block element per line.
///
/// Only the content column is read when the page has one; the share widget
/// and `<head>` are skipped. Whitespace inside a line is collapsed and blank
/// lines are dropped, so the result is stable across cosmetic markup changes.
pub fn extract_text(html: &str) -> Result<String, FetchError> {
  let html = strip_raw_text(html);
  let scoped = html.contains(CONTENT_CLASS);
  let mut reader = lenient_reader(&html);

  let mut scope: Option<Open> = None;
  let mut skip: Option<Open> = None;
  let mut out = String::new();

  while let Some(event) = next_event(&mut reader, "subject page") {
    let inside = !scoped || scope.is_some();

    match event {
      Event::Start(e) => {
        let tag = tag_name(&e);
        if let Some(s) = skip.as_mut() {
          s.start(&tag);
          continue;
        }
        match scope.as_mut() {
          Some(s) => s.start(&tag),
          None if scoped && has_class(&e, CONTENT_CLASS) => {
            scope = Some(Open::new(tag));
            continue;
          }
          None => {}
        }
        if !inside {
          continue;
        }
        if tag == b"head" || attr(&e, b"id").as_deref() == Some(SHARE_WIDGET_ID) {
          skip = Some(Open::new(tag));
        } else if is_block(&tag) {
          out.push('\n');
        }
      }
      Event::Empty(e) => {
        if inside && skip.is_none() && is_block(&tag_name(&e)) {
          out.push('\n');
        }
      }
      Event::Text(t) => {
        if inside && skip.is_none() {
          push_inline(&mut out, &decode(&t));
        }
      }
      Event::CData(t) => {
        if inside && skip.is_none() {
          push_inline(&mut out, &String::from_utf8_lossy(&t));
        }
      }
      Event::End(e) => {
        let tag = e.local_name().as_ref().to_ascii_lowercase();
        if let Some(s) = skip.as_mut() {
          if s.end(&tag) {
            skip = None;
          }
          continue;
        }
        if inside && is_block(&tag) {
          out.push('\n');
        }
        if let Some(s) = scope.as_mut()
          && s.end(&tag)
        {
          break;
        }
      }
      _ => {}
    }
  }

  let lines: Vec<String> = out
    .lines()
    .map(collapse_whitespace)
    .filter(|line| !line.is_empty())
    .collect();
  if lines.is_empty() {
    return Err(FetchError::Parse {
      what:   "subject page".into(),
      reason: "no text content".into(),
    });
  }

  let mut text = lines.join("\n");
  text.push('\n');
  Ok(text)
}

fn push_inline(out: &mut String, text: &str) {
  out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
}

// ─── Reader helpers ──────────────────────────────────────────────────────────

/// An element being tracked until its matching close tag.
///
/// Only same-named descendants are counted, which keeps void elements like
/// `<br>` from unbalancing the depth.
struct Open {
  tag:   Vec<u8>,
  depth: usize,
}

impl Open {
  fn new(tag: Vec<u8>) -> Self { Self { tag, depth: 1 } }

  fn start(&mut self, tag: &[u8]) {
    if tag == self.tag {
      self.depth += 1;
    }
  }

  /// Returns `true` once the tracked element itself has closed.
  fn end(&mut self, tag: &[u8]) -> bool {
    if tag == self.tag {
      self.depth = self.depth.saturating_sub(1);
    }
    self.depth == 0
  }
}

fn lenient_reader(html: &str) -> Reader<&[u8]> {
  let mut reader = Reader::from_str(html);
  let config = reader.config_mut();
  config.check_end_names = false;
  config.allow_unmatched_ends = true;
  reader
}

/// The next event, or `None` at end of input.
///
/// Errors are logged and stepped over. After a syntax error the reader only
/// reports end of input, and a read that makes no progress ends the document.
fn next_event<'a>(reader: &mut Reader<&'a [u8]>, what: &str) -> Option<Event<'a>> {
  loop {
    let before = reader.buffer_position();
    match reader.read_event() {
      Ok(Event::Eof) => return None,
      Ok(event) => return Some(event),
      Err(e) => {
        debug!("skipping malformed markup in {what} at byte {before}: {e}");
        if reader.buffer_position() == before {
          return None;
        }
      }
    }
  }
}

fn tag_name(e: &BytesStart<'_>) -> Vec<u8> {
  e.local_name().as_ref().to_ascii_lowercase()
}

fn is_block(tag: &[u8]) -> bool { BLOCK_TAGS.contains(&tag) }

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
  e.html_attributes()
    .flatten()
    .find(|a| a.key.as_ref().eq_ignore_ascii_case(key))
    .map(|a| decode(&a.value))
}

fn has_class(e: &BytesStart<'_>, class: &str) -> bool {
  attr(e, b"class").is_some_and(|v| v.split_whitespace().any(|c| c == class))
}

/// Decode raw text, resolving the entities catalog pages actually use.
/// Anything unresolvable is kept verbatim.
fn decode(raw: &[u8]) -> String {
  let raw = String::from_utf8_lossy(raw);
  let decoded = unescape_with(&raw, |entity| {
    resolve_predefined_entity(entity).or_else(|| html_entity(entity))
  })
  .map(Cow::into_owned);
  decoded.unwrap_or_else(|_| raw.into_owned())
}

fn html_entity(name: &str) -> Option<&'static str> {
  Some(match name {
    "nbsp" => " ",
    "ndash" => "\u{2013}",
    "mdash" => "\u{2014}",
    "lsquo" | "rsquo" => "'",
    "ldquo" | "rdquo" => "\"",
    "hellip" => "...",
    "copy" => "\u{a9}",
    _ => return None,
  })
}

fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `<script>` and `<style>` elements, bodies included.
fn strip_raw_text(html: &str) -> String {
  // ASCII lowercasing keeps byte offsets identical.
  let lower = html.to_ascii_lowercase();
  let mut out = String::with_capacity(html.len());
  let mut pos = 0;

  while let Some((start, tag)) = RAW_TEXT_TAGS
    .iter()
    .filter_map(|tag| find_open_tag(&lower, pos, tag).map(|at| (at, *tag)))
    .min_by_key(|(at, _)| *at)
  {
    out.push_str(&html[pos..start]);
    let close = format!("</{tag}");
    pos = match lower[start..].find(&close) {
      Some(i) => {
        let close_at = start + i;
        lower[close_at..]
          .find('>')
          .map_or(lower.len(), |j| close_at + j + 1)
      }
      None => lower.len(),
    };
  }

  out.push_str(&html[pos..]);
  out
}

fn find_open_tag(lower: &str, from: usize, tag: &str) -> Option<usize> {
  let needle = format!("<{tag}");
  let mut at = from;
  while let Some(i) = lower[at..].find(&needle) {
    let start = at + i;
    let next = lower.as_bytes().get(start + needle.len());
    if matches!(next, None | Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r')) {
      return Some(start);
    }
    at = start + needle.len();
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;

  const SUFFIX: &str = " 2021 HSC exam pack";

  fn base() -> Url { Url::parse("https://catalog.example/portal/").unwrap() }

  const DIRECTORY: &str = r#"<!DOCTYPE html>
<html><head><title>HSC exam papers</title>
<script>if (a < b && c) { document.write("<ul><li>x</li></ul>"); }</script>
<style>li > a { color: red; }</style>
</head>
<body>
<nav><ul><li><a href="/home">Home</a></li></ul></nav>
<div name="ibmMainContainer">
  <div class="stControlBody">
    <p>Select a subject<br></p>
    <ul>
      <li><a href="/nesa/2021/biology">Biology 2021 HSC exam pack</a></li>
      <li><a href="/nesa/2021/eald">English EAL/D
          2021 HSC exam pack</a></li>
      <li><a href="https://other.example/physics">Physics 2021 HSC exam pack</a></li>
      <li><a href="music">Music 1 exam pack</a></li>
      <li>Retired subject</li>
    </ul>
    <ul><li><a href="/other">Not a subject</a></li></ul>
  </div>
</div>
</body></html>"#;

  #[test]
  fn directory_entries_come_from_the_main_list() {
    let listing = parse_directory(DIRECTORY, &base(), SUFFIX);

    assert_eq!(listing.len(), 4, "{listing:?}");
    assert_eq!(listing["Biology"], "https://catalog.example/nesa/2021/biology");
    assert_eq!(listing["English EAL/D"], "https://catalog.example/nesa/2021/eald");
    assert_eq!(listing["Physics"], "https://other.example/physics");
    // Suffix missing: kept whole, link resolved relative to the base.
    assert_eq!(listing["Music 1 exam pack"], "https://catalog.example/portal/music");
    assert!(!listing.contains_key("Home"));
    assert!(!listing.contains_key("Not a subject"));
  }

  #[test]
  fn directory_without_container_uses_first_list() {
    let html = r#"<body><ul><li><a href="/a">Art 2021 HSC exam pack</a></li></ul></body>"#;
    let listing = parse_directory(html, &base(), SUFFIX);
    assert_eq!(listing["Art"], "https://catalog.example/a");
  }

  #[test]
  fn unclosed_list_items_are_split() {
    let html = r#"<ul><li><a href="/a">Art</a><li><a href="/b">Biology</a></ul>"#;
    let listing = parse_directory(html, &base(), SUFFIX);
    let names: Vec<_> = listing.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Art", "Biology"]);
  }

  #[test]
  fn malformed_markup_keeps_the_entries_before_it() {
    let html = r#"<ul>
      <li><a href="/a">Art 2021 HSC exam pack</a></li>
      <li><a href="/b">Biology 2021 HSC exam pack</a></li>
      <li><a href="/c">Chemistry <!x 2021 HSC exam pack</a></li>
    </ul>"#;
    let listing = parse_directory(html, &base(), SUFFIX);
    assert_eq!(listing["Art"], "https://catalog.example/a");
    assert_eq!(listing["Biology"], "https://catalog.example/b");
  }

  const SUBJECT: &str = r##"<html><head><title>Biology</title><style>.x{}</style></head><body>
<div name="ibmMainContainer"><div class="stControlBody">
<div class="left-col"><p>Menu</p></div>
<div class="col right-col">
  <h1>Biology 2021 HSC exam pack</h1>
  <div id="print-share-desktop"><a href="#">Print</a> <div>Share</div></div>
  <p>Exam paper
     (PDF, 1.2MB)</p>
  <p></p>
  <ul><li>Q1 &amp; Q2</li><li>Marking&nbsp;guidelines</li></ul>
  <script>var x = 1 < 2;</script>
</div>
<div class="footer">Footer</div>
</div></div></body></html>"##;

  #[test]
  fn subject_text_is_read_from_the_content_column() {
    let text = extract_text(SUBJECT).unwrap();
    assert_eq!(
      text,
      "Biology 2021 HSC exam pack\nExam paper (PDF, 1.2MB)\nQ1 & Q2\nMarking guidelines\n"
    );
  }

  #[test]
  fn subject_without_content_column_reads_the_body() {
    let html = "<html><head><title>T</title></head><body><p>Hello</p>\n\n\n<p>World</p></body></html>";
    assert_eq!(extract_text(html).unwrap(), "Hello\nWorld\n");
  }

  #[test]
  fn subject_text_survives_malformed_markup() {
    let html = "<body><p>Q1</p><p>Q2 <!x</p><p>Q3</p></body>";
    let text = extract_text(html).unwrap();
    assert!(text.starts_with("Q1\nQ2\n"), "{text:?}");
  }

  #[test]
  fn empty_content_is_an_error() {
    let html = r#"<html><body><div class="right-col">   </div></body></html>"#;
    assert!(matches!(extract_text(html), Err(FetchError::Parse { .. })));
  }

  #[test]
  fn raw_text_elements_are_removed() {
    let html = "<p>a</p><SCRIPT type=\"x\">1 < 2</SCRIPT><p>b</p><styles>c</styles>";
    assert_eq!(strip_raw_text(html), "<p>a</p><p>b</p><styles>c</styles>");
  }
}
