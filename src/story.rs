//! Story archive loading (Twine 2 `<tw-storydata>` and Twine 1 `#storeArea`).
//!
//! Only the story data container is parsed; the surrounding page template is
//! skipped, so archives embedded in arbitrary HTML load as long as the story
//! data itself is well-formed.
//!
//! # Usage
//!
//! ```rust
//! use story_stream::Story;
//!
//! # fn example() -> Result<(), story_stream::LoadError> {
//! let html = br#"<tw-storydata name="Cave" startnode="1">
//!   <tw-passagedata pid="1" name="Start" tags="">You wake up. [[Look around]]</tw-passagedata>
//!   <tw-passagedata pid="2" name="Look around" tags="end">Darkness.</tw-passagedata>
//! </tw-storydata>"#;
//! let story = Story::from_html(html)?;
//! assert_eq!(story.name, "Cave");
//! assert_eq!(story.start_passage(), 1);
//! # Ok(())
//! # }
//! ```

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::LoadError;
use crate::passage::{split_tags, Passage, PassageTarget};

const TWINE2_MARKER: &[u8] = b"<tw-storydata";
const TWINE1_MARKER: &[u8] = b"id=\"storeArea\"";

/// Limits applied while loading a story archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoryLimits {
    /// Maximum number of passages.
    pub max_passages: usize,
    /// Maximum UTF-8 byte length of a single passage source.
    pub max_source_bytes: usize,
}

impl Default for StoryLimits {
    fn default() -> Self {
        Self {
            max_passages: 16_384,
            max_source_bytes: 1024 * 1024,
        }
    }
}

impl StoryLimits {
    /// Embedded-focused preset with smaller bounds.
    pub fn embedded() -> Self {
        Self {
            max_passages: 2048,
            max_source_bytes: 64 * 1024,
        }
    }
}

/// Archive flavor a story was loaded from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Built in memory rather than parsed.
    #[default]
    Memory,
    /// Twine 1 `#storeArea` with `tiddler` passages.
    Twine1,
    /// Twine 2 `<tw-storydata>` with `<tw-passagedata>` passages.
    Twine2,
}

/// A loaded story: passages plus metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Story {
    pub name: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    /// Program that created the archive.
    pub creator: Option<String>,
    pub creator_version: Option<String>,
    /// Author scripts, run once by the host at session start.
    pub user_scripts: Vec<String>,
    /// Author stylesheets, installed at session start.
    pub user_styles: Vec<String>,
    format: ArchiveFormat,
    start_passage: u32,
    passages: BTreeMap<u32, Passage>,
}

impl Story {
    /// Build a story from passages already in memory.
    pub fn new<I>(name: impl Into<String>, start_passage: u32, passages: I) -> Self
    where
        I: IntoIterator<Item = Passage>,
    {
        let mut story = Self {
            name: name.into(),
            start_passage,
            passages: passages.into_iter().map(|p| (p.id, p)).collect(),
            ..Self::default()
        };
        story.fill_special_passages();
        story
    }

    /// Parse a story archive with default limits.
    pub fn from_html(html: &[u8]) -> Result<Self, LoadError> {
        Self::from_html_with_limits(html, StoryLimits::default())
    }

    /// Parse a story archive with explicit limits.
    pub fn from_html_with_limits(html: &[u8], limits: StoryLimits) -> Result<Self, LoadError> {
        let mut story = if let Some(offset) = find(html, TWINE2_MARKER) {
            parse_twine2(&html[offset..], limits)?
        } else if let Some(offset) = find(html, TWINE1_MARKER) {
            let open = html[..offset]
                .iter()
                .rposition(|b| *b == b'<')
                .ok_or(LoadError::MissingStoryData)?;
            parse_twine1(&html[open..], limits)?
        } else {
            return Err(LoadError::MissingStoryData);
        };
        story.fill_special_passages();
        log::debug!(
            "loaded story '{}' ({:?}, {} passages, start={})",
            story.name,
            story.format,
            story.passages.len(),
            story.start_passage
        );
        Ok(story)
    }

    fn fill_special_passages(&mut self) {
        if self.subtitle.is_none() {
            self.subtitle = self.passage_by_name("StorySubtitle").map(|p| p.source.clone());
        }
        if self.author.is_none() {
            self.author = self
                .passage_by_name("StoryAuthor")
                .map(|p| p.source.trim().to_string())
                .filter(|author| !author.is_empty());
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Id of the first passage to display.
    pub fn start_passage(&self) -> u32 {
        self.start_passage
    }

    /// Look up a passage by id or name.
    pub fn passage(&self, target: &PassageTarget) -> Option<&Passage> {
        match target {
            PassageTarget::Id(id) => self.passage_by_id(*id),
            PassageTarget::Name(name) => self.passage_by_name(name),
        }
    }

    pub fn passage_by_id(&self, id: u32) -> Option<&Passage> {
        self.passages.get(&id)
    }

    /// First passage in id order with this name.
    pub fn passage_by_name(&self, name: &str) -> Option<&Passage> {
        self.passages.values().find(|p| p.name == name)
    }

    /// Passages in id order.
    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.passages.values()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Passage being collected between its start and end tags.
struct PartialPassage {
    id: u32,
    name: String,
    tags: String,
    source: String,
}

/// Non-passage text being captured (author script or stylesheet).
enum Capture {
    Script(String),
    Style(String),
}

struct Collector {
    limits: StoryLimits,
    passages: BTreeMap<u32, Passage>,
}

impl Collector {
    fn new(limits: StoryLimits) -> Self {
        Self {
            limits,
            passages: BTreeMap::new(),
        }
    }

    fn check_source(&self, source: &str) -> Result<(), LoadError> {
        if source.len() > self.limits.max_source_bytes {
            log::warn!(
                "passage source exceeds {} bytes",
                self.limits.max_source_bytes
            );
            return Err(LoadError::LimitExceeded {
                kind: "passage_source_bytes",
                actual: source.len(),
                limit: self.limits.max_source_bytes,
            });
        }
        Ok(())
    }

    fn finish(&mut self, partial: PartialPassage) -> Result<&Passage, LoadError> {
        self.check_source(&partial.source)?;
        if self.passages.len() >= self.limits.max_passages {
            log::warn!("story exceeds {} passages", self.limits.max_passages);
            return Err(LoadError::LimitExceeded {
                kind: "passages",
                actual: self.passages.len() + 1,
                limit: self.limits.max_passages,
            });
        }
        let passage = Passage {
            id: partial.id,
            name: partial.name,
            tags: split_tags(&partial.tags),
            source: partial.source,
        };
        let id = passage.id;
        if let Some(previous) = self.passages.insert(id, passage) {
            log::warn!(
                "duplicate passage id {} ('{}' replaced)",
                id,
                previous.name
            );
        }
        self.passages
            .get(&id)
            .ok_or(LoadError::InvalidPassageId(id.to_string()))
    }
}

fn new_reader(content: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;
    reader
}

/// Decoded, entity-expanded attribute values of an element.
fn attributes(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Vec<(Vec<u8>, String)> {
    e.html_attributes()
        .flatten()
        .map(|attr| {
            let raw = reader
                .decoder()
                .decode(attr.value.as_ref())
                .unwrap_or_default();
            (attr.key.as_ref().to_vec(), unescape(&raw))
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(Vec<u8>, String)], key: &[u8]) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.as_slice() == key)
        .map(|(_, v)| v.as_str())
}

fn parse_id(raw: &str) -> Result<u32, LoadError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| LoadError::InvalidPassageId(raw.to_string()))
}

fn parse_twine2(content: &[u8], limits: StoryLimits) -> Result<Story, LoadError> {
    let mut reader = new_reader(content);
    let mut buf = Vec::with_capacity(256);
    let mut story = Story {
        format: ArchiveFormat::Twine2,
        ..Story::default()
    };
    let mut collector = Collector::new(limits);
    let mut start_node: Option<u32> = None;
    let mut current: Option<PartialPassage> = None;
    let mut capture: Option<Capture> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"tw-storydata" => {
                    let attrs = attributes(&reader, &e);
                    story.name = attr(&attrs, b"name").unwrap_or_default().to_string();
                    story.creator = attr(&attrs, b"creator").map(String::from);
                    story.creator_version = attr(&attrs, b"creator-version").map(String::from);
                    start_node = attr(&attrs, b"startnode").map(parse_id).transpose()?;
                }
                b"tw-passagedata" => {
                    current = Some(twine2_passage(&attributes(&reader, &e))?);
                }
                _ => {
                    let attrs = attributes(&reader, &e);
                    capture = match attr(&attrs, b"type") {
                        Some("text/twine-javascript") => Some(Capture::Script(String::new())),
                        Some("text/twine-css") => Some(Capture::Style(String::new())),
                        _ => capture,
                    };
                }
            },
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"tw-passagedata" {
                    let partial = twine2_passage(&attributes(&reader, &e))?;
                    collector.finish(partial)?;
                }
            }
            Ok(Event::Text(e)) => {
                let text = reader.decoder().decode(&e).unwrap_or_default();
                push_text(&mut current, &mut capture, &text, &collector)?;
            }
            Ok(Event::CData(e)) => {
                let text = reader.decoder().decode(&e).unwrap_or_default();
                push_text(&mut current, &mut capture, &text, &collector)?;
            }
            Ok(Event::GeneralRef(e)) => {
                let name = e.decode().unwrap_or_default();
                let mut text = String::with_capacity(4);
                push_entity(&mut text, &name);
                push_text(&mut current, &mut capture, &text, &collector)?;
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"tw-passagedata" => {
                    if let Some(partial) = current.take() {
                        collector.finish(partial)?;
                    }
                }
                b"tw-storydata" => break,
                _ => match capture.take() {
                    Some(Capture::Script(script)) => story.user_scripts.push(script),
                    Some(Capture::Style(style)) => story.user_styles.push(style),
                    None => {}
                },
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::Markup(alloc::format!("{:?}", e))),
            _ => {}
        }
        buf.clear();
    }

    story.start_passage = start_node.ok_or(LoadError::MissingAttribute {
        element: "tw-storydata",
        attribute: "startnode",
    })?;
    story.passages = collector.passages;
    Ok(story)
}

fn twine2_passage(attrs: &[(Vec<u8>, String)]) -> Result<PartialPassage, LoadError> {
    let id = attr(attrs, b"pid")
        .ok_or(LoadError::MissingAttribute {
            element: "tw-passagedata",
            attribute: "pid",
        })
        .and_then(parse_id)?;
    let name = attr(attrs, b"name").ok_or(LoadError::MissingAttribute {
        element: "tw-passagedata",
        attribute: "name",
    })?;
    Ok(PartialPassage {
        id,
        name: name.to_string(),
        tags: attr(attrs, b"tags").unwrap_or_default().to_string(),
        source: String::new(),
    })
}

fn push_text(
    current: &mut Option<PartialPassage>,
    capture: &mut Option<Capture>,
    text: &str,
    collector: &Collector,
) -> Result<(), LoadError> {
    if let Some(partial) = current.as_mut() {
        partial.source.push_str(text);
        collector.check_source(&partial.source)?;
    } else if let Some(Capture::Script(out) | Capture::Style(out)) = capture.as_mut() {
        out.push_str(text);
    }
    Ok(())
}

fn parse_twine1(content: &[u8], limits: StoryLimits) -> Result<Story, LoadError> {
    let mut reader = new_reader(content);
    let mut buf = Vec::with_capacity(256);
    let mut collector = Collector::new(limits);
    let mut current: Option<PartialPassage> = None;
    let mut no_capture: Option<Capture> = None;
    // Element depth inside the store area; the store area itself is depth 1.
    let mut depth = 0usize;
    let mut passage_depth = 0usize;
    let mut next_id = 0u32;
    let mut story = Story {
        format: ArchiveFormat::Twine1,
        ..Story::default()
    };
    let mut start_id: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    depth = 1;
                } else {
                    depth += 1;
                    if depth == 2 && current.is_none() {
                        let attrs = attributes(&reader, &e);
                        if let Some(name) = attr(&attrs, b"tiddler") {
                            current = Some(PartialPassage {
                                id: next_id,
                                name: name.to_string(),
                                tags: attr(&attrs, b"tags").unwrap_or_default().to_string(),
                                source: String::new(),
                            });
                            next_id += 1;
                            passage_depth = depth;
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 1 {
                    let attrs = attributes(&reader, &e);
                    if let Some(name) = attr(&attrs, b"tiddler") {
                        let partial = PartialPassage {
                            id: next_id,
                            name: name.to_string(),
                            tags: attr(&attrs, b"tags").unwrap_or_default().to_string(),
                            source: String::new(),
                        };
                        next_id += 1;
                        finish_twine1(&mut collector, &mut story, &mut start_id, partial)?;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = reader.decoder().decode(&e).unwrap_or_default();
                push_text(&mut current, &mut no_capture, &text, &collector)?;
            }
            Ok(Event::GeneralRef(e)) => {
                let name = e.decode().unwrap_or_default();
                let mut text = String::with_capacity(4);
                push_entity(&mut text, &name);
                push_text(&mut current, &mut no_capture, &text, &collector)?;
            }
            Ok(Event::End(_)) => {
                if current.is_some() && depth == passage_depth {
                    if let Some(mut partial) = current.take() {
                        partial.source = expand_twine1_escapes(&partial.source);
                        finish_twine1(&mut collector, &mut story, &mut start_id, partial)?;
                    }
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::Markup(alloc::format!("{:?}", e))),
            _ => {}
        }
        buf.clear();
    }

    story.start_passage = start_id.ok_or(LoadError::MissingStartPassage)?;
    story.passages = collector.passages;
    Ok(story)
}

fn finish_twine1(
    collector: &mut Collector,
    story: &mut Story,
    start_id: &mut Option<u32>,
    partial: PartialPassage,
) -> Result<(), LoadError> {
    let passage = collector.finish(partial)?;
    match passage.name.as_str() {
        "StoryTitle" => story.name = passage.source.trim().to_string(),
        "Start" => *start_id = Some(passage.id),
        _ => {}
    }
    if passage.has_tag("script") {
        story.user_scripts.push(passage.source.clone());
    }
    if passage.has_tag("stylesheet") {
        story.user_styles.push(passage.source.clone());
    }
    Ok(())
}

/// Twine 1 stores newlines and tabs as literal `\n` / `\t`.
fn expand_twine1_escapes(source: &str) -> String {
    source.replace("\\n", "\n").replace("\\t", "\t")
}

/// Append the expansion of `&name;` to `out`. Unknown entities are kept verbatim.
fn push_entity(out: &mut String, name: &str) {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        };
        if let Some(ch) = code.and_then(char::from_u32) {
            out.push(ch);
            return;
        }
    } else {
        let expanded = match name {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => None,
        };
        if let Some(ch) = expanded {
            out.push(ch);
            return;
        }
    }
    out.push('&');
    out.push_str(name);
    out.push(';');
}

/// Expand entity references in an attribute value.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';') {
            Some(semi) if semi > 0 && !after[..semi].contains([' ', '&']) => {
                push_entity(&mut out, &after[..semi]);
                rest = &after[semi + 1..];
            }
            _ => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
