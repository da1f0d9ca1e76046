//! Passage model and id-or-name lookup targets.

extern crate alloc;

use alloc::string::String;
use core::fmt;

use smallvec::SmallVec;

/// Passage tags; most passages carry zero to a handful.
pub type Tags = SmallVec<[String; 4]>;

/// A single named unit of narrative content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Passage {
    /// Stable id for the lifetime of the loaded story.
    pub id: u32,
    /// Passage name, used by links.
    pub name: String,
    /// Ordered tag list.
    pub tags: Tags,
    /// Raw, unescaped passage source.
    pub source: String,
}

impl Passage {
    pub fn new(id: u32, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tags: Tags::new(),
            source: source.into(),
        }
    }

    /// Builder-style tag helper.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Split a space-separated tag attribute, dropping empty segments.
pub(crate) fn split_tags(raw: &str) -> Tags {
    raw.split_whitespace().map(String::from).collect()
}

/// Navigation target: a passage id or a passage name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PassageTarget {
    Id(u32),
    Name(String),
}

impl fmt::Display for PassageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<u32> for PassageTarget {
    fn from(value: u32) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for PassageTarget {
    fn from(value: &str) -> Self {
        Self::Name(value.into())
    }
}

impl From<String> for PassageTarget {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<&Passage> for PassageTarget {
    fn from(value: &Passage) -> Self {
        Self::Id(value.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_ignores_repeated_whitespace() {
        let tags = split_tags("  end  widget\tnobr ");
        assert_eq!(tags.as_slice(), ["end", "widget", "nobr"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn has_tag_is_exact_match() {
        let passage = Passage::new(3, "End", "fin").with_tags(["ending", "end"]);
        assert!(passage.has_tag("end"));
        assert!(!passage.has_tag("en"));
    }
}
