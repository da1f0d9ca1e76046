//! Error types for story loading, navigation, and session persistence.

extern crate alloc;

use alloc::string::String;
use core::fmt;

use crate::passage::PassageTarget;

/// Story archive loading error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// No `<tw-storydata>` element or `#storeArea` container was found.
    MissingStoryData,
    /// The archive markup could not be parsed.
    Markup(String),
    /// A passage element was missing a required attribute.
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    /// A passage id attribute was not a valid integer.
    InvalidPassageId(String),
    /// A Twine 1 archive had no `Start` passage.
    MissingStartPassage,
    /// A configured loader limit was exceeded.
    LimitExceeded {
        kind: &'static str,
        actual: usize,
        limit: usize,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStoryData => write!(f, "no story data found in document"),
            Self::Markup(message) => write!(f, "story markup error: {}", message),
            Self::MissingAttribute { element, attribute } => {
                write!(f, "<{}> is missing attribute '{}'", element, attribute)
            }
            Self::InvalidPassageId(raw) => write!(f, "invalid passage id '{}'", raw),
            Self::MissingStartPassage => write!(f, "story has no Start passage"),
            Self::LimitExceeded {
                kind,
                actual,
                limit,
            } => write!(
                f,
                "story limit exceeded: {} (actual={} limit={})",
                kind, actual, limit
            ),
        }
    }
}

impl std::error::Error for LoadError {}

/// Restorable token encode/decode error.
///
/// Every decode failure is treated as corruption; the variants only exist
/// so diagnostics can say which stage rejected the token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenError {
    /// Token was empty after trimming a leading `#`.
    Empty,
    /// Token exceeded `TokenLimits::max_token_bytes`.
    TooLarge { actual: usize, limit: usize },
    /// Token contained characters outside the URL-safe alphabet.
    Encoding(String),
    /// Compressed payload was corrupt or inflated past the configured limit.
    Compression(String),
    /// Payload JSON did not describe a `{state, history}` session.
    Payload(String),
    /// Decoded history exceeded `TokenLimits::max_history_len`.
    HistoryTooLong { actual: usize, limit: usize },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "token is empty"),
            Self::TooLarge { actual, limit } => {
                write!(f, "token too large (actual={} limit={})", actual, limit)
            }
            Self::Encoding(message) => write!(f, "token encoding invalid: {}", message),
            Self::Compression(message) => write!(f, "token payload corrupt: {}", message),
            Self::Payload(message) => write!(f, "token session invalid: {}", message),
            Self::HistoryTooLong { actual, limit } => write!(
                f,
                "token history too long (actual={} limit={})",
                actual, limit
            ),
        }
    }
}

impl std::error::Error for TokenError {}

/// The platform refused to record a native history checkpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointError {
    pub message: String,
}

impl CheckpointError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "checkpoint rejected: {}", self.message)
    }
}

impl std::error::Error for CheckpointError {}

/// Content error raised by a passage renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderError {
    /// Human-readable message, substituted into the error template.
    pub message: String,
    /// Script or resource location, if the renderer knows it.
    pub url: Option<String>,
    /// Line within `url`, if known.
    pub line: Option<u32>,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            url: None,
            line: None,
        }
    }

    pub fn at(mut self, url: impl Into<String>, line: Option<u32>) -> Self {
        self.url = Some(url.into());
        self.line = line;
        self
    }

    /// Message with the ` (url: line)` suffix used by the error trap.
    pub fn located_message(&self) -> String {
        let mut message = self.message.clone();
        if let Some(url) = self.url.as_deref() {
            message.push_str(" (");
            message.push_str(url);
            if let Some(line) = self.line {
                message.push_str(&alloc::format!(": {}", line));
            }
            message.push(')');
        }
        message
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.located_message())
    }
}

impl std::error::Error for RenderError {}

/// Hard failure of a player operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoryError {
    /// No passage matches the requested id or name.
    PassageNotFound(PassageTarget),
    /// The current passage was queried before anything was shown.
    EmptyHistory,
    /// The passage renderer reported a content error.
    Render(RenderError),
    /// The story archive could not be loaded.
    Load(LoadError),
    /// The platform refused a native history checkpoint.
    CheckpointRejected(CheckpointError),
    /// A restorable token was malformed or corrupt.
    TokenDecode(TokenError),
}

impl fmt::Display for StoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassageNotFound(target) => {
                write!(f, "there is no passage with the ID or name \"{}\"", target)
            }
            Self::EmptyHistory => write!(f, "history is empty"),
            Self::Render(err) => write!(f, "render failed: {}", err),
            Self::Load(err) => write!(f, "load failed: {}", err),
            Self::CheckpointRejected(err) => write!(f, "{}", err),
            Self::TokenDecode(err) => write!(f, "restore failed: {}", err),
        }
    }
}

impl std::error::Error for StoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(err) => Some(err),
            Self::Load(err) => Some(err),
            Self::CheckpointRejected(err) => Some(err),
            Self::TokenDecode(err) => Some(err),
            Self::PassageNotFound(_) | Self::EmptyHistory => None,
        }
    }
}

impl From<RenderError> for StoryError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl From<TokenError> for StoryError {
    fn from(value: TokenError) -> Self {
        Self::TokenDecode(value)
    }
}

impl From<CheckpointError> for StoryError {
    fn from(value: CheckpointError) -> Self {
        Self::CheckpointRejected(value)
    }
}

impl From<LoadError> for StoryError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}
