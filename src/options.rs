//! Player configuration.

extern crate alloc;

use alloc::string::{String, ToString};

use serde::{Deserialize, Serialize};

use crate::codec::TokenLimits;

/// Default error template; `%s` is replaced by the error message.
pub const DEFAULT_ERROR_MESSAGE: &str = "\u{26a0} %s";

/// How newly shown passages relate to earlier ones on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// One display slot; earlier passages move to an append-only review log.
    #[default]
    Replace,
    /// Passages accumulate as branch nodes; revisits scroll instead of re-rendering.
    Branch,
}

/// Layout axis used for scroll requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAxis {
    #[default]
    Vertical,
    Horizontal,
}

impl LayoutAxis {
    /// Suggested transition duration for scrolls along this axis.
    pub fn duration_hint_ms(self) -> u32 {
        match self {
            Self::Vertical => 1000,
            Self::Horizontal => 500,
        }
    }
}

/// Player options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    pub display_mode: DisplayMode,
    pub layout_axis: LayoutAxis,
    /// Tag marking passages that receive the colophon.
    pub end_tag: String,
    /// Name of the passage appended after end-tagged passages.
    pub colophon_passage: String,
    /// Scroll offset in pixels applied by the presentation layer.
    pub scroll_adjust: i32,
    /// Suppress the error trap's replacement of passage content.
    pub ignore_errors: bool,
    /// Error template; the first `%s` receives the message.
    pub error_message: String,
    /// Bounds for decoding restorable tokens.
    pub token: TokenLimits,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Replace,
            layout_axis: LayoutAxis::Vertical,
            end_tag: "end".to_string(),
            colophon_passage: "StoryColophon".to_string(),
            scroll_adjust: 5,
            ignore_errors: false,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            token: TokenLimits::default(),
        }
    }
}

impl PlayerOptions {
    /// Journal preset: branch display on a horizontal axis.
    pub fn journal() -> Self {
        Self {
            display_mode: DisplayMode::Branch,
            layout_axis: LayoutAxis::Horizontal,
            ..Self::default()
        }
    }

    /// Parse options from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_branch(&self) -> bool {
        self.display_mode == DisplayMode::Branch
    }

    /// Format `message` through the error template.
    ///
    /// Only the first `%s` is substituted; an empty template falls back to
    /// [`DEFAULT_ERROR_MESSAGE`].
    pub fn format_error(&self, message: &str) -> String {
        let template = if self.error_message.is_empty() {
            DEFAULT_ERROR_MESSAGE
        } else {
            self.error_message.as_str()
        };
        template.replacen("%s", message, 1)
    }
}
