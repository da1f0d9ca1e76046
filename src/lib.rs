//! Navigation, history, and persistence core for branching-story players.
//!
//! A [`Story`] is loaded from a Twine archive (or built in memory) and driven
//! by a [`Player`], which renders passages through a [`PassageRenderer`],
//! issues [`DisplayCommand`]s to a [`Presentation`], and checkpoints progress
//! into a [`NativeHistory`]. The whole session can be saved as a compact,
//! URL-fragment-safe token and restored later.
//!
//! # Example
//!
//! ```rust
//! use story_stream::{
//!     MemoryHistory, Passage, Player, PlayerOptions, RecordingPresentation, SourceRenderer,
//!     Story,
//! };
//!
//! # fn example() -> Result<(), story_stream::StoryError> {
//! let story = Story::new(
//!     "Cave",
//!     1,
//!     [
//!         Passage::new(1, "Start", "You wake up."),
//!         Passage::new(2, "Exit", "Daylight.").with_tags(["end"]),
//!     ],
//! );
//! let mut player = Player::new(
//!     story,
//!     PlayerOptions::default(),
//!     SourceRenderer,
//!     RecordingPresentation::new(),
//!     MemoryHistory::new(),
//! );
//! player.begin(None)?;
//! player.show("Exit")?;
//! assert_eq!(player.history().entries(), [1, 2]);
//!
//! let token = player.save()?;
//! assert!(player.restore(&token));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod branch;
pub mod bridge;
pub mod codec;
pub mod error;
pub mod events;
pub mod history;
pub mod navigator;
pub mod options;
pub mod passage;
pub mod platform;
pub mod story;

pub use branch::{BranchNode, BranchTracker};
pub use bridge::{NativeEvent, PopOutcome};
pub use codec::{decode_session, decode_session_with_limits, encode_session, TokenLimits};
pub use error::{CheckpointError, LoadError, RenderError, StoryError, TokenError};
pub use events::{EventBus, StoryEvent, SubscriptionId};
pub use history::{Checkpoint, History, Session, SessionSnapshot, StateBag};
pub use navigator::{LinkSource, NavigateOutcome, Player};
pub use options::{DisplayMode, LayoutAxis, PlayerOptions, DEFAULT_ERROR_MESSAGE};
pub use passage::{Passage, PassageTarget, Tags};
pub use platform::{
    ArchivedPassage, DisplayCommand, MemoryHistory, NativeHistory, NodeView, PassageRenderer,
    Presentation, RecordingPresentation, ScrollDirection, ScrollRequest, Slot, SourceRenderer,
};
pub use story::{ArchiveFormat, Story, StoryLimits};
