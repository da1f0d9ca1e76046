//! Seams to the host platform: passage rendering, presentation commands,
//! and the native back/forward stack.
//!
//! The player never reads layout or platform state. It issues
//! [`DisplayCommand`]s to a [`Presentation`], pushes checkpoints into a
//! [`NativeHistory`], and reacts to [`NativeEvent`]s the host feeds back.
//! [`RecordingPresentation`] and [`MemoryHistory`] are in-memory
//! implementations for headless hosts and tests.

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::bridge::NativeEvent;
use crate::error::{CheckpointError, RenderError};
use crate::history::Checkpoint;
use crate::options::LayoutAxis;
use crate::passage::Passage;

/// Converts passage source into display markup.
pub trait PassageRenderer {
    fn render(&self, passage: &Passage) -> Result<String, RenderError>;
}

impl<F> PassageRenderer for F
where
    F: Fn(&Passage) -> Result<String, RenderError>,
{
    fn render(&self, passage: &Passage) -> Result<String, RenderError> {
        self(passage)
    }
}

/// Renderer that hands the raw passage source through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceRenderer;

impl PassageRenderer for SourceRenderer {
    fn render(&self, passage: &Passage) -> Result<String, RenderError> {
        Ok(passage.source.clone())
    }
}

/// Where rendered content lives on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// The single display slot used in replace mode.
    Main,
    /// The branch node of a passage.
    Node(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    TowardStart,
    TowardEnd,
}

/// Scroll-into-view request. Motion is up to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollRequest {
    pub anchor: Slot,
    pub axis: LayoutAxis,
    pub direction: ScrollDirection,
    /// Pixel offset to leave before the anchor.
    pub offset_px: i32,
    pub duration_ms: u32,
}

/// Presentation command. Commands are fire-and-forget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayCommand {
    /// Replace the content of a slot.
    Render { slot: Slot, markup: String },
    /// Append content to a slot (colophon).
    Append { slot: Slot, markup: String },
    /// Move the main slot's content to the end of the review log.
    ArchiveCurrent { passage_id: u32 },
    /// Remove the newest review log entry.
    DropArchived,
    /// Empty the review log.
    ClearArchive,
    /// Create a hidden branch node, right after `after` or at the end.
    InsertNode {
        passage_id: u32,
        after: Option<u32>,
        markup: String,
    },
    ShowNode(u32),
    /// Take a branch node off screen; it is not reused.
    HideNode(u32),
    /// Remove every branch node.
    ClearNodes,
    ScrollTo(ScrollRequest),
    /// Replace the visible passage with a formatted error.
    ShowError { markup: String },
    /// Install an author stylesheet.
    InstallStyle { css: String },
}

/// Receives presentation commands.
pub trait Presentation {
    fn apply(&mut self, command: DisplayCommand);
}

/// Review log entry mirrored by [`RecordingPresentation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivedPassage {
    pub passage_id: u32,
    pub markup: String,
}

/// Rendered branch node mirrored by [`RecordingPresentation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeView {
    pub passage_id: u32,
    pub markup: String,
    pub visible: bool,
}

/// In-memory presentation that logs commands and keeps a view model.
#[derive(Clone, Debug, Default)]
pub struct RecordingPresentation {
    commands: Vec<DisplayCommand>,
    main: String,
    archive: Vec<ArchivedPassage>,
    nodes: Vec<NodeView>,
    styles: Vec<String>,
    error: Option<String>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DisplayCommand] {
        &self.commands
    }

    /// Drain the command log, keeping the view model.
    pub fn take_commands(&mut self) -> Vec<DisplayCommand> {
        core::mem::take(&mut self.commands)
    }

    /// Markup currently in the main slot.
    pub fn main(&self) -> &str {
        &self.main
    }

    pub fn archive(&self) -> &[ArchivedPassage] {
        &self.archive
    }

    pub fn nodes(&self) -> &[NodeView] {
        &self.nodes
    }

    pub fn node(&self, passage_id: u32) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.passage_id == passage_id)
    }

    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    /// Last error markup shown by the error trap, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Most recent scroll request.
    pub fn last_scroll(&self) -> Option<ScrollRequest> {
        self.commands.iter().rev().find_map(|command| match command {
            DisplayCommand::ScrollTo(request) => Some(*request),
            _ => None,
        })
    }

    fn slot_markup(&mut self, slot: Slot) -> Option<&mut String> {
        match slot {
            Slot::Main => Some(&mut self.main),
            Slot::Node(id) => self
                .nodes
                .iter_mut()
                .find(|node| node.passage_id == id)
                .map(|node| &mut node.markup),
        }
    }

    fn apply_to_model(&mut self, command: &DisplayCommand) {
        match command {
            DisplayCommand::Render { slot, markup } => {
                if *slot == Slot::Main {
                    self.error = None;
                }
                if let Some(content) = self.slot_markup(*slot) {
                    content.clone_from(markup);
                }
            }
            DisplayCommand::Append { slot, markup } => {
                if let Some(content) = self.slot_markup(*slot) {
                    content.push_str(markup);
                }
            }
            DisplayCommand::ArchiveCurrent { passage_id } => {
                self.archive.push(ArchivedPassage {
                    passage_id: *passage_id,
                    markup: core::mem::take(&mut self.main),
                });
            }
            DisplayCommand::DropArchived => {
                self.archive.pop();
            }
            DisplayCommand::ClearArchive => self.archive.clear(),
            DisplayCommand::InsertNode {
                passage_id,
                after,
                markup,
            } => {
                self.nodes.retain(|node| node.passage_id != *passage_id);
                let view = NodeView {
                    passage_id: *passage_id,
                    markup: markup.clone(),
                    visible: false,
                };
                let index = after
                    .and_then(|parent| self.nodes.iter().position(|n| n.passage_id == parent))
                    .map(|parent_index| parent_index + 1)
                    .unwrap_or(self.nodes.len());
                self.nodes.insert(index, view);
            }
            DisplayCommand::ShowNode(id) => {
                if let Some(node) = self.nodes.iter_mut().find(|n| n.passage_id == *id) {
                    node.visible = true;
                }
            }
            DisplayCommand::HideNode(id) => {
                self.nodes.retain(|node| node.passage_id != *id);
            }
            DisplayCommand::ClearNodes => self.nodes.clear(),
            DisplayCommand::ScrollTo(_) => {}
            DisplayCommand::ShowError { markup } => {
                self.main.clone_from(markup);
                self.error = Some(markup.clone());
            }
            DisplayCommand::InstallStyle { css } => self.styles.push(css.clone()),
        }
    }
}

impl Presentation for RecordingPresentation {
    fn apply(&mut self, command: DisplayCommand) {
        self.apply_to_model(&command);
        self.commands.push(command);
    }
}

/// Platform back/forward stack as seen by the player.
///
/// Implementations deliver pops and fragment changes back to the player as
/// [`NativeEvent`]s; the player never inspects the stack.
pub trait NativeHistory {
    /// Push a checkpoint for the passage just shown.
    fn push_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
    /// Ask the platform to go back one entry. The resulting pop arrives later.
    fn go_back(&mut self);
    /// Publish a restorable token as the address fragment.
    fn set_fragment(&mut self, fragment: &str);
}

/// Browser-like in-memory session history.
///
/// Entry 0 is the page load entry and carries no checkpoint. Programmatic
/// `go_back` and `set_fragment` calls queue events the way a browser
/// delivers them asynchronously; user `back`/`forward` return their event
/// directly.
#[derive(Clone, Debug)]
pub struct MemoryHistory {
    entries: Vec<Option<Checkpoint>>,
    cursor: usize,
    quota: Option<usize>,
    fragment: String,
    pending: VecDeque<NativeEvent>,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self {
            entries: alloc::vec![None],
            cursor: 0,
            quota: None,
            fragment: String::new(),
            pending: VecDeque::new(),
        }
    }
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject pushes once `max_entries` entries exist (including entry 0).
    pub fn with_quota(mut self, max_entries: usize) -> Self {
        self.quota = Some(max_entries);
        self
    }

    /// History stack where every push is refused, like a sandboxed frame.
    pub fn sandboxed() -> Self {
        Self::default().with_quota(0)
    }

    /// Start with an address fragment already present.
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = fragment.into();
        self
    }

    /// User pressed back. Returns the pop to deliver, if there was an entry.
    pub fn back(&mut self) -> Option<NativeEvent> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(NativeEvent::Pop(self.entries[self.cursor].clone()))
    }

    /// User pressed forward. Returns the pop to deliver, if there was an entry.
    pub fn forward(&mut self) -> Option<NativeEvent> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(NativeEvent::Pop(self.entries[self.cursor].clone()))
    }

    /// Next queued event produced by programmatic navigation.
    pub fn next_event(&mut self) -> Option<NativeEvent> {
        self.pending.pop_front()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checkpoint at the cursor, `None` for the page load entry.
    pub fn current(&self) -> Option<&Checkpoint> {
        self.entries.get(self.cursor).and_then(Option::as_ref)
    }
}

impl NativeHistory for MemoryHistory {
    fn push_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let kept = self.cursor + 1;
        if let Some(quota) = self.quota {
            if kept >= quota {
                return Err(CheckpointError::new(alloc::format!(
                    "history quota of {} entries exceeded",
                    quota
                )));
            }
        }
        self.entries.truncate(kept);
        self.entries.push(Some(checkpoint.clone()));
        self.cursor = self.entries.len() - 1;
        Ok(())
    }

    fn go_back(&mut self) {
        if let Some(event) = self.back() {
            self.pending.push_back(event);
        }
    }

    fn set_fragment(&mut self, fragment: &str) {
        if self.fragment == fragment {
            return;
        }
        self.fragment = fragment.into();
        self.pending
            .push_back(NativeEvent::FragmentChanged(self.fragment.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(history: &[u32]) -> Checkpoint {
        Checkpoint {
            history: history.to_vec(),
            ..Checkpoint::default()
        }
    }

    #[test]
    fn memory_history_back_and_forward_walk_the_stack() {
        let mut native = MemoryHistory::new();
        native.push_checkpoint(&checkpoint(&[1])).unwrap();
        native.push_checkpoint(&checkpoint(&[1, 2])).unwrap();
        assert_eq!(native.len(), 3);

        assert_eq!(
            native.back(),
            Some(NativeEvent::Pop(Some(checkpoint(&[1]))))
        );
        assert_eq!(native.back(), Some(NativeEvent::Pop(None)));
        assert_eq!(native.back(), None);
        assert_eq!(
            native.forward(),
            Some(NativeEvent::Pop(Some(checkpoint(&[1]))))
        );
    }

    #[test]
    fn push_after_back_discards_forward_entries() {
        let mut native = MemoryHistory::new();
        native.push_checkpoint(&checkpoint(&[1])).unwrap();
        native.push_checkpoint(&checkpoint(&[1, 2])).unwrap();
        native.back();
        native.push_checkpoint(&checkpoint(&[1, 3])).unwrap();
        assert_eq!(native.len(), 3);
        assert_eq!(native.current(), Some(&checkpoint(&[1, 3])));
        assert_eq!(native.forward(), None);
    }

    #[test]
    fn quota_rejects_pushes_without_moving_cursor() {
        let mut native = MemoryHistory::new().with_quota(2);
        native.push_checkpoint(&checkpoint(&[1])).unwrap();
        let err = native.push_checkpoint(&checkpoint(&[1, 2])).unwrap_err();
        assert!(err.message.contains("quota"));
        assert_eq!(native.cursor(), 1);

        let mut sandboxed = MemoryHistory::sandboxed();
        assert!(sandboxed.push_checkpoint(&checkpoint(&[1])).is_err());
    }

    #[test]
    fn programmatic_navigation_queues_events() {
        let mut native = MemoryHistory::new();
        native.push_checkpoint(&checkpoint(&[1])).unwrap();
        native.go_back();
        native.set_fragment("abc");
        native.set_fragment("abc");
        assert_eq!(native.pending_len(), 2);
        assert_eq!(native.next_event(), Some(NativeEvent::Pop(None)));
        assert_eq!(
            native.next_event(),
            Some(NativeEvent::FragmentChanged("abc".into()))
        );
        assert_eq!(native.next_event(), None);
    }

    #[test]
    fn recording_presentation_mirrors_archive_and_nodes() {
        let mut display = RecordingPresentation::new();
        display.apply(DisplayCommand::Render {
            slot: Slot::Main,
            markup: "one".into(),
        });
        display.apply(DisplayCommand::ArchiveCurrent { passage_id: 1 });
        display.apply(DisplayCommand::Render {
            slot: Slot::Main,
            markup: "two".into(),
        });
        display.apply(DisplayCommand::Append {
            slot: Slot::Main,
            markup: "<p>fin</p>".into(),
        });
        assert_eq!(display.main(), "two<p>fin</p>");
        assert_eq!(display.archive().len(), 1);
        assert_eq!(display.archive()[0].markup, "one");

        display.apply(DisplayCommand::InsertNode {
            passage_id: 1,
            after: None,
            markup: "a".into(),
        });
        display.apply(DisplayCommand::InsertNode {
            passage_id: 2,
            after: None,
            markup: "b".into(),
        });
        display.apply(DisplayCommand::InsertNode {
            passage_id: 3,
            after: Some(1),
            markup: "c".into(),
        });
        display.apply(DisplayCommand::ShowNode(3));
        let order: Vec<u32> = display.nodes().iter().map(|n| n.passage_id).collect();
        assert_eq!(order, [1, 3, 2]);
        assert!(display.node(3).map(|n| n.visible).unwrap_or(false));
        assert!(!display.node(2).map(|n| n.visible).unwrap_or(true));

        display.apply(DisplayCommand::HideNode(3));
        assert!(display.node(3).is_none());
        assert_eq!(display.commands().len(), 9);
    }

    #[test]
    fn closures_are_renderers() {
        let renderer = |passage: &Passage| -> Result<String, RenderError> {
            Ok(format!("<p>{}</p>", passage.source))
        };
        let passage = Passage::new(1, "Start", "hello");
        assert_eq!(renderer.render(&passage).unwrap(), "<p>hello</p>");
        assert_eq!(SourceRenderer.render(&passage).unwrap(), "hello");
    }
}
