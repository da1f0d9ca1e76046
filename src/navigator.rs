//! Navigation controller.
//!
//! [`Player`] owns every piece of mutable session state (history, state bag,
//! branch nodes, review log, suppress-back flag) and is the only thing that
//! changes it. One controller serves both display modes; [`DisplayMode`]
//! gates the revisit short-circuit, archive-vs-node creation, and
//! origin-relative node placement.
//!
//! [`DisplayMode`]: crate::options::DisplayMode

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::branch::BranchTracker;
use crate::codec::{decode_session_with_limits, encode_session};
use crate::error::{RenderError, StoryError, TokenError};
use crate::events::{EventBus, StoryEvent, SubscriptionId};
use crate::history::{History, Session, StateBag};
use crate::options::PlayerOptions;
use crate::passage::{Passage, PassageTarget};
use crate::platform::{
    DisplayCommand, NativeHistory, PassageRenderer, Presentation, ScrollDirection, ScrollRequest,
    Slot,
};
use crate::story::Story;

/// Result of a navigation request that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigateOutcome {
    /// The passage was rendered into a new slot or node.
    Shown,
    /// Branch mode: the passage already had a node and was scrolled to.
    Revisited,
    /// The request was dropped (link activated inside the review log).
    Ignored,
}

/// Where an activated link lives on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkSource {
    /// The passage currently on display.
    Current,
    /// An archived passage in the replace-mode review log.
    ReviewLog,
    /// The branch node of the given passage.
    Node(u32),
}

/// Passage resolved and rendered, ready to be put on screen.
#[derive(Debug)]
pub(crate) enum Prepared {
    Revisit(u32),
    Show {
        passage_id: u32,
        markup: String,
        colophon: Option<String>,
    },
}

/// Story session driver.
///
/// Generic over the passage renderer, the presentation layer, and the
/// native history stack so hosts plug in their own platform.
pub struct Player<R, D, H> {
    pub(crate) story: Story,
    pub(crate) options: PlayerOptions,
    pub(crate) renderer: R,
    pub(crate) display: D,
    pub(crate) native: H,
    pub(crate) session: Session,
    pub(crate) branches: BranchTracker,
    /// Replace mode review log: passage ids in archive order.
    pub(crate) review: Vec<u32>,
    pub(crate) displayed: Option<u32>,
    pub(crate) suppress_back: bool,
    /// Last token this player published as the address fragment.
    pub(crate) published_token: Option<String>,
    pub(crate) events: EventBus,
}

impl<R, D, H> core::fmt::Debug for Player<R, D, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Player")
            .field("story", &self.story.name)
            .field("display_mode", &self.options.display_mode)
            .field("history", &self.session.history)
            .field("displayed", &self.displayed)
            .field("review", &self.review.len())
            .field("nodes", &self.branches.len())
            .field("suppress_back", &self.suppress_back)
            .finish_non_exhaustive()
    }
}

impl<R, D, H> Player<R, D, H>
where
    R: PassageRenderer,
    D: Presentation,
    H: NativeHistory,
{
    pub fn new(story: Story, options: PlayerOptions, renderer: R, display: D, native: H) -> Self {
        Self {
            story,
            options,
            renderer,
            display,
            native,
            session: Session::new(),
            branches: BranchTracker::new(),
            review: Vec::new(),
            displayed: None,
            suppress_back: false,
            published_token: None,
            events: EventBus::new(),
        }
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn history(&self) -> &History {
        &self.session.history
    }

    pub fn state(&self) -> &StateBag {
        &self.session.state
    }

    /// Author-facing state bag. Changes are captured by the next checkpoint.
    pub fn state_mut(&mut self) -> &mut StateBag {
        &mut self.session.state
    }

    pub fn branches(&self) -> &BranchTracker {
        &self.branches
    }

    /// Passage ids currently in the replace-mode review log, oldest first.
    pub fn review(&self) -> &[u32] {
        &self.review
    }

    /// Passage most recently rendered or scrolled to.
    pub fn displayed(&self) -> Option<u32> {
        self.displayed
    }

    /// Whether the next native back notification will be absorbed.
    pub fn is_suppressing_back(&self) -> bool {
        self.suppress_back
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn native(&self) -> &H {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut H {
        &mut self.native
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoryEvent) + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Id of the passage at the top of history.
    pub fn current_id(&self) -> Result<u32, StoryError> {
        self.session.history.current_id()
    }

    pub fn passage(&self, target: impl Into<PassageTarget>) -> Option<&Passage> {
        self.story.passage(&target.into())
    }

    /// Render a passage without showing it (for embedding one passage in another).
    pub fn render(&self, target: impl Into<PassageTarget>) -> Result<String, StoryError> {
        let target = target.into();
        let passage = self
            .story
            .passage(&target)
            .ok_or(StoryError::PassageNotFound(target))?;
        Ok(self.renderer.render(passage)?)
    }

    /// Start the session: install author styles, announce the start, then
    /// resume from `fragment` if it holds a valid token or show the start
    /// passage otherwise. A start passage that fails to render is shown
    /// through the error trap before the error is returned.
    pub fn begin(&mut self, fragment: Option<&str>) -> Result<NavigateOutcome, StoryError> {
        for css in &self.story.user_styles {
            self.display
                .apply(DisplayCommand::InstallStyle { css: css.clone() });
        }
        self.events.emit(StoryEvent::StartStory);

        let token = fragment
            .map(|fragment| fragment.trim_start_matches('#'))
            .filter(|token| !token.is_empty());
        if let Some(token) = token {
            if self.restore(token) {
                return Ok(NavigateOutcome::Shown);
            }
            log::debug!("fragment did not restore; starting fresh");
        }
        let start = self.story.start_passage();
        let result = self.navigate(start, None, true);
        self.trap(result)
    }

    /// New game: forget all progress and show the start passage.
    pub fn restart(&mut self) -> Result<NavigateOutcome, StoryError> {
        let prepared = self.prepare(&PassageTarget::Id(self.story.start_passage()), false)?;
        self.session.reset();
        self.suppress_back = false;
        self.clear_screen();
        Ok(self.present(prepared, None, true))
    }

    /// Show a passage and record it in history.
    pub fn show(&mut self, target: impl Into<PassageTarget>) -> Result<NavigateOutcome, StoryError> {
        self.navigate(target, None, true)
    }

    /// Navigate to a passage.
    ///
    /// `origin` positions a new branch node right after the node of the
    /// passage whose link was followed. With `record_history` false the
    /// passage is redisplayed without a history entry or checkpoint.
    pub fn navigate(
        &mut self,
        target: impl Into<PassageTarget>,
        origin: Option<u32>,
        record_history: bool,
    ) -> Result<NavigateOutcome, StoryError> {
        let prepared = self.prepare(&target.into(), true)?;
        Ok(self.present(prepared, origin, record_history))
    }

    /// Activate a passage link.
    ///
    /// Links inside the replace-mode review log are inert. Failures are
    /// shown through the error trap and then returned.
    pub fn follow_link(
        &mut self,
        target: impl Into<PassageTarget>,
        source: LinkSource,
    ) -> Result<NavigateOutcome, StoryError> {
        let origin = match source {
            LinkSource::ReviewLog if !self.options.is_branch() => {
                log::debug!("ignoring link inside the review log");
                return Ok(NavigateOutcome::Ignored);
            }
            LinkSource::ReviewLog => None,
            LinkSource::Current => self.displayed,
            LinkSource::Node(id) => Some(id),
        };
        let result = self.navigate(target, origin, true);
        self.trap(result)
    }

    /// Top-level error trap for content errors.
    ///
    /// Replaces the visible passage with the formatted error unless
    /// `ignore_errors` is set. Returns whether anything was shown.
    pub fn report_content_error(&mut self, error: &RenderError) -> bool {
        log::warn!("content error: {}", error);
        if self.options.ignore_errors {
            return false;
        }
        let markup = self.options.format_error(&error.located_message());
        self.display.apply(DisplayCommand::ShowError { markup });
        true
    }

    /// Route a failed top-level operation through the error trap, then hand
    /// the result back unchanged.
    pub(crate) fn trap<T>(&mut self, result: Result<T, StoryError>) -> Result<T, StoryError> {
        if let Err(err) = &result {
            let content_error = match err {
                StoryError::Render(render) => render.clone(),
                other => RenderError::new(other.to_string()),
            };
            self.report_content_error(&content_error);
        }
        result
    }

    /// Encode the session into a restorable token without publishing it.
    pub fn save_token(&self) -> Result<String, TokenError> {
        encode_session(&self.session.snapshot())
    }

    /// Encode the session and publish it as the address fragment.
    pub fn save(&mut self) -> Result<String, TokenError> {
        self.events.emit(StoryEvent::Save);
        let token = self.save_token()?;
        self.published_token = Some(token.clone());
        self.native.set_fragment(&token);
        Ok(token)
    }

    /// Replace the session with the one encoded in `token` and redisplay its
    /// last passage. On failure the live session is untouched,
    /// `restorefailed` is emitted, and `false` is returned.
    pub fn restore(&mut self, token: &str) -> bool {
        self.events.emit(StoryEvent::Restore);
        match self.try_restore(token) {
            Ok(()) => {
                self.events.emit(StoryEvent::RestoreAfter);
                true
            }
            Err(error) => {
                log::warn!("restore failed: {}", error);
                self.events.emit(StoryEvent::RestoreFailed { error });
                false
            }
        }
    }

    fn try_restore(&mut self, token: &str) -> Result<(), StoryError> {
        let snapshot = decode_session_with_limits(token, self.options.token)?;
        let top = snapshot
            .history
            .last()
            .copied()
            .ok_or(StoryError::EmptyHistory)?;
        let prepared = self.prepare(&PassageTarget::Id(top), true)?;
        self.session.restore_from(snapshot);
        self.present(prepared, None, false);
        Ok(())
    }

    /// Entries the native stack should carry for a genuine one-step rewind.
    pub(crate) fn review_len(&self) -> usize {
        if self.options.is_branch() {
            self.branches.len().saturating_sub(1)
        } else {
            self.review.len()
        }
    }

    /// Remove every archived passage and branch node from the screen.
    pub(crate) fn clear_screen(&mut self) {
        if self.options.is_branch() {
            self.branches.clear();
            self.display.apply(DisplayCommand::ClearNodes);
        } else {
            self.review.clear();
            self.display.apply(DisplayCommand::ClearArchive);
        }
        self.displayed = None;
    }

    /// Resolve and render a passage without touching any state, so a failure
    /// leaves the session exactly as it was.
    pub(crate) fn prepare(
        &self,
        target: &PassageTarget,
        allow_revisit: bool,
    ) -> Result<Prepared, StoryError> {
        let passage = self
            .story
            .passage(target)
            .ok_or_else(|| StoryError::PassageNotFound(target.clone()))?;

        if allow_revisit && self.options.is_branch() && self.branches.has_node(passage.id) {
            return Ok(Prepared::Revisit(passage.id));
        }

        let markup = self.renderer.render(passage)?;
        let colophon = if passage.has_tag(&self.options.end_tag) {
            match self.story.passage_by_name(&self.options.colophon_passage) {
                Some(colophon) => Some(self.renderer.render(colophon)?),
                None => None,
            }
        } else {
            None
        };
        Ok(Prepared::Show {
            passage_id: passage.id,
            markup,
            colophon,
        })
    }

    /// Put a prepared passage on screen. Never fails.
    pub(crate) fn present(
        &mut self,
        prepared: Prepared,
        origin: Option<u32>,
        record_history: bool,
    ) -> NavigateOutcome {
        let (passage_id, markup, colophon) = match prepared {
            Prepared::Revisit(passage_id) => {
                log::debug!("revisiting passage {}", passage_id);
                self.events.emit(StoryEvent::RevisitPassage { passage_id });
                let direction = self.direction_to(passage_id);
                self.displayed = Some(passage_id);
                self.scroll_to(Slot::Node(passage_id), direction);
                self.events
                    .emit(StoryEvent::RevisitPassageAfter { passage_id });
                return NavigateOutcome::Revisited;
            }
            Prepared::Show {
                passage_id,
                markup,
                colophon,
            } => (passage_id, markup, colophon),
        };

        self.events.emit(StoryEvent::ShowPassage { passage_id });

        if record_history {
            let len = self.session.history.append(passage_id);
            log::debug!("recorded passage {} (history len {})", passage_id, len);
            if let Err(error) = self.native.push_checkpoint(&self.session.snapshot()) {
                log::warn!("native history checkpoint failed: {}", error);
                self.events.emit(StoryEvent::CheckpointFailed { error });
            }
        } else {
            log::debug!("redisplaying passage {} without recording", passage_id);
        }

        let (slot, direction) = if self.options.is_branch() {
            let after = origin.filter(|parent| self.branches.has_node(*parent));
            self.branches.create_node(passage_id, origin);
            let direction = self.direction_to(passage_id);
            self.display.apply(DisplayCommand::InsertNode {
                passage_id,
                after,
                markup,
            });
            (Slot::Node(passage_id), direction)
        } else {
            if let Some(previous) = self.displayed {
                self.review.push(previous);
                self.display.apply(DisplayCommand::ArchiveCurrent {
                    passage_id: previous,
                });
            }
            self.display.apply(DisplayCommand::Render {
                slot: Slot::Main,
                markup,
            });
            (Slot::Main, ScrollDirection::TowardEnd)
        };

        if let Some(colophon) = colophon {
            self.display.apply(DisplayCommand::Append {
                slot,
                markup: colophon,
            });
        }
        if let Slot::Node(id) = slot {
            self.display.apply(DisplayCommand::ShowNode(id));
        }
        self.displayed = Some(passage_id);

        self.events.emit(StoryEvent::ShowPassageAfter { passage_id });
        self.scroll_to(slot, direction);
        NavigateOutcome::Shown
    }

    /// Direction from the displayed node to `passage_id`'s node.
    fn direction_to(&self, passage_id: u32) -> ScrollDirection {
        let from = self.displayed.and_then(|id| self.branches.position(id));
        let to = self.branches.position(passage_id);
        match (from, to) {
            (Some(from), Some(to)) if to < from => ScrollDirection::TowardStart,
            _ => ScrollDirection::TowardEnd,
        }
    }

    fn scroll_to(&mut self, anchor: Slot, direction: ScrollDirection) {
        let axis = self.options.layout_axis;
        self.display.apply(DisplayCommand::ScrollTo(ScrollRequest {
            anchor,
            axis,
            direction,
            offset_px: self.options.scroll_adjust,
            duration_ms: axis.duration_hint_ms(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckpointError;
    use crate::history::Checkpoint;
    use crate::options::LayoutAxis;
    use crate::platform::{MemoryHistory, RecordingPresentation, SourceRenderer};
    use std::cell::RefCell;
    use std::rc::Rc;

    type TestPlayer = Player<SourceRenderer, RecordingPresentation, MemoryHistory>;

    fn story() -> Story {
        Story::new(
            "Test",
            1,
            [
                Passage::new(1, "Start", "start"),
                Passage::new(2, "Room", "room"),
                Passage::new(3, "End", "end").with_tags(["end"]),
                Passage::new(4, "StoryColophon", "<colophon>"),
            ],
        )
    }

    fn player(options: PlayerOptions) -> TestPlayer {
        Player::new(
            story(),
            options,
            SourceRenderer,
            RecordingPresentation::new(),
            MemoryHistory::new(),
        )
    }

    fn record_events(player: &mut TestPlayer) -> Rc<RefCell<Vec<&'static str>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        player.subscribe(move |event| sink.borrow_mut().push(event.name()));
        seen
    }

    #[test]
    fn recorded_navigation_appends_exactly_one_entry() {
        let mut player = player(PlayerOptions::default());
        assert_eq!(player.current_id(), Err(StoryError::EmptyHistory));

        player.navigate(1, None, true).unwrap();
        player.navigate("Room", None, true).unwrap();
        assert_eq!(player.current_id(), Ok(2));
        assert_eq!(player.history().entries(), [1, 2]);
        assert_eq!(player.review(), [1]);
        assert_eq!(player.display().main(), "room");
        assert_eq!(player.display().archive()[0].markup, "start");
        assert_eq!(player.native().len(), 3);
    }

    #[test]
    fn revisits_in_replace_mode_add_entries() {
        let mut player = player(PlayerOptions::default());
        player.show(1).unwrap();
        player.show(2).unwrap();
        player.show(1).unwrap();
        assert_eq!(player.history().entries(), [1, 2, 1]);
        assert_eq!(player.review(), [1, 2]);
    }

    #[test]
    fn end_tag_appends_colophon_without_history() {
        let mut player = player(PlayerOptions::default());
        player.show(1).unwrap();
        player.show(2).unwrap();
        player.show(3).unwrap();
        assert_eq!(player.history().entries(), [1, 2, 3]);
        assert_eq!(player.display().main(), "end<colophon>");
    }

    #[test]
    fn unrecorded_navigation_skips_history_and_checkpoint() {
        let mut player = player(PlayerOptions::default());
        player.show(1).unwrap();
        player.navigate(2, None, false).unwrap();
        assert_eq!(player.history().entries(), [1]);
        assert_eq!(player.native().len(), 2);
        assert_eq!(player.displayed(), Some(2));
    }

    #[test]
    fn missing_passage_fails_without_side_effects() {
        let mut player = player(PlayerOptions::default());
        player.show(1).unwrap();
        let events = record_events(&mut player);
        let before = player.display().commands().len();

        let err = player.show("Cellar").unwrap_err();
        assert_eq!(err, StoryError::PassageNotFound(PassageTarget::from("Cellar")));
        assert_eq!(player.history().entries(), [1]);
        assert_eq!(player.display().commands().len(), before);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn show_emits_lifecycle_in_order() {
        let mut player = player(PlayerOptions::default());
        let events = record_events(&mut player);
        player.begin(None).unwrap();
        assert_eq!(
            *events.borrow(),
            ["startstory", "showpassage", "showpassage:after"]
        );
    }

    #[test]
    fn rejected_checkpoint_is_reported_and_play_continues() {
        let mut player = Player::new(
            story(),
            PlayerOptions::default(),
            SourceRenderer,
            RecordingPresentation::new(),
            MemoryHistory::sandboxed(),
        );
        let failures: Rc<RefCell<Vec<CheckpointError>>> = Rc::default();
        let sink = Rc::clone(&failures);
        player.subscribe(move |event| {
            if let StoryEvent::CheckpointFailed { error } = event {
                sink.borrow_mut().push(error.clone());
            }
        });

        player.show(1).unwrap();
        player.show(2).unwrap();
        assert_eq!(player.history().entries(), [1, 2]);
        assert_eq!(failures.borrow().len(), 2);
        assert_eq!(player.native().len(), 1);
    }

    #[test]
    fn branch_revisit_reuses_node_and_history() {
        let mut player = player(PlayerOptions::journal());
        let events = record_events(&mut player);
        player.show(1).unwrap();
        player.follow_link(2, LinkSource::Node(1)).unwrap();
        let outcome = player.follow_link(1, LinkSource::Node(2)).unwrap();

        assert_eq!(outcome, NavigateOutcome::Revisited);
        assert_eq!(player.branches().len(), 2);
        assert_eq!(player.history().entries(), [1, 2]);
        assert_eq!(player.display().nodes().len(), 2);
        assert!(events.borrow().ends_with(&["revisitpassage", "revisitpassage:after"]));

        let scroll = player.display().last_scroll().unwrap();
        assert_eq!(scroll.anchor, Slot::Node(1));
        assert_eq!(scroll.direction, ScrollDirection::TowardStart);
        assert_eq!(scroll.axis, LayoutAxis::Horizontal);
        assert_eq!(scroll.duration_ms, 500);
    }

    #[test]
    fn branch_nodes_insert_after_origin() {
        let mut player = player(PlayerOptions::journal());
        player.show(1).unwrap();
        player.follow_link(2, LinkSource::Node(1)).unwrap();
        player.follow_link(3, LinkSource::Node(1)).unwrap();
        let order: Vec<u32> = player.display().nodes().iter().map(|n| n.passage_id).collect();
        assert_eq!(order, [1, 3, 2]);
        assert!(player.display().nodes().iter().all(|n| n.visible));
        assert_eq!(player.display().node(3).unwrap().markup, "end<colophon>");
    }

    #[test]
    fn review_log_links_are_inert_in_replace_mode() {
        let mut player = player(PlayerOptions::default());
        player.show(1).unwrap();
        player.show(2).unwrap();
        let outcome = player.follow_link(3, LinkSource::ReviewLog).unwrap();
        assert_eq!(outcome, NavigateOutcome::Ignored);
        assert_eq!(player.history().entries(), [1, 2]);
    }

    #[test]
    fn render_errors_go_through_the_trap() {
        let renderer = |passage: &Passage| -> Result<String, RenderError> {
            if passage.name == "Room" {
                Err(RenderError::new("x is not defined").at("Room", Some(3)))
            } else {
                Ok(passage.source.clone())
            }
        };
        let mut player = Player::new(
            story(),
            PlayerOptions::default(),
            renderer,
            RecordingPresentation::new(),
            MemoryHistory::new(),
        );
        player.show(1).unwrap();
        let err = player.follow_link("Room", LinkSource::Current).unwrap_err();
        assert!(matches!(err, StoryError::Render(_)));
        assert_eq!(player.history().entries(), [1]);
        assert_eq!(
            player.display().error(),
            Some("\u{26a0} x is not defined (Room: 3)")
        );
    }

    #[test]
    fn ignore_errors_leaves_display_alone() {
        let options = PlayerOptions {
            ignore_errors: true,
            ..PlayerOptions::default()
        };
        let mut player = player(options);
        player.show(1).unwrap();
        assert!(player.follow_link("Nowhere", LinkSource::Current).is_err());
        assert_eq!(player.display().error(), None);
        assert_eq!(player.display().main(), "start");
    }

    #[test]
    fn save_then_restore_in_fresh_session() {
        let mut player = player(PlayerOptions::default());
        player.show(1).unwrap();
        player.show(2).unwrap();
        player.show(3).unwrap();
        player.state_mut().insert("score".into(), 2.into());
        let token = player.save().unwrap();
        assert_eq!(player.native().fragment(), token);

        let mut fresh = self::player(PlayerOptions::default());
        let events = record_events(&mut fresh);
        assert!(fresh.restore(&token));
        assert_eq!(fresh.current_id(), Ok(3));
        assert_eq!(fresh.state()["score"], 2);
        assert_eq!(fresh.native().len(), 1);
        assert_eq!(*events.borrow().first().unwrap(), "restore");
        assert_eq!(*events.borrow().last().unwrap(), "restore:after");
    }

    #[test]
    fn failed_restore_keeps_live_session() {
        let mut player = player(PlayerOptions::default());
        player.show(1).unwrap();
        player.show(2).unwrap();
        let before = player.session().clone();
        let events = record_events(&mut player);

        assert!(!player.restore("definitely not a token"));
        assert_eq!(*player.session(), before);
        assert_eq!(*events.borrow(), ["restore", "restorefailed"]);

        let unknown = encode_session(&Checkpoint {
            state: StateBag::new(),
            history: alloc::vec![1, 99],
        })
        .unwrap();
        assert!(!player.restore(&unknown));
        assert_eq!(*player.session(), before);
    }

    #[test]
    fn begin_resumes_from_fragment_or_starts_fresh() {
        let mut source = player(PlayerOptions::default());
        source.show(1).unwrap();
        source.show(2).unwrap();
        let token = source.save_token().unwrap();

        let mut resumed = player(PlayerOptions::default());
        resumed.begin(Some(&alloc::format!("#{}", token))).unwrap();
        assert_eq!(resumed.history().entries(), [1, 2]);
        assert_eq!(resumed.displayed(), Some(2));

        let mut fresh = player(PlayerOptions::default());
        fresh.begin(Some("#garbage")).unwrap();
        assert_eq!(fresh.history().entries(), [1]);
    }

    #[test]
    fn restart_clears_progress() {
        let mut player = player(PlayerOptions::journal());
        player.show(1).unwrap();
        player.follow_link(2, LinkSource::Current).unwrap();
        player.state_mut().insert("lamp".into(), true.into());

        player.restart().unwrap();
        assert_eq!(player.history().entries(), [1]);
        assert!(player.state().is_empty());
        assert_eq!(player.branches().len(), 1);
        assert_eq!(player.display().nodes().len(), 1);
    }

    #[test]
    fn begin_installs_author_styles() {
        let mut story = story();
        story.user_styles.push("p { color: red; }".into());
        let mut player = Player::new(
            story,
            PlayerOptions::default(),
            SourceRenderer,
            RecordingPresentation::new(),
            MemoryHistory::new(),
        );
        player.begin(None).unwrap();
        assert_eq!(player.display().styles(), ["p { color: red; }"]);
    }

    #[test]
    fn failing_start_passage_reaches_the_trap() {
        let renderer = |passage: &Passage| -> Result<String, RenderError> {
            if passage.name == "Start" {
                Err(RenderError::new("boom"))
            } else {
                Ok(passage.source.clone())
            }
        };
        let mut player = Player::new(
            story(),
            PlayerOptions::default(),
            renderer,
            RecordingPresentation::new(),
            MemoryHistory::new(),
        );
        let err = player.begin(None).unwrap_err();
        assert!(matches!(err, StoryError::Render(_)));
        assert!(player.history().is_empty());
        assert_eq!(player.display().error(), Some("\u{26a0} boom"));
    }

    #[test]
    fn begin_resumes_from_host_fragment() {
        let mut source = player(PlayerOptions::default());
        source.show(1).unwrap();
        source.show(2).unwrap();
        let token = source.save_token().unwrap();

        let mut player = Player::new(
            story(),
            PlayerOptions::default(),
            SourceRenderer,
            RecordingPresentation::new(),
            MemoryHistory::new().with_fragment(alloc::format!("#{}", token)),
        );
        let fragment = player.native().fragment().to_owned();
        player.begin(Some(&fragment)).unwrap();
        assert_eq!(player.history().entries(), [1, 2]);

        let commands = player.display_mut().take_commands();
        assert!(commands.contains(&DisplayCommand::Render {
            slot: Slot::Main,
            markup: "room".into(),
        }));
        assert!(player.display().commands().is_empty());
        assert_eq!(player.display().main(), "room");
    }

    #[test]
    fn unplaced_origin_is_kept_as_node_parent() {
        let mut player = player(PlayerOptions::journal());
        player.show(1).unwrap();
        player.navigate(2, Some(3), true).unwrap();

        let nodes = player.branches().nodes();
        assert_eq!(nodes[1].passage_id, 2);
        assert_eq!(nodes[1].parent, Some(3));
        let order: Vec<u32> = player.display().nodes().iter().map(|n| n.passage_id).collect();
        assert_eq!(order, [1, 2]);
    }
}
