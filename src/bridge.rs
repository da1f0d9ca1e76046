//! Native history bridge.
//!
//! The platform's back/forward stack is an uncontrolled message source. Each
//! notification is reconciled using only the length of the delivered history
//! against the live review length, plus the suppress-back flag.
//!
//! Forward navigation is not supported: a forward step is bounced with a
//! programmatic back, and the pop that bounce produces is absorbed. Rapid
//! repeated back/forward input can still leave the flag out of step with the
//! platform's position.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::StoryError;
use crate::history::Checkpoint;
use crate::navigator::Player;
use crate::passage::PassageTarget;
use crate::platform::{DisplayCommand, MemoryHistory, NativeHistory, PassageRenderer, Presentation};

/// Notification delivered by the platform.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeEvent {
    /// Back/forward landed on an entry; `None` for entries the player did not push.
    Pop(Option<Checkpoint>),
    /// The address fragment changed.
    FragmentChanged(String),
}

/// How a native notification was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopOutcome {
    /// One-step rewind applied.
    Rewound,
    /// Synthetic back produced by a bounce; nothing changed.
    Absorbed,
    /// Forward (or multi-step) jump refused with a programmatic back.
    Bounced,
    /// Popped past the first checkpoint; session reset to the start passage.
    Reset,
    /// A fragment carried a token that was restored.
    Restored,
    /// Nothing to do.
    Ignored,
}

impl<R, D, H> Player<R, D, H>
where
    R: PassageRenderer,
    D: Presentation,
    H: NativeHistory,
{
    pub fn handle_native_event(&mut self, event: NativeEvent) -> Result<PopOutcome, StoryError> {
        match event {
            NativeEvent::Pop(payload) => {
                let result = self.on_pop(payload);
                self.trap(result)
            }
            NativeEvent::FragmentChanged(fragment) => Ok(if self.on_fragment_change(&fragment) {
                PopOutcome::Restored
            } else {
                PopOutcome::Ignored
            }),
        }
    }

    /// React to a native back/forward pop.
    ///
    /// Errors are only possible when the passage to redisplay cannot be
    /// rendered; the session is left untouched in that case.
    pub fn on_pop(&mut self, payload: Option<Checkpoint>) -> Result<PopOutcome, StoryError> {
        if self.suppress_back {
            self.suppress_back = false;
            log::debug!("absorbed synthetic back");
            return Ok(PopOutcome::Absorbed);
        }

        let Some(checkpoint) = payload else {
            if self.session.history.len() > 1 {
                self.reset_to_start()?;
                return Ok(PopOutcome::Reset);
            }
            return Ok(PopOutcome::Ignored);
        };

        if checkpoint.history.is_empty() {
            log::warn!("ignoring pop with empty history payload");
            return Ok(PopOutcome::Ignored);
        }

        let live = self.review_len();
        if checkpoint.history.len() == live {
            self.rewind(checkpoint)?;
            Ok(PopOutcome::Rewound)
        } else {
            log::debug!(
                "bouncing pop (payload len {}, live review len {})",
                checkpoint.history.len(),
                live
            );
            self.suppress_back = true;
            self.native.go_back();
            Ok(PopOutcome::Bounced)
        }
    }

    /// Restore from a changed address fragment.
    ///
    /// Ignores empty fragments and the token this player last published.
    pub fn on_fragment_change(&mut self, fragment: &str) -> bool {
        let token = fragment.trim_start_matches('#');
        if token.is_empty() {
            return false;
        }
        if self.published_token.as_deref() == Some(token) {
            log::trace!("fragment echo of our own save");
            return false;
        }
        self.restore(token)
    }

    fn rewind(&mut self, checkpoint: Checkpoint) -> Result<(), StoryError> {
        let top = checkpoint
            .history
            .last()
            .copied()
            .ok_or(StoryError::EmptyHistory)?;
        let leaving = self.session.history.current_id().ok();
        let branch = self.options.is_branch();
        let prepared = self.prepare(&PassageTarget::Id(top), true)?;
        log::debug!("rewinding from {:?} to {}", leaving, top);

        self.session.restore_from(checkpoint);
        if branch {
            if let Some(leaving) = leaving.filter(|id| *id != top) {
                if self.branches.remove_node(leaving).is_some() {
                    self.display.apply(DisplayCommand::HideNode(leaving));
                }
            }
        } else {
            self.drop_archived();
        }

        self.present(prepared, None, false);

        if !branch {
            self.drop_archived();
        }
        Ok(())
    }

    fn reset_to_start(&mut self) -> Result<(), StoryError> {
        let start = self.story.start_passage();
        let prepared = self.prepare(&PassageTarget::Id(start), false)?;
        log::debug!("popped past first checkpoint; resetting to {}", start);
        self.session.reset();
        self.session.history.append(start);
        self.clear_screen();
        self.present(prepared, None, false);
        Ok(())
    }

    fn drop_archived(&mut self) {
        if self.review.pop().is_some() {
            self.display.apply(DisplayCommand::DropArchived);
        }
    }
}

impl<R, D> Player<R, D, MemoryHistory>
where
    R: PassageRenderer,
    D: Presentation,
{
    /// Deliver every event queued by programmatic navigation, in order.
    pub fn pump_native_events(&mut self) -> Result<Vec<PopOutcome>, StoryError> {
        let mut outcomes = Vec::new();
        while let Some(event) = self.native.next_event() {
            outcomes.push(self.handle_native_event(event)?);
        }
        Ok(outcomes)
    }

    /// Simulate the user pressing back and deliver the resulting pop.
    pub fn press_back(&mut self) -> Result<PopOutcome, StoryError> {
        match self.native.back() {
            Some(event) => self.handle_native_event(event),
            None => Ok(PopOutcome::Ignored),
        }
    }

    /// Simulate the user pressing forward and deliver the resulting pop.
    pub fn press_forward(&mut self) -> Result<PopOutcome, StoryError> {
        match self.native.forward() {
            Some(event) => self.handle_native_event(event),
            None => Ok(PopOutcome::Ignored),
        }
    }
}
