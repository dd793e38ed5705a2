use crate::square::Square;
use std::time::{Duration, Instant};

/// A pending ambiguous move waiting for the player's approval.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationRequest {
    pub chosen: Square,
    pub candidates: Vec<Square>,
    pub to: Square,
    pub created_at: Instant,
    pub deadline: Instant,
}

impl ConfirmationRequest {
    pub fn new(
        chosen: Square,
        candidates: Vec<Square>,
        to: Square,
        now: Instant,
        timeout: Duration,
    ) -> Self {
        Self {
            chosen,
            candidates,
            to,
            created_at: now,
            deadline: now + timeout,
        }
    }

    pub fn prompt(&self) -> String {
        format!("Move {} to {}? confirm or cancel", self.chosen, self.to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirm,
    Deny,
}

const AFFIRMATIVE: [&str; 10] = [
    "yes", "yeah", "yep", "yup", "confirm", "confirmed", "correct", "ok", "okay", "sure",
];
const NEGATIVE: [&str; 5] = ["no", "nope", "nah", "cancel", "stop"];

impl Reply {
    /// Classifies a normalized utterance. The first yes/no word wins.
    pub fn classify(normalized: &str) -> Option<Reply> {
        normalized.split_whitespace().find_map(|word| {
            if AFFIRMATIVE.contains(&word) {
                Some(Reply::Affirm)
            } else if NEGATIVE.contains(&word) {
                Some(Reply::Deny)
            } else {
                None
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationState {
    Idle,
    AwaitingConfirmation(ConfirmationRequest),
}

/// How a pending confirmation ended. The controller is back in `Idle` by the
/// time one of these is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Confirmed(ConfirmationRequest),
    Cancelled(ConfirmationRequest),
    TimedOut(ConfirmationRequest),
}

#[derive(Debug)]
pub struct ConfirmationController {
    state: ConfirmationState,
}

impl ConfirmationController {
    pub fn new() -> Self {
        Self {
            state: ConfirmationState::Idle,
        }
    }

    pub fn state(&self) -> &ConfirmationState {
        &self.state
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, ConfirmationState::AwaitingConfirmation(_))
    }

    pub fn pending(&self) -> Option<&ConfirmationRequest> {
        match &self.state {
            ConfirmationState::AwaitingConfirmation(request) => Some(request),
            ConfirmationState::Idle => None,
        }
    }

    /// Starts waiting for approval. A request that is already pending is
    /// replaced and returned as cancelled.
    pub fn begin(&mut self, request: ConfirmationRequest) -> Option<Resolution> {
        tracing::info!(
            "Awaiting confirmation: {} -> {} (candidates: {:?})",
            request.chosen,
            request.to,
            request.candidates
        );
        let previous = std::mem::replace(
            &mut self.state,
            ConfirmationState::AwaitingConfirmation(request),
        );
        match previous {
            ConfirmationState::AwaitingConfirmation(old) => Some(Resolution::Cancelled(old)),
            ConfirmationState::Idle => None,
        }
    }

    /// Feeds a spoken utterance. Anything that is not a yes or a no is ignored.
    /// Past the deadline every utterance times the request out instead.
    pub fn on_utterance(&mut self, normalized: &str, now: Instant) -> Option<Resolution> {
        if let Some(timed_out) = self.poll(now) {
            return Some(timed_out);
        }
        if !self.is_awaiting() {
            return None;
        }
        match Reply::classify(normalized)? {
            Reply::Affirm => self.finish(Resolution::Confirmed),
            Reply::Deny => self.finish(Resolution::Cancelled),
        }
    }

    /// Confirms the pending request, unless its deadline has already passed.
    pub fn on_gesture(&mut self, now: Instant) -> Option<Resolution> {
        self.poll(now).or_else(|| self.finish(Resolution::Confirmed))
    }

    pub fn cancel(&mut self) -> Option<Resolution> {
        self.finish(Resolution::Cancelled)
    }

    /// Times out the pending request once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Resolution> {
        let expired = self.pending().is_some_and(|request| now >= request.deadline);
        if expired {
            self.finish(Resolution::TimedOut)
        } else {
            None
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending().map(|request| request.deadline)
    }

    fn finish(
        &mut self,
        outcome: impl FnOnce(ConfirmationRequest) -> Resolution,
    ) -> Option<Resolution> {
        match std::mem::replace(&mut self.state, ConfirmationState::Idle) {
            ConfirmationState::AwaitingConfirmation(request) => {
                let resolution = outcome(request);
                match &resolution {
                    Resolution::Confirmed(r) => {
                        tracing::info!("Confirmed {} -> {}", r.chosen, r.to)
                    }
                    Resolution::Cancelled(r) => {
                        tracing::info!("Cancelled {} -> {}", r.chosen, r.to)
                    }
                    Resolution::TimedOut(r) => tracing::warn!(
                        "Confirmation of {} -> {} timed out after {:?}",
                        r.chosen,
                        r.to,
                        r.deadline.duration_since(r.created_at)
                    ),
                }
                Some(resolution)
            }
            ConfirmationState::Idle => None,
        }
    }
}

impl Default for ConfirmationController {
    fn default() -> Self {
        Self::new()
    }
}
