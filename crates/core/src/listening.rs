//! Lifecycle of the external speech service.
//!
//! The controller never talks to the service directly. Each call returns the
//! `ServiceCall`s the host has to perform, and timers are plain deadlines that
//! the host drives through [`ListeningController::poll`].

use crate::config::ListeningConfig;
use crate::timers::TimerSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Inactive,
    Activating,
    Listening,
    Processing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCall {
    Activate,
    Deactivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListeningTimer {
    Activate,
    StallRecovery,
}

#[derive(Debug)]
pub struct ListeningController {
    state: ListeningState,
    timers: TimerSet<ListeningTimer>,
    config: ListeningConfig,
    /// Set by `board_ready`. Nothing activates the service before that.
    armed: bool,
}

impl ListeningController {
    pub fn new(config: ListeningConfig) -> Self {
        Self {
            state: ListeningState::Inactive,
            timers: TimerSet::new(),
            config,
            armed: false,
        }
    }

    pub fn state(&self) -> ListeningState {
        self.state
    }

    pub fn config(&self) -> &ListeningConfig {
        &self.config
    }

    pub fn activation_pending(&self) -> bool {
        self.timers.is_scheduled(ListeningTimer::Activate)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    // Every state change drops the timers of the state being left.
    fn transition(&mut self, next: ListeningState) {
        if self.state != next {
            tracing::debug!("Listening: {:?} -> {:?}", self.state, next);
        }
        self.timers.cancel_all();
        self.state = next;
    }

    /// Schedules the next activation. Only an armed, `Inactive` controller can
    /// activate, which keeps activation cycles from overlapping.
    fn schedule_activation(&mut self, now: Instant, delay: Duration) {
        if !self.armed {
            tracing::debug!("Board not ready, not scheduling activation");
            return;
        }
        if self.state != ListeningState::Inactive {
            tracing::debug!("Not scheduling activation while {:?}", self.state);
            return;
        }
        self.timers.schedule(ListeningTimer::Activate, now + delay);
        tracing::debug!("Scheduled activation in {:?}", delay);
    }

    pub fn board_ready(&mut self, now: Instant) {
        self.armed = true;
        self.schedule_activation(now, self.config.board_ready_delay);
    }

    /// Re-arms an idle controller that has nothing scheduled.
    pub fn rearm(&mut self, now: Instant, delay: Duration) {
        if self.state == ListeningState::Inactive && !self.activation_pending() {
            self.schedule_activation(now, delay);
        }
    }

    /// The service accepted the activation call.
    pub fn on_listening_started(&mut self, _now: Instant) {
        if self.state == ListeningState::Activating {
            // The stall timer keeps running: only a transcript proves the
            // service is actually hearing anything.
            self.state = ListeningState::Listening;
            tracing::debug!("Listening: Activating -> Listening");
        }
    }

    /// A partial transcript is evidence that the service is alive.
    pub fn on_partial(&mut self, _now: Instant) {
        match self.state {
            ListeningState::Activating | ListeningState::Listening => {
                self.transition(ListeningState::Listening);
            }
            _ => {}
        }
    }

    /// Claims the controller for one full transcript. Returns false when a
    /// transcript is already being processed or listening is paused.
    pub fn begin_processing(&mut self, _now: Instant) -> bool {
        match self.state {
            ListeningState::Processing => {
                tracing::warn!("Transcript arrived while another is being processed; dropping it");
                false
            }
            ListeningState::Paused => {
                tracing::debug!("Transcript arrived while paused; dropping it");
                false
            }
            ListeningState::Inactive | ListeningState::Activating | ListeningState::Listening => {
                self.transition(ListeningState::Processing);
                true
            }
        }
    }

    /// Ends processing: the service is deactivated and, when `rearm` is set,
    /// the next activation is scheduled after the relisten delay.
    pub fn finish_processing(&mut self, now: Instant, rearm: bool) -> Vec<ServiceCall> {
        if self.state != ListeningState::Processing {
            return vec![];
        }
        self.transition(ListeningState::Inactive);
        if rearm {
            self.schedule_activation(now, self.config.relisten_delay);
        }
        vec![ServiceCall::Deactivate]
    }

    /// Error, abort or a service-side stop. Heads back towards `Activating`
    /// after `delay` from whatever state it interrupted, unless paused.
    pub fn on_fault(&mut self, now: Instant, delay: Duration) {
        if self.state == ListeningState::Paused {
            return;
        }
        self.transition(ListeningState::Inactive);
        self.schedule_activation(now, delay);
    }

    /// The service reports a stop caused by deactivation. While activating or
    /// listening nobody asked for it, so it is handled like a fault; otherwise
    /// it is the echo of our own deactivate call.
    pub fn on_deactivated(&mut self, now: Instant) {
        match self.state {
            ListeningState::Activating | ListeningState::Listening => {
                tracing::warn!("Speech service deactivated itself while {:?}", self.state);
                self.on_fault(now, self.config.stop_delay);
            }
            _ => tracing::debug!("Speech service confirmed deactivation"),
        }
    }

    pub fn pause(&mut self) -> Vec<ServiceCall> {
        if self.state == ListeningState::Paused {
            return vec![];
        }
        self.transition(ListeningState::Paused);
        vec![ServiceCall::Deactivate]
    }

    pub fn resume(&mut self, now: Instant) {
        if self.state != ListeningState::Paused {
            return;
        }
        self.transition(ListeningState::Inactive);
        self.schedule_activation(now, self.config.resume_delay);
    }

    /// Fires every expired timer and returns the service calls they produce.
    pub fn poll(&mut self, now: Instant) -> Vec<ServiceCall> {
        let mut calls = Vec::new();
        while let Some(timer) = self.timers.take_due(now) {
            match timer {
                ListeningTimer::Activate => {
                    if self.state != ListeningState::Inactive {
                        continue;
                    }
                    tracing::info!(">>> Activating speech service");
                    self.transition(ListeningState::Activating);
                    self.timers
                        .schedule(ListeningTimer::StallRecovery, now + self.config.stall_timeout);
                    calls.push(ServiceCall::Activate);
                }
                ListeningTimer::StallRecovery => {
                    if !matches!(
                        self.state,
                        ListeningState::Activating | ListeningState::Listening
                    ) {
                        continue;
                    }
                    tracing::warn!("!!! No transcript since activation, forcing reactivation");
                    self.transition(ListeningState::Inactive);
                    self.schedule_activation(now, self.config.force_reactivate_gap);
                    calls.push(ServiceCall::Deactivate);
                }
            }
        }
        calls
    }
}
