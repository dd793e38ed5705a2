//! Tunables for the interpreter. Hosts usually start from `Default` and
//! override a few values from their own configuration source.

use crate::disambiguator::DisambiguationWeights;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ListeningConfig {
    /// Delay before the first activation once the board is ready.
    pub board_ready_delay: Duration,
    /// Delay before listening again after a transcript was handled.
    pub relisten_delay: Duration,
    /// Delay before listening again after a service error.
    pub fault_delay: Duration,
    /// Delay before listening again after an abort or a service-side stop.
    pub stop_delay: Duration,
    /// How long an activation may go without any transcript before it is
    /// forcibly restarted.
    pub stall_timeout: Duration,
    /// Gap between the forced deactivate and the re-activate.
    pub force_reactivate_gap: Duration,
    pub resume_delay: Duration,
}

impl Default for ListeningConfig {
    fn default() -> Self {
        Self {
            board_ready_delay: Duration::from_millis(500),
            relisten_delay: Duration::from_millis(800),
            fault_delay: Duration::from_millis(1000),
            stop_delay: Duration::from_millis(500),
            stall_timeout: Duration::from_millis(2000),
            force_reactivate_gap: Duration::from_millis(300),
            resume_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationConfig {
    pub timeout: Duration,
    /// Keep the speech service cycling while a confirmation is pending so the
    /// player can answer out loud. When false only the gesture, an external
    /// cancel or the timeout can resolve it.
    pub listen_during_confirmation: bool,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            listen_during_confirmation: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpreterConfig {
    pub listening: ListeningConfig,
    pub confirmation: ConfirmationConfig,
    pub weights: DisambiguationWeights,
}
