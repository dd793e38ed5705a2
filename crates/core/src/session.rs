use crate::{
    Command, MoveReport,
    config::InterpreterConfig,
    confirmation::{ConfirmationController, ConfirmationRequest, ConfirmationState, Resolution},
    disambiguator::{SpatialContext, rank},
    engine::{GameEngine, GestureSensor},
    error::InterpretError,
    intent::{MoveIntent, ParseFailure, extract},
    listening::{ListeningController, ListeningState, ServiceCall},
    normalizer::{is_menu_command, normalize},
    resolver::resolve,
    square::Square,
};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

pub const BOARD_READY_PROMPT: &str = "Say your move, e.g. \"knight to f3\" or \"e2 to e4\".";
pub const NOTHING_HEARD: &str = "I didn't hear anything. Try again.";
const NOT_READY: &str = "Game is not ready.";
const CANCELLED: &str = "Cancelled.";
const STOPPED_TIMEOUT: &str = "I didn't catch that. Say your move.";
const STOPPED_INACTIVITY: &str = "Say your move, e.g. \"knight to f3\".";

/// Why the speech service stopped listening on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Timeout,
    Inactivity,
    Deactivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Open,
    Close,
}

/// What became of a transcript or a confirmation trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Executed(MoveReport),
    /// More than one piece fits; nothing moves until the player approves.
    ConfirmationRequested(ConfirmationRequest),
    /// The pending confirmation ended without a move, either by a no, an
    /// external cancel or its deadline passing.
    Cancelled { timed_out: bool },
    Menu(MenuCommand),
    /// The input was not acted on (paused, not ready, or not a yes/no while
    /// a confirmation is pending).
    Ignored,
}

/// Drives one player's voice input against one game.
///
/// Every method is synchronous and takes the current time; the host serializes
/// calls and forwards the `Command`s that come out of `command_tx`.
pub struct MoveSession<E: GameEngine> {
    engine: E,
    config: InterpreterConfig,
    listening: ListeningController,
    confirmation: ConfirmationController,
    spatial: Option<SpatialContext>,
    ready: bool,
    menu_open: bool,
    moves_executed: u32,
    command_tx: UnboundedSender<Command>,
}

impl<E: GameEngine> MoveSession<E> {
    pub fn new(engine: E, config: InterpreterConfig, command_tx: UnboundedSender<Command>) -> Self {
        Self {
            listening: ListeningController::new(config.listening.clone()),
            confirmation: ConfirmationController::new(),
            engine,
            config,
            spatial: None,
            ready: false,
            menu_open: false,
            moves_executed: 0,
            command_tx,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn listening_state(&self) -> ListeningState {
        self.listening.state()
    }

    pub fn confirmation_state(&self) -> &ConfirmationState {
        self.confirmation.state()
    }

    pub fn moves_executed(&self) -> u32 {
        self.moves_executed
    }

    /// The earliest moment at which `tick` has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (
            self.listening.next_deadline(),
            self.confirmation.next_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn update_spatial_context(&mut self, context: Option<SpatialContext>) {
        self.spatial = context;
    }

    // --- Host signals ---

    pub fn board_ready(&mut self, now: Instant) {
        tracing::info!("Board ready. Starting voice recognition.");
        self.ready = true;
        self.show_status(BOARD_READY_PROMPT);
        self.listening.board_ready(now);
    }

    pub fn menu_opened(&mut self, _now: Instant) {
        tracing::info!("Menu opened, pausing voice input");
        self.menu_open = true;
        // A pending confirmation does not survive the pause.
        if let Some(resolution) = self.confirmation.cancel() {
            if let Err(e) = self.settle(resolution) {
                tracing::warn!("Cancelling confirmation for the menu failed: {}", e);
            }
        }
        let calls = self.listening.pause();
        self.apply(calls);
    }

    pub fn menu_closed(&mut self, now: Instant) {
        tracing::info!("Menu closed, resuming voice input");
        self.menu_open = false;
        self.listening.resume(now);
    }

    /// Explicit cancel from outside the speech channel (e.g. a UI button).
    pub fn cancel_confirmation(&mut self, now: Instant) -> Option<Outcome> {
        let resolution = self.confirmation.cancel()?;
        let result = self.settle(resolution);
        self.listening.rearm(now, self.config.listening.relisten_delay);
        match result {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.report_failure(&e, None);
                None
            }
        }
    }

    // --- Speech service events ---

    pub fn on_listening_started(&mut self, now: Instant) {
        self.listening.on_listening_started(now);
    }

    pub fn on_partial_transcript(&mut self, text: &str, now: Instant) {
        tracing::debug!("Partial: '{}'", text);
        self.listening.on_partial(now);
    }

    pub fn on_full_transcript(&mut self, text: &str, now: Instant) -> Result<Outcome, InterpretError> {
        tracing::info!("====== FULL TRANSCRIPTION ====== '{}'", text);
        // The listening cycle starts with the board. Until then only menu
        // commands are honoured and the service is left alone.
        if !self.ready {
            return Ok(self.before_board_ready(text));
        }
        if !self.listening.begin_processing(now) {
            return Ok(Outcome::Ignored);
        }

        let result = self.process_transcript(text, now);
        if let Err(e) = &result {
            self.report_failure(e, Some(text));
        }

        let rearm = !self.confirmation.is_awaiting()
            || self.config.confirmation.listen_during_confirmation;
        let calls = self.listening.finish_processing(now, rearm);
        self.apply(calls);
        result
    }

    pub fn on_error(&mut self, code: &str, message: &str, now: Instant) {
        let fault = InterpretError::ServiceFault {
            code: code.to_string(),
            message: message.to_string(),
        };
        self.report_failure(&fault, None);
        self.listening.on_fault(now, self.config.listening.fault_delay);
    }

    pub fn on_aborted(&mut self, now: Instant) {
        tracing::warn!("*** Speech request aborted");
        self.listening.on_fault(now, self.config.listening.stop_delay);
    }

    pub fn on_stopped_listening(&mut self, reason: StopReason, now: Instant) {
        tracing::debug!("*** Stopped listening ({:?})", reason);
        let prompt = match reason {
            StopReason::Timeout => STOPPED_TIMEOUT,
            StopReason::Inactivity => STOPPED_INACTIVITY,
            StopReason::Deactivation => {
                self.listening.on_deactivated(now);
                return;
            }
        };
        // Keep the confirmation prompt on screen while one is pending.
        if !self.confirmation.is_awaiting() {
            self.show_status(prompt);
        }
        self.listening.on_fault(now, self.config.listening.stop_delay);
    }

    pub fn on_request_completed(&mut self) {
        tracing::debug!(">>> Speech request completed");
    }

    /// Fires due timers and polls the gesture sensor. Returns the result of a
    /// confirmation that resolved during this tick, if any.
    pub fn tick<G: GestureSensor + ?Sized>(
        &mut self,
        now: Instant,
        gestures: &G,
    ) -> Option<Result<Outcome, InterpretError>> {
        let calls = self.listening.poll(now);
        self.apply(calls);

        // An expired request times out before the gesture sensor is consulted.
        let resolution = match self.confirmation.poll(now) {
            Some(resolution) => resolution,
            None if self.confirmation.is_awaiting()
                && gestures.confirmation_gesture_detected() =>
            {
                tracing::info!("Confirmation gesture detected");
                self.confirmation.on_gesture(now)?
            }
            None => return None,
        };

        let result = self.settle(resolution);
        if let Err(e) = &result {
            self.report_failure(e, None);
        }
        self.listening.rearm(now, self.config.listening.relisten_delay);
        Some(result)
    }

    // --- Pipeline ---

    fn process_transcript(&mut self, text: &str, now: Instant) -> Result<Outcome, InterpretError> {
        let normalized = normalize(text);
        tracing::debug!("[Parse] Normalized: '{}'", normalized);

        if is_menu_command(&normalized) {
            return Ok(self.menu_command(&normalized));
        }

        // While a confirmation is pending, speech only answers it.
        if let Some(request) = self.confirmation.pending() {
            let prompt = request.prompt();
            return match self.confirmation.on_utterance(&normalized, now) {
                Some(resolution) => self.settle(resolution),
                None => {
                    tracing::debug!("Not a confirmation reply: '{}'", normalized);
                    self.show_status(&prompt);
                    Ok(Outcome::Ignored)
                }
            };
        }

        if text.trim().is_empty() {
            return Err(InterpretError::Parse(ParseFailure {
                hint: NOTHING_HEARD.to_string(),
            }));
        }

        let intent = extract(&normalized)?;
        tracing::debug!("[Parse] Intent: {}", intent);

        let candidates = resolve(&intent, &self.engine);
        let to = intent.destination();
        match candidates.len() {
            0 => Err(match intent {
                MoveIntent::SquareToSquare { from, to } => InterpretError::IllegalMove { from, to },
                MoveIntent::PieceToSquare { piece, to } => InterpretError::NoLegalPiece { piece, to },
            }),
            1 => {
                let from = candidates[0];
                self.execute(from, to, false, candidates)
            }
            _ => Ok(self.request_confirmation(candidates, to, now)),
        }
    }

    fn before_board_ready(&mut self, text: &str) -> Outcome {
        let normalized = normalize(text);
        if is_menu_command(&normalized) {
            return self.menu_command(&normalized);
        }
        tracing::warn!("Transcript before the board is ready");
        self.show_status(NOT_READY);
        Outcome::Ignored
    }

    fn request_confirmation(&mut self, candidates: Vec<Square>, to: Square, now: Instant) -> Outcome {
        let ranking = match rank(&candidates, self.spatial.as_ref(), &self.config.weights) {
            Some(ranking) => ranking,
            None => return Outcome::Ignored,
        };
        let request = ConfirmationRequest::new(
            ranking.best,
            ranking.squares(),
            to,
            now,
            self.config.confirmation.timeout,
        );

        self.emit(Command::HighlightCandidates {
            selected: request.chosen,
            candidates: request.candidates.clone(),
        });
        self.show_status(&request.prompt());
        self.confirmation.begin(request.clone());
        Outcome::ConfirmationRequested(request)
    }

    fn settle(&mut self, resolution: Resolution) -> Result<Outcome, InterpretError> {
        self.emit(Command::ClearHighlights);
        match resolution {
            Resolution::Confirmed(request) => {
                self.execute(request.chosen, request.to, true, request.candidates)
            }
            Resolution::Cancelled(_) => {
                self.show_status(CANCELLED);
                Ok(Outcome::Cancelled { timed_out: false })
            }
            Resolution::TimedOut(request) => {
                let timeout = InterpretError::ConfirmationTimeout {
                    from: request.chosen,
                    to: request.to,
                };
                self.report_failure(&timeout, None);
                Ok(Outcome::Cancelled { timed_out: true })
            }
        }
    }

    fn execute(
        &mut self,
        from: Square,
        to: Square,
        was_ambiguous: bool,
        candidates: Vec<Square>,
    ) -> Result<Outcome, InterpretError> {
        if !self.engine.execute_move(from, to) {
            return Err(InterpretError::EngineRejected { from, to });
        }

        self.moves_executed += 1;
        tracing::info!("Move #{} success: {} -> {}", self.moves_executed, from, to);
        self.show_status(&format!("Moved {from} to {to}."));

        let report = MoveReport {
            from,
            to,
            was_ambiguous,
            candidates,
        };
        self.emit(Command::MoveExecuted(report.clone()));
        Ok(Outcome::Executed(report))
    }

    fn menu_command(&mut self, normalized: &str) -> Outcome {
        let words: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let close = if words.contains(&"toggle") {
            self.menu_open
        } else {
            words
                .iter()
                .any(|word| matches!(*word, "close" | "hide" | "resume" | "exit"))
        };
        if close {
            self.emit(Command::CloseMenu);
            Outcome::Menu(MenuCommand::Close)
        } else {
            self.emit(Command::OpenMenu);
            Outcome::Menu(MenuCommand::Open)
        }
    }

    // --- Outputs ---

    fn report_failure(&self, error: &InterpretError, transcript: Option<&str>) {
        tracing::warn!("[{}] {}", error.reason_code(), error);
        let text = match (error, transcript) {
            (InterpretError::Parse(failure), Some(t)) if !t.trim().is_empty() => {
                format!("Couldn't understand \"{}\". {}", t.trim(), failure.hint)
            }
            _ => error.status_text(),
        };
        self.show_status(&text);
    }

    fn show_status(&self, text: &str) {
        self.emit(Command::ShowStatus {
            text: text.to_string(),
        });
    }

    fn apply(&self, calls: Vec<ServiceCall>) {
        for call in calls {
            self.emit(match call {
                ServiceCall::Activate => Command::ActivateService,
                ServiceCall::Deactivate => Command::DeactivateService,
            });
        }
    }

    fn emit(&self, command: Command) {
        if let Err(e) = self.command_tx.send(command) {
            tracing::warn!("Failed to send command to runtime: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockGameEngine, NoGestures};
    use crate::square::PieceType;
    use std::time::Duration;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    fn sq(text: &str) -> Square {
        Square::parse(text).expect("valid square")
    }

    fn drain(rx: &mut UnboundedReceiver<Command>) -> Vec<Command> {
        let mut commands = vec![];
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    fn statuses(commands: &[Command]) -> Vec<String> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::ShowStatus { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Two knights (b1, g1) that can both reach d2; only g1 reaches f3.
    fn knights_engine() -> MockGameEngine {
        let mut engine = MockGameEngine::new();
        engine
            .expect_piece_type_at()
            .returning(|square| match square.to_string().as_str() {
                "b1" | "g1" => Some(PieceType::Knight),
                "e2" => Some(PieceType::Pawn),
                _ => None,
            });
        engine.expect_is_move_legal().returning(|from, to| {
            matches!(
                (from.to_string().as_str(), to.to_string().as_str()),
                ("b1", "d2") | ("g1", "d2") | ("g1", "f3") | ("e2", "e4")
            )
        });
        engine
    }

    fn ready_session(
        engine: MockGameEngine,
        t0: Instant,
    ) -> (MoveSession<MockGameEngine>, UnboundedReceiver<Command>) {
        let (command_tx, mut command_rx) = unbounded_channel();
        let mut session = MoveSession::new(engine, InterpreterConfig::default(), command_tx);
        session.board_ready(t0);
        session.tick(t0 + Duration::from_millis(500), &NoGestures);
        drain(&mut command_rx);
        (session, command_rx)
    }

    #[test]
    fn unambiguous_move_executes_immediately() {
        // --- 1. Arrange ---
        let mut engine = knights_engine();
        engine
            .expect_execute_move()
            .withf(|from, to| from.to_string() == "e2" && to.to_string() == "e4")
            .return_const(true)
            .once();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        // --- 2. Act ---
        let outcome = session
            .on_full_transcript("e2 to e4", t0 + Duration::from_secs(1))
            .expect("move should execute");

        // --- 3. Assert ---
        assert!(matches!(outcome, Outcome::Executed(ref r) if !r.was_ambiguous));
        let commands = drain(&mut command_rx);
        assert_eq!(statuses(&commands), vec!["Moved e2 to e4.".to_string()]);
        assert!(commands.contains(&Command::DeactivateService));
        assert_eq!(session.listening_state(), ListeningState::Inactive);
        assert_eq!(session.moves_executed(), 1);
    }

    #[test]
    fn ambiguous_move_waits_for_confirmation() {
        let mut engine = knights_engine();
        engine.expect_execute_move().never();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        let outcome = session
            .on_full_transcript("knight d2", t0 + Duration::from_secs(1))
            .expect("ambiguity is not an error");

        match outcome {
            Outcome::ConfirmationRequested(request) => {
                assert_eq!(request.chosen, sq("b1"));
                assert_eq!(request.candidates, vec![sq("b1"), sq("g1")]);
                assert_eq!(request.to, sq("d2"));
            }
            other => panic!("Expected a confirmation request, got {other:?}"),
        }
        let commands = drain(&mut command_rx);
        assert!(commands.contains(&Command::HighlightCandidates {
            selected: sq("b1"),
            candidates: vec![sq("b1"), sq("g1")],
        }));
        assert_eq!(
            statuses(&commands),
            vec!["Move b1 to d2? confirm or cancel".to_string()]
        );
    }

    #[test]
    fn spoken_cancel_returns_to_idle_without_moving() {
        let mut engine = knights_engine();
        engine.expect_execute_move().never();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        session
            .on_full_transcript("knight d2", t0 + Duration::from_secs(1))
            .expect("ambiguity is not an error");
        // Listening re-arms so the answer can be heard.
        session.tick(t0 + Duration::from_millis(1800), &NoGestures);
        drain(&mut command_rx);

        let outcome = session
            .on_full_transcript("cancel", t0 + Duration::from_secs(2))
            .expect("cancel is not an error");

        assert_eq!(outcome, Outcome::Cancelled { timed_out: false });
        assert_eq!(session.confirmation_state(), &ConfirmationState::Idle);
        let commands = drain(&mut command_rx);
        assert!(commands.contains(&Command::ClearHighlights));
        assert_eq!(statuses(&commands), vec!["Cancelled.".to_string()]);
    }

    #[test]
    fn new_moves_are_not_parsed_while_awaiting_confirmation() {
        let mut engine = knights_engine();
        engine.expect_execute_move().never();
        let t0 = Instant::now();
        let (mut session, _command_rx) = ready_session(engine, t0);

        session
            .on_full_transcript("knight d2", t0 + Duration::from_secs(1))
            .expect("ambiguity is not an error");
        let outcome = session
            .on_full_transcript("e2 to e4", t0 + Duration::from_secs(2))
            .expect("ignored, not failed");

        assert_eq!(outcome, Outcome::Ignored);
        assert!(matches!(
            session.confirmation_state(),
            ConfirmationState::AwaitingConfirmation(_)
        ));
    }

    #[test]
    fn gesture_confirms_the_default_candidate() {
        let mut engine = knights_engine();
        engine
            .expect_execute_move()
            .withf(|from, to| from.to_string() == "b1" && to.to_string() == "d2")
            .return_const(true)
            .once();
        let t0 = Instant::now();
        let (mut session, _command_rx) = ready_session(engine, t0);

        session
            .on_full_transcript("knight d2", t0 + Duration::from_secs(1))
            .expect("ambiguity is not an error");
        let result = session
            .tick(t0 + Duration::from_millis(1100), &|| true)
            .expect("gesture resolves the confirmation");

        match result {
            Ok(Outcome::Executed(report)) => {
                assert!(report.was_ambiguous);
                assert_eq!(report.candidates, vec![sq("b1"), sq("g1")]);
            }
            other => panic!("Expected an executed move, got {other:?}"),
        }
    }

    #[test]
    fn confirmation_times_out_into_idle() {
        let mut engine = knights_engine();
        engine.expect_execute_move().never();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        let asked_at = t0 + Duration::from_secs(1);
        session
            .on_full_transcript("knight d2", asked_at)
            .expect("ambiguity is not an error");
        drain(&mut command_rx);

        assert!(
            session
                .tick(asked_at + Duration::from_millis(4900), &NoGestures)
                .is_none()
        );
        let result = session
            .tick(asked_at + Duration::from_millis(5001), &NoGestures)
            .expect("deadline passed");

        assert_eq!(result, Ok(Outcome::Cancelled { timed_out: true }));
        assert_eq!(session.confirmation_state(), &ConfirmationState::Idle);
        let commands = drain(&mut command_rx);
        assert!(commands.contains(&Command::ClearHighlights));
        assert_eq!(statuses(&commands), vec!["Confirmation timed out.".to_string()]);
    }

    #[test]
    fn late_spoken_yes_times_out_instead_of_moving() {
        // --- 1. Arrange ---
        let mut engine = knights_engine();
        engine.expect_execute_move().never();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        session
            .on_full_transcript("knight d2", t0 + Duration::from_secs(1))
            .expect("ambiguity is not an error");
        drain(&mut command_rx);

        // --- 2. Act ---
        // No tick ran between the deadline and the reply.
        let outcome = session
            .on_full_transcript("yes", t0 + Duration::from_secs(11))
            .expect("a timeout is not an error");

        // --- 3. Assert ---
        assert_eq!(outcome, Outcome::Cancelled { timed_out: true });
        assert_eq!(session.moves_executed(), 0);
        assert_eq!(
            statuses(&drain(&mut command_rx)),
            vec!["Confirmation timed out.".to_string()]
        );
    }

    #[test]
    fn late_gesture_times_out_instead_of_moving() {
        // --- 1. Arrange ---
        let mut engine = knights_engine();
        engine.expect_execute_move().never();
        let t0 = Instant::now();
        let (mut session, _command_rx) = ready_session(engine, t0);

        session
            .on_full_transcript("knight d2", t0 + Duration::from_secs(1))
            .expect("ambiguity is not an error");

        // --- 2. Act ---
        let result = session
            .tick(t0 + Duration::from_secs(11), &|| true)
            .expect("the pending request resolves");

        // --- 3. Assert ---
        assert_eq!(result, Ok(Outcome::Cancelled { timed_out: true }));
        assert_eq!(session.moves_executed(), 0);
        assert_eq!(session.confirmation_state(), &ConfirmationState::Idle);
    }

    #[test]
    fn engine_rejection_is_reported_without_retry() {
        let mut engine = knights_engine();
        engine.expect_execute_move().return_const(false).once();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        let err = session
            .on_full_transcript("knight f3", t0 + Duration::from_secs(1))
            .expect_err("engine refused");
        assert_eq!(
            err,
            InterpretError::EngineRejected {
                from: sq("g1"),
                to: sq("f3")
            }
        );
        assert_eq!(
            statuses(&drain(&mut command_rx)),
            vec!["Could not move g1 to f3. Try again.".to_string()]
        );
        assert_eq!(session.moves_executed(), 0);
    }

    #[test]
    fn unparseable_transcript_prompts_retry_and_relistens() {
        let engine = knights_engine();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        let now = t0 + Duration::from_secs(1);
        let err = session
            .on_full_transcript("hello there", now)
            .expect_err("no grammar matches");
        assert_eq!(err.reason_code(), "parse_failure");
        assert_eq!(
            statuses(&drain(&mut command_rx)),
            vec![
                "Couldn't understand \"hello there\". Say a move like \"knight to f3\" or \"e2 to e4\"."
                    .to_string()
            ]
        );

        session.tick(now + Duration::from_millis(800), &NoGestures);
        assert!(drain(&mut command_rx).contains(&Command::ActivateService));
    }

    #[test]
    fn no_legal_piece_is_reported() {
        let engine = knights_engine();
        let t0 = Instant::now();
        let (mut session, _command_rx) = ready_session(engine, t0);

        let err = session
            .on_full_transcript("knight e5", t0 + Duration::from_secs(1))
            .expect_err("no knight reaches e5");
        assert_eq!(
            err,
            InterpretError::NoLegalPiece {
                piece: PieceType::Knight,
                to: sq("e5")
            }
        );
        assert_eq!(err.status_text(), "No knight can legally reach e5. Try again.");
    }

    #[test]
    fn menu_open_pauses_and_cancels_pending_confirmation() {
        let mut engine = knights_engine();
        engine.expect_execute_move().never();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        session
            .on_full_transcript("knight d2", t0 + Duration::from_secs(1))
            .expect("ambiguity is not an error");
        let outcome = session
            .on_full_transcript("open the menu", t0 + Duration::from_secs(2))
            .expect("menu commands always work");
        assert_eq!(outcome, Outcome::Menu(MenuCommand::Open));
        assert!(drain(&mut command_rx).contains(&Command::OpenMenu));

        session.menu_opened(t0 + Duration::from_secs(2));
        let commands = drain(&mut command_rx);
        assert!(commands.contains(&Command::ClearHighlights));
        assert!(commands.contains(&Command::DeactivateService));
        assert_eq!(statuses(&commands), vec![CANCELLED.to_string()]);
        assert_eq!(session.listening_state(), ListeningState::Paused);
        assert_eq!(session.confirmation_state(), &ConfirmationState::Idle);
        assert_eq!(session.next_deadline(), None);

        session.menu_closed(t0 + Duration::from_secs(10));
        session.tick(t0 + Duration::from_millis(10_500), &NoGestures);
        assert_eq!(session.listening_state(), ListeningState::Activating);
    }

    #[test]
    fn service_timeout_relistens_without_a_transcript() {
        let engine = knights_engine();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);
        session.on_partial_transcript("e", t0 + Duration::from_millis(600));

        session.on_stopped_listening(StopReason::Timeout, t0 + Duration::from_secs(1));
        assert_eq!(session.listening_state(), ListeningState::Inactive);
        session.tick(t0 + Duration::from_millis(1500), &NoGestures);

        let commands = drain(&mut command_rx);
        assert!(statuses(&commands).contains(&STOPPED_TIMEOUT.to_string()));
        assert!(commands.contains(&Command::ActivateService));
        assert_eq!(session.listening_state(), ListeningState::Activating);
    }

    #[test]
    fn suspended_listening_resumes_once_confirmation_resolves() {
        let mut engine = knights_engine();
        engine.expect_execute_move().never();
        let (command_tx, mut command_rx) = unbounded_channel();
        let mut config = InterpreterConfig::default();
        config.confirmation.listen_during_confirmation = false;
        let mut session = MoveSession::new(engine, config, command_tx);
        let t0 = Instant::now();
        session.board_ready(t0);
        session.tick(t0 + Duration::from_millis(500), &NoGestures);

        session
            .on_full_transcript("knight d2", t0 + Duration::from_secs(1))
            .expect("ambiguity is not an error");
        // Only the confirmation deadline is left.
        assert_eq!(session.next_deadline(), Some(t0 + Duration::from_secs(6)));
        session.tick(t0 + Duration::from_secs(3), &NoGestures);
        assert_eq!(session.listening_state(), ListeningState::Inactive);
        drain(&mut command_rx);

        assert_eq!(
            session.cancel_confirmation(t0 + Duration::from_secs(3)),
            Some(Outcome::Cancelled { timed_out: false })
        );
        session.tick(t0 + Duration::from_millis(3800), &NoGestures);
        assert!(drain(&mut command_rx).contains(&Command::ActivateService));
    }

    #[test]
    fn service_error_reports_and_relistens_after_fault_delay() {
        let engine = knights_engine();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        session.on_error("7", "network down", t0 + Duration::from_secs(1));
        assert_eq!(session.listening_state(), ListeningState::Inactive);
        assert_eq!(
            statuses(&drain(&mut command_rx)),
            vec!["Voice error. Restarting...".to_string()]
        );

        session.tick(t0 + Duration::from_millis(1999), &NoGestures);
        assert!(drain(&mut command_rx).is_empty());
        session.tick(t0 + Duration::from_millis(2000), &NoGestures);
        assert_eq!(drain(&mut command_rx), vec![Command::ActivateService]);
    }

    #[test]
    fn abort_relistens_silently_after_stop_delay() {
        let engine = knights_engine();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        session.on_aborted(t0 + Duration::from_secs(1));
        assert!(drain(&mut command_rx).is_empty());

        session.tick(t0 + Duration::from_millis(1499), &NoGestures);
        assert!(drain(&mut command_rx).is_empty());
        session.tick(t0 + Duration::from_millis(1500), &NoGestures);
        assert_eq!(drain(&mut command_rx), vec![Command::ActivateService]);
    }

    #[test]
    fn deactivation_echo_keeps_the_scheduled_relisten() {
        let engine = knights_engine();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);

        session
            .on_full_transcript("hello there", t0 + Duration::from_secs(1))
            .expect_err("no grammar matches");
        drain(&mut command_rx);

        session.on_stopped_listening(StopReason::Deactivation, t0 + Duration::from_millis(1100));
        assert_eq!(session.listening_state(), ListeningState::Inactive);
        assert_eq!(
            session.next_deadline(),
            Some(t0 + Duration::from_millis(1800))
        );
        assert!(drain(&mut command_rx).is_empty());

        session.tick(t0 + Duration::from_millis(1800), &NoGestures);
        assert_eq!(drain(&mut command_rx), vec![Command::ActivateService]);
    }

    #[test]
    fn unexpected_deactivation_while_listening_relistens() {
        let engine = knights_engine();
        let t0 = Instant::now();
        let (mut session, mut command_rx) = ready_session(engine, t0);
        session.on_partial_transcript("kn", t0 + Duration::from_millis(600));
        assert_eq!(session.listening_state(), ListeningState::Listening);

        session.on_stopped_listening(StopReason::Deactivation, t0 + Duration::from_secs(1));
        assert_eq!(session.listening_state(), ListeningState::Inactive);
        assert!(drain(&mut command_rx).is_empty());

        session.tick(t0 + Duration::from_millis(1499), &NoGestures);
        assert!(drain(&mut command_rx).is_empty());
        session.tick(t0 + Duration::from_millis(1500), &NoGestures);
        assert_eq!(drain(&mut command_rx), vec![Command::ActivateService]);
    }

    #[test]
    fn toggle_menu_flips_the_menu_state() {
        let (command_tx, mut command_rx) = unbounded_channel();
        let mut session =
            MoveSession::new(knights_engine(), InterpreterConfig::default(), command_tx);
        let t0 = Instant::now();

        session.menu_opened(t0);
        let outcome = session
            .on_full_transcript("toggle menu", t0)
            .expect("menu commands always work");
        assert_eq!(outcome, Outcome::Menu(MenuCommand::Close));
        assert!(drain(&mut command_rx).contains(&Command::CloseMenu));

        session.menu_closed(t0);
        let outcome = session
            .on_full_transcript("toggle the menu", t0)
            .expect("menu commands always work");
        assert_eq!(outcome, Outcome::Menu(MenuCommand::Open));
    }

    #[test]
    fn nothing_activates_before_board_ready() {
        // --- 1. Arrange ---
        let (command_tx, mut command_rx) = unbounded_channel();
        let mut session =
            MoveSession::new(knights_engine(), InterpreterConfig::default(), command_tx);
        let t0 = Instant::now();

        // --- 2. Act ---
        let outcome = session
            .on_full_transcript("e2 to e4", t0)
            .expect("ignored, not failed");
        session.on_error("7", "network down", t0);
        session.on_stopped_listening(StopReason::Timeout, t0);
        session.on_aborted(t0);
        session.tick(t0 + Duration::from_secs(5), &NoGestures);

        // --- 3. Assert ---
        assert_eq!(outcome, Outcome::Ignored);
        let commands = drain(&mut command_rx);
        assert!(!commands.contains(&Command::ActivateService));
        assert!(!commands.contains(&Command::DeactivateService));
        assert_eq!(statuses(&commands)[0], NOT_READY);
        assert_eq!(session.next_deadline(), None);

        // Menu commands still work.
        let outcome = session
            .on_full_transcript("open menu", t0 + Duration::from_secs(5))
            .expect("menu commands always work");
        assert_eq!(outcome, Outcome::Menu(MenuCommand::Open));
    }
}
