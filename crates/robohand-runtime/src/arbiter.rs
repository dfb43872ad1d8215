//! [`ModeArbiter`] – top-level session state machine.
//!
//! ```text
//! Start ──"1"──▶ CameraSession ──feed ended / quit──▶ Terminated
//!       ──"2"──▶ VoiceSession  ──stop / quit──────────▶ Terminated
//!       ──anything else──▶ Start (menu shown again)
//!       ──end of input──▶ Terminated
//! ```
//!
//! Exactly one session runs per process.  Invalid menu input is handled by a
//! loop, so a stream of bad answers cannot grow the stack.

use std::io::{self, BufRead, Write};

use robohand_perception::{LandmarkSource, TranscriptSource};
use robohand_types::{HandError, Mode};
use tracing::{info, warn};

use crate::camera_session::{CameraReport, run_camera_session};
use crate::context::SessionContext;
use crate::voice_session::{FingerDisplay, VoiceExit, run_voice_session};

/// Menu shown at [`ArbiterState::Start`].
pub const MENU: &str = "=== MENU ===\n1. Camera mode\n2. Voice mode\n";

/// Prompt printed after the menu.
pub const PROMPT: &str = "Choice (1/2): ";

/// States of the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterState {
    Start,
    CameraSession,
    VoiceSession,
    Terminated,
}

/// Map one menu answer to a mode.
///
/// # Errors
///
/// Returns [`HandError::InvalidSelection`] for anything but `1` or `2`
/// (surrounding whitespace ignored).
pub fn parse_selection(answer: &str) -> Result<Mode, HandError> {
    match answer.trim() {
        "1" => Ok(Mode::Camera),
        "2" => Ok(Mode::Voice),
        other => Err(HandError::InvalidSelection(other.to_string())),
    }
}

pub struct ModeArbiter {
    ctx: SessionContext,
    state: ArbiterState,
}

impl ModeArbiter {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            state: ArbiterState::Start,
        }
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Show the menu on `output` and read answers from `input` until one is
    /// valid.  Each invalid answer is reported and the menu shown again.
    ///
    /// Returns `Ok(None)` and moves to [`ArbiterState::Terminated`] when
    /// `input` ends before a valid answer.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::Config`] if the arbiter already left `Start`, or
    /// [`HandError::Transport`] if the console cannot be read or written.
    pub fn select(
        &mut self,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<Option<Mode>, HandError> {
        if self.state != ArbiterState::Start {
            return Err(HandError::Config(format!(
                "mode already chosen (state {:?})",
                self.state
            )));
        }
        let console = |e: io::Error| HandError::Transport(format!("console: {e}"));

        loop {
            output.write_all(MENU.as_bytes()).map_err(console)?;
            output.write_all(PROMPT.as_bytes()).map_err(console)?;
            output.flush().map_err(console)?;

            let mut answer = String::new();
            if input.read_line(&mut answer).map_err(console)? == 0 {
                info!("menu input closed before a mode was chosen");
                self.terminate();
                return Ok(None);
            }
            match parse_selection(&answer) {
                Ok(mode) => {
                    self.ctx.state.set_mode(mode)?;
                    self.state = match mode {
                        Mode::Camera => ArbiterState::CameraSession,
                        Mode::Voice => ArbiterState::VoiceSession,
                    };
                    return Ok(Some(mode));
                }
                Err(e) => {
                    warn!(error = %e, "invalid menu choice");
                    writeln!(output, "Invalid choice.").map_err(console)?;
                }
            }
        }
    }

    /// Run the camera session on this thread, then terminate.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::InvalidSelection`] unless camera mode was selected.
    pub fn run_camera(
        &mut self,
        source: &mut dyn LandmarkSource,
    ) -> Result<CameraReport, HandError> {
        self.expect_state(ArbiterState::CameraSession)?;
        let dispatcher = self.ctx.dispatcher();
        let report = run_camera_session(
            source,
            dispatcher.as_ref(),
            &self.ctx.settings,
            &self.ctx.stop,
        );
        self.terminate();
        Ok(report)
    }

    /// Run the voice session (background listener, foreground display),
    /// then terminate.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::InvalidSelection`] unless voice mode was selected.
    pub fn run_voice(
        &mut self,
        source: Box<dyn TranscriptSource>,
        display: &mut dyn FingerDisplay,
    ) -> Result<VoiceExit, HandError> {
        self.expect_state(ArbiterState::VoiceSession)?;
        let exit = run_voice_session(
            source,
            self.ctx.dispatcher(),
            &self.ctx.state,
            display,
            &self.ctx.settings,
            self.ctx.stop.clone(),
        );
        self.terminate();
        Ok(exit)
    }

    /// Stop any session loop and release the serial link.  Idempotent.
    pub fn terminate(&mut self) {
        if self.state == ArbiterState::Terminated {
            return;
        }
        self.ctx.request_stop();
        self.ctx.transport.close();
        self.state = ArbiterState::Terminated;
        info!("session terminated");
    }

    fn expect_state(&self, wanted: ArbiterState) -> Result<(), HandError> {
        if self.state == wanted {
            Ok(())
        } else {
            Err(HandError::InvalidSelection(format!(
                "{wanted:?} requested while in {:?}",
                self.state
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionSettings;
    use robohand_hal::sim::SimLink;
    use robohand_middleware::{EventBus, SessionState};
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    fn arbiter() -> ModeArbiter {
        let link = SimLink::new(Duration::from_millis(5));
        let ctx = SessionContext::new(
            Arc::new(link.transport()),
            Arc::new(SessionState::new()),
            EventBus::default(),
            SessionSettings::default(),
        );
        ModeArbiter::new(ctx)
    }

    fn select(arbiter: &mut ModeArbiter, answers: &str) -> (Option<Mode>, String) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let mode = arbiter.select(&mut input, &mut output).unwrap();
        (mode, String::from_utf8(output).unwrap())
    }

    #[test]
    fn parse_selection_accepts_only_one_and_two() {
        assert_eq!(parse_selection("1"), Ok(Mode::Camera));
        assert_eq!(parse_selection(" 2\n"), Ok(Mode::Voice));
        for bad in ["3", "", "12", "camera"] {
            assert!(matches!(
                parse_selection(bad),
                Err(HandError::InvalidSelection(_))
            ));
        }
    }

    #[test]
    fn valid_choice_enters_session() {
        let mut a = arbiter();
        let (mode, out) = select(&mut a, "1\n");
        assert_eq!(mode, Some(Mode::Camera));
        assert_eq!(a.state(), ArbiterState::CameraSession);
        assert_eq!(a.context().state.mode(), Some(Mode::Camera));
        assert_eq!(out.matches(PROMPT).count(), 1);
    }

    #[test]
    fn each_invalid_answer_reprompts_once() {
        let mut a = arbiter();
        let (mode, out) = select(&mut a, "3\n\n2\n");
        assert_eq!(mode, Some(Mode::Voice));
        assert_eq!(a.state(), ArbiterState::VoiceSession);
        assert_eq!(out.matches("Invalid choice.").count(), 2);
        assert_eq!(out.matches(PROMPT).count(), 3);
    }

    #[test]
    fn invalid_answers_do_not_leave_start() {
        let mut a = arbiter();
        let (mode, out) = select(&mut a, "3\n");
        // Input ended after the bad answer.
        assert_eq!(mode, None);
        assert_eq!(a.state(), ArbiterState::Terminated);
        assert_eq!(a.context().state.mode(), None);
        assert_eq!(out.matches(PROMPT).count(), 2);
        assert!(a.context().transport.is_closed());
    }

    #[test]
    fn many_invalid_answers_do_not_overflow() {
        let mut a = arbiter();
        let answers = "x\n".repeat(50_000) + "1\n";
        let (mode, _) = select(&mut a, &answers);
        assert_eq!(mode, Some(Mode::Camera));
    }

    #[test]
    fn session_must_match_selection() {
        let mut a = arbiter();
        select(&mut a, "2\n");
        struct NoFeed;
        impl LandmarkSource for NoFeed {
            fn next_frame(&mut self) -> Result<robohand_perception::FrameInput, HandError> {
                Ok(robohand_perception::FrameInput::Ended)
            }
        }
        assert!(a.run_camera(&mut NoFeed).is_err());
        assert_eq!(a.state(), ArbiterState::VoiceSession);
    }

    #[test]
    fn select_twice_is_rejected() {
        let mut a = arbiter();
        select(&mut a, "1\n");
        let mut input = Cursor::new(b"2\n".to_vec());
        assert!(a.select(&mut input, &mut Vec::<u8>::new()).is_err());
    }

    #[test]
    fn terminate_is_idempotent() {
        let mut a = arbiter();
        a.terminate();
        a.terminate();
        assert_eq!(a.state(), ArbiterState::Terminated);
        assert!(a.context().stop_requested());
    }
}
