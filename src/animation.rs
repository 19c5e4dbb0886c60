//! The render loop.
//!
//! Each tick polls input, draws the current frame, homes the cursor, advances
//! the frame index and sleeps for a fixed interval. The sleep is not corrected
//! for time spent drawing, so the real rate runs slightly under
//! [`TICKS_PER_SECOND`].

use std::io;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::frames::FrameSet;
use crate::input::{InputSource, Poll, StopReason, poll_input};
use crate::signals::ShutdownFlag;
use crate::terminal::{StdinMode, TerminalSession, TtyOutput};

pub const TICKS_PER_SECOND: u32 = 15;

/// Sleep between two ticks.
pub const TICK_INTERVAL: Duration = Duration::from_micros(1_000_000 / TICKS_PER_SECOND as u64);

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Error reading: {0}")]
    Input(#[source] io::Error),
}

/// Something that can pause the loop between ticks.
pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Stopping(StopReason),
}

/// Frame index and run state owned by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationState {
    pub current_frame_index: usize,
    stop: Option<StopReason>,
}

impl AnimationState {
    pub fn new() -> Self {
        Self {
            current_frame_index: 0,
            stop: None,
        }
    }

    pub fn running(&self) -> bool {
        self.stop.is_none()
    }

    pub fn phase(&self) -> Phase {
        match self.stop {
            None => Phase::Running,
            Some(reason) => Phase::Stopping(reason),
        }
    }

    /// Request a stop. The first reason wins.
    pub fn stop(&mut self, reason: StopReason) {
        if self.stop.is_none() {
            self.stop = Some(reason);
        }
    }

    pub fn advance(&mut self, frames: &FrameSet) {
        self.current_frame_index = frames.next_index(self.current_frame_index);
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Animation<'a, I: InputSource, C: Clock> {
    frames: &'a FrameSet,
    input: I,
    clock: C,
    shutdown: ShutdownFlag,
    interval: Duration,
    state: AnimationState,
}

impl<'a, I: InputSource, C: Clock> Animation<'a, I, C> {
    pub fn new(frames: &'a FrameSet, input: I, clock: C, shutdown: ShutdownFlag) -> Self {
        Self {
            frames,
            input,
            clock,
            shutdown,
            interval: TICK_INTERVAL,
            state: AnimationState::new(),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    /// Run one tick and report whether the loop should keep going.
    ///
    /// Output trouble never ends the loop: a frame the terminal cannot take
    /// is skipped and the next tick tries again.
    pub fn tick<W: TtyOutput, S: StdinMode>(
        &mut self,
        session: &mut TerminalSession<W, S>,
    ) -> Result<Phase, RunError> {
        if let Poll::Stop(reason) = poll_input(&mut self.input).map_err(RunError::Input)? {
            self.state.stop(reason);
        }

        let frame = self.frames.get(self.state.current_frame_index);
        match session.draw_frame(frame) {
            Ok(true) => {}
            Ok(false) => trace!(
                index = self.state.current_frame_index,
                "animation:frame skipped"
            ),
            Err(e) => warn!(error = %e, "animation:frame write failed"),
        }
        self.state.advance(self.frames);
        self.clock.sleep(self.interval);

        if self.shutdown.is_requested() {
            self.state.stop(StopReason::Signal);
        }
        Ok(self.state.phase())
    }

    /// Tick until input or a signal asks to stop.
    pub fn run<W: TtyOutput, S: StdinMode>(
        &mut self,
        session: &mut TerminalSession<W, S>,
    ) -> Result<StopReason, RunError> {
        info!(
            frames = self.frames.len(),
            interval_ms = self.interval.as_millis(),
            "animation:start"
        );
        let mut ticks: u64 = 0;
        loop {
            let phase = self.tick(session)?;
            ticks += 1;
            if let Phase::Stopping(reason) = phase {
                debug_assert!(!self.state.running());
                info!(ticks, reason = ?reason, "animation:stop");
                return Ok(reason);
            }
            if ticks % u64::from(TICKS_PER_SECOND * 60) == 0 {
                debug!(ticks, "animation:heartbeat");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{FRAME_SIZE, ROFLCOPTER};
    use crate::input::tests::Scripted;
    use crate::terminal::tests::{FakeStdin, Recorder, Stalling, Step};

    /// Counts sleeps and optionally raises the shutdown flag after `n` of them.
    struct TestClock {
        sleeps: Vec<Duration>,
        signal_after: Option<(usize, ShutdownFlag)>,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                sleeps: Vec::new(),
                signal_after: None,
            }
        }

        fn signal_after(n: usize, flag: ShutdownFlag) -> Self {
            Self {
                sleeps: Vec::new(),
                signal_after: Some((n, flag)),
            }
        }
    }

    impl Clock for &mut TestClock {
        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
            if let Some((n, flag)) = &self.signal_after
                && self.sleeps.len() >= *n
            {
                flag.request();
            }
        }
    }

    fn session(out: &Recorder) -> TerminalSession<Recorder, FakeStdin> {
        TerminalSession::prepare(out.clone(), FakeStdin::default(), true).unwrap()
    }

    fn frames_drawn(out: &Recorder) -> usize {
        out.contents().matches("\x1b[H").count() - 1
    }

    #[test]
    fn test_tick_interval_is_fifteen_per_second() {
        assert_eq!(TICK_INTERVAL, Duration::from_micros(66_666));
    }

    #[test]
    fn test_state_starts_running_at_frame_zero() {
        let state = AnimationState::new();
        assert!(state.running());
        assert_eq!(state.current_frame_index, 0);
        assert_eq!(state.phase(), Phase::Running);
    }

    #[test]
    fn test_first_stop_reason_wins() {
        let mut state = AnimationState::new();
        state.stop(StopReason::Quit);
        state.stop(StopReason::Signal);
        assert_eq!(state.phase(), Phase::Stopping(StopReason::Quit));
    }

    #[test]
    fn test_index_cycles_across_ticks() {
        let out = Recorder::default();
        let mut session = session(&out);
        let mut clock = TestClock::new();
        let mut animation = Animation::new(
            &ROFLCOPTER,
            Scripted::idle(),
            &mut clock,
            ShutdownFlag::default(),
        );

        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(animation.state().current_frame_index);
            assert_eq!(animation.tick(&mut session).unwrap(), Phase::Running);
        }

        assert_eq!(seen, vec![0, 1, 0, 1, 0]);
        drop(animation);
        assert_eq!(clock.sleeps, vec![TICK_INTERVAL; 5]);
    }

    #[test]
    fn test_tick_writes_one_frame_and_homes() {
        let out = Recorder::default();
        let mut session = session(&out);
        let before = out.contents().len();
        let mut clock = TestClock::new();
        let mut animation = Animation::new(
            &ROFLCOPTER,
            Scripted::idle(),
            &mut clock,
            ShutdownFlag::default(),
        );

        animation.tick(&mut session).unwrap();

        let written = &out.contents()[before..];
        assert_eq!(written.len(), FRAME_SIZE + "\x1b[H".len());
        assert_eq!(written, format!("{}\x1b[H", ROFLCOPTER.get(0).as_str()));
    }

    #[test]
    fn test_quit_key_stops_within_one_tick() {
        let out = Recorder::default();
        let mut session = session(&out);
        let mut clock = TestClock::new();
        let input = Scripted::new([
            Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Ok(b"x".to_vec()),
            Ok(b"Q".to_vec()),
        ]);
        let mut animation =
            Animation::new(&ROFLCOPTER, input, &mut clock, ShutdownFlag::default());

        let reason = animation.run(&mut session).unwrap();

        assert_eq!(reason, StopReason::Quit);
        assert_eq!(frames_drawn(&out), 3);
    }

    #[test]
    fn test_end_of_input_stops() {
        let out = Recorder::default();
        let mut session = session(&out);
        let mut clock = TestClock::new();
        let input = Scripted::new([Ok(Vec::new())]);
        let mut animation =
            Animation::new(&ROFLCOPTER, input, &mut clock, ShutdownFlag::default());

        assert_eq!(
            animation.run(&mut session).unwrap(),
            StopReason::EndOfInput
        );
        assert_eq!(frames_drawn(&out), 1);
    }

    #[test]
    fn test_signal_stops_loop() {
        let out = Recorder::default();
        let mut session = session(&out);
        let flag = ShutdownFlag::default();
        let mut clock = TestClock::signal_after(4, flag.clone());
        let mut animation = Animation::new(&ROFLCOPTER, Scripted::idle(), &mut clock, flag);

        assert_eq!(animation.run(&mut session).unwrap(), StopReason::Signal);
        assert_eq!(frames_drawn(&out), 4);
    }

    #[test]
    fn test_signal_then_teardown_restores_once() {
        let out = Recorder::default();
        let stdin = FakeStdin::default();
        let mut session = TerminalSession::prepare(out.clone(), stdin.clone(), true).unwrap();
        let flag = ShutdownFlag::default();
        flag.request();
        let mut clock = TestClock::new();
        let mut animation = Animation::new(&ROFLCOPTER, Scripted::idle(), &mut clock, flag);

        assert_eq!(animation.run(&mut session).unwrap(), StopReason::Signal);
        session.teardown().unwrap();
        drop(session);

        assert_eq!(out.contents().matches("\x1b[?47l").count(), 1);
        assert_eq!(stdin.calls(), vec![true, false]);
    }

    #[test]
    fn test_input_error_is_fatal() {
        let out = Recorder::default();
        let mut session = session(&out);
        let mut clock = TestClock::new();
        let input = Scripted::new([Err(io::Error::from_raw_os_error(libc::EIO))]);
        let mut animation =
            Animation::new(&ROFLCOPTER, input, &mut clock, ShutdownFlag::default());

        let err = animation.run(&mut session).unwrap_err();

        assert!(matches!(err, RunError::Input(_)));
        assert!(err.to_string().starts_with("Error reading: "));
        assert_eq!(frames_drawn(&out), 0);
    }

    #[test]
    fn test_paused_terminal_skips_frames_and_keeps_running() {
        let tty = Stalling::default();
        let stdin = FakeStdin::default();
        let mut session = TerminalSession::prepare(tty.clone(), stdin.clone(), true).unwrap();
        tty.script([Step::Block, Step::Block]);
        let would_block = || -> io::Result<Vec<u8>> { Err(io::ErrorKind::WouldBlock.into()) };
        let input = Scripted::new([would_block(), would_block(), would_block(), Ok(b"q".to_vec())]);
        let mut clock = TestClock::new();
        let mut animation =
            Animation::new(&ROFLCOPTER, input, &mut clock, ShutdownFlag::default());

        assert_eq!(animation.run(&mut session).unwrap(), StopReason::Quit);
        assert_eq!(animation.state().current_frame_index, 0);
        assert_eq!(frames_drawn(&tty.out), 2);

        tty.script([Step::Block]);
        session.teardown().unwrap();

        assert!(tty.out.contents().ends_with("\x1b[?47l\x1b[u\x1b[?25h"));
        assert_eq!(tty.waits(), 1);
        assert_eq!(stdin.calls(), vec![true, false]);
    }
}
