//! Session lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionPhase {
    /// Connected and exchanging frames.
    Active = 0,
    /// This side initiated the close.
    ClosingLocal = 1,
    /// The peer initiated the close.
    ClosingRemote = 2,
    /// Shutdown finished.
    Closed = 3,
}

impl SessionPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::ClosingLocal,
            2 => Self::ClosingRemote,
            _ => Self::Closed,
        }
    }
}

/// What ended a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseTrigger {
    /// The operator sent `/close`.
    CloseCommand,
    /// Ctrl-C or the process interrupt signal.
    Interrupt,
    /// The peer sent a close frame.
    RemoteClose,
    /// The scripted wait expired.
    Timeout,
    /// The console reached end of input.
    ConsoleClosed,
    /// The connection failed without a close frame.
    ConnectionLost,
    /// The peer sent a frame that breaks the protocol.
    ProtocolViolation,
    /// An outbound write failed or timed out.
    WriteFailed,
}

impl CloseTrigger {
    /// Phase the session moves to when this trigger wins.
    pub fn closing_phase(self) -> SessionPhase {
        match self {
            Self::RemoteClose | Self::ConnectionLost => SessionPhase::ClosingRemote,
            Self::CloseCommand
            | Self::Interrupt
            | Self::Timeout
            | Self::ConsoleClosed
            | Self::ProtocolViolation
            | Self::WriteFailed => SessionPhase::ClosingLocal,
        }
    }
}

/// Atomic session phase. The move out of `Active` happens exactly once.
#[derive(Debug)]
pub struct SessionState {
    phase: AtomicU8,
}

impl SessionState {
    /// A new, active session.
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(SessionPhase::Active as u8),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Try to start closing. Returns `true` only for the first caller.
    pub fn begin_close(&self, trigger: CloseTrigger) -> bool {
        self.phase
            .compare_exchange(
                SessionPhase::Active as u8,
                trigger.closing_phase() as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Mark shutdown complete. Returns `true` only once, and only after a close began.
    pub fn finish(&self) -> bool {
        let current = self.phase.load(Ordering::Acquire);
        if current == SessionPhase::Active as u8 || current == SessionPhase::Closed as u8 {
            return false;
        }
        self.phase
            .compare_exchange(
                current,
                SessionPhase::Closed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn starts_active() {
        assert_eq!(SessionState::new().phase(), SessionPhase::Active);
    }

    #[test]
    fn first_trigger_wins() {
        let state = SessionState::new();
        assert!(state.begin_close(CloseTrigger::Interrupt));
        assert!(!state.begin_close(CloseTrigger::RemoteClose));
        assert_eq!(state.phase(), SessionPhase::ClosingLocal);
    }

    #[test]
    fn remote_close_moves_to_closing_remote() {
        let state = SessionState::new();
        assert!(state.begin_close(CloseTrigger::RemoteClose));
        assert_eq!(state.phase(), SessionPhase::ClosingRemote);
    }

    #[test]
    fn protocol_violation_is_closed_locally() {
        let state = SessionState::new();
        assert!(state.begin_close(CloseTrigger::ProtocolViolation));
        assert_eq!(state.phase(), SessionPhase::ClosingLocal);
    }

    #[test]
    fn finish_requires_closing_and_happens_once() {
        let state = SessionState::new();
        assert!(!state.finish());
        assert!(state.begin_close(CloseTrigger::Timeout));
        assert!(state.finish());
        assert!(!state.finish());
        assert_eq!(state.phase(), SessionPhase::Closed);
        assert!(!state.begin_close(CloseTrigger::CloseCommand));
    }

    #[test]
    fn concurrent_triggers_have_one_winner() {
        let triggers = [
            CloseTrigger::CloseCommand,
            CloseTrigger::Interrupt,
            CloseTrigger::RemoteClose,
            CloseTrigger::Timeout,
            CloseTrigger::ConsoleClosed,
            CloseTrigger::ConnectionLost,
            CloseTrigger::ProtocolViolation,
            CloseTrigger::WriteFailed,
        ];
        for _ in 0..100 {
            let state = Arc::new(SessionState::new());
            let winners = Arc::new(AtomicUsize::new(0));
            let threads: Vec<_> = triggers
                .iter()
                .map(|&trigger| {
                    let state = state.clone();
                    let winners = winners.clone();
                    std::thread::spawn(move || {
                        if state.begin_close(trigger) {
                            let _ = winners.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for t in threads {
                t.join().unwrap();
            }
            assert_eq!(winners.load(Ordering::SeqCst), 1);
        }
    }
}
