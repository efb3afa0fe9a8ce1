//! Play/pause/stop/record state machine

use std::sync::atomic::{AtomicU8, Ordering};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransportState {
    #[default]
    Stopped = 0,
    Playing = 1,
    Paused = 2,
    Recording = 3,
}

impl TransportState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => TransportState::Playing,
            2 => TransportState::Paused,
            3 => TransportState::Recording,
            _ => TransportState::Stopped,
        }
    }

    /// Whether the callback should render and advance the clock
    pub fn is_rolling(self) -> bool {
        matches!(self, TransportState::Playing | TransportState::Recording)
    }
}

/// Lock-free transport, read by the audio callback every block
#[derive(Debug, Default)]
pub struct Transport {
    state: AtomicU8,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter Playing from any state
    pub fn play(&self) {
        self.state.store(TransportState::Playing as u8, Ordering::Release);
    }

    /// Enter Paused, only from Playing or Recording.
    ///
    /// Returns whether the state changed.
    pub fn pause(&self) -> bool {
        for from in [TransportState::Playing, TransportState::Recording] {
            if self
                .state
                .compare_exchange(
                    from as u8,
                    TransportState::Paused as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return true;
            }
        }
        false
    }

    pub fn stop(&self) {
        self.state.store(TransportState::Stopped as u8, Ordering::Release);
    }

    /// Enter Recording. Only the state is tracked; nothing is captured.
    pub fn record(&self) {
        self.state.store(TransportState::Recording as u8, Ordering::Release);
    }

    #[inline]
    pub fn state(&self) -> TransportState {
        TransportState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state().is_rolling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let transport = Transport::new();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert!(!transport.is_playing());
    }

    #[test]
    fn test_pause_requires_rolling() {
        let transport = Transport::new();
        assert!(!transport.pause());
        assert_eq!(transport.state(), TransportState::Stopped);

        transport.play();
        assert!(transport.is_playing());
        assert!(transport.pause());
        assert_eq!(transport.state(), TransportState::Paused);
        assert!(!transport.is_playing());

        // Pausing twice is a no-op
        assert!(!transport.pause());
        assert_eq!(transport.state(), TransportState::Paused);
    }

    #[test]
    fn test_record_counts_as_playing() {
        let transport = Transport::new();
        transport.record();
        assert!(transport.is_playing());
        assert!(transport.pause());
        assert_eq!(transport.state(), TransportState::Paused);
    }

    #[test]
    fn test_play_is_unconditional() {
        let transport = Transport::new();
        transport.record();
        transport.play();
        assert_eq!(transport.state(), TransportState::Playing);
        transport.stop();
        transport.play();
        assert_eq!(transport.state(), TransportState::Playing);
    }
}
