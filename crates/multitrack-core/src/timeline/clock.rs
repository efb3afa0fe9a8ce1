//! Shared sample clock

use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonic playback position in frames.
///
/// Advanced once per audio callback by the stream; set explicitly by seek
/// and stop from the control thread.
#[derive(Debug, Default)]
pub struct Clock {
    position: AtomicI64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `frames`
    #[inline]
    pub fn advance(&self, frames: i64) {
        self.position.fetch_add(frames, Ordering::AcqRel);
    }

    /// Current position in frames
    #[inline]
    pub fn position(&self) -> i64 {
        self.position.load(Ordering::Acquire)
    }

    pub fn set_position(&self, position: i64) {
        self.position.store(position, Ordering::Release);
    }

    pub fn reset(&self) {
        self.set_position(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_advance_and_reset() {
        let clock = Clock::new();
        clock.advance(256);
        clock.advance(256);
        assert_eq!(clock.position(), 512);
        clock.set_position(48000);
        assert_eq!(clock.position(), 48000);
        clock.reset();
        assert_eq!(clock.position(), 0);
    }

    #[test]
    fn test_concurrent_advance() {
        let clock = Arc::new(Clock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        clock.advance(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(clock.position(), 4000);
    }
}
