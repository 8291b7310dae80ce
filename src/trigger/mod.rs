//! Capture triggers: record button and interval timer
//!
//! Two independent event sources drive the capture loop: a physical key
//! acting as the record button (read via evdev from /dev/input/event*)
//! and a fixed interval timer for continuous monitoring. Both feed a
//! capacity-1 channel; a trigger firing while a capture/upload cycle is
//! in flight is dropped, never queued.
//!
//! # Requirements
//! - User must be in the `input` group for the button:
//!   `sudo usermod -aG input $USER`, then log out and back in.

pub mod button;
pub mod timer;

pub use button::ButtonMonitor;
pub use timer::spawn_interval_timer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// The event that starts one capture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Record button pressed.
    Button,
    /// Continuous-monitoring interval elapsed.
    Timer,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Button => "button",
            Trigger::Timer => "timer",
        }
    }
}

/// Shared debounce state for the button, usable from every device monitor.
pub struct DebounceState {
    /// Timestamp of last trigger in milliseconds since start
    last_trigger_ms: AtomicU64,
    /// Start time for calculating elapsed time
    start: Instant,
    /// Minimum gap between accepted presses
    debounce_ms: u64,
}

impl DebounceState {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            last_trigger_ms: AtomicU64::new(0),
            start: Instant::now(),
            debounce_ms,
        }
    }

    /// Check if we should trigger and update the last trigger time.
    /// Returns true if trigger should proceed (not debounced).
    pub fn should_trigger(&self) -> bool {
        // Clamp so a press right after startup is not debounced against 0.
        let now_ms = (self.start.elapsed().as_millis() as u64).max(self.debounce_ms);
        let last = self.last_trigger_ms.load(Ordering::SeqCst);

        if now_ms.saturating_sub(last) >= self.debounce_ms {
            // Claim this trigger - only proceed if we win the CAS
            match self.last_trigger_ms.compare_exchange(
                last,
                now_ms,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => true,
                Err(_) => {
                    log::trace!("Button debounce: another device won the race");
                    false
                }
            }
        } else {
            log::trace!(
                "Button debounced ({}ms since last trigger)",
                now_ms.saturating_sub(last)
            );
            false
        }
    }
}
