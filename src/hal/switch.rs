//! Synchronous physical-format switch.
//!
//! The mutation request is asynchronous and not atomic on real drivers,
//! so the switch subscribes to change notifications, issues the request,
//! and re-reads the stream on every wake until the target is active or an
//! absolute deadline passes. On failure the previous format is requested
//! again without waiting for confirmation.
//!
//! Callers must serialize switches on the same stream. Sessions on
//! different streams share nothing.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::equality::{descriptors_equal, EqualityMode};
use super::traits::{HardwareStream, ListenerId};
use super::types::FormatDescriptor;

pub const DEFAULT_SWITCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a switch did not commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The active format could not be read before switching
    CaptureFailed,
    /// The change notification could not be installed
    SubscribeFailed,
    /// Reading back the format failed while polling
    ReadbackFailed,
    /// The target was not reached before the deadline
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Committed,
    Aborted(AbortReason),
}

impl SwitchOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SwitchOutcome::Committed)
    }
}

/// Wait primitive shared between the poll loop and the notification
/// callback. Each notification bumps the sequence number.
#[derive(Default)]
struct ChangeSignal {
    seq: Mutex<u64>,
    cond: Condvar,
}

impl ChangeSignal {
    fn notify(&self) {
        let mut seq = self.seq.lock();
        *seq = seq.wrapping_add(1);
        self.cond.notify_all();
    }

    fn current(&self) -> u64 {
        *self.seq.lock()
    }

    /// Block until the sequence moves past `seen` or `deadline` passes.
    /// Returns the new sequence number, `None` on timeout.
    fn wait_past(&self, seen: u64, deadline: Instant) -> Option<u64> {
        let mut seq = self.seq.lock();
        while *seq == seen {
            if self.cond.wait_until(&mut seq, deadline).timed_out() && *seq == seen {
                return None;
            }
        }
        Some(*seq)
    }
}

/// Installed change-notification subscription; removed on drop
struct Subscription<'a> {
    stream: &'a dyn HardwareStream,
    id: ListenerId,
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.stream.remove_format_listener(self.id) {
            warn!(stream = %self.stream.id(), error = %e, "can't remove property listener");
        }
    }
}

/// One in-flight format change
struct SwitchSession<'a> {
    stream: &'a dyn HardwareStream,
    target: FormatDescriptor,
    previous: FormatDescriptor,
    signal: Arc<ChangeSignal>,
}

impl SwitchSession<'_> {
    fn run(&self, timeout: Duration) -> SwitchOutcome {
        let stream_id = self.stream.id();

        // Snapshot before the mutation so a notification racing the
        // first readback still wakes the loop.
        let mut seen = self.signal.current();
        let deadline = Instant::now() + timeout;

        if let Err(e) = self.stream.set_physical_format(&self.target) {
            warn!(stream = %stream_id, error = %e, "error changing physical format");
        }

        loop {
            let actual = match self.stream.physical_format() {
                Ok(format) => format,
                Err(e) => {
                    warn!(stream = %stream_id, error = %e, "could not retrieve physical format");
                    return SwitchOutcome::Aborted(AbortReason::ReadbackFailed);
                }
            };

            if descriptors_equal(&self.target, &actual, EqualityMode::StrictNonMixable) {
                debug!(stream = %stream_id, format = %actual, "actual format in use");
                return SwitchOutcome::Committed;
            }

            if Instant::now() >= deadline {
                debug!(stream = %stream_id, format = %actual, "reached timeout");
                return SwitchOutcome::Aborted(AbortReason::TimedOut);
            }

            match self.signal.wait_past(seen, deadline) {
                Some(seq) => seen = seq,
                None => {
                    debug!(stream = %stream_id, format = %actual, "reached timeout");
                    return SwitchOutcome::Aborted(AbortReason::TimedOut);
                }
            }
        }
    }

    fn roll_back(&self) {
        if let Err(e) = self.stream.set_physical_format(&self.previous) {
            warn!(stream = %self.stream.id(), error = %e, "error restoring physical format");
        }
    }
}

/// Drives the synchronous switch protocol with a fixed timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSwitcher {
    timeout: Duration,
}

impl Default for FormatSwitcher {
    fn default() -> Self {
        Self::new(DEFAULT_SWITCH_TIMEOUT)
    }
}

impl FormatSwitcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Switch `stream` to `target` and wait for the hardware to confirm.
    ///
    /// Exactly one listener is installed and removed once the previous
    /// format has been captured, whatever the outcome.
    pub fn switch(&self, stream: &dyn HardwareStream, target: &FormatDescriptor) -> SwitchOutcome {
        let stream_id = stream.id();
        info!(stream = %stream_id, format = %target, "setting stream physical format");

        let previous = match stream.physical_format() {
            Ok(format) => format,
            Err(e) => {
                warn!(stream = %stream_id, error = %e, "can't get current physical format");
                return SwitchOutcome::Aborted(AbortReason::CaptureFailed);
            }
        };
        debug!(stream = %stream_id, format = %previous, "format in use before switching");

        let signal = Arc::new(ChangeSignal::default());
        let listener = {
            let signal = Arc::clone(&signal);
            Arc::new(move || signal.notify())
        };
        let subscription = match stream.add_format_listener(listener) {
            Ok(id) => Subscription { stream, id },
            Err(e) => {
                warn!(stream = %stream_id, error = %e, "can't add property listener during format change");
                return SwitchOutcome::Aborted(AbortReason::SubscribeFailed);
            }
        };

        let session = SwitchSession {
            stream,
            target: *target,
            previous,
            signal,
        };

        let outcome = session.run(self.timeout);
        if !outcome.is_committed() {
            warn!(stream = %stream_id, ?outcome, "changing physical format failed");
            session.roll_back();
        }

        drop(subscription);
        outcome
    }
}

/// Switch with the default two second deadline. Returns whether the
/// hardware confirmed the target format.
pub fn switch_physical_format(stream: &dyn HardwareStream, target: &FormatDescriptor) -> bool {
    FormatSwitcher::default().switch(stream, target).is_committed()
}
