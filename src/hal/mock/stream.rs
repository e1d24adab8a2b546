use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::hal::error::PropertyError;
use crate::hal::traits::{FormatListener, HardwareStream, ListenerId};
use crate::hal::types::{FormatDescriptor, StreamId};

/// How the simulated driver reacts to one `set_physical_format` call
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Apply the requested format on the dispatch thread, then notify
    Apply,
    /// Apply an intermediate format first (with its own notification),
    /// then the requested one
    ApplyInSteps(FormatDescriptor),
    /// Apply a different format than requested
    Substitute(FormatDescriptor),
    /// Fire a notification without changing anything
    Ignore,
    /// Apply and notify synchronously from inside the set call
    ApplyInline,
    /// Refuse the request
    Reject,
}

enum Command {
    Apply(FormatDescriptor),
    Notify,
    Flush(Sender<()>),
    Shutdown,
}

struct StreamState {
    current: FormatDescriptor,
    available: Vec<FormatDescriptor>,
    script: VecDeque<Behavior>,
    default_behavior: Behavior,
    readbacks_left: Option<usize>,
    set_calls: Vec<FormatDescriptor>,
}

struct Shared {
    state: Mutex<StreamState>,
    listeners: Mutex<HashMap<ListenerId, FormatListener>>,
    latency: Mutex<Duration>,
    next_listener: AtomicU64,
    subscribe_fails: AtomicBool,
    unsubscribe_fails: AtomicBool,
    subscribes: AtomicUsize,
    unsubscribes: AtomicUsize,
    notifications: AtomicUsize,
}

impl Shared {
    fn apply(&self, format: FormatDescriptor) {
        self.state.lock().current = format;
        self.fire();
    }

    fn fire(&self) {
        // Callbacks run without the table lock held.
        let listeners: Vec<FormatListener> = self.listeners.lock().values().cloned().collect();
        self.notifications.fetch_add(1, Ordering::SeqCst);
        for listener in listeners {
            listener();
        }
    }
}

/// In-memory hardware stream with its own event-dispatch thread.
///
/// Format changes requested through [`HardwareStream::set_physical_format`]
/// are queued to the dispatch thread, applied after the configured latency
/// and announced to every installed listener from that thread.
pub struct SimulatedStream {
    id: StreamId,
    shared: Arc<Shared>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedStream {
    pub fn new(id: StreamId, initial: FormatDescriptor) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(StreamState {
                current: initial,
                available: vec![initial],
                script: VecDeque::new(),
                default_behavior: Behavior::Apply,
                readbacks_left: None,
                set_calls: Vec::new(),
            }),
            listeners: Mutex::new(HashMap::new()),
            latency: Mutex::new(Duration::ZERO),
            next_listener: AtomicU64::new(1),
            subscribe_fails: AtomicBool::new(false),
            unsubscribe_fails: AtomicBool::new(false),
            subscribes: AtomicUsize::new(0),
            unsubscribes: AtomicUsize::new(0),
            notifications: AtomicUsize::new(0),
        });

        let (commands, rx) = unbounded();
        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("sim-stream-{}", id.0))
                .spawn(move || dispatch_loop(shared, rx))
                .ok()
        };

        Self {
            id,
            shared,
            commands,
            worker,
        }
    }

    pub fn with_available(self, formats: Vec<FormatDescriptor>) -> Self {
        self.shared.state.lock().available = formats;
        self
    }

    /// Delay between a queued change and its notification
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.shared.latency.lock() = latency;
        self
    }

    /// Behaviors consumed one per set call before the default applies
    pub fn with_script(self, script: Vec<Behavior>) -> Self {
        self.shared.state.lock().script = script.into();
        self
    }

    pub fn with_default_behavior(self, behavior: Behavior) -> Self {
        self.shared.state.lock().default_behavior = behavior;
        self
    }

    /// Allow `count` successful readbacks, then fail every later one
    pub fn fail_readback_after(self, count: usize) -> Self {
        self.shared.state.lock().readbacks_left = Some(count);
        self
    }

    /// Refuse every `add_format_listener` call
    pub fn fail_subscribe(self) -> Self {
        self.shared.subscribe_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Count `remove_format_listener` calls but keep the listener and fail
    pub fn fail_unsubscribe(self) -> Self {
        self.shared.unsubscribe_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Active format without counting as a readback
    pub fn current_format(&self) -> FormatDescriptor {
        self.shared.state.lock().current
    }

    /// Every format passed to `set_physical_format`, in order
    pub fn set_calls(&self) -> Vec<FormatDescriptor> {
        self.shared.state.lock().set_calls.clone()
    }

    pub fn subscribe_count(&self) -> usize {
        self.shared.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.shared.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    pub fn notification_count(&self) -> usize {
        self.shared.notifications.load(Ordering::SeqCst)
    }

    /// Block until every queued hardware event has been dispatched
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = bounded(1);
        if self.commands.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    fn queue(&self, command: Command) -> Result<(), PropertyError> {
        self.commands
            .send(command)
            .map_err(|e| PropertyError::Backend(format!("dispatch thread gone: {}", e)))
    }
}

fn dispatch_loop(shared: Arc<Shared>, rx: Receiver<Command>) {
    for command in rx {
        match command {
            Command::Apply(format) => {
                let latency = *shared.latency.lock();
                if !latency.is_zero() {
                    thread::sleep(latency);
                }
                shared.apply(format);
            }
            Command::Notify => {
                let latency = *shared.latency.lock();
                if !latency.is_zero() {
                    thread::sleep(latency);
                }
                shared.fire();
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
            Command::Shutdown => break,
        }
    }
}

impl HardwareStream for SimulatedStream {
    fn id(&self) -> StreamId {
        self.id
    }

    fn physical_format(&self) -> Result<FormatDescriptor, PropertyError> {
        let mut state = self.shared.state.lock();
        if let Some(left) = state.readbacks_left.as_mut() {
            if *left == 0 {
                return Err(PropertyError::Backend("readback failed".to_string()));
            }
            *left -= 1;
        }
        Ok(state.current)
    }

    fn set_physical_format(&self, format: &FormatDescriptor) -> Result<(), PropertyError> {
        let behavior = {
            let mut state = self.shared.state.lock();
            state.set_calls.push(*format);
            match state.script.pop_front() {
                Some(behavior) => behavior,
                None => state.default_behavior.clone(),
            }
        };

        match behavior {
            Behavior::Apply => self.queue(Command::Apply(*format)),
            Behavior::ApplyInSteps(intermediate) => {
                self.queue(Command::Apply(intermediate))?;
                self.queue(Command::Apply(*format))
            }
            Behavior::Substitute(other) => self.queue(Command::Apply(other)),
            Behavior::Ignore => self.queue(Command::Notify),
            Behavior::ApplyInline => {
                self.shared.apply(*format);
                Ok(())
            }
            Behavior::Reject => Err(PropertyError::Rejected {
                status: -50,
                reason: "format not accepted".to_string(),
            }),
        }
    }

    fn available_physical_formats(&self) -> Result<Vec<FormatDescriptor>, PropertyError> {
        Ok(self.shared.state.lock().available.clone())
    }

    fn add_format_listener(&self, listener: FormatListener) -> Result<ListenerId, PropertyError> {
        if self.shared.subscribe_fails.load(Ordering::SeqCst) {
            return Err(PropertyError::Unsupported);
        }
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::SeqCst));
        self.shared.listeners.lock().insert(id, listener);
        self.shared.subscribes.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn remove_format_listener(&self, id: ListenerId) -> Result<(), PropertyError> {
        self.shared.unsubscribes.fetch_add(1, Ordering::SeqCst);
        if self.shared.unsubscribe_fails.load(Ordering::SeqCst) {
            return Err(PropertyError::Backend(format!("cannot remove {}", id)));
        }
        match self.shared.listeners.lock().remove(&id) {
            Some(_) => Ok(()),
            None => Err(PropertyError::Backend(format!("unknown {}", id))),
        }
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
