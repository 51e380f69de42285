//! Step-event sources: who tells the profiler "a statement is about to run"
//!
//! Rust has no runtime hook that fires before every statement, so lineprof uses
//! checkpoint instrumentation instead: the [`step!`](crate::step!) macro placed
//! in front of a statement reports its `file!()`/`line!()` to the process-wide
//! [`CheckpointSource`]. A session registers one callback for one execution
//! context (the thread that opened the scope); checkpoints hit on any other
//! thread, or while nothing is registered, are ignored.
//!
//! Each checkpoint also carries the path of the function it sits in, so a
//! session can tell the traced function's own statements from those of the
//! functions it calls.
//!
//! Embedders that own their own execution engine (an interpreter, a VM) can
//! drive a session through [`LocalStepSource`] or their own [`StepSource`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::Mutex;

use crate::error::{ProfileError, Result};
use crate::location::LineId;

/// The execution context a traced scope runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(ThreadId);

impl ContextId {
    /// Context of the calling thread
    pub fn current() -> Self {
        Self(std::thread::current().id())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Callback invoked before each statement in the registered context
///
/// The second argument is the path of the enclosing function, when the step
/// source knows it.
pub type StepCallback = Arc<dyn Fn(&LineId, Option<&'static str>) + Send + Sync>;

/// Path of the function a marker fn item is declared in
///
/// `marker` must be a zero-argument fn item named `__lineprof_here`, declared
/// inside the function of interest, as the [`step!`](crate::step!) and
/// [`profile_scope!`](crate::profile_scope!) macros do. Closures show up as
/// `{{closure}}` segments of the enclosing function's path.
#[doc(hidden)]
pub fn function_path<F: Fn()>(_marker: F) -> &'static str {
    let name = std::any::type_name::<F>();
    name.strip_suffix("::__lineprof_here").unwrap_or(name)
}

/// Delivers step notifications for one registered execution context
pub trait StepSource: Send + Sync {
    /// Start delivering steps from `context` to `callback`
    ///
    /// Fails with [`ProfileError::SourceBusy`] while another registration is held.
    fn register(&self, context: ContextId, callback: StepCallback) -> Result<()>;

    /// Stop delivering steps for `context`
    fn deregister(&self, context: ContextId);
}

struct Registration {
    context: ContextId,
    callback: StepCallback,
}

/// A single registration target shared by everything that reports steps into it
struct RegistrationSlot {
    // Fast path for checkpoints hit while no scope is being traced
    armed: AtomicBool,
    current: Mutex<Option<Registration>>,
}

impl RegistrationSlot {
    const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    fn register(&self, context: ContextId, callback: StepCallback) -> Result<()> {
        let mut current = self.current.lock();
        if let Some(existing) = current.as_ref() {
            return Err(ProfileError::SourceBusy {
                context: existing.context,
            });
        }
        *current = Some(Registration { context, callback });
        self.armed.store(true, Ordering::Release);
        tracing::debug!("Step callback registered for {}", context);
        Ok(())
    }

    fn deregister(&self, context: ContextId) {
        let mut current = self.current.lock();
        match current.as_ref() {
            Some(existing) if existing.context == context => {
                *current = None;
                self.armed.store(false, Ordering::Release);
                tracing::debug!("Step callback deregistered for {}", context);
            }
            Some(existing) => {
                tracing::warn!(
                    "Ignoring deregistration for {}: slot held by {}",
                    context,
                    existing.context
                );
            }
            None => {}
        }
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    fn dispatch(&self, id: &LineId, function: Option<&'static str>) {
        if !self.is_armed() {
            return;
        }
        let callback = {
            let current = self.current.lock();
            match current.as_ref() {
                Some(reg) if reg.context == ContextId::current() => Arc::clone(&reg.callback),
                _ => return,
            }
        };
        // The slot lock is released so the callback may take its own locks.
        callback(id, function);
    }
}

static CHECKPOINTS: RegistrationSlot = RegistrationSlot::new();

/// Report that the statement at `id` is about to run
///
/// This is what [`step!`](crate::step!) expands to. It costs one atomic load
/// when no scope is being traced.
#[inline]
pub fn checkpoint(id: &LineId) {
    CHECKPOINTS.dispatch(id, None);
}

/// Like [`checkpoint`], tagging the step with the function `marker` lives in
///
/// See [`function_path`] for what `marker` must be. The path is only computed
/// while a scope is being traced.
#[doc(hidden)]
#[inline]
pub fn checkpoint_at<F: Fn()>(id: &LineId, marker: F) {
    if CHECKPOINTS.is_armed() {
        CHECKPOINTS.dispatch(id, Some(function_path(marker)));
    }
}

/// Whether a traced scope currently holds the process-wide checkpoint slot
pub fn checkpoints_armed() -> bool {
    CHECKPOINTS.is_armed()
}

/// The process-wide step source fed by [`checkpoint`] and `step!()`
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckpointSource;

impl StepSource for CheckpointSource {
    fn register(&self, context: ContextId, callback: StepCallback) -> Result<()> {
        CHECKPOINTS.register(context, callback)
    }

    fn deregister(&self, context: ContextId) {
        CHECKPOINTS.deregister(context);
    }
}

/// A step source with its own registration slot, driven by [`LocalStepSource::step`]
pub struct LocalStepSource {
    slot: RegistrationSlot,
}

impl Default for LocalStepSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStepSource {
    pub fn new() -> Self {
        Self {
            slot: RegistrationSlot::new(),
        }
    }

    /// Report a step from the calling thread
    pub fn step(&self, id: &LineId) {
        self.slot.dispatch(id, None);
    }

    /// Report a step from the calling thread inside function `function`
    pub fn step_in(&self, id: &LineId, function: &'static str) {
        self.slot.dispatch(id, Some(function));
    }

    pub fn is_registered(&self) -> bool {
        self.slot.is_armed()
    }
}

impl StepSource for LocalStepSource {
    fn register(&self, context: ContextId, callback: StepCallback) -> Result<()> {
        self.slot.register(context, callback)
    }

    fn deregister(&self, context: ContextId) {
        self.slot.deregister(context);
    }
}

impl fmt::Debug for LocalStepSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStepSource")
            .field("registered", &self.is_registered())
            .finish_non_exhaustive()
    }
}
