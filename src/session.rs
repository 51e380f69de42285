//! Trace sessions: the `Idle -> Active -> Idle` state machine around one traced scope
//!
//! Entering a session resets it, registers a step callback for the calling
//! thread and hands back a [`ScopeGuard`]. Every step moves the "active line"
//! forward and charges the time since the previous step to the line that just
//! finished. Dropping the guard (normally, through `?`, or while a panic
//! unwinds) deregisters the callback, charges the final interval, prints the
//! report and returns the session to `Idle`.
//!
//! The line that opened the scope is the entry line. Time charged to it is
//! discarded, so the scope-opening statement never appears in the report.
//!
//! Only steps from the traced function (and closures inside it) are charged.
//! Steps from callees are dropped, so a call's full cost lands on the calling
//! line. When the opening call does not name its function, as with
//! [`Session::enter`], the first step in the entry file decides it.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;

use crate::color::ColorMode;
use crate::config::ProfilerConfig;
use crate::error::{ProfileError, Result};
use crate::location::{LineId, LineRegistry};
use crate::report::{self, ProfileSnapshot};
use crate::source::SourceLookup;
use crate::step::{CheckpointSource, ContextId, StepCallback, StepSource};
use crate::timing::{Clock, SystemClock, TimingAccumulator};

/// Where the report of a finished scope is written
pub type ReportWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
}

/// The statement opening a traced scope and the context it runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub context: ContextId,
    pub line: LineId,
    /// Path of the function opening the scope, if known
    pub function: Option<&'static str>,
}

impl CallSite {
    pub fn new(context: ContextId, line: LineId) -> Self {
        Self {
            context,
            line,
            function: None,
        }
    }

    /// Same call site, inside function `function`
    pub fn in_function(mut self, function: &'static str) -> Self {
        self.function = Some(function);
        self
    }

    /// Call site of the function annotated with `#[track_caller]` that calls this
    #[track_caller]
    pub fn caller() -> Self {
        Self::new(ContextId::current(), std::panic::Location::caller().into())
    }

    /// Line `line` in `file` on the calling thread
    pub fn here(file: &'static str, line: u32) -> Self {
        Self::new(ContextId::current(), LineId::new(file, line))
    }
}

#[derive(Debug)]
struct SessionState {
    phase: Phase,
    timings: TimingAccumulator,
    lines: LineRegistry,
    context: Option<ContextId>,
    entry_line: Option<LineId>,
    frame: Option<&'static str>,
    start_time: Option<Instant>,
    last_time: Option<Instant>,
    last_line: Option<LineId>,
    last_report: Option<ProfileSnapshot>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            timings: TimingAccumulator::new(),
            lines: LineRegistry::new(),
            context: None,
            entry_line: None,
            frame: None,
            start_time: None,
            last_time: None,
            last_line: None,
            last_report: None,
        }
    }

    /// Clears everything a previous scope left behind
    fn reset(&mut self) {
        self.timings.clear();
        self.lines.clear();
        self.context = None;
        self.entry_line = None;
        self.frame = None;
        self.start_time = None;
        self.last_time = None;
        self.last_line = None;
        self.last_report = None;
    }

    /// Charge `now - last_time` to the line active since `last_time`
    fn attribute(&mut self, now: Instant, lookup: &dyn SourceLookup) {
        let (Some(line), Some(since)) = (self.last_line.as_ref(), self.last_time) else {
            return;
        };
        if self.entry_line.as_ref() == Some(line) {
            return;
        }
        self.timings.add(line, now.saturating_duration_since(since));
        self.lines.ensure(line, lookup);
    }

    /// Whether a step in `function` belongs to the traced function
    ///
    /// Adopts the first function seen when the entry did not name one.
    fn in_frame(&mut self, function: Option<&'static str>) -> bool {
        let Some(function) = function else {
            return true;
        };
        match self.frame {
            Some(frame) => function
                .strip_prefix(frame)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::{{closure}}")),
            None => {
                let frame = enclosing_function(function);
                tracing::debug!("Traced function is {}", frame);
                self.frame = Some(frame);
                true
            }
        }
    }
}

/// `function` without trailing closure segments
fn enclosing_function(function: &'static str) -> &'static str {
    let mut base = function;
    while let Some(outer) = base.strip_suffix("::{{closure}}") {
        base = outer;
    }
    base
}

struct SessionInner {
    state: Mutex<SessionState>,
    steps: Arc<dyn StepSource>,
    lookup: Arc<dyn SourceLookup + Send + Sync>,
    clock: Arc<dyn Clock>,
    output: ReportWriter,
    use_color: bool,
}

impl SessionInner {
    fn on_step(&self, id: &LineId, function: Option<&'static str>) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if state.phase != Phase::Active {
            return;
        }
        // Checkpoints from other files are inside callees; their time stays
        // with the calling line.
        if let Some(entry) = state.entry_line.as_ref() {
            if !entry.same_file(id) {
                tracing::trace!("Step {} outside traced file, folded into caller", id);
                return;
            }
        }
        if !state.in_frame(function) {
            tracing::trace!("Step {} inside a callee, folded into caller", id);
            return;
        }
        tracing::trace!("Step {}", id);
        state.attribute(now, self.lookup.as_ref());
        state.last_time = Some(now);
        state.last_line = Some(id.clone());
    }
}

/// A line profiler for one traced scope at a time
///
/// Cloning a `Session` yields another handle to the same session. Use
/// [`Session::fresh`] (or [`crate::fresh`]) for an independent one.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session with the default configuration, reporting to stdout
    pub fn new() -> Self {
        Self::with_config(&ProfilerConfig::default())
    }

    pub fn with_config(config: &ProfilerConfig) -> Self {
        Self::builder()
            .color(config.color)
            .source_lookup(config.source_lookup())
            .build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// A new, independent session sharing this one's collaborators
    ///
    /// The returned session has its own timings, line registry and state; only
    /// the step source, source lookup, clock and report writer are shared.
    pub fn fresh(&self) -> Session {
        Session {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::new()),
                steps: Arc::clone(&self.inner.steps),
                lookup: Arc::clone(&self.inner.lookup),
                clock: Arc::clone(&self.inner.clock),
                output: Arc::clone(&self.inner.output),
                use_color: self.inner.use_color,
            }),
        }
    }

    /// Whether two handles refer to the same session
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().phase
    }

    pub fn is_active(&self) -> bool {
        self.phase() == Phase::Active
    }

    pub fn use_color(&self) -> bool {
        self.inner.use_color
    }

    /// Snapshot of the most recently finished scope
    pub fn last_report(&self) -> Option<ProfileSnapshot> {
        self.inner.state.lock().last_report.clone()
    }

    /// Clear all state from previous scopes
    ///
    /// Entering a scope already does this; it fails while a scope is active.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.phase == Phase::Active {
            return Err(ProfileError::AlreadyActive);
        }
        state.reset();
        tracing::debug!("Session reset");
        Ok(())
    }

    /// Start tracing the enclosing scope
    ///
    /// The caller's line becomes the entry line and the calling thread the
    /// traced context. Bind the guard to a named variable: `let _ = ...` drops
    /// it, and the scope, immediately.
    #[track_caller]
    pub fn enter(&self) -> Result<ScopeGuard> {
        self.enter_at(CallSite::caller())
    }

    /// Start tracing with an explicit entry line and context
    pub fn enter_at(&self, site: CallSite) -> Result<ScopeGuard> {
        let mut state = self.inner.state.lock();
        if state.phase == Phase::Active {
            return Err(ProfileError::AlreadyActive);
        }

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let callback: StepCallback = Arc::new(move |id: &LineId, function: Option<&'static str>| {
            if let Some(inner) = weak.upgrade() {
                inner.on_step(id, function);
            }
        });
        self.inner.steps.register(site.context, callback)?;
        state.reset();

        let now = self.inner.clock.now();
        tracing::debug!("Entering traced scope at {} on {}", site.line, site.context);
        state.context = Some(site.context);
        state.entry_line = Some(site.line.clone());
        state.frame = site.function;
        state.last_line = Some(site.line);
        state.start_time = Some(now);
        state.last_time = Some(now);
        state.phase = Phase::Active;

        Ok(ScopeGuard {
            session: self.clone(),
            finished: false,
        })
    }

    /// Finish the active scope: flush the last interval, report, go idle
    fn exit(&self) -> Result<ProfileSnapshot> {
        let snapshot = {
            let mut state = self.inner.state.lock();
            if state.phase != Phase::Active {
                return Err(ProfileError::NotActive);
            }
            if let Some(context) = state.context.take() {
                self.inner.steps.deregister(context);
            }
            let now = self.inner.clock.now();
            state.attribute(now, self.inner.lookup.as_ref());
            state.phase = Phase::Idle;

            let snapshot = ProfileSnapshot::from_parts(&state.timings, &state.lines);
            let wall = state
                .start_time
                .map(|start| now.saturating_duration_since(start))
                .unwrap_or_default();
            tracing::debug!(
                "Traced scope finished: {} lines, {:.4}s attributed, {:.4}s wall",
                snapshot.rows.len(),
                snapshot.total_seconds,
                wall.as_secs_f64()
            );
            state.last_report = Some(snapshot.clone());
            snapshot
        };

        let mut out = self.inner.output.lock();
        report::print_report(&snapshot, self.inner.use_color, &mut **out)?;
        Ok(snapshot)
    }

    /// Trace `body` as one scope and return its result unchanged
    ///
    /// An `Err` returned by `body` is passed through after the report is
    /// printed; a panic in `body` unwinds through the guard, which reports
    /// before the panic continues. Only entering can fail: a report that
    /// cannot be written is logged, and `body`'s value is still returned.
    #[track_caller]
    pub fn run<T>(&self, body: impl FnOnce() -> T) -> Result<T> {
        let guard = self.enter_at(CallSite::caller())?;
        let value = body();
        if let Err(e) = guard.finish() {
            tracing::warn!("Failed to write profile report: {}", e);
        }
        Ok(value)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.phase())
            .field("use_color", &self.inner.use_color)
            .finish_non_exhaustive()
    }
}

/// Active traced scope; the scope ends when this is dropped
#[must_use = "the traced scope ends as soon as the guard is dropped"]
pub struct ScopeGuard {
    session: Session,
    finished: bool,
}

impl ScopeGuard {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// End the scope now and return its snapshot
    pub fn finish(mut self) -> Result<ProfileSnapshot> {
        self.finished = true;
        self.session.exit()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.session.exit() {
            tracing::warn!("Failed to finish traced scope: {}", e);
        }
    }
}

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Session`] from its collaborators
pub struct SessionBuilder {
    steps: Arc<dyn StepSource>,
    lookup: Option<Arc<dyn SourceLookup + Send + Sync>>,
    clock: Arc<dyn Clock>,
    output: Option<ReportWriter>,
    color: ColorMode,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            steps: Arc::new(CheckpointSource),
            lookup: None,
            clock: Arc::new(SystemClock),
            output: None,
            color: ColorMode::Auto,
        }
    }
}

impl SessionBuilder {
    /// Step source to register with (default: the process-wide checkpoints)
    pub fn step_source(mut self, steps: Arc<dyn StepSource>) -> Self {
        self.steps = steps;
        self
    }

    pub fn source_lookup(mut self, lookup: impl SourceLookup + Send + Sync + 'static) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Write reports to `writer` instead of stdout
    pub fn output(mut self, writer: impl Write + Send + 'static) -> Self {
        self.output = Some(Arc::new(Mutex::new(Box::new(writer))));
        self
    }

    pub fn color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub fn build(self) -> Session {
        let lookup = self
            .lookup
            .unwrap_or_else(|| Arc::new(ProfilerConfig::default().source_lookup()));
        let output = self
            .output
            .unwrap_or_else(|| Arc::new(Mutex::new(Box::new(std::io::stdout()))));
        Session {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::new()),
                steps: self.steps,
                lookup,
                clock: self.clock,
                output,
                use_color: self.color.resolve(),
            }),
        }
    }
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}
