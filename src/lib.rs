//! lineprof - Line-by-line wall-clock profiler for scoped Rust code blocks
//!
//! A traced scope charges the wall-clock time between consecutive statements
//! to the statement that was running, then prints a report with the time and
//! share of total for every line, colored from white (cheap) to red (hot).
//!
//! Statements are marked with [`step!`], which stands in for a per-statement
//! runtime hook. Scopes are opened with [`profile_scope!`], [`Session::enter`]
//! or [`Session::run`].
//!
//! ```no_run
//! use lineprof::{profile_scope, step};
//!
//! fn main() {
//!     profile_scope!();
//!     step!(let data: Vec<u64> = (0..1_000_000).collect());
//!     step!(let sum: u64 = data.iter().sum());
//!     step!(std::thread::sleep(std::time::Duration::from_millis(50)));
//!     println!("{sum}");
//! }
//! ```
//!
//! # Sessions
//!
//! [`default_session`] is a process-wide session built on first use. Every
//! scope entry resets it, so it can be reused for any number of sequential
//! scopes. [`fresh`] builds an independent session. Only one scope may be
//! traced at a time per process, because all sessions share the checkpoint
//! registration.

pub mod cli;
pub mod color;
pub mod config;
pub mod demo;
pub mod error;
pub mod location;
mod macros;
pub mod report;
pub mod session;
pub mod source;
pub mod step;
pub mod timing;

use once_cell::sync::Lazy;

pub use color::ColorMode;
pub use config::ProfilerConfig;
pub use error::{ProfileError, Result};
pub use location::{LineId, LineRegistry};
pub use report::{ProfileSnapshot, ReportRow};
pub use session::{CallSite, Phase, ScopeGuard, Session, SessionBuilder};
pub use source::{FileSourceLookup, MemorySourceLookup, SourceLookup};
pub use step::{checkpoint, CheckpointSource, ContextId, LocalStepSource, StepSource};
pub use timing::{Clock, ManualClock, SystemClock, TimingAccumulator};

static DEFAULT_SESSION: Lazy<Session> = Lazy::new(Session::new);

/// The shared process-wide session used by [`profile_scope!`]
///
/// Built with [`ProfilerConfig::default`] on first use and reset on every
/// scope entry. Entering it while it is already active fails.
pub fn default_session() -> &'static Session {
    &DEFAULT_SESSION
}

/// A new session, independent of [`default_session`] and of every other session
pub fn fresh() -> Session {
    Session::new()
}

/// Enter `session` at `site`, panicking on integration errors
///
/// Used by [`profile_scope!`]; an error here means the scope macro was nested
/// or used while another scope holds the step source.
#[doc(hidden)]
pub fn enter_or_panic(session: &Session, site: CallSite) -> ScopeGuard {
    match session.enter_at(site) {
        Ok(guard) => guard,
        Err(e) => panic!("lineprof: cannot start traced scope: {}", e),
    }
}
