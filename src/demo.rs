//! Built-in workloads for the `lineprof` binary
//!
//! Each scenario opens a traced scope on the given session and runs a few
//! instrumented statements. They double as end-to-end fixtures for the CLI
//! tests, so their statements are kept stable.

use std::hint::black_box;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::ValueEnum;

use crate::session::Session;
use crate::step;

/// Which workload to profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Three cheap assignments
    Arith,
    /// A single sleep
    Sleep,
    /// A summing loop with a repeated body line
    Loop,
    /// One no-op checkpoint
    Empty,
    /// A scope with no checkpoints at all
    #[value(name = "none")]
    NoSteps,
    /// Panics inside the scope; the panic is caught outside it
    Panic,
    /// Returns an error out of the scope
    Error,
}

/// Tunables for the workloads
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub sleep: Duration,
    pub iterations: u64,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            sleep: Duration::from_millis(50),
            iterations: 1000,
        }
    }
}

/// Run `scenario` under `session`
pub fn run_scenario(session: &Session, scenario: Scenario, options: &DemoOptions) -> Result<()> {
    tracing::debug!("Running scenario {:?}", scenario);
    match scenario {
        Scenario::Arith => {
            let z = arith(session)?;
            tracing::debug!("arith result {}", z);
        }
        Scenario::Sleep => sleep(session, options.sleep)?,
        Scenario::Loop => {
            let total = summing_loop(session, options.iterations)?;
            tracing::debug!("loop total {}", total);
        }
        Scenario::Empty => empty(session)?,
        Scenario::NoSteps => no_checkpoints(session)?,
        Scenario::Panic => {
            let caught =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| panicking(session)));
            if caught.is_err() {
                println!("CAUGHT");
            }
        }
        Scenario::Error => failing(session)?,
    }
    Ok(())
}

fn arith(session: &Session) -> Result<i64> {
    let _scope = session.enter()?;
    step!(let x: i64 = black_box(1));
    step!(let y: i64 = black_box(2));
    step!(let z = x + y);
    Ok(z)
}

fn sleep(session: &Session, pause: Duration) -> Result<()> {
    let _scope = session.enter()?;
    step!(std::thread::sleep(pause));
    Ok(())
}

fn summing_loop(session: &Session, iterations: u64) -> Result<u64> {
    let _scope = session.enter()?;
    step!(let mut total: u64 = 0);
    for i in 0..iterations {
        step!(total = total.wrapping_add(black_box(i * i)));
    }
    step!(let total = black_box(total));
    Ok(total)
}

fn empty(session: &Session) -> Result<()> {
    let _scope = session.enter()?;
    step!();
    Ok(())
}

fn no_checkpoints(session: &Session) -> Result<()> {
    let _scope = session.enter()?;
    Ok(())
}

fn panicking(session: &Session) {
    let _scope = match session.enter() {
        Ok(scope) => scope,
        Err(e) => panic!("cannot enter scope: {}", e),
    };
    step!(let x = black_box(1));
    step!(if x == 1 { panic!("scenario panic") });
}

fn failing(session: &Session) -> Result<()> {
    let _scope = session.enter()?;
    step!(let x = black_box(1));
    step!(if x == 1 { bail!("scenario failed after x = {}", x) });
    Ok(())
}
