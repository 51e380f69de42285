// Shared helpers for the scope profiling integration tests

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use lineprof::{step, ColorMode, Session};
use parking_lot::Mutex;

/// In-memory report sink that can be read back after the scope ends
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A session on the process-wide checkpoints that reports into memory
pub fn captured_session(color: ColorMode) -> (Session, Captured) {
    let out = Captured::default();
    let session = Session::builder().color(color).output(out.clone()).build();
    (session, out)
}

/// Instrumented work living in another file; its steps belong to the caller
pub fn busy_helper() -> u64 {
    step!(let mut acc: u64 = 0);
    for i in 0..100u64 {
        step!(acc += i);
    }
    step!(std::thread::sleep(Duration::from_millis(5)));
    acc
}
