//! Checkpoint and scope macros.

/// Mark the start of a statement for line profiling.
///
/// `step!()` reports the current `file!()`/`line!()` to the process-wide
/// checkpoint source. `step!(stmt)` does the same and then runs `stmt`, so
/// the report shows the statement itself on that line.
///
/// The step also records which function it sits in. Steps from functions
/// called by the traced one are ignored, so their time stays with the
/// calling line.
///
/// Outside an active traced scope this costs one atomic load.
///
/// # Examples
///
/// ```
/// use lineprof::step;
///
/// let session = lineprof::fresh();
/// let scope = session.enter().unwrap();
/// step!(let x = 1);
/// step!(let y = x + 1);
/// drop(scope);
/// # assert_eq!(y, 2);
/// ```
#[macro_export]
macro_rules! step {
    () => {{
        fn __lineprof_here() {}
        $crate::step::checkpoint_at(&$crate::LineId::new(file!(), line!()), __lineprof_here)
    }};
    ($s:stmt) => {
        $crate::step!();
        $s;
    };
}

/// Trace the rest of the enclosing block with the shared default session.
///
/// The invocation line is the entry line. The report is printed when the
/// block is left, including by `?`, `return` or a panic.
///
/// With an argument, traces with that session instead of the default one.
///
/// # Panics
///
/// Panics if the session is already active or another scope holds the step
/// source. Use [`Session::enter`](crate::Session::enter) to handle that as an error.
///
/// ```
/// use lineprof::{profile_scope, step};
///
/// fn work() -> u64 {
///     profile_scope!();
///     step!(let a: u64 = (1..100).sum());
///     step!(let b = a * 2);
///     b
/// }
/// # let _ = work();
/// ```
#[macro_export]
macro_rules! profile_scope {
    () => {
        let _lineprof_scope =
            $crate::enter_or_panic($crate::default_session(), $crate::__lineprof_call_site!());
    };
    ($session:expr) => {
        let _lineprof_scope = $crate::enter_or_panic(&$session, $crate::__lineprof_call_site!());
    };
}

/// Call site of the invocation, tagged with its enclosing function.
#[doc(hidden)]
#[macro_export]
macro_rules! __lineprof_call_site {
    () => {{
        fn __lineprof_here() {}
        $crate::CallSite::here(file!(), line!())
            .in_function($crate::step::function_path(__lineprof_here))
    }};
}
