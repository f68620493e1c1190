//! Process-wide host integration test
//!
//! The process host owns global hook slots and the std panic hook, so the
//! whole lifecycle runs inside a single test in its own binary.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use faultlog::testing::TestEnvironment;
use faultlog::{fault, fault_assert, AssertionFailed, SeverityCode, ShutdownOutcome};

#[test]
fn test_process_host_lifecycle() {
    let env = TestEnvironment::new().unwrap();

    // Application hook installed before registration
    let app_hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = app_hook_calls.clone();
    panic::set_hook(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let guard = faultlog::register_all_with(env.config().unwrap()).unwrap();

    // Runtime faults
    assert!(faultlog::raise(SeverityCode::WARNING, "disk nearly full", file!(), line!()));
    assert!(fault!(SeverityCode::DEPRECATED, "v{} endpoint called", 1));
    assert!(!fault!(SeverityCode::RECOVERABLE_ERROR, "bad cast"));
    assert_eq!(env.count_records("other.txt"), 2);
    assert_eq!(env.count_records("deprecated.txt"), 1);
    assert!(env
        .read_log("deprecated.txt")
        .unwrap()
        .contains("Error: v1 endpoint called\n"));

    // A panic is logged as an uncaught exception, then the earlier hook runs
    let result = panic::catch_unwind(|| panic!("worker crashed"));
    assert!(result.is_err());
    assert_eq!(app_hook_calls.load(Ordering::SeqCst), 1);
    let exceptions = env.read_log("exception.txt").unwrap();
    assert!(exceptions.contains("Message:   worker crashed\n"));
    assert!(exceptions.contains("Exception: panic"));

    // A failed assertion carries a typed payload
    let value = 2;
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        fault_assert!(value + 1 == 4);
    }));
    let payload = result.unwrap_err();
    let failed = payload.downcast_ref::<AssertionFailed>().unwrap();
    assert_eq!(failed.code, "value + 1 == 4");
    assert!(failed.file.ends_with("process_host_test.rs"));

    let exceptions = env.read_log("exception.txt").unwrap();
    assert_eq!(env.count_records("exception.txt"), 2);
    assert!(exceptions.contains("Exception: AssertionFailed\n"));
    assert!(exceptions.contains("Message:   Assertion Failed - Code[ value + 1 == 4 ]\n"));

    // A passing assertion is silent
    fault_assert!(value == 2);
    assert_eq!(env.count_records("exception.txt"), 2);

    // Fatal fault captured at shutdown
    faultlog::raise_fatal("out of memory", "alloc.rs", 88);
    let outcome = guard.run();
    assert!(matches!(
        outcome,
        Some(ShutdownOutcome::Captured { write, .. }) if write.is_written()
    ));

    let dump = env.read_log("fatal_error.txt").unwrap();
    assert!(dump.contains("Type: 1 (Error)\n"));
    assert!(dump.contains("Message: out of memory\n"));
    assert!(!dump.contains("  PATH: "));
    assert_eq!(env.count_records("fatal_error.txt"), 1);

    // The registered process hook finds the capture already done
    faultlog::ProcessHost.run_shutdown_hooks();
    assert_eq!(env.count_records("fatal_error.txt"), 1);
}
