//! Port acquisition against real sockets.

mod common;

use std::net::TcpListener;

use common::hold_consecutive;
use notebook_server::net::{acquire, BindError};

#[test]
fn busy_sequential_run_falls_back_to_random_range() {
    let (preferred, _held) = hold_consecutive(5);

    let listener = acquire(preferred, "127.0.0.1", 50).unwrap();
    let port = listener.port();

    assert!(!(preferred..preferred + 5).contains(&port));
    let distance = (i32::from(port) - i32::from(preferred)).abs();
    assert!(distance <= 100, "port {port} is {distance} away from {preferred}");
}

#[test]
fn exhausted_candidates_report_no_available_port() {
    // One random draw spans preferred-2..=preferred+2; hold that plus the run.
    let (base, held) = hold_consecutive(7);
    let preferred = base + 2;

    let err = acquire(preferred, "127.0.0.1", 1).unwrap_err();
    assert!(matches!(err, BindError::NoAvailablePort { attempts: 6, .. }));
    assert!(err.to_string().starts_with("no available port"));

    // Nothing was left bound by the failed search.
    drop(held);
    for port in base..base + 7 {
        TcpListener::bind(("127.0.0.1", port)).unwrap();
    }
}

#[test]
fn free_preferred_port_is_used() {
    let (preferred, held) = hold_consecutive(1);
    drop(held);

    let listener = acquire(preferred, "127.0.0.1", 50).unwrap();
    assert_eq!(listener.port(), preferred);
    assert_eq!(listener.local_addr().unwrap().port(), preferred);
}
