//! Per-query deadline enforcement for server mode (spec §4.10).
//!
//! The MySQL driver has no built-in way to cancel an in-flight query from
//! the calling thread; the server keeps executing it even after the client
//! gives up. A watchdog thread races the query against the deadline and, if
//! the deadline wins, sends `KILL QUERY <connection_id>` on a fresh
//! connection so the server-side work actually stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mysql::prelude::Queryable;
use tracing::warn;

use crate::error::{Result, StorageError};
use crate::server::pool::{connect_unpooled, ServerParams, ServerPool};

/// Runs `f` against a dedicated pooled connection, killing the query
/// server-side if it runs past `timeout`.
///
/// `timeout == Duration::ZERO` disables the watchdog: `f` runs on a plain
/// pooled connection with no deadline tracking, matching
/// `EngineConfig::watchdog_enabled() == false`.
pub fn run_with_deadline<T>(
    pool: &ServerPool,
    timeout: Duration,
    f: impl FnOnce(&mut mysql::PooledConn) -> Result<T>,
) -> Result<T> {
    if timeout.is_zero() {
        let mut conn = pool.get()?;
        return f(&mut conn);
    }

    let mut conn = pool.get()?;
    let connection_id = ServerPool::connection_id(&mut conn)?;
    let killed = Arc::new(AtomicBool::new(false));

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let params = pool.params().clone();
    let killed_for_watchdog = Arc::clone(&killed);

    let watchdog = thread::spawn(move || {
        match done_rx.recv_timeout(timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                // The query finished (or errored) before the deadline.
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(connection_id, ?timeout, "query exceeded deadline, sending KILL QUERY");
                killed_for_watchdog.store(true, Ordering::SeqCst);
                if let Err(e) = send_kill_query(&params, connection_id) {
                    warn!(error = %e, connection_id, "failed to send KILL QUERY");
                }
            }
        }
    });

    let result = f(&mut conn);
    let _ = done_tx.send(());
    let _ = watchdog.join();

    match result {
        Err(_) if killed.load(Ordering::SeqCst) => Err(StorageError::DeadlineExceeded),
        other => other,
    }
}

/// Sends `KILL QUERY` on a fresh, unpooled connection so the kill itself
/// can't be starved by the same pool exhaustion that might be causing the
/// slow query.
fn send_kill_query(params: &ServerParams, connection_id: u64) -> Result<()> {
    let mut conn = connect_unpooled(params)?;
    conn.query_drop(format!("KILL QUERY {connection_id}"))
        .map_err(|e| StorageError::Connection(format!("KILL QUERY failed: {e}")))
}
