//! Background health supervisor for server mode (spec §4.10).
//!
//! Runs only in server mode. Starting a fresh server process and
//! reconnecting the pool's underlying handle is the caller's concern (this
//! crate doesn't know where the server binary lives or how it's launched);
//! the supervisor owns the probe/backoff bookkeeping and invokes a
//! caller-supplied restart closure when the backend is declared unhealthy.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::Result;
use crate::server::pool::ServerPool;

/// Tuning knobs for the supervisor loop.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub host: String,
    pub port: u16,
    pub probe_period: Duration,
    pub max_restart_count: u32,
    pub backoff: Duration,
}

impl SupervisorConfig {
    /// Defaults matching spec §4.10: 10s probe period, restart budget of 3,
    /// 60s backoff once the budget is exhausted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            probe_period: Duration::from_secs(10),
            max_restart_count: 3,
            backoff: Duration::from_secs(60),
        }
    }
}

/// Current health as of the last completed probe tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy,
    Backoff,
}

struct SharedState {
    health: Mutex<Health>,
}

fn lock_health(state: &SharedState) -> std::sync::MutexGuard<'_, Health> {
    state.health.lock().unwrap_or_else(|e| e.into_inner())
}

/// A running supervisor loop.
pub struct SupervisorHandle {
    cancel_tx: mpsc::Sender<()>,
    joined: Mutex<Option<JoinHandle<()>>>,
    state: Arc<SharedState>,
}

/// Entry point for spawning a [`SupervisorHandle`].
pub struct Supervisor;

impl Supervisor {
    /// Spawns the background health-probe loop.
    ///
    /// `restart` is invoked once per tick that the backend is found
    /// unhealthy and the restart budget isn't exhausted; it should start a
    /// fresh server process and reconnect `pool`'s underlying handle.
    pub fn spawn(
        pool: Arc<ServerPool>,
        config: SupervisorConfig,
        restart: impl Fn() -> Result<()> + Send + 'static,
    ) -> SupervisorHandle {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let state = Arc::new(SharedState {
            health: Mutex::new(Health::Healthy),
        });
        let loop_state = Arc::clone(&state);

        let join = thread::spawn(move || run_loop(pool, config, restart, cancel_rx, loop_state));

        SupervisorHandle {
            cancel_tx,
            joined: Mutex::new(Some(join)),
            state,
        }
    }
}

impl SupervisorHandle {
    /// Current health as of the last completed probe tick.
    pub fn health(&self) -> Health {
        *lock_health(&self.state)
    }

    /// Signals the loop to exit and waits up to 5s for it to report done.
    pub fn shutdown(&self) {
        let _ = self.cancel_tx.send(());
        let mut guard = self.joined.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(join) = guard.take() {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !join.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(20));
            }
            if join.is_finished() {
                let _ = join.join();
            }
            // Otherwise detach: the loop will still observe the cancel
            // signal (or the next probe tick) and exit on its own.
        }
    }
}

fn run_loop(
    pool: Arc<ServerPool>,
    config: SupervisorConfig,
    restart: impl Fn() -> Result<()>,
    cancel_rx: mpsc::Receiver<()>,
    state: Arc<SharedState>,
) {
    let mut restart_count: u32 = 0;
    let mut backoff_until: Option<Instant> = None;

    loop {
        match cancel_rx.recv_timeout(config.probe_period) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => return,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        if let Some(until) = backoff_until {
            if Instant::now() < until {
                continue;
            }
            info!("backoff expired, resuming health probes");
            backoff_until = None;
            restart_count = 0;
        }

        let healthy = probe_tcp(&config.host, config.port) && pool.probe_select_one().is_ok();
        let previous = *lock_health(&state);

        if healthy {
            if previous != Health::Healthy {
                info!(host = %config.host, port = config.port, "server-mode backend healthy again");
            }
            *lock_health(&state) = Health::Healthy;
            continue;
        }

        warn!(host = %config.host, port = config.port, "server-mode backend probe failed");
        *lock_health(&state) = Health::Unhealthy;
        restart_count += 1;

        if restart_count > config.max_restart_count {
            warn!(restart_count, backoff = ?config.backoff, "restart budget exhausted, entering backoff");
            *lock_health(&state) = Health::Backoff;
            backoff_until = Some(Instant::now() + config.backoff);
            continue;
        }

        match restart() {
            Ok(()) => {
                info!(restart_count, "server-mode backend restarted successfully");
                *lock_health(&state) = Health::Healthy;
                restart_count = 0;
            }
            Err(e) => {
                warn!(error = %e, restart_count, "restart attempt failed");
            }
        }
    }
}

/// TCP-only reachability probe, the first of the two probes in spec §4.10.
fn probe_tcp(host: &str, port: u16) -> bool {
    let addr = match (host, port).to_socket_addrs() {
        Ok(mut addrs) => addrs.next(),
        Err(_) => None,
    };
    match addr {
        Some(addr) => TcpStream::connect_timeout(&addr, Duration::from_secs(2)).is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_probe_fails_against_closed_port() {
        // Port 1 is reserved and practically never accepting connections in
        // a sandboxed test environment.
        assert!(!probe_tcp("127.0.0.1", 1));
    }

    #[test]
    fn supervisor_config_defaults_match_spec() {
        let cfg = SupervisorConfig::new("db.internal", 3306);
        assert_eq!(cfg.probe_period, Duration::from_secs(10));
        assert_eq!(cfg.max_restart_count, 3);
        assert_eq!(cfg.backoff, Duration::from_secs(60));
    }
}
