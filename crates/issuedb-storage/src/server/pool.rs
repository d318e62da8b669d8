//! Connection pool to a remote MySQL-protocol server (spec §4.9, server mode).

use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder, Pool, PooledConn};
use tracing::info;

use crate::error::{Result, StorageError};

/// Connection parameters for a server-mode store.
///
/// Mirrors the subset of [`issuedb_config::config::EngineConfig`] that
/// server mode needs; kept independent of that crate so `issuedb-storage`
/// doesn't gain a dependency on `issuedb-config` just for this struct.
#[derive(Debug, Clone)]
pub struct ServerParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ServerParams {
    pub(crate) fn to_opts(&self) -> Opts {
        OptsBuilder::new()
            .ip_or_hostname(Some(self.host.clone()))
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some(self.database.clone()))
            .into()
    }
}

/// A connection pool to a remote MySQL-protocol server.
///
/// Unlike the embedded backend's single-writer `Mutex<Connection>`, this
/// pool allows genuine concurrent SQL execution bounded by pool capacity.
pub struct ServerPool {
    pool: Pool,
    params: ServerParams,
}

impl ServerPool {
    /// Opens a pool and pings it on a throwaway connection so construction
    /// fails fast if the server is unreachable, rather than surfacing the
    /// failure on the caller's first real query.
    pub fn connect(params: ServerParams) -> Result<Self> {
        let pool = Pool::new(params.to_opts())
            .map_err(|e| StorageError::Connection(format!("failed to build pool: {e}")))?;

        let mut conn = pool
            .get_conn()
            .map_err(|e| StorageError::Connection(format!("initial ping failed: {e}")))?;
        conn.query_drop("SELECT 1")
            .map_err(|e| StorageError::Connection(format!("initial ping failed: {e}")))?;
        drop(conn);

        info!(host = %params.host, port = params.port, database = %params.database,
              "connected to server-mode backend");
        Ok(Self { pool, params })
    }

    /// Checks out a pooled connection.
    pub fn get(&self) -> Result<PooledConn> {
        self.pool
            .get_conn()
            .map_err(|e| StorageError::ServerQuery(e.to_string()))
    }

    /// Parameters this pool was built from, used by the watchdog to open a
    /// throwaway connection for `KILL QUERY`.
    pub fn params(&self) -> &ServerParams {
        &self.params
    }

    /// The server-side connection id of a pooled connection (`SELECT
    /// CONNECTION_ID()`), the target of a watchdog's `KILL QUERY`.
    pub fn connection_id(conn: &mut PooledConn) -> Result<u64> {
        conn.query_first::<u64, _>("SELECT CONNECTION_ID()")
            .map_err(|e| StorageError::ServerQuery(e.to_string()))?
            .ok_or_else(|| StorageError::Internal("CONNECTION_ID() returned no row".into()))
    }

    /// A TCP-only reachability probe, used by the supervisor's health check.
    pub fn probe_select_one(&self) -> Result<()> {
        let mut conn = self.get()?;
        conn.query_drop("SELECT 1")
            .map_err(|e| StorageError::ServerQuery(e.to_string()))
    }
}

/// Opens a short-lived, unpooled connection for out-of-band administrative
/// statements (`KILL QUERY`) that must not be served from the same pool as
/// the query being killed.
pub(crate) fn connect_unpooled(params: &ServerParams) -> Result<Conn> {
    Conn::new(params.to_opts()).map_err(|e| StorageError::Connection(format!("{e}")))
}
