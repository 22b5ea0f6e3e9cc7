//! Pooled PostgreSQL gateway.
//!
//! Every statement checks out exactly one connection from the pool and hands
//! it back when the `PoolConnection` guard drops, on success and on error.

use crate::config::{DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DatabaseSettings};
use crate::db::params::bind_all;
use crate::db::statement::{StatementKind, command_verb};
use crate::db::types::{fields_of, row_to_json};
use crate::db::{ConnectionInfo, QueryGateway};
use crate::error::{DbError, DbResult};
use crate::models::{Field, QueryParam, QueryResult};
use futures_util::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Either, Execute, Executor, Postgres};
use std::time::Duration;
use tracing::{debug, info, warn};

const APPLICATION_NAME: &str = "pg-mcp-server";

/// Gateway over a bounded `PgPool`.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
    info: ConnectionInfo,
}

impl std::fmt::Debug for PgGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgGateway")
            .field("info", &self.info)
            .field("pool_size", &self.pool.size())
            .field("idle", &self.pool.num_idle())
            .finish()
    }
}

/// Connect options for the configured target.
///
/// `ssl` maps to `PgSslMode::Require`: encrypted, certificate not verified.
pub fn connect_options(settings: &DatabaseSettings) -> PgConnectOptions {
    let mut options = PgConnectOptions::new_without_pgpass()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .application_name(APPLICATION_NAME)
        .ssl_mode(if settings.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        });
    if let Some(password) = &settings.password {
        options = options.password(password);
    }
    if let Some(database) = &settings.database {
        options = options.database(database);
    }
    options
}

impl PgGateway {
    /// Build the pool for the configured target and verify connectivity.
    pub async fn connect(settings: &DatabaseSettings) -> DbResult<Self> {
        Self::connect_with(connect_options(settings), settings.connection_limit).await
    }

    /// Build the pool from explicit connect options.
    pub async fn connect_with(options: PgConnectOptions, max_connections: u32) -> DbResult<Self> {
        let address = format!("{}:{}", options.get_host(), options.get_port());
        let configured_database = options.get_database().map(String::from);

        info!(
            address = %address,
            database = ?configured_database,
            max_connections = max_connections,
            "Connecting to database"
        );

        let pool = pool_options(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                DbError::connection(format!("Failed to connect: {}", e), connection_suggestion(&e))
            })?;

        let (current_database, server_version) = probe_server(&pool).await?;
        let info = ConnectionInfo {
            database: configured_database.unwrap_or(current_database),
            address,
            server_version,
        };

        info!(
            database = %info.database,
            server_version = ?info.server_version,
            "Connected successfully"
        );

        Ok(Self { pool, info })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drain the pool: reject new acquisitions, wait for checked-out
    /// connections to come back, close everything.
    pub async fn close(&self) {
        info!("Closing connection pool");
        self.pool.close().await;
        info!("Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl QueryGateway for PgGateway {
    async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        let mut conn = self.pool.acquire().await?;

        // Without parameters the simple-query protocol is used, which
        // accepts several statements in one string.
        let (rows, affected) = if params.is_empty() {
            collect(&mut conn, sql).await?
        } else {
            collect(&mut conn, bind_all(sql, params)).await?
        };

        let fields = match rows.first() {
            Some(row) => fields_of(sqlx::Row::columns(row)),
            None if StatementKind::detect(sql).returns_rows() => {
                describe_fields(&mut conn, sql).await
            }
            None => Vec::new(),
        };

        let row_count = effective_row_count(affected, rows.len());
        debug!(rows = rows.len(), row_count = row_count, "Statement executed");

        Ok(QueryResult {
            row_count,
            rows: rows.iter().map(row_to_json).collect(),
            fields,
            command: command_verb(sql),
        })
    }

    fn info(&self) -> &ConnectionInfo {
        &self.info
    }
}

/// Drain the result stream: rows plus the summed per-statement row counts.
async fn collect<'c, 'q: 'c, E>(conn: &'c mut PgConnection, query: E) -> DbResult<(Vec<PgRow>, u64)>
where
    E: 'q + Execute<'q, Postgres>,
{
    let mut rows = Vec::new();
    let mut row_count = 0u64;
    let mut stream = conn.fetch_many(query);
    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(done) => row_count += done.rows_affected(),
            Either::Right(row) => rows.push(row),
        }
    }
    Ok((rows, row_count))
}

/// Pool limits: acquisition waits up to the configured acquire timeout.
fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
        .idle_timeout(Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)))
}

/// Row count reported for a statement.
///
/// Command tags without a count (`EXPLAIN`, `SHOW`) report zero affected
/// rows even though rows came back; the returned row count is used then.
fn effective_row_count(affected: u64, returned: usize) -> u64 {
    affected.max(returned as u64)
}

/// Field metadata for a read statement that produced no rows.
async fn describe_fields(conn: &mut PgConnection, sql: &str) -> Vec<Field> {
    match conn.describe(sql).await {
        Ok(describe) => fields_of(describe.columns()),
        Err(e) => {
            debug!(error = %e, "Could not describe statement for field metadata");
            Vec::new()
        }
    }
}

async fn probe_server(pool: &PgPool) -> DbResult<(String, Option<String>)> {
    let database = sqlx::query_scalar::<_, String>("SELECT current_database()::text")
        .fetch_one(pool)
        .await
        .map_err(|e| {
            DbError::connection(format!("Connectivity check failed: {}", e), connection_suggestion(&e))
        })?;

    let version = match sqlx::query_scalar::<_, String>("SELECT version()")
        .fetch_one(pool)
        .await
    {
        Ok(version) => {
            debug!(version = %version, "Got server version");
            Some(version)
        }
        Err(e) => {
            warn!(error = %e, "Failed to get server version");
            None
        }
    };

    Ok((database, version))
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the PostgreSQL server is running and PGHOST/PGPORT are correct"
            .to_string();
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify PGUSER and PGPASSWORD (percent-encode special characters)".to_string();
    }

    if error_str.contains("does not exist") {
        return "Check that PGDATABASE names an existing database".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check PGSSLMODE: set it to 'require' for servers that demand TLS".to_string();
    }

    "Verify PGHOST, PGPORT, PGUSER, PGPASSWORD and PGDATABASE".to_string()
}
