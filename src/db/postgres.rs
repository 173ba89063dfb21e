//! PostgreSQL connection factory.
//!
//! Opens one `sqlx::PgConnection` per request (no pool) and converts result
//! rows into ordered `Row` mappings.

use crate::config::ConnectionConfig;
use crate::db::{ConnectionFactory, DatabaseConnection, Row, Value};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::types::{PgInterval, PgTimeTz};
use sqlx::postgres::{
    PgColumn, PgConnectOptions, PgConnection, PgRow, PgSslMode, PgValueFormat, PgValueRef,
};
use sqlx::types::Uuid;
use sqlx::{
    Column as SqlxColumn, Connection, Decode, Postgres, Row as SqlxRow, Type, TypeInfo, ValueRef,
};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Time allowed for establishing a connection.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Opens PostgreSQL connections from a fixed configuration.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    options: PgConnectOptions,
    host: String,
    port: u16,
    user: String,
    database: String,
}

impl PostgresConnector {
    /// Builds connect options from the configuration. No connection is made.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let host = config.host.clone().unwrap_or_else(|| "localhost".to_string());
        let port = config.port_or_default();
        let database = config
            .database
            .clone()
            .ok_or_else(|| AgentError::config("Database name is required"))?;

        let mut options = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .database(&database);

        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        if let Some(mode) = &config.sslmode {
            let mode = PgSslMode::from_str(mode)
                .map_err(|e| AgentError::config(format!("Invalid sslmode '{mode}': {e}")))?;
            options = options.ssl_mode(mode);
        }

        let mut session = Vec::new();
        if let Some(search_path) = config.search_path() {
            session.push(("search_path", search_path.to_string()));
        }
        if let Some(secs) = config.statement_timeout_secs {
            session.push(("statement_timeout", format!("{}s", secs)));
        }
        if !session.is_empty() {
            options = options.options(session);
        }

        Ok(Self {
            options,
            host,
            port,
            user: config.user.clone().unwrap_or_else(|| "unknown".to_string()),
            database,
        })
    }
}

#[async_trait]
impl ConnectionFactory for PostgresConnector {
    async fn connect(&self) -> Result<Box<dyn DatabaseConnection>> {
        debug!(host = %self.host, port = self.port, "Opening database connection");

        let conn = tokio::time::timeout(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            PgConnection::connect_with(&self.options),
        )
        .await
        .map_err(|_| {
            AgentError::connection(format!(
                "Connection to {}:{} timed out. The server may be overloaded or unreachable.",
                self.host, self.port
            ))
        })?
        .map_err(|e| self.map_connection_error(e))?;

        Ok(Box::new(PostgresConnection { conn: Some(conn) }))
    }
}

impl PostgresConnector {
    /// Maps sqlx connection errors to user-friendly messages.
    fn map_connection_error(&self, error: sqlx::Error) -> AgentError {
        let host = &self.host;
        let port = self.port;
        let error_str = error.to_string().to_lowercase();

        if error_str.contains("connection refused") || error_str.contains("could not connect") {
            AgentError::connection(format!(
                "Cannot connect to {host}:{port}. Check that the server is running."
            ))
        } else if error_str.contains("password authentication failed")
            || error_str.contains("authentication failed")
        {
            AgentError::connection(format!(
                "Authentication failed for user '{}'. Check your credentials.",
                self.user
            ))
        } else if error_str.contains("does not exist") && error_str.contains("database") {
            AgentError::connection(format!("Database '{}' does not exist.", self.database))
        } else if error_str.contains("ssl") || error_str.contains("tls") {
            AgentError::connection(
                "Server requires SSL. Set sslmode = \"require\" in [database].".to_string(),
            )
        } else {
            AgentError::connection(error.to_string())
        }
    }
}

/// A single open PostgreSQL connection.
struct PostgresConnection {
    conn: Option<PgConnection>,
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| AgentError::connection("connection is closed"))?;

        let start = Instant::now();
        let rows = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AgentError::query(format_query_error(e)))?;

        debug!(
            row_count = rows.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Fetched rows"
        );

        rows.iter().map(convert_row).collect()
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| AgentError::connection(format!("Failed to close connection: {e}")))?;
        }
        Ok(())
    }
}

/// Converts a sqlx PgRow to our ordered Row type.
fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .map(|col| convert_value(row, col).map(|value| (col.name().to_string(), value)))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// SQL NULL is the only thing that becomes `Value::Null`. A non-null value of
/// a type we cannot render is an error naming the column.
fn convert_value(row: &PgRow, col: &PgColumn) -> Result<Value> {
    let index = col.ordinal();
    let raw = row
        .try_get_raw(index)
        .map_err(|e| undecodable(col, e.to_string()))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match col.type_info().name() {
        "BOOL" => Value::Bool(decode(row, col)?),
        "INT2" => Value::Int(decode::<i16>(row, col)?.into()),
        "INT4" => Value::Int(decode::<i32>(row, col)?.into()),
        "INT8" => Value::Int(decode(row, col)?),
        "FLOAT4" => Value::Float(decode::<f32>(row, col)?.into()),
        "FLOAT8" => Value::Float(decode(row, col)?),

        // AVG() and friends return NUMERIC; keep the exact decimal text
        "NUMERIC" => match row.try_get::<Decimal, _>(index) {
            Ok(v) => Value::String(v.normalize().to_string()),
            Err(_) => numeric_text(&raw)
                .map(Value::String)
                .ok_or_else(|| undecodable(col, "malformed numeric"))?,
        },

        "TIMESTAMPTZ" => Value::String(decode::<DateTime<Utc>>(row, col)?.to_rfc3339()),
        "TIMESTAMP" => Value::String(
            decode::<NaiveDateTime>(row, col)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "DATE" => Value::String(decode::<NaiveDate>(row, col)?.to_string()),
        "TIME" => Value::String(decode::<NaiveTime>(row, col)?.to_string()),
        "TIMETZ" => {
            let v: PgTimeTz<NaiveTime, FixedOffset> = decode(row, col)?;
            Value::String(format!("{}{}", v.time, v.offset))
        }
        "INTERVAL" => Value::String(format_interval(&decode::<PgInterval>(row, col)?)),

        "UUID" => Value::String(decode::<Uuid>(row, col)?.to_string()),
        "JSON" | "JSONB" => Value::Json(decode(row, col)?),
        "BYTEA" => Value::Bytes(decode(row, col)?),

        "BOOL[]" => json_array(decode::<Vec<Option<bool>>>(row, col)?),
        "INT2[]" => json_array(decode::<Vec<Option<i16>>>(row, col)?),
        "INT4[]" => json_array(decode::<Vec<Option<i32>>>(row, col)?),
        "INT8[]" => json_array(decode::<Vec<Option<i64>>>(row, col)?),
        "FLOAT8[]" => json_array(decode::<Vec<Option<f64>>>(row, col)?),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            json_array(decode::<Vec<Option<String>>>(row, col)?)
        }

        // TEXT, VARCHAR, BPCHAR, NAME and CITEXT decode as strings
        _ => Value::String(decode(row, col)?),
    };

    Ok(value)
}

fn decode<'r, T>(row: &'r PgRow, col: &PgColumn) -> Result<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(col.ordinal())
        .map_err(|e| undecodable(col, e.to_string()))
}

fn undecodable(col: &PgColumn, cause: impl fmt::Display) -> AgentError {
    AgentError::query(format!(
        "Cannot read column \"{name}\" of type {ty} ({cause}). \
         Cast it to text in the query, e.g. {name}::text, and try again.",
        name = col.name(),
        ty = col.type_info().name(),
    ))
}

fn json_array<T: Into<serde_json::Value>>(items: Vec<Option<T>>) -> Value {
    Value::Json(serde_json::Value::Array(
        items
            .into_iter()
            .map(|item| item.map_or(serde_json::Value::Null, Into::into))
            .collect(),
    ))
}

/// Renders an interval the way `psql` does for the common cases:
/// `1 year 2 mons 3 days 04:05:06`.
fn format_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();
    let (years, months) = (interval.months / 12, interval.months % 12);
    for (n, unit) in [(years, "year"), (months, "mon"), (interval.days, "day")] {
        if n != 0 {
            let plural = if n.abs() == 1 { "" } else { "s" };
            parts.push(format!("{n} {unit}{plural}"));
        }
    }

    let micros = interval.microseconds;
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let secs = total / 1_000_000;
        let frac = total % 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        if frac != 0 {
            let digits = format!("{frac:06}");
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

/// Exact decimal text of a NUMERIC that `Decimal` cannot hold
/// (NaN, infinities, more than 28 significant digits).
fn numeric_text(raw: &PgValueRef<'_>) -> Option<String> {
    match raw.format() {
        PgValueFormat::Text => raw.as_str().ok().map(str::to_string),
        PgValueFormat::Binary => numeric_from_binary(raw.as_bytes().ok()?),
    }
}

/// Decodes the binary NUMERIC wire format: digit count, weight, sign and
/// display scale as 16-bit words, then base-10000 digits.
fn numeric_from_binary(bytes: &[u8]) -> Option<String> {
    let word = |i: usize| {
        bytes
            .get(2 * i..2 * i + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
    };

    let ndigits = usize::from(word(0)?);
    let weight = i32::from(word(1)? as i16);
    let sign = word(2)?;
    let dscale = usize::from(word(3)?);

    match sign {
        0x0000 | 0x4000 => {}
        0xC000 => return Some("NaN".to_string()),
        0xD000 => return Some("Infinity".to_string()),
        0xF000 => return Some("-Infinity".to_string()),
        _ => return None,
    }

    let digits = (0..ndigits)
        .map(|i| word(4 + i))
        .collect::<Option<Vec<u16>>>()?;
    let digit_at = |g: i32| {
        usize::try_from(g)
            .ok()
            .and_then(|g| digits.get(g).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit_at(0).to_string());
        for g in 1..=weight {
            out.push_str(&format!("{:04}", digit_at(g)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::new();
        let mut g = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit_at(g)));
            g += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Some(out)
}

/// Formats a query error with PostgreSQL detail and hint if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
