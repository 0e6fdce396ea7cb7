//! Access to the relational database the agent queries.
//!
//! Every call opens its own connection and closes it before returning, whatever the
//! outcome. Nothing is pooled or shared between tool calls.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Executor, Row, TypeInfo, ValueRef};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatabaseError {
    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Execution(String),
}

/// Rows returned by a query, with column order kept as the database reported it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// One JSON object per row, keyed by column name
    pub fn to_objects(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .collect()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.to_objects()).unwrap_or_else(|_| "[]".to_string())
    }
}

#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement exactly as given and collect every returned row
    async fn fetch(&self, sql: &str) -> Result<QueryRows, DatabaseError>;

    /// Names of all tables in the connected schema
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError>;
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub struct MySqlDatabase {
    options: MySqlConnectOptions,
}

impl MySqlDatabase {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);
        Self { options }
    }

    async fn connect(&self) -> Result<MySqlConnection, DatabaseError> {
        MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }
}

#[async_trait]
impl Database for MySqlDatabase {
    async fn fetch(&self, sql: &str) -> Result<QueryRows, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = Executor::fetch_all(&mut conn, sqlx::raw_sql(sql)).await;
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "failed to close database connection");
        }

        let rows = result.map_err(|e| DatabaseError::Execution(e.to_string()))?;
        Ok(rows_to_query_rows(&rows))
    }

    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let rows = self.fetch("SHOW TABLES;").await?;
        Ok(rows
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|value| match value {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }
}

fn rows_to_query_rows(rows: &[MySqlRow]) -> QueryRows {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let values = rows
        .iter()
        .map(|row| (0..row.columns().len()).map(|i| decode_value(row, i)).collect())
        .collect();

    QueryRows::new(columns, values)
}

/// Decode one column into JSON. Values without a JSON counterpart (decimals, dates,
/// times) become their display string.
fn decode_value(row: &MySqlRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }

    if let Ok(v) = row.try_get::<i64, _>(index) {
        return json!(v);
    }
    if let Ok(v) = row.try_get::<u64, _>(index) {
        return json!(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return json!(v);
    }
    if let Ok(v) = row.try_get::<f32, _>(index) {
        return json!(v);
    }
    if let Ok(v) = row.try_get::<Decimal, _>(index) {
        return Value::String(v.to_string());
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(index) {
        return Value::String(v.to_string());
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(index) {
        return Value::String(v.to_string());
    }
    if let Ok(v) = row.try_get::<NaiveTime, _>(index) {
        return Value::String(v.to_string());
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return json!(v);
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::String(v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        return Value::String(String::from_utf8_lossy(&v).into_owned());
    }

    let type_name = row.columns()[index].type_info().name().to_string();
    tracing::debug!(column = index, %type_name, "could not decode column value");
    Value::String(format!("<{}>", type_name))
}

/// Remove markdown code fences the model sometimes wraps around SQL
pub fn strip_code_fences(query: &str) -> String {
    let trimmed = query.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the language tag on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end()
        .trim_end_matches("```")
        .trim()
        .to_string()
}
