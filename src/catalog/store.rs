//! Persistence of the node catalog
//!
//! The store owns one database connection for the duration of a command and
//! releases it through [`CatalogStore::close`] (or on drop). Writes happen in
//! a single transaction: an error rolls it back before it is returned, so the
//! catalog is left exactly as it was before the call.
//!
//! A non-interactive upsert writes with one `INSERT ... ON CONFLICT` (or
//! `ON DUPLICATE KEY UPDATE` on MySQL) statement, so concurrent registrations
//! of the same id never fail on the primary key. The existence read before it
//! only labels the outcome. The interactive path has to ask between the check
//! and the write, so it stays check-then-act: two concurrent interactive
//! registrations of a new id can both see "absent", and the second insert
//! then fails on the primary key as a storage error with nothing committed.

use crate::catalog::confirm::{Confirmer, TerminalConfirmer};
use crate::error::{MiqroforgeError, Result};
use crate::logging::Logger;
use crate::node::manifest::NodeManifest;
use serde_json::{Map, Value};
use sqlx::AnyConnection;
use sqlx::any::{AnyRow, install_default_drivers};
use sqlx::{Connection, Row};
use std::fmt;

const CREATE_NODE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS node (
        id VARCHAR(128) NOT NULL PRIMARY KEY,
        type VARCHAR(8) NOT NULL,
        name TEXT,
        description TEXT,
        version VARCHAR(64),
        color VARCHAR(32),
        tag VARCHAR(255),
        input TEXT,
        output TEXT,
        performance_config_path VARCHAR(512),
        example_config_path VARCHAR(512),
        contact TEXT,
        image VARCHAR(512),
        execution_command TEXT,
        created_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
"#;

/// Writable columns, in the order [`node_values`] yields them
const NODE_COLUMNS: [&str; 14] = [
    "id",
    "type",
    "name",
    "description",
    "version",
    "color",
    "tag",
    "input",
    "output",
    "performance_config_path",
    "example_config_path",
    "contact",
    "image",
    "execution_command",
];

const SELECT_NODE_COLUMNS: &str = "SELECT id, type, name, description, version, color, tag, \
     input, output, performance_config_path, example_config_path, contact, image, \
     execution_command, CAST(created_time AS CHAR) AS created_time FROM node";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertOutcome::Inserted => write!(f, "inserted"),
            UpsertOutcome::Updated => write!(f, "updated"),
            UpsertOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// A persisted node: the manifest plus what the database adds
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub manifest: NodeManifest,
    pub node_type: String,
    pub created_time: Option<String>,
}

impl CatalogRow {
    /// Column name / display value pairs in table order
    pub fn columns(&self) -> Vec<(&'static str, String)> {
        let m = &self.manifest;
        vec![
            ("id", m.id.clone()),
            ("type", self.node_type.clone()),
            ("name", canonical(&m.name)),
            ("description", m.description.clone()),
            ("version", m.version.clone()),
            ("color", m.color.clone()),
            ("tag", m.tag.clone()),
            ("input", canonical_map(&m.input)),
            ("output", canonical_map(&m.output)),
            ("performance_config_path", m.performance_config_path.clone()),
            ("example_config_path", m.example_config_path.clone()),
            ("contact", canonical_map(&m.contact)),
            ("image", m.image.clone()),
            ("execution_command", m.execution_command.clone()),
            (
                "created_time",
                self.created_time.clone().unwrap_or_else(|| "NULL".to_string()),
            ),
        ]
    }
}

pub struct CatalogStore {
    conn: AnyConnection,
    confirmer: Box<dyn Confirmer>,
    output: Logger,
}

impl CatalogStore {
    /// Open a dedicated connection. `url` is any URL the sqlx `Any` driver
    /// accepts (`mysql://…` in production, `sqlite::memory:` in tests).
    pub async fn connect(url: &str, output: Logger) -> Result<Self> {
        install_default_drivers();
        let conn = AnyConnection::connect(url)
            .await
            .map_err(|e| MiqroforgeError::Storage(format!("cannot connect to catalog: {}", e)))?;

        Ok(Self {
            conn,
            confirmer: Box::new(TerminalConfirmer),
            output,
        })
    }

    pub fn with_confirmer(mut self, confirmer: Box<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    /// Raw connection for read-only queries outside the node table
    pub fn connection(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }

    pub async fn ensure_schema(&mut self) -> Result<()> {
        sqlx::query(CREATE_NODE_TABLE).execute(&mut self.conn).await?;
        Ok(())
    }

    pub async fn exists(&mut self, id: &str) -> Result<bool> {
        node_exists(&mut self.conn, id).await
    }

    /// Insert the manifest, or overwrite the existing row for its id.
    ///
    /// With `interactive` set, overwriting asks first and a "no" leaves the
    /// catalog untouched and yields [`UpsertOutcome::Skipped`].
    pub async fn upsert(&mut self, manifest: &NodeManifest, interactive: bool) -> Result<UpsertOutcome> {
        let mut tx = self.conn.begin().await?;

        let result = apply_upsert(&mut tx, manifest, interactive, self.confirmer.as_ref()).await;
        match result {
            Ok(UpsertOutcome::Skipped) => {
                tx.rollback().await?;
                self.output
                    .info(&format!("Node {} left unchanged", manifest.id));
                Ok(UpsertOutcome::Skipped)
            }
            Ok(outcome) => {
                tx.commit().await?;
                self.output
                    .success(&format!("Node {} {} in catalog", manifest.id, outcome));
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    self.output
                        .warning(&format!("Rollback failed: {}", rollback));
                }
                Err(e)
            }
        }
    }

    pub async fn fetch_by_id(&mut self, id: &str) -> Result<Option<CatalogRow>> {
        let sql = format!("{} WHERE id = ?", SELECT_NODE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut self.conn)
            .await?;
        row.map(|row| decode_row(&row)).transpose()
    }

    pub async fn list(&mut self) -> Result<Vec<CatalogRow>> {
        let sql = format!("{} ORDER BY id", SELECT_NODE_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&mut self.conn).await?;
        rows.iter().map(decode_row).collect()
    }

    /// Release the connection
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

async fn node_exists(conn: &mut AnyConnection, id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM node WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

async fn apply_upsert(
    conn: &mut AnyConnection,
    manifest: &NodeManifest,
    interactive: bool,
    confirmer: &dyn Confirmer,
) -> Result<UpsertOutcome> {
    let existed = node_exists(conn, &manifest.id).await?;

    if !interactive {
        let sql = upsert_sql(Dialect::of(conn));
        execute_with(conn, &sql, node_values(manifest)).await?;
        return Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        });
    }

    if !existed {
        execute_with(conn, &insert_sql(), node_values(manifest)).await?;
        return Ok(UpsertOutcome::Inserted);
    }

    let prompt = format!("Node {} already exists. Overwrite it?", manifest.id);
    if !confirmer.confirm(&prompt)? {
        return Ok(UpsertOutcome::Skipped);
    }

    let mut values = node_values(manifest);
    let id = values.remove(0);
    values.push(id);
    execute_with(conn, &update_sql(), values).await?;
    Ok(UpsertOutcome::Updated)
}

/// Upsert syntax differs between MySQL and SQLite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    MySql,
    Standard,
}

impl Dialect {
    fn of(conn: &AnyConnection) -> Self {
        if conn.backend_name().eq_ignore_ascii_case("mysql") {
            Dialect::MySql
        } else {
            Dialect::Standard
        }
    }
}

/// Column values of `m` in [`NODE_COLUMNS`] order
fn node_values(m: &NodeManifest) -> Vec<String> {
    vec![
        m.id.clone(),
        m.node_type().to_string(),
        canonical(&m.name),
        m.description.clone(),
        m.version.clone(),
        m.color.clone(),
        m.tag.clone(),
        canonical_map(&m.input),
        canonical_map(&m.output),
        m.performance_config_path.clone(),
        m.example_config_path.clone(),
        canonical_map(&m.contact),
        m.image.clone(),
        m.execution_command.clone(),
    ]
}

fn insert_sql() -> String {
    format!(
        "INSERT INTO node ({}) VALUES ({})",
        NODE_COLUMNS.join(", "),
        vec!["?"; NODE_COLUMNS.len()].join(", ")
    )
}

/// Binds every column but `id`, then `id` last
fn update_sql() -> String {
    let assignments: Vec<String> = NODE_COLUMNS[1..]
        .iter()
        .map(|column| format!("{} = ?", column))
        .collect();
    format!("UPDATE node SET {} WHERE id = ?", assignments.join(", "))
}

fn upsert_sql(dialect: Dialect) -> String {
    let assignments: Vec<String> = NODE_COLUMNS[1..]
        .iter()
        .map(|column| match dialect {
            Dialect::MySql => format!("{0} = VALUES({0})", column),
            Dialect::Standard => format!("{0} = excluded.{0}", column),
        })
        .collect();
    let conflict = match dialect {
        Dialect::MySql => "ON DUPLICATE KEY UPDATE",
        Dialect::Standard => "ON CONFLICT (id) DO UPDATE SET",
    };
    format!("{} {} {}", insert_sql(), conflict, assignments.join(", "))
}

async fn execute_with(conn: &mut AnyConnection, sql: &str, values: Vec<String>) -> Result<()> {
    let mut query = sqlx::query(sql);
    for value in values {
        query = query.bind(value);
    }
    query.execute(&mut *conn).await?;
    Ok(())
}

/// Compact JSON with sorted object keys
pub fn canonical(value: &Value) -> String {
    value.to_string()
}

pub fn canonical_map(map: &Map<String, Value>) -> String {
    Value::Object(map.clone()).to_string()
}

fn text(row: &AnyRow, column: &str) -> Result<String> {
    Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
}

fn json_column(row: &AnyRow, column: &str) -> Result<Value> {
    let raw = text(row, column)?;
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&raw)
        .map_err(|e| MiqroforgeError::Storage(format!("column {} holds invalid JSON: {}", column, e)))
}

fn object_column(row: &AnyRow, column: &str) -> Result<Map<String, Value>> {
    match json_column(row, column)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(MiqroforgeError::Storage(format!(
            "column {} must hold a JSON object, found {}",
            column, other
        ))),
    }
}

fn decode_row(row: &AnyRow) -> Result<CatalogRow> {
    let name = match json_column(row, "name")? {
        Value::Null => Value::String(String::new()),
        name => name,
    };

    let manifest = NodeManifest {
        id: text(row, "id")?,
        name,
        description: text(row, "description")?,
        version: text(row, "version")?,
        color: text(row, "color")?,
        tag: text(row, "tag")?,
        input: object_column(row, "input")?,
        output: object_column(row, "output")?,
        performance_config_path: text(row, "performance_config_path")?,
        example_config_path: text(row, "example_config_path")?,
        contact: object_column(row, "contact")?,
        image: text(row, "image")?,
        execution_command: text(row, "execution_command")?,
    };

    Ok(CatalogRow {
        manifest,
        node_type: text(row, "type")?,
        created_time: row.try_get::<Option<String>, _>("created_time")?,
    })
}
