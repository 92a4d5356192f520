//! Read-only queries over submitted tasks, their nodes and node parameters

use crate::error::Result;
use sqlx::Row;
use sqlx::AnyConnection;
use sqlx::any::AnyRow;

pub const TASK_COLUMNS: [&str; 7] = [
    "Task ID",
    "Name",
    "Status",
    "Start Time",
    "End Time",
    "Created Time",
    "Error Message",
];

pub const TASK_NODE_COLUMNS: [&str; 8] = [
    "Node ID",
    "Task ID",
    "Name (CN)",
    "Name (EN)",
    "Status",
    "Data Dir",
    "Jobs",
    "Created Time",
];

pub const NODE_PARAM_COLUMNS: [&str; 8] = [
    "Param ID",
    "Task ID",
    "Node ID",
    "Type",
    "Name (CN)",
    "Name (EN)",
    "Code",
    "Value",
];

const ERROR_MESSAGE_WIDTH: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: i64,
    pub name: Option<String>,
    pub status: i64,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub created_time: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskNodeRecord {
    pub id: i64,
    pub task_id: i64,
    pub name_cn: Option<String>,
    pub name_en: Option<String>,
    pub status: i64,
    pub data_dir: Option<String>,
    pub job_num: Option<i64>,
    pub created_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeParamRecord {
    pub id: i64,
    pub task_id: i64,
    pub node_id: i64,
    pub param_type: i64,
    pub name_cn: Option<String>,
    pub name_en: Option<String>,
    pub param_code: Option<String>,
    pub value: Option<String>,
}

pub fn task_status_name(code: i64) -> &'static str {
    match code {
        1 => "CREATED",
        2 => "QUEUED",
        3 => "RUNNING",
        4 => "SUCCEED",
        5 => "FAILED",
        6 => "CANCELLED",
        _ => "UNKNOWN",
    }
}

pub fn node_status_name(code: i64) -> &'static str {
    match code {
        1 => "CREATED",
        2 => "PENDING",
        3 => "RUNNING",
        4 => "SUCCEED",
        5 => "FAILED",
        6 => "CANCELLED",
        _ => "UNKNOWN",
    }
}

pub fn param_type_name(code: i64) -> &'static str {
    match code {
        0 => "input",
        1 => "output",
        _ => "unknown",
    }
}

fn or_dash(value: &Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.clone(),
        _ => "-".to_string(),
    }
}

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Shorten to `max` characters, ending in "..." when cut
pub fn truncate_message(message: &Option<String>, max: usize) -> String {
    match message {
        None => "-".to_string(),
        Some(msg) if msg.chars().count() > max => {
            let kept: String = msg.chars().take(max.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
        Some(msg) => msg.clone(),
    }
}

impl TaskRecord {
    pub fn display_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            or_empty(&self.name),
            task_status_name(self.status).to_string(),
            or_dash(&self.start_time),
            or_dash(&self.end_time),
            or_dash(&self.created_time),
            truncate_message(&self.error_message, ERROR_MESSAGE_WIDTH),
        ]
    }
}

impl TaskNodeRecord {
    pub fn display_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.task_id.to_string(),
            or_empty(&self.name_cn),
            or_empty(&self.name_en),
            node_status_name(self.status).to_string(),
            or_empty(&self.data_dir),
            self.job_num.map(|n| n.to_string()).unwrap_or_default(),
            or_dash(&self.created_time),
        ]
    }
}

impl NodeParamRecord {
    pub fn display_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.task_id.to_string(),
            self.node_id.to_string(),
            param_type_name(self.param_type).to_string(),
            or_empty(&self.name_cn),
            or_empty(&self.name_en),
            or_empty(&self.param_code),
            or_empty(&self.value),
        ]
    }
}

fn int(row: &AnyRow, column: &str) -> Result<i64> {
    Ok(row.try_get::<Option<i64>, _>(column)?.unwrap_or(0))
}

fn opt_text(row: &AnyRow, column: &str) -> Result<Option<String>> {
    Ok(row.try_get::<Option<String>, _>(column)?)
}

/// Most recent tasks first
pub async fn fetch_tasks(conn: &mut AnyConnection, limit: i64) -> Result<Vec<TaskRecord>> {
    let rows = sqlx::query(
        "SELECT id, name, status, CAST(start_time AS CHAR) AS start_time, \
         CAST(end_time AS CHAR) AS end_time, CAST(created_time AS CHAR) AS created_time, \
         error_message FROM task ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(TaskRecord {
                id: int(row, "id")?,
                name: opt_text(row, "name")?,
                status: int(row, "status")?,
                start_time: opt_text(row, "start_time")?,
                end_time: opt_text(row, "end_time")?,
                created_time: opt_text(row, "created_time")?,
                error_message: opt_text(row, "error_message")?,
            })
        })
        .collect()
}

pub async fn fetch_task_nodes(conn: &mut AnyConnection, task_id: i64) -> Result<Vec<TaskNodeRecord>> {
    let rows = sqlx::query(
        "SELECT id, task_id, name_cn, name_en, status, data_dir, job_num, \
         CAST(created_time AS CHAR) AS created_time FROM task_node \
         WHERE task_id = ? ORDER BY id ASC",
    )
    .bind(task_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(TaskNodeRecord {
                id: int(row, "id")?,
                task_id: int(row, "task_id")?,
                name_cn: opt_text(row, "name_cn")?,
                name_en: opt_text(row, "name_en")?,
                status: int(row, "status")?,
                data_dir: opt_text(row, "data_dir")?,
                job_num: row.try_get::<Option<i64>, _>("job_num")?,
                created_time: opt_text(row, "created_time")?,
            })
        })
        .collect()
}

pub async fn fetch_node_params(conn: &mut AnyConnection, node_id: i64) -> Result<Vec<NodeParamRecord>> {
    let rows = sqlx::query(
        "SELECT id, task_id, node_id, type, name_cn, name_en, param_code, value \
         FROM task_node_params WHERE node_id = ? ORDER BY id ASC",
    )
    .bind(node_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(NodeParamRecord {
                id: int(row, "id")?,
                task_id: int(row, "task_id")?,
                node_id: int(row, "node_id")?,
                param_type: int(row, "type")?,
                name_cn: opt_text(row, "name_cn")?,
                name_en: opt_text(row, "name_en")?,
                param_code: opt_text(row, "param_code")?,
                value: opt_text(row, "value")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(task_status_name(2), "QUEUED");
        assert_eq!(node_status_name(2), "PENDING");
        assert_eq!(task_status_name(42), "UNKNOWN");
        assert_eq!(param_type_name(1), "output");
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message(&None, 30), "-");
        assert_eq!(truncate_message(&Some("short".to_string()), 30), "short");
        let long = "x".repeat(40);
        let cut = truncate_message(&Some(long), 30);
        assert_eq!(cut.len(), 30);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_task_display_row() {
        let task = TaskRecord {
            id: 7,
            name: Some("relax".to_string()),
            status: 3,
            start_time: Some("2024-05-01 10:00:00".to_string()),
            end_time: None,
            created_time: Some("2024-05-01 09:59:00".to_string()),
            error_message: None,
        };
        assert_eq!(
            task.display_row(),
            vec!["7", "relax", "RUNNING", "2024-05-01 10:00:00", "-", "2024-05-01 09:59:00", "-"]
        );
    }
}
