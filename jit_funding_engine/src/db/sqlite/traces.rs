use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{ExecutionTrace, NewExecutionTrace},
};

#[derive(FromRow)]
struct TraceRow {
    id: i64,
    event_token: String,
    card_id: String,
    steps: String,
    approved: bool,
    final_decision: String,
    total_latency_ms: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<TraceRow> for ExecutionTrace {
    type Error = SqliteDatabaseError;

    fn try_from(row: TraceRow) -> Result<Self, Self::Error> {
        let steps = serde_json::from_str(&row.steps)
            .map_err(|e| SqliteDatabaseError::DecodeError(format!("trace #{} steps: {e}", row.id)))?;
        let final_decision = row
            .final_decision
            .parse()
            .map_err(|e| SqliteDatabaseError::DecodeError(format!("trace #{} decision: {e}", row.id)))?;
        Ok(ExecutionTrace {
            id: row.id,
            event_token: row.event_token,
            card_id: row.card_id,
            steps,
            approved: row.approved,
            final_decision,
            total_latency_ms: row.total_latency_ms,
            created_at: row.created_at,
        })
    }
}

/// Appends a trace and returns its id. `RETURNING` statements are always run to completion with `fetch_all`, otherwise
/// sqlx leaves the statement open and the insert is not committed until the connection is next used.
pub async fn insert_trace(trace: NewExecutionTrace, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let steps = serde_json::to_string(&trace.steps).map_err(|e| SqliteDatabaseError::QueryError(e.to_string()))?;
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO execution_traces (event_token, card_id, steps, approved, final_decision, total_latency_ms)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(trace.event_token)
    .bind(trace.card_id)
    .bind(steps)
    .bind(trace.approved)
    .bind(trace.final_decision.to_string())
    .bind(trace.total_latency_ms)
    .fetch_all(conn)
    .await?;
    ids.into_iter().next().ok_or_else(|| SqliteDatabaseError::QueryError("The trace insert returned no id".into()))
}

pub async fn fetch_latest_for_event(
    event_token: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ExecutionTrace>, SqliteDatabaseError> {
    let row: Option<TraceRow> =
        sqlx::query_as("SELECT * FROM execution_traces WHERE event_token = $1 ORDER BY id DESC LIMIT 1")
            .bind(event_token)
            .fetch_optional(conn)
            .await?;
    row.map(ExecutionTrace::try_from).transpose()
}

pub async fn fetch_for_event(
    event_token: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExecutionTrace>, SqliteDatabaseError> {
    let rows: Vec<TraceRow> = sqlx::query_as("SELECT * FROM execution_traces WHERE event_token = $1 ORDER BY id ASC")
        .bind(event_token)
        .fetch_all(conn)
        .await?;
    rows.into_iter().map(ExecutionTrace::try_from).collect()
}

pub async fn fetch_for_card(
    card_id: &str,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExecutionTrace>, SqliteDatabaseError> {
    let rows: Vec<TraceRow> =
        sqlx::query_as("SELECT * FROM execution_traces WHERE card_id = $1 ORDER BY id DESC LIMIT $2")
            .bind(card_id)
            .bind(limit)
            .fetch_all(conn)
            .await?;
    rows.into_iter().map(ExecutionTrace::try_from).collect()
}
