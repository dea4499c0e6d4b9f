use rusqlite::{params, Connection};
use uuid::Uuid;

use super::finding::insert_findings;
use crate::db::DatabaseError;
use crate::models::DocumentAnalysis;

/// One row of the append-only analyses table.
#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    pub id: i64,
    pub data: DocumentAnalysis,
}

/// Append a pipeline result and its per-finding rows in one transaction.
/// Returns the new analysis id.
pub fn save_analysis(conn: &Connection, analysis: &DocumentAnalysis) -> Result<i64, DatabaseError> {
    let json = serde_json::to_string(analysis)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO analyses (document_id, analysis_data) VALUES (?1, ?2)",
        params![analysis.document_id.to_string(), json],
    )?;
    let id = tx.last_insert_rowid();

    let written = insert_findings(
        &tx,
        &analysis.document_id,
        &analysis.analysis.findings,
        &analysis.processed_at,
    )?;
    tx.commit()?;

    tracing::info!(
        document_id = %analysis.document_id,
        analysis_id = id,
        findings = written,
        "Analysis saved"
    );
    Ok(id)
}

/// Most recently inserted analysis of a document.
pub fn get_latest_analysis(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Option<StoredAnalysis>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, analysis_data FROM analyses WHERE document_id = ?1 ORDER BY id DESC LIMIT 1",
        params![document_id.to_string()],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    );

    match result {
        Ok((id, json)) => Ok(Some(StoredAnalysis {
            id,
            data: serde_json::from_str(&json)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Overwrite the payload of an existing analysis row.
pub fn update_analysis(conn: &Connection, id: i64, analysis: &DocumentAnalysis) -> Result<(), DatabaseError> {
    let json = serde_json::to_string(analysis)?;
    let rows = conn.execute(
        "UPDATE analyses SET analysis_data = ?2 WHERE id = ?1",
        params![id, json],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Analysis".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn count_analyses(conn: &Connection, document_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM analyses WHERE document_id = ?1",
        params![document_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}
