use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::{DocumentRecord, DocumentStatus};

/// Insert or refresh the upload metadata of a document.
///
/// Re-saving an existing id updates it in place, so stored analyses and
/// findings of that document are kept.
pub fn save_document_metadata(conn: &Connection, doc: &DocumentRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (document_id, filename, file_type, upload_time, status,
         processed_time, document_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(document_id) DO UPDATE SET
            filename = excluded.filename,
            file_type = excluded.file_type,
            upload_time = excluded.upload_time,
            status = excluded.status,
            processed_time = excluded.processed_time,
            document_type = excluded.document_type",
        params![
            doc.document_id.to_string(),
            doc.filename,
            doc.file_type,
            format_timestamp(&doc.upload_time),
            doc.status.as_str(),
            doc.processed_time.as_ref().map(format_timestamp),
            doc.document_type,
        ],
    )?;
    Ok(())
}

/// Set the processing status and stamp `processed_time` with `at`.
pub fn update_document_status(
    conn: &Connection,
    document_id: &Uuid,
    status: DocumentStatus,
    at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET status = ?2, processed_time = ?3 WHERE document_id = ?1",
        params![document_id.to_string(), status.as_str(), format_timestamp(at)],
    )?;
    if rows == 0 {
        return Err(not_found(document_id));
    }
    tracing::debug!(document_id = %document_id, status = status.as_str(), "Document status updated");
    Ok(())
}

/// Record the classification and extracted text produced by a pipeline run.
pub fn update_document_content(
    conn: &Connection,
    document_id: &Uuid,
    document_type: &str,
    extracted_text: &str,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET document_type = ?2, extracted_text = ?3 WHERE document_id = ?1",
        params![document_id.to_string(), document_type, extracted_text],
    )?;
    if rows == 0 {
        return Err(not_found(document_id));
    }
    Ok(())
}

pub fn get_document(conn: &Connection, document_id: &Uuid) -> Result<Option<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT document_id, filename, file_type, upload_time, status, processed_time, document_type
         FROM documents WHERE document_id = ?1",
    )?;

    let result = stmt.query_row(params![document_id.to_string()], read_row);

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_extracted_text(conn: &Connection, document_id: &Uuid) -> Result<Option<String>, DatabaseError> {
    let result = conn.query_row(
        "SELECT extracted_text FROM documents WHERE document_id = ?1",
        params![document_id.to_string()],
        |row| row.get::<_, Option<String>>(0),
    );
    match result {
        Ok(text) => Ok(text),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(not_found(document_id)),
        Err(e) => Err(e.into()),
    }
}

/// Page through documents, newest upload first.
pub fn list_documents(conn: &Connection, skip: usize, limit: usize) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT document_id, filename, file_type, upload_time, status, processed_time, document_type
         FROM documents ORDER BY upload_time DESC, id DESC LIMIT ?1 OFFSET ?2",
    )?;

    let rows = stmt.query_map(params![limit as i64, skip as i64], read_row)?;

    let mut docs = Vec::new();
    for row in rows {
        docs.push(document_from_row(row?)?);
    }
    Ok(docs)
}

/// Delete a document. Analyses and findings go with it through the
/// `ON DELETE CASCADE` foreign keys.
pub fn delete_document(conn: &Connection, document_id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM documents WHERE document_id = ?1",
        params![document_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(not_found(document_id));
    }
    tracing::info!(document_id = %document_id, "Document deleted");
    Ok(())
}

fn not_found(document_id: &Uuid) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "Document".into(),
        id: document_id.to_string(),
    }
}

/// Internal row struct for document mapping
struct DocumentRow {
    document_id: String,
    filename: String,
    file_type: String,
    upload_time: String,
    status: String,
    processed_time: Option<String>,
    document_type: Option<String>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        document_id: row.get(0)?,
        filename: row.get(1)?,
        file_type: row.get(2)?,
        upload_time: row.get(3)?,
        status: row.get(4)?,
        processed_time: row.get(5)?,
        document_type: row.get(6)?,
    })
}

fn document_from_row(row: DocumentRow) -> Result<DocumentRecord, DatabaseError> {
    Ok(DocumentRecord {
        document_id: Uuid::parse_str(&row.document_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        filename: row.filename,
        file_type: row.file_type,
        upload_time: parse_timestamp(&row.upload_time).unwrap_or_default(),
        status: DocumentStatus::from_str(&row.status)?,
        processed_time: row.processed_time.as_deref().and_then(parse_timestamp),
        document_type: row.document_type,
    })
}
