use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::format_timestamp;
use crate::db::DatabaseError;
use crate::models::{Finding, TrendPoint, TrendResponse};
use crate::trends::{extract_numeric_value, trend_response};

/// Write one row per finding, dated `test_date`. Rows that fail to insert
/// are logged and skipped; returns the number written.
pub fn insert_findings(
    conn: &Connection,
    document_id: &Uuid,
    findings: &[Finding],
    test_date: &NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO findings (document_id, test_name, value, value_text, status, test_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let doc_id = document_id.to_string();
    let date = format_timestamp(test_date);

    let mut written = 0;
    for finding in findings {
        let result = stmt.execute(params![
            doc_id,
            finding.test_name,
            extract_numeric_value(&finding.value),
            finding.value,
            finding.status.as_str(),
            date,
        ]);
        match result {
            Ok(_) => written += 1,
            Err(e) => tracing::warn!(
                test_name = %finding.test_name,
                error = %e,
                "Skipping finding row"
            ),
        }
    }
    Ok(written)
}

/// Swap the findings rows of one analysis run (identified by its date)
/// for a new set.
pub fn replace_findings(
    conn: &Connection,
    document_id: &Uuid,
    findings: &[Finding],
    test_date: &NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM findings WHERE document_id = ?1 AND test_date = ?2",
        params![document_id.to_string(), format_timestamp(test_date)],
    )?;
    let written = insert_findings(conn, document_id, findings, test_date)?;
    tracing::info!(document_id = %document_id, removed, written, "Findings replaced");
    Ok(written)
}

/// Distinct test names recorded for one document.
pub fn available_tests(conn: &Connection, document_id: &Uuid) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT test_name FROM findings WHERE document_id = ?1 ORDER BY test_name",
    )?;
    let rows = stmt.query_map(params![document_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Every stored observation of a test across documents, oldest first.
pub fn trend_points(conn: &Connection, test_name: &str) -> Result<Vec<TrendPoint>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT f.test_date, f.value, f.value_text, f.status, f.document_id
         FROM findings f
         JOIN documents d ON f.document_id = d.document_id
         WHERE f.test_name = ?1
         ORDER BY f.test_date ASC, f.id ASC",
    )?;

    let rows = stmt.query_map(params![test_name], |row| {
        Ok(TrendPoint {
            date: row.get(0)?,
            value: row.get(1)?,
            value_text: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            status: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            document_id: row.get(4)?,
        })
    })?;

    let mut points = Vec::new();
    for row in rows {
        points.push(row?);
    }
    Ok(points)
}

/// Trend query: without a test name, list the tests of `document_id`;
/// with one, compute that test's trend across all documents.
pub fn get_trends(
    conn: &Connection,
    document_id: &Uuid,
    test_name: Option<&str>,
) -> Result<TrendResponse, DatabaseError> {
    match test_name {
        None => Ok(TrendResponse::AvailableTests {
            available_tests: available_tests(conn, document_id)?,
        }),
        Some(name) => {
            let points = trend_points(conn, name)?;
            Ok(trend_response(name, &points))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::save_document_metadata;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{DocumentRecord, FindingStatus, TrendDirection};

    fn finding(name: &str, value: &str) -> Finding {
        Finding {
            test_name: name.into(),
            value: value.into(),
            normal_range: String::new(),
            status: FindingStatus::Normal,
            plain_english: String::new(),
            what_it_means: None,
            clinical_significance: None,
            recommendations: vec![],
        }
    }

    fn document(conn: &Connection) -> Uuid {
        let doc = DocumentRecord::new(Uuid::new_v4(), "labs.pdf", "application/pdf");
        save_document_metadata(conn, &doc).unwrap();
        doc.document_id
    }

    fn day(d: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn numeric_value_extracted_on_insert() {
        let conn = open_memory_database().unwrap();
        let doc = document(&conn);
        let written = insert_findings(
            &conn,
            &doc,
            &[finding("B12", "210 pg/mL"), finding("Culture", "Negative")],
            &day(1),
        )
        .unwrap();
        assert_eq!(written, 2);

        let b12 = trend_points(&conn, "B12").unwrap();
        assert_eq!(b12[0].value, Some(210.0));
        assert_eq!(b12[0].value_text, "210 pg/mL");
        assert_eq!(trend_points(&conn, "Culture").unwrap()[0].value, None);
    }

    #[test]
    fn unknown_document_rows_skipped() {
        let conn = open_memory_database().unwrap();
        let written = insert_findings(&conn, &Uuid::new_v4(), &[finding("B12", "210")], &day(1)).unwrap();
        assert_eq!(written, 0);
    }

    #[test]
    fn trend_across_documents() {
        let conn = open_memory_database().unwrap();
        let first = document(&conn);
        let second = document(&conn);
        insert_findings(&conn, &second, &[finding("B12", "500 pg/mL")], &day(20)).unwrap();
        insert_findings(&conn, &first, &[finding("B12", "210 pg/mL")], &day(2)).unwrap();

        match get_trends(&conn, &first, Some("B12")).unwrap() {
            TrendResponse::Trend(summary) => {
                assert_eq!(summary.total_tests, 2);
                assert_eq!(summary.data_points[0].document_id, first.to_string());
                assert_eq!(summary.trend_direction, TrendDirection::Increasing);
            }
            other => panic!("expected trend, got {other:?}"),
        }
    }

    #[test]
    fn unknown_test_is_no_data() {
        let conn = open_memory_database().unwrap();
        let doc = document(&conn);
        assert_eq!(get_trends(&conn, &doc, Some("Ferritin")).unwrap(), TrendResponse::no_data());
    }

    #[test]
    fn no_test_name_lists_document_tests() {
        let conn = open_memory_database().unwrap();
        let doc = document(&conn);
        insert_findings(&conn, &doc, &[finding("WBC", "6"), finding("B12", "210"), finding("WBC", "7")], &day(1))
            .unwrap();

        assert_eq!(
            get_trends(&conn, &doc, None).unwrap(),
            TrendResponse::AvailableTests {
                available_tests: vec!["B12".into(), "WBC".into()]
            }
        );
    }

    #[test]
    fn replace_swaps_one_run() {
        let conn = open_memory_database().unwrap();
        let doc = document(&conn);
        insert_findings(&conn, &doc, &[finding("WBC", "6")], &day(1)).unwrap();
        insert_findings(&conn, &doc, &[finding("WBC", "7")], &day(2)).unwrap();

        replace_findings(&conn, &doc, &[finding("WBC", "8"), finding("RBC", "4.5")], &day(2)).unwrap();

        let wbc = trend_points(&conn, "WBC").unwrap();
        let values: Vec<_> = wbc.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(6.0), Some(8.0)]);
        assert_eq!(trend_points(&conn, "RBC").unwrap().len(), 1);
    }
}
