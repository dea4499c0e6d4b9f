use std::sync::LazyLock;

use regex::Regex;

use super::TrendError;
use crate::models::{TrendDirection, TrendPoint, TrendResponse, TrendSummary};

/// Percent change beyond which a series counts as moving.
const DIRECTION_THRESHOLD_PCT: f64 = 5.0;

static SIGNED_DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+\.?\d*").unwrap());

/// First signed decimal in a free-text value ("210 pg/mL" gives 210.0).
pub fn extract_numeric_value(text: &str) -> Option<f64> {
    SIGNED_DECIMAL
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Summarize one test's history.
///
/// Points are ordered by date. The change is computed between the first and
/// last point, only when both carry a number and the first is non-zero.
pub fn compute_trend(test_name: &str, points: &[TrendPoint]) -> Result<TrendSummary, TrendError> {
    if points.is_empty() {
        return Err(TrendError::NoData);
    }

    let mut data_points = points.to_vec();
    data_points.sort_by(|a, b| a.date.cmp(&b.date));

    let percentage_change = match (data_points.first(), data_points.last()) {
        (Some(first), Some(last)) if data_points.len() > 1 => match (first.value, last.value) {
            (Some(from), Some(to)) if from != 0.0 => Some(round2((to - from) / from * 100.0)),
            _ => None,
        },
        _ => None,
    };

    let trend_direction = match percentage_change {
        Some(pct) if pct > DIRECTION_THRESHOLD_PCT => TrendDirection::Increasing,
        Some(pct) if pct < -DIRECTION_THRESHOLD_PCT => TrendDirection::Decreasing,
        _ => TrendDirection::Stable,
    };

    tracing::debug!(
        test_name,
        points = data_points.len(),
        direction = trend_direction.as_str(),
        pct = ?percentage_change,
        "Computed trend"
    );

    Ok(TrendSummary {
        test_name: test_name.to_string(),
        total_tests: data_points.len(),
        data_points,
        trend_direction,
        percentage_change,
    })
}

/// Wire form of a trend computation; an empty series becomes the error object.
pub fn trend_response(test_name: &str, points: &[TrendPoint]) -> TrendResponse {
    match compute_trend(test_name, points) {
        Ok(summary) => TrendResponse::Trend(summary),
        Err(TrendError::NoData) => TrendResponse::no_data(),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, text: &str) -> TrendPoint {
        TrendPoint {
            date: date.into(),
            value: extract_numeric_value(text),
            value_text: text.into(),
            status: "NORMAL".into(),
            document_id: "doc".into(),
        }
    }

    #[test]
    fn rising_series_is_increasing() {
        let points = [
            point("2026-01-10T09:00:00", "210 pg/mL"),
            point("2026-04-10T09:00:00", "500 pg/mL"),
        ];
        let summary = compute_trend("Vitamin B12", &points).unwrap();
        assert_eq!(summary.percentage_change, Some(138.1));
        assert_eq!(summary.trend_direction, TrendDirection::Increasing);
        assert_eq!(summary.total_tests, 2);
    }

    #[test]
    fn small_drop_is_stable() {
        let points = [point("2026-01-01", "100"), point("2026-02-01", "98")];
        let summary = compute_trend("Glucose", &points).unwrap();
        assert_eq!(summary.percentage_change, Some(-2.0));
        assert_eq!(summary.trend_direction, TrendDirection::Stable);
    }

    #[test]
    fn large_drop_is_decreasing() {
        let points = [point("2026-01-01", "200"), point("2026-02-01", "150")];
        let summary = compute_trend("LDL", &points).unwrap();
        assert_eq!(summary.percentage_change, Some(-25.0));
        assert_eq!(summary.trend_direction, TrendDirection::Decreasing);
    }

    #[test]
    fn endpoints_taken_in_date_order() {
        let points = [point("2026-03-01", "500"), point("2026-01-01", "210")];
        let summary = compute_trend("B12", &points).unwrap();
        assert_eq!(summary.data_points[0].date, "2026-01-01");
        assert_eq!(summary.trend_direction, TrendDirection::Increasing);
    }

    #[test]
    fn single_point_has_no_change() {
        let summary = compute_trend("TSH", &[point("2026-01-01", "2.1")]).unwrap();
        assert_eq!(summary.percentage_change, None);
        assert_eq!(summary.trend_direction, TrendDirection::Stable);
    }

    #[test]
    fn text_only_endpoint_has_no_change() {
        let points = [point("2026-01-01", "Negative"), point("2026-02-01", "12")];
        let summary = compute_trend("Culture", &points).unwrap();
        assert_eq!(summary.percentage_change, None);
        assert_eq!(summary.trend_direction, TrendDirection::Stable);
    }

    #[test]
    fn zero_first_value_has_no_change() {
        let points = [point("2026-01-01", "0"), point("2026-02-01", "3")];
        assert_eq!(compute_trend("CRP", &points).unwrap().percentage_change, None);
    }

    #[test]
    fn zero_last_value_is_a_real_change() {
        let points = [point("2026-01-01", "4"), point("2026-02-01", "0")];
        let summary = compute_trend("CRP", &points).unwrap();
        assert_eq!(summary.percentage_change, Some(-100.0));
        assert_eq!(summary.trend_direction, TrendDirection::Decreasing);
    }

    #[test]
    fn empty_series_is_no_data() {
        assert_eq!(compute_trend("WBC", &[]), Err(TrendError::NoData));
        let json = serde_json::to_value(trend_response("WBC", &[])).unwrap();
        assert_eq!(json, serde_json::json!({"error": "No trend data found"}));
    }

    #[test]
    fn numeric_extraction() {
        assert_eq!(extract_numeric_value("210 pg/mL"), Some(210.0));
        assert_eq!(extract_numeric_value("-1.5 SD"), Some(-1.5));
        assert_eq!(extract_numeric_value("<0.5"), Some(0.5));
        assert_eq!(extract_numeric_value("Negative"), None);
        assert_eq!(extract_numeric_value(""), None);
    }
}
