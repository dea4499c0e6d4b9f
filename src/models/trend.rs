use serde::{Deserialize, Serialize};

use super::enums::TrendDirection;

/// One observation of a test over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    /// First signed decimal in `value_text`, if any.
    pub value: Option<f64>,
    pub value_text: String,
    pub status: String,
    pub document_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub test_name: String,
    pub data_points: Vec<TrendPoint>,
    pub trend_direction: TrendDirection,
    pub percentage_change: Option<f64>,
    pub total_tests: usize,
}

/// Wire shape of a trend query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrendResponse {
    Trend(TrendSummary),
    NoData { error: String },
    AvailableTests { available_tests: Vec<String> },
}

pub const NO_TREND_DATA: &str = "No trend data found";

impl TrendResponse {
    pub fn no_data() -> Self {
        Self::NoData {
            error: NO_TREND_DATA.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_serializes_as_error_object() {
        let json = serde_json::to_value(TrendResponse::no_data()).unwrap();
        assert_eq!(json, serde_json::json!({"error": "No trend data found"}));
    }

    #[test]
    fn available_tests_shape() {
        let resp = TrendResponse::AvailableTests {
            available_tests: vec!["WBC".into(), "Hemoglobin".into()],
        };
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["available_tests"][1], "Hemoglobin");
    }

    #[test]
    fn summary_serializes_direction_lowercase() {
        let summary = TrendSummary {
            test_name: "B12".into(),
            data_points: vec![],
            trend_direction: TrendDirection::Stable,
            percentage_change: None,
            total_tests: 0,
        };
        let json = serde_json::to_value(TrendResponse::Trend(summary)).unwrap();
        assert_eq!(json["trend_direction"], "stable");
        assert!(json["percentage_change"].is_null());
    }
}
