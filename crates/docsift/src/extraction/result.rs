//! Extraction result model and tolerant cleaning of model output

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Metrics the model is asked for, in canonical order
pub const EXPECTED_METRICS: [&str; 5] = ["arr", "revenue", "gross_margin", "cash", "burn"];

/// Subset whose low confidence routes the analysis to review
pub const CRITICAL_METRICS: [&str; 4] = ["arr", "revenue", "cash", "burn"];

/// One extracted metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Numeric value, or `None` when absent or non-numeric
    pub value: Option<f64>,
    /// Confidence in [0, 1], rounded to two decimals
    pub confidence: f64,
    /// Where in the file the model found it
    #[serde(default)]
    pub source: String,
}

/// Cleaned result of one extraction call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Always holds exactly the expected metrics
    pub metrics: BTreeMap<String, MetricValue>,
    pub detected_period: Option<String>,
    pub insights: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    /// Mean of the per-metric confidences, rounded to two decimals
    pub overall_confidence: f64,
}

impl ExtractionResult {
    /// An analysis needs review when any critical metric's confidence falls
    /// below the threshold. Non-critical metrics never trigger review.
    pub fn needs_review(&self, threshold: f64) -> bool {
        CRITICAL_METRICS.iter().any(|name| {
            self.metrics
                .get(*name)
                .map(|m| m.confidence < threshold)
                .unwrap_or(true)
        })
    }
}

/// Clean raw model output into an [`ExtractionResult`].
///
/// Tolerant of malformed fields: a non-numeric value is discarded with its
/// confidence forced to zero, confidences are clamped to [0, 1], and missing
/// metrics default to absent with zero confidence. The only hard failure is
/// a missing `metrics` object.
pub fn clean_extraction(raw: &Value) -> Result<ExtractionResult> {
    let raw_metrics = raw
        .get("metrics")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::invalid_response("missing 'metrics' object in model output"))?;

    let mut metrics = BTreeMap::new();
    let mut confidences = Vec::with_capacity(EXPECTED_METRICS.len());

    for name in EXPECTED_METRICS {
        let entry = raw_metrics.get(name);
        let mut confidence = clamp01(coerce_number(
            entry.and_then(|e| e.get("confidence")).unwrap_or(&Value::Null),
        ));

        let raw_value = entry.and_then(|e| e.get("value"));
        let value = match raw_value {
            None | Some(Value::Null) => None,
            Some(v) => {
                let coerced = coerce_number_opt(v);
                if coerced.is_none() {
                    // Present but unusable: discard and zero the confidence
                    confidence = 0.0;
                }
                coerced
            }
        };

        confidences.push(confidence);
        metrics.insert(
            name.to_string(),
            MetricValue {
                value,
                confidence: round2(confidence),
                source: entry
                    .and_then(|e| e.get("source"))
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or("unknown")
                    .to_string(),
            },
        );
    }

    let overall = confidences.iter().sum::<f64>() / confidences.len() as f64;

    Ok(ExtractionResult {
        metrics,
        detected_period: raw
            .get("detected_period")
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
        insights: string_list(raw.get("insights")),
        warnings: string_list(raw.get("warnings")),
        recommendations: string_list(raw.get("recommendations")),
        overall_confidence: round2(overall),
    })
}

/// Lenient numeric coercion: numbers pass through, numeric strings parse,
/// everything else is zero.
fn coerce_number(value: &Value) -> f64 {
    coerce_number_opt(value).unwrap_or(0.0)
}

fn coerce_number_opt(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn well_formed(confidence: f64) -> Value {
        let mut metrics = serde_json::Map::new();
        for name in EXPECTED_METRICS {
            metrics.insert(
                name.to_string(),
                json!({"value": 100.0, "confidence": confidence, "source": "row 3"}),
            );
        }
        json!({
            "metrics": metrics,
            "detected_period": "Q3 2025",
            "insights": ["ARR is growing"],
            "warnings": [],
            "recommendations": ["extend runway"]
        })
    }

    #[test]
    fn clean_well_formed_output() {
        let result = clean_extraction(&well_formed(0.9)).unwrap();
        assert_eq!(result.metrics.len(), 5);
        assert_eq!(result.metrics["arr"].value, Some(100.0));
        assert_eq!(result.metrics["arr"].confidence, 0.9);
        assert_eq!(result.overall_confidence, 0.9);
        assert_eq!(result.detected_period.as_deref(), Some("Q3 2025"));
    }

    #[test]
    fn missing_metrics_object_is_the_only_hard_failure() {
        let err = clean_extraction(&json!({"insights": []})).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn non_numeric_value_is_discarded_and_zeroes_confidence() {
        let mut raw = well_formed(0.8);
        raw["metrics"]["cash"] = json!({"value": "approximately two million", "confidence": 0.8});
        let result = clean_extraction(&raw).unwrap();
        assert_eq!(result.metrics["cash"].value, None);
        assert_eq!(result.metrics["cash"].confidence, 0.0);
        // overall averages the cleaned confidences: (4 * 0.8 + 0.0) / 5
        assert_eq!(result.overall_confidence, 0.64);
    }

    #[test]
    fn numeric_strings_parse() {
        let mut raw = well_formed(0.7);
        raw["metrics"]["arr"] = json!({"value": "1200000.5", "confidence": "0.7"});
        let result = clean_extraction(&raw).unwrap();
        assert_eq!(result.metrics["arr"].value, Some(1200000.5));
        assert_eq!(result.metrics["arr"].confidence, 0.7);
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let mut raw = well_formed(0.9);
        raw["metrics"]["burn"] = json!({"value": -50000.0, "confidence": 1.7});
        raw["metrics"]["revenue"] = json!({"value": 80000.0, "confidence": -0.3});
        let result = clean_extraction(&raw).unwrap();
        assert_eq!(result.metrics["burn"].confidence, 1.0);
        assert_eq!(result.metrics["revenue"].confidence, 0.0);
    }

    #[test]
    fn missing_metric_defaults_to_absent_with_zero_confidence() {
        let mut raw = well_formed(0.9);
        raw["metrics"].as_object_mut().unwrap().remove("gross_margin");
        let result = clean_extraction(&raw).unwrap();
        assert_eq!(result.metrics["gross_margin"].value, None);
        assert_eq!(result.metrics["gross_margin"].confidence, 0.0);
        assert_eq!(result.metrics["gross_margin"].source, "unknown");
    }

    #[test]
    fn review_triggers_only_on_critical_metrics() {
        let mut raw = well_formed(0.9);
        raw["metrics"]["gross_margin"] = json!({"value": 0.6, "confidence": 0.1});
        let result = clean_extraction(&raw).unwrap();
        // gross_margin is not critical
        assert!(!result.needs_review(0.5));

        let mut raw = well_formed(0.9);
        raw["metrics"]["cash"] = json!({"value": 2_000_000.0, "confidence": 0.2});
        let result = clean_extraction(&raw).unwrap();
        assert!(result.needs_review(0.5));
    }
}
