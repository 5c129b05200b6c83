//! Message types exchanged with the broker and the Quality API
//!
//! Inbound: [`PalletEvent`] decoded from `quality/pallets/new`.
//! Outbound: [`AnalysisResult`] posted to `/pallets/{pallet_id}/results`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Notification that a new pallet is ready for inspection
///
/// # Examples
/// ```
/// use pallet_worker::protocol::PalletEvent;
///
/// let event = PalletEvent::new("P1");
/// assert_eq!(event.pallet_id, "P1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PalletEvent {
    pub pallet_id: String,
}

impl PalletEvent {
    pub fn new<S: Into<String>>(pallet_id: S) -> Self {
        Self {
            pallet_id: pallet_id.into(),
        }
    }
}

/// Pallet data as returned by the Quality API
///
/// Opaque pass-through: the worker never inspects its structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PalletData(pub Value);

impl PalletData {
    pub fn into_inner(self) -> Value {
        self.0
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for PalletData {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Result payload submitted back to the Quality API
///
/// # Examples
/// ```
/// use pallet_worker::protocol::{AnalysisResult, DetectedProduct, QualityCheck, QualityStatus};
///
/// let result = AnalysisResult {
///     custom_model_version: "1.2.3".to_string(),
///     detected_products: vec![DetectedProduct {
///         name: "Industrial Widget A".to_string(),
///         quantity: 15,
///         confidence: 0.95,
///     }],
///     quality_check: QualityCheck {
///         status: QualityStatus::Pass,
///         anomalies_detected: 0,
///     },
/// };
///
/// let json = serde_json::to_value(&result).unwrap();
/// assert_eq!(json["quality_check"]["status"], "PASS");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub custom_model_version: String,
    /// Order is preserved on the wire
    pub detected_products: Vec<DetectedProduct>,
    pub quality_check: QualityCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedProduct {
    pub name: String,
    pub quantity: u32,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityCheck {
    pub status: QualityStatus,
    pub anomalies_detected: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityStatus {
    Pass,
    Fail,
}

impl AnalysisResult {
    /// True when every detected product carries a confidence within [0, 1]
    pub fn confidences_in_range(&self) -> bool {
        self.detected_products
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            custom_model_version: "1.2.3".to_string(),
            detected_products: vec![
                DetectedProduct {
                    name: "Industrial Widget A".to_string(),
                    quantity: 15,
                    confidence: 0.95,
                },
                DetectedProduct {
                    name: "Industrial Widget B".to_string(),
                    quantity: 10,
                    confidence: 0.89,
                },
            ],
            quality_check: QualityCheck {
                status: QualityStatus::Pass,
                anomalies_detected: 0,
            },
        }
    }

    #[test]
    fn test_analysis_result_wire_shape() {
        let value = serde_json::to_value(sample_result()).unwrap();

        assert_eq!(
            value,
            json!({
                "custom_model_version": "1.2.3",
                "detected_products": [
                    {"name": "Industrial Widget A", "quantity": 15, "confidence": 0.95},
                    {"name": "Industrial Widget B", "quantity": 10, "confidence": 0.89}
                ],
                "quality_check": {"status": "PASS", "anomalies_detected": 0}
            })
        );
    }

    #[test]
    fn test_quality_status_serialization() {
        assert_eq!(serde_json::to_string(&QualityStatus::Pass).unwrap(), "\"PASS\"");
        assert_eq!(serde_json::to_string(&QualityStatus::Fail).unwrap(), "\"FAIL\"");

        let parsed: QualityStatus = serde_json::from_str("\"FAIL\"").unwrap();
        assert_eq!(parsed, QualityStatus::Fail);
        assert!(serde_json::from_str::<QualityStatus>("\"pass\"").is_err());
    }

    #[test]
    fn test_pallet_data_is_transparent() {
        let raw = json!({"images": ["https://cdn/1.jpg"], "meta": {"line": 4}});
        let data: PalletData = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(data.as_value(), &raw);
        assert_eq!(serde_json::to_value(&data).unwrap(), raw);
    }

    #[test]
    fn test_confidences_in_range() {
        let mut result = sample_result();
        assert!(result.confidences_in_range());

        result.detected_products[0].confidence = 1.2;
        assert!(!result.confidences_in_range());
    }

    #[test]
    fn test_pallet_event_deserializes_from_broker_body() {
        let event: PalletEvent = serde_json::from_str(r#"{"pallet_id":"P1"}"#).unwrap();
        assert_eq!(event, PalletEvent::new("P1"));
    }
}
