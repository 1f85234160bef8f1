use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slippy::Geometry;

/// Label a detection score is stored under.
pub const DETECTION_LABEL: &str = "default";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub quadkey: String,
    /// Detection footprint; classification records cover the whole tile and carry none.
    #[serde(rename = "quadkey_geom", default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    pub predictions: BTreeMap<String, f64>,
    pub prediction_id: String,
}

/// Request body for the result store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionBatch {
    #[serde(rename = "predictionId")]
    pub prediction_id: String,
    pub predictions: Vec<PredictionRecord>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_shape() {
        let batch = PredictionBatch {
            prediction_id: "7".to_string(),
            predictions: vec![
                PredictionRecord {
                    quadkey: "302".to_string(),
                    geometry: None,
                    predictions: BTreeMap::from([("building".to_string(), 0.25)]),
                    prediction_id: "7".to_string(),
                },
                PredictionRecord {
                    quadkey: "302".to_string(),
                    geometry: Some(Geometry::rect(0.0, 0.0, 1.0, 1.0)),
                    predictions: BTreeMap::from([(DETECTION_LABEL.to_string(), 0.5)]),
                    prediction_id: "7".to_string(),
                },
            ],
        };
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["predictionId"], "7");
        assert_eq!(
            value["predictions"][0],
            json!({ "quadkey": "302", "predictions": { "building": 0.25 }, "prediction_id": "7" })
        );
        assert_eq!(value["predictions"][1]["quadkey_geom"]["type"], "Polygon");
        let back: PredictionBatch = serde_json::from_value(value).unwrap();
        assert_eq!(back, batch);
    }
}
