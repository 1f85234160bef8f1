//! Shapes model server output into prediction records.
//!
//! Classification models score every tile against a fixed label list in one
//! batched call. Detection models only accept a single instance per call and
//! return zero or more boxes per tile, each of which becomes its own record.

use std::collections::BTreeMap;

use futures::{StreamExt, TryStreamExt, stream};
use serde::Deserialize;
use slippy::{GeoTransformer, PixelBox, Tile};
use tracing::debug;

use crate::error::{Error, Result};
use crate::payload::{Chip, PredictRequest};
use crate::record::{DETECTION_LABEL, PredictionRecord};
use crate::serving::{ModelServer, ModelType};

#[derive(Debug, Clone)]
pub enum Strategy {
    Classification { labels: Vec<String> },
    Detection { transformer: GeoTransformer },
}

impl Strategy {
    pub fn new(model_type: ModelType, labels: Vec<String>) -> Self {
        match model_type {
            ModelType::Classification => Strategy::Classification { labels },
            ModelType::ObjectDetection => Strategy::Detection {
                transformer: GeoTransformer::default(),
            },
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            Strategy::Classification { .. } => ModelType::Classification,
            Strategy::Detection { .. } => ModelType::ObjectDetection,
        }
    }

    /// Runs `chips` through the model. Detection calls may overlap up to
    /// `concurrency`, records still come out grouped by chip in input order.
    pub async fn predict(
        &self,
        server: &ModelServer,
        chips: &[Chip],
        prediction_id: &str,
        concurrency: usize,
    ) -> Result<Vec<PredictionRecord>> {
        match self {
            Strategy::Classification { labels } => {
                let scores: Vec<Vec<f64>> = server.predict(&PredictRequest::batch(chips)).await?;
                classification_records(chips, scores, labels, prediction_id)
            }
            Strategy::Detection { transformer } => {
                let per_tile: Vec<Vec<PredictionRecord>> = stream::iter(chips)
                    .map(|chip| async move {
                        let outputs: Vec<DetectionOutput> =
                            server.predict(&PredictRequest::single(chip)).await?;
                        let output = outputs.into_iter().next().ok_or_else(|| {
                            Error::alignment(format!("no prediction returned for {}", chip.tile))
                        })?;
                        detection_records(&chip.tile, &output, prediction_id, transformer)
                    })
                    .buffered(concurrency.max(1))
                    .try_collect()
                    .await?;
                Ok(per_tile.into_iter().flatten().collect())
            }
        }
    }
}

/// One record per chip, zipping each score vector against `labels`.
pub fn classification_records(
    chips: &[Chip],
    scores: Vec<Vec<f64>>,
    labels: &[String],
    prediction_id: &str,
) -> Result<Vec<PredictionRecord>> {
    if scores.len() != chips.len() {
        return Err(Error::alignment(format!(
            "{} predictions returned for {} tiles",
            scores.len(),
            chips.len()
        )));
    }
    chips
        .iter()
        .zip(scores)
        .map(|(chip, scores)| {
            if scores.len() != labels.len() {
                return Err(Error::alignment(format!(
                    "{} scores returned for {} labels on {}",
                    scores.len(),
                    labels.len(),
                    chip.tile
                )));
            }
            Ok(PredictionRecord {
                quadkey: chip.tile.quadkey(),
                geometry: None,
                predictions: labels.iter().cloned().zip(scores).collect(),
                prediction_id: prediction_id.to_string(),
            })
        })
        .collect()
}

/// Output of an object detection signature for a single image.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DetectionOutput {
    pub num_detections: f64,
    #[serde(default)]
    pub detection_scores: Vec<f64>,
    /// Normalized `[ymin, xmin, ymax, xmax]`.
    #[serde(default)]
    pub detection_boxes: Vec<[f64; 4]>,
}

pub fn detection_records(
    tile: &Tile,
    output: &DetectionOutput,
    prediction_id: &str,
    transformer: &GeoTransformer,
) -> Result<Vec<PredictionRecord>> {
    let n = output.num_detections;
    if !n.is_finite() || n < 0.0 {
        return Err(Error::alignment(format!(
            "invalid num_detections {n} for {tile}"
        )));
    }
    let n = n.trunc() as usize;
    if n == 0 {
        return Ok(vec![]);
    }
    let (Some(scores), Some(boxes)) = (
        output.detection_scores.get(..n),
        output.detection_boxes.get(..n),
    ) else {
        return Err(Error::alignment(format!(
            "{tile} reported {n} detections but returned {} scores and {} boxes",
            output.detection_scores.len(),
            output.detection_boxes.len()
        )));
    };
    debug!(%tile, detections = n, "detections");

    let size = f64::from(transformer.raster_size());
    let quadkey = tile.quadkey();
    Ok(scores
        .iter()
        .zip(boxes)
        .map(|(&score, &[ymin, xmin, ymax, xmax])| {
            let pixels = PixelBox::new(xmin * size, ymin * size, xmax * size, ymax * size);
            PredictionRecord {
                quadkey: quadkey.clone(),
                geometry: Some(transformer.pixel_box_to_polygon(tile, pixels)),
                predictions: BTreeMap::from([(DETECTION_LABEL.to_string(), score)]),
                prediction_id: prediction_id.to_string(),
            }
        })
        .collect())
}
