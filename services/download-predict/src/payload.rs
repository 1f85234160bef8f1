//! Encodes fetched rasters into model server instances.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;
use slippy::Tile;

use crate::imagery::Raster;
use crate::serving::ModelType;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct B64 {
    pub b64: String,
}

/// One model input. Serializes as `{"image_bytes": {"b64": ..}}` or `{"inputs": {"b64": ..}}`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Instance {
    Classification { image_bytes: B64 },
    Detection { inputs: B64 },
}

impl Instance {
    pub fn encode(model_type: ModelType, raster: &[u8]) -> Self {
        let b64 = B64 {
            b64: STANDARD.encode(raster),
        };
        match model_type {
            ModelType::Classification => Instance::Classification { image_bytes: b64 },
            ModelType::ObjectDetection => Instance::Detection { inputs: b64 },
        }
    }
}

/// An encoded raster together with the tile it depicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    pub tile: Tile,
    pub instance: Instance,
}

/// Body of a `:predict` call.
#[derive(Serialize, Debug)]
pub struct PredictRequest<'a> {
    pub instances: Vec<&'a Instance>,
}

impl<'a> PredictRequest<'a> {
    pub fn batch(chips: &'a [Chip]) -> Self {
        PredictRequest {
            instances: chips.iter().map(|chip| &chip.instance).collect(),
        }
    }

    pub fn single(chip: &'a Chip) -> Self {
        PredictRequest {
            instances: vec![&chip.instance],
        }
    }
}

/// Raster content is not validated; a corrupt image surfaces as a model server error.
pub fn build_chips(rasters: Vec<Raster>, model_type: ModelType) -> Vec<Chip> {
    rasters
        .into_iter()
        .map(|raster| Chip {
            tile: raster.tile,
            instance: Instance::encode(model_type, &raster.bytes),
        })
        .collect()
}
