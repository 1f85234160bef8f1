//! Client for a TF Serving style model server.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::payload::PredictRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Classification,
    ObjectDetection,
}

/// Serving signatures that take an `inputs` tensor are object detectors.
const DETECTION_INPUT: &str = "inputs";

#[derive(Deserialize, Debug)]
pub struct ModelMetadata {
    metadata: MetadataBody,
}

#[derive(Deserialize, Debug)]
struct MetadataBody {
    signature_def: SignatureDefs,
}

#[derive(Deserialize, Debug)]
struct SignatureDefs {
    signature_def: Signatures,
}

#[derive(Deserialize, Debug)]
struct Signatures {
    serving_default: Signature,
}

#[derive(Deserialize, Debug)]
struct Signature {
    inputs: Map<String, Value>,
}

impl ModelMetadata {
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .signature_def
            .signature_def
            .serving_default
            .inputs
            .keys()
            .map(String::as_str)
    }

    pub fn model_type(&self) -> ModelType {
        if self.input_names().any(|name| name == DETECTION_INPUT) {
            ModelType::ObjectDetection
        } else {
            ModelType::Classification
        }
    }
}

#[derive(Deserialize, Debug)]
struct PredictResponse<T> {
    predictions: Vec<T>,
}

#[derive(Clone, Debug)]
pub struct ModelServer {
    client: reqwest::Client,
    endpoint: String,
}

impl ModelServer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        ModelServer { client, endpoint }
    }

    pub async fn metadata(&self) -> Result<ModelMetadata> {
        let url = format!("{}/metadata", self.endpoint);
        let err = |reason: String| Error::ServingMetadata(format!("{url}: {reason}"));
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| err(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(err(format!("HTTP {status}")));
        }
        let body = res.bytes().await.map_err(|e| err(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| err(format!("unexpected metadata schema: {e}")))
    }

    pub async fn model_type(&self) -> Result<ModelType> {
        let metadata = self.metadata().await?;
        let model_type = metadata.model_type();
        let inputs: Vec<&str> = metadata.input_names().collect();
        info!(?model_type, ?inputs, "detected model type");
        Ok(model_type)
    }

    /// Posts `request` to `:predict` and returns one decoded entry per instance.
    pub async fn predict<T: DeserializeOwned>(&self, request: &PredictRequest<'_>) -> Result<Vec<T>> {
        let url = format!("{}:predict", self.endpoint);
        let err = |reason: String| Error::PredictionRequest(format!("{url}: {reason}"));
        debug!(instances = request.instances.len(), "sending predict request");
        let res = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| err(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(err(format!("HTTP {status}: {body}")));
        }
        let body = res.bytes().await.map_err(|e| err(e.to_string()))?;
        let response: PredictResponse<T> =
            serde_json::from_slice(&body).map_err(|e| err(format!("unexpected response: {e}")))?;
        Ok(response.predictions)
    }
}
