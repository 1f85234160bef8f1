use reqwest::Url;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::PredictionBatch;

/// Posts finished batches to the result store. No deduplication happens
/// here: a redelivered batch is stored twice unless the store drops it.
#[derive(Clone, Debug)]
pub struct ResultSink {
    client: reqwest::Client,
    endpoint: String,
}

impl ResultSink {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        ResultSink { client, endpoint }
    }

    /// `prediction_id` is percent-encoded as a single path segment.
    pub fn url(&self, prediction_id: &str) -> Result<Url> {
        let err = |reason: String| Error::Sink(format!("{}: {reason}", self.endpoint));
        let mut url = Url::parse(&self.endpoint).map_err(|e| err(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| err("not a base URL".to_string()))?
            .pop_if_empty()
            .extend(["v1", "model", "prediction", prediction_id, "tiles"]);
        Ok(url)
    }

    pub async fn save(&self, batch: &PredictionBatch) -> Result<()> {
        let url = self.url(&batch.prediction_id)?;
        let err = |reason: String| Error::Sink(format!("{url}: {reason}"));
        let res = self
            .client
            .post(url.clone())
            .json(batch)
            .send()
            .await
            .map_err(|e| err(e.to_string()))?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        debug!(%status, %body, "result store response");
        if !status.is_success() {
            return Err(err(format!("HTTP {status}: {body}")));
        }
        info!(records = batch.predictions.len(), "saved predictions");
        Ok(())
    }
}
