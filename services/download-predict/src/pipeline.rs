use serde_json::Value;
use tracing::{Instrument, info, info_span};

use crate::batch::extract_tiles;
use crate::config::Config;
use crate::error::Result;
use crate::imagery::{ImageryFetcher, ImageryMode};
use crate::payload::build_chips;
use crate::postprocess::Strategy;
use crate::record::PredictionBatch;
use crate::serving::ModelServer;
use crate::sink::ResultSink;

/// One batch invocation: tiles -> imagery -> model -> records -> store.
#[derive(Clone, Debug)]
pub struct Pipeline {
    imagery: ImageryFetcher,
    mode: ImageryMode,
    server: ModelServer,
    sink: ResultSink,
    prediction_id: String,
    labels: Vec<String>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        let concurrency = config.concurrency.max(1);
        Pipeline {
            imagery: ImageryFetcher::new(client.clone(), config.imagery.clone())
                .with_concurrency(concurrency),
            mode: config.imagery_mode(),
            server: ModelServer::new(client.clone(), config.prediction_endpoint.clone()),
            sink: ResultSink::new(client, config.mlenabler_endpoint.clone()),
            prediction_id: config.prediction_id.clone(),
            labels: config.inferences.clone(),
            concurrency,
        }
    }

    /// Produces the full record list without touching the result store.
    pub async fn run(&self, event: &Value) -> Result<PredictionBatch> {
        let span = info_span!("batch", prediction_id = %self.prediction_id);
        self.predict(event).instrument(span).await
    }

    /// Runs the batch and stores it; nothing is stored if any stage fails.
    pub async fn run_and_save(&self, event: &Value) -> Result<PredictionBatch> {
        let batch = self.run(event).await?;
        self.sink
            .save(&batch)
            .instrument(info_span!("sink", prediction_id = %self.prediction_id))
            .await?;
        Ok(batch)
    }

    async fn predict(&self, event: &Value) -> Result<PredictionBatch> {
        let tiles = extract_tiles(event)?;
        let mut batch = PredictionBatch {
            prediction_id: self.prediction_id.clone(),
            predictions: vec![],
        };
        if tiles.is_empty() {
            info!("empty batch");
            return Ok(batch);
        }
        info!(tiles = tiles.len(), mode = ?self.mode, "processing batch");

        let model_type = self.server.model_type().await?;
        let rasters = self.imagery.fetch(self.mode, &tiles).await?;
        let chips = build_chips(rasters, model_type);
        let strategy = Strategy::new(model_type, self.labels.clone());
        batch.predictions = strategy
            .predict(&self.server, &chips, &self.prediction_id, self.concurrency)
            .await?;
        info!(
            chips = chips.len(),
            records = batch.predictions.len(),
            "batch predicted"
        );
        Ok(batch)
    }
}
