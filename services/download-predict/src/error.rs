use miette::Diagnostic;
use thiserror::Error;

/// Every variant aborts the batch; redelivery is left to whatever invoked us.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("malformed tile message #{index}: {reason}")]
    #[diagnostic(code(download_predict::malformed_tile_message))]
    MalformedTileMessage { index: usize, reason: String },
    #[error("serving metadata: {0}")]
    #[diagnostic(
        code(download_predict::serving_metadata),
        help("check that `prediction_endpoint` points at a TF Serving model")
    )]
    ServingMetadata(String),
    #[error("imagery fetch for {tile}: {reason}")]
    #[diagnostic(code(download_predict::imagery_fetch))]
    ImageryFetch { tile: String, reason: String },
    /// The `:predict` call itself failed (transport, non-success status, undecodable
    /// body). Same fatal class as `PredictionAlignment` and `ImageryFetch`.
    #[error("prediction request: {0}")]
    #[diagnostic(code(download_predict::prediction_request))]
    PredictionRequest(String),
    #[error("prediction alignment: {0}")]
    #[diagnostic(code(download_predict::prediction_alignment))]
    PredictionAlignment(String),
    #[error("result sink: {0}")]
    #[diagnostic(code(download_predict::sink))]
    Sink(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn imagery(tile: &slippy::Tile, reason: impl ToString) -> Self {
        Error::ImageryFetch {
            tile: tile.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn alignment(reason: impl Into<String>) -> Self {
        Error::PredictionAlignment(reason.into())
    }
}
