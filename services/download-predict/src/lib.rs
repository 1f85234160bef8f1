//! Batch inference over map tiles: fetch imagery for each tile, run it
//! through a TF Serving model and post geolocated predictions to the
//! result store.

pub mod batch;
pub mod config;
pub mod error;
pub mod imagery;
pub mod payload;
pub mod pipeline;
pub mod postprocess;
pub mod record;
pub mod serving;
pub mod sink;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use record::{PredictionBatch, PredictionRecord};
pub use serving::ModelType;
