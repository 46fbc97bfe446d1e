//! State module for tracking run progress
//!
//! - `RunStage`: the stage a scrape run is in, and which moves are legal

mod run_stage;

pub use run_stage::RunStage;
