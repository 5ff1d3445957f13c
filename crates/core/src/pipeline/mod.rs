//! The link-processing pipeline: phases, transient-file tracking, the
//! loading indicator and the orchestrator tying them together.

mod indicator;
mod orchestrator;
mod phase;
mod tracker;

pub use indicator::LoadingIndicator;
pub use orchestrator::LinkPipeline;
pub use phase::PipelinePhase;
pub use tracker::TransientFileTracker;
