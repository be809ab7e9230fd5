//! Batch driver for finding symbols shared between circular cards.
//!
//! [`BatchRunner`] walks a directory of photographs and hands the located
//! cards to a [`ComparisonOrchestrator`], which decides for each card pair
//! whether some symbol appears on both.

pub mod batch;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod visualize;

#[cfg(test)]
mod test_images;

pub use batch::{BatchReport, BatchRunner, CardOrigin, format_report, list_images, load_grayscale};
pub use config::{BatchScope, FileSelection, OrchestratorConfig, PairScope, RunConfig, StopPolicy};
pub use error::{BatchError, BatchResult};
pub use orchestrator::{BatchOutcome, CardFeatures, CardPairMatch, ComparisonOrchestrator, ComparisonReport};
pub use visualize::{NullVisualizer, OverlayVisualizer, Visualizer};

pub use card_core::{self, PipelineConfig, init_thread_pool};
pub use card_detect::{self, CardDetector, CardDetectorBuilder};
pub use card_features::{self, SymbolMatcher};
