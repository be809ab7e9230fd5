//! Card-side stages of the symbol matching pipeline.
//!
//! A photograph goes through [`CardLocator`] (circular cards), then
//! [`CardNormalizer`] (one shared square frame), then [`ObjectSegmenter`]
//! (plausible symbol contours). [`CardDetector`] bundles the three behind the
//! operations the comparison loop uses.

pub mod builder;
pub mod config;
pub mod detector;
pub mod error;
pub mod locator;
pub mod normalizer;
pub mod segmenter;
pub mod types;

pub use builder::{CardDetectorBuilder, DEFAULT_CROP_MARGIN};
pub use config::{LocatorConfig, SegmenterConfig};
pub use detector::CardDetector;
pub use error::{DetectError, DetectResult};
pub use locator::CardLocator;
pub use normalizer::CardNormalizer;
pub use segmenter::{crop_object, ObjectSegmenter, Rejection};
pub use types::{Card, ContourRegion, NormalizedCard};
