//! Symbol description and matching.
//!
//! FAST-9 corners over a small pyramid, intensity-centroid orientation and a
//! 64-float gradient descriptor per corner. Two symbols match when enough
//! descriptors of the second find a close neighbour among the first.

pub mod descriptor;
pub mod error;
pub mod fast;
pub mod index;
pub mod matcher;
pub mod orientation;
pub mod pyramid;

pub use descriptor::{DescriptorConfig, DescriptorExtractor, descriptor_distance};
pub use error::{FeatureError, FeatureResult};
pub use fast::{FastConfig, FastDetector};
pub use index::{DescriptorIndex, DescriptorMatch};
pub use matcher::{DescriptorSet, MatchVerdict, MatcherConfig, SymbolMatcher, count_good_matches};
pub use pyramid::PyramidConfig;
