pub mod config;
pub mod geometry;
pub mod resample;

pub use config::{ConfigError, DEFAULT_WORKING_RESOLUTION, PipelineConfig};
pub use geometry::{BoundingRect, Circle};

/// Row-major 8-bit grayscale image
pub type Image = image::GrayImage;

/// Length of every feature vector produced for a keypoint
pub const DESCRIPTOR_LEN: usize = 64;

/// Real-valued, L2-normalised feature vector
pub type Descriptor = [f32; DESCRIPTOR_LEN];

/// Key-point ≙ corner location + orientation (radians) + detection scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Pyramid scale the keypoint was found at (1.0 = full resolution)
    pub scale: f32,
    /// Corner response used for suppression ordering
    pub response: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            scale: 1.0,
            response: 0.0,
        }
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
