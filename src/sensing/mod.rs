pub mod controller;
pub mod fingerprint;
pub mod frame;
mod loop_worker;
pub mod sampler;
pub mod stability;

pub use controller::SamplingController;
pub use fingerprint::{compute_hamming_distance, Fingerprint, FingerprintMode};
pub use frame::{Frame, ImagePayload};
pub use sampler::{FrameSampler, VideoSource};
pub use stability::{frame_similarity, StabilityConfig, StabilityDetector};
