#[cfg(feature = "desktop")]
pub mod detector;
pub mod landmark;
#[cfg(feature = "desktop")]
pub mod preprocess;

#[cfg(feature = "desktop")]
pub use detector::HandLandmarkDetector;
pub use landmark::{HandJoint, Landmark, LandmarkSet, PALM_RING};
#[cfg(feature = "desktop")]
pub use preprocess::preprocess_for_hand_landmarks;
