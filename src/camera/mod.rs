pub mod capture;

pub use capture::{CameraStream, OpenCvCamera, OpenCvCameraProvider};
