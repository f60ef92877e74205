pub mod canvas;
pub mod projection;
pub mod scene;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

pub use canvas::Canvas;
pub use projection::OrthoProjection;
pub use scene::OverlayScene;
pub use skeleton::HAND_CONNECTIONS;

#[cfg(feature = "desktop")]
pub use minifb::Key;
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;
