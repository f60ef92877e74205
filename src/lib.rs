pub mod anchor;
pub mod asset;
#[cfg(feature = "desktop")]
pub mod camera;
pub mod config;
pub mod error;
pub mod hand;
pub mod overlay;
pub mod render;
pub mod scheduler;
pub mod session;
