pub mod basis;
pub mod mapper;
pub mod synth;

pub use basis::{solve_basis, PalmBasis, FALLBACK_NORMAL};
pub use mapper::{map_to_render_space, RenderExtent, DEPTH_SCALE};
pub use synth::{base_scale, final_scale, palm_width_pixels, synthesize_pose, OverlayPose};
