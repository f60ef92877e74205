use nalgebra::{UnitQuaternion, Vector3};

use super::basis::{solve_basis, PalmBasis};
use super::mapper::{map_to_render_space, RenderExtent};
use crate::hand::{HandJoint, LandmarkSet, PALM_RING};

/// baseScale = 1 になる掌幅（ピクセル）
pub const REFERENCE_PALM_WIDTH: f64 = 180.0;
pub const BASE_SCALE_MIN: f64 = 0.3;
pub const BASE_SCALE_MAX: f64 = 2.5;
pub const FINAL_SCALE_MIN: f64 = 0.2;
pub const FINAL_SCALE_MAX: f64 = 8.0;
/// 掌面から法線方向へ浮かせる距離
pub const SURFACE_OFFSET: f64 = 40.0;

/// オーバーレイの剛体変換 + 一様スケール
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPose {
    pub position: Vector3<f64>,
    pub basis: PalmBasis,
    pub scale: f64,
}

impl OverlayPose {
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.basis.orientation()
    }

    /// モデル座標の点をレンダー空間へ
    pub fn transform_point(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.basis.look_rotation() * (local * self.scale) + self.position
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.scale.is_finite()
            && self.basis.normal.iter().all(|c| c.is_finite())
            && self.basis.up.iter().all(|c| c.is_finite())
            && self.basis.right.iter().all(|c| c.is_finite())
    }
}

/// 人差し指と小指の付け根の距離（ピクセル、画像平面内）
pub fn palm_width_pixels(landmarks: &LandmarkSet, extent: RenderExtent) -> f64 {
    let index_base = landmarks.get(HandJoint::IndexMcp);
    let pinky_base = landmarks.get(HandJoint::PinkyMcp);
    let dx = (index_base.x - pinky_base.x) as f64 * extent.width() as f64;
    let dy = (index_base.y - pinky_base.y) as f64 * extent.height() as f64;
    dx.hypot(dy)
}

pub fn base_scale(palm_width_pixels: f64) -> f64 {
    (palm_width_pixels / REFERENCE_PALM_WIDTH).clamp(BASE_SCALE_MIN, BASE_SCALE_MAX)
}

pub fn final_scale(base_scale: f64, scale_multiplier: f64) -> f64 {
    (base_scale * scale_multiplier).clamp(FINAL_SCALE_MIN, FINAL_SCALE_MAX)
}

/// 検出された手からオーバーレイの姿勢を合成する
///
/// 掌の中心は正規化座標で平均してからレンダー空間へ写す。
pub fn synthesize_pose(
    landmarks: &LandmarkSet,
    extent: RenderExtent,
    scale_multiplier: f64,
) -> OverlayPose {
    let center = map_to_render_space(&landmarks.average(&PALM_RING), extent);
    let basis = solve_basis(landmarks, extent);

    let scale = final_scale(base_scale(palm_width_pixels(landmarks, extent)), scale_multiplier);
    let position = center + basis.normal * SURFACE_OFFSET;

    OverlayPose {
        position,
        basis,
        scale,
    }
}
