use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

use super::mapper::{map_to_render_space, RenderExtent};
use crate::hand::{HandJoint, LandmarkSet};

/// 法線が求まらない（3 点が一直線）ときの既定法線
pub const FALLBACK_NORMAL: Vector3<f64> = Vector3::new(0.0, 0.0, -1.0);

/// これ未満の長さのベクトルは退化とみなす
const DEGENERATE_EPSILON: f64 = 1e-9;

/// 掌の向きを表す正規直交基底
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmBasis {
    /// 掌の法線（カメラ側、Z が負）
    pub normal: Vector3<f64>,
    /// 手首から中指の付け根へ向かう方向
    pub up: Vector3<f64>,
    /// `up × normal`
    pub right: Vector3<f64>,
}

impl PalmBasis {
    /// オブジェクトを `position - normal` に向けたときの回転
    ///
    /// ローカル軸は X = -right, Y = up, Z = -normal。
    pub fn look_rotation(&self) -> Rotation3<f64> {
        let m = Matrix3::from_columns(&[-self.right, self.up, -self.normal]);
        Rotation3::from_matrix_unchecked(m)
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_rotation_matrix(&self.look_rotation())
    }
}

/// 手首・人差し指/小指/中指の付け根から掌の基底を求める
///
/// 有限な入力に対しては常に単位長・直交の基底を返す。
pub fn solve_basis(landmarks: &LandmarkSet, extent: RenderExtent) -> PalmBasis {
    let wrist = map_to_render_space(landmarks.get(HandJoint::Wrist), extent);
    let index_base = map_to_render_space(landmarks.get(HandJoint::IndexMcp), extent);
    let pinky_base = map_to_render_space(landmarks.get(HandJoint::PinkyMcp), extent);
    let middle_base = map_to_render_space(landmarks.get(HandJoint::MiddleMcp), extent);

    let index_vec = index_base - wrist;
    let pinky_vec = pinky_base - wrist;
    let normal = palm_normal(&index_vec, &pinky_vec);

    let up_ref = (middle_base - wrist)
        .try_normalize(DEGENERATE_EPSILON)
        .filter(|up| up.cross(&normal).norm() > DEGENERATE_EPSILON)
        .unwrap_or_else(|| reference_up(&normal));

    // 正規化済みで平行でないので 0 にはならない
    let right = up_ref.cross(&normal).normalize();
    let up = normal.cross(&right).normalize();

    PalmBasis { normal, up, right }
}

/// 外積から法線を作り、カメラ側（Z 負）に揃える
fn palm_normal(index_vec: &Vector3<f64>, pinky_vec: &Vector3<f64>) -> Vector3<f64> {
    let cross = index_vec.cross(pinky_vec);
    match cross.try_normalize(DEGENERATE_EPSILON) {
        None => FALLBACK_NORMAL,
        Some(n) if n.z > 0.0 => -n,
        Some(n) => n,
    }
}

/// up の参照が使えないときの代替軸
fn reference_up(normal: &Vector3<f64>) -> Vector3<f64> {
    let y = Vector3::y();
    if y.cross(normal).norm() > 1e-3 {
        y
    } else {
        Vector3::x()
    }
}
