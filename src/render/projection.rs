use nalgebra::Vector3;

use crate::anchor::RenderExtent;
use crate::hand::Landmark;

/// カメラ位置（Z）
pub const CAMERA_Z: f64 = 500.0;
/// カメラから見た手前側のクリップ距離
pub const NEAR: f64 = -1000.0;
/// カメラから見た奥側のクリップ距離
pub const FAR: f64 = 1000.0;

/// z = 500 から -Z 方向を見る正射影カメラ
///
/// 視錐台は `[-W/2, W/2] x [-H/2, H/2]` なので、レンダー空間の 1 単位が描画面の 1 ピクセルになる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrthoProjection {
    extent: RenderExtent,
}

impl OrthoProjection {
    pub fn new(extent: RenderExtent) -> Self {
        Self { extent }
    }

    pub fn extent(&self) -> RenderExtent {
        self.extent
    }

    /// レンダー空間の点を描画面のピクセル座標へ。クリップ範囲外なら None
    pub fn project(&self, point: &Vector3<f64>) -> Option<(f64, f64)> {
        if !point.iter().all(|c| c.is_finite()) {
            return None;
        }
        let distance = CAMERA_Z - point.z;
        if !(NEAR..=FAR).contains(&distance) {
            return None;
        }
        let w = self.extent.width() as f64;
        let h = self.extent.height() as f64;
        Some((point.x + w / 2.0, h / 2.0 - point.y))
    }

    /// 正規化ランドマークを直接ピクセル座標へ（骨格表示用）
    pub fn landmark_to_pixel(&self, landmark: &Landmark) -> (f64, f64) {
        (
            landmark.x as f64 * self.extent.width() as f64,
            landmark.y as f64 * self.extent.height() as f64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::map_to_render_space;

    fn projection() -> OrthoProjection {
        OrthoProjection::new(RenderExtent::new(640, 480).unwrap())
    }

    #[test]
    fn test_origin_projects_to_centre() {
        assert_eq!(projection().project(&Vector3::zeros()), Some((320.0, 240.0)));
    }

    #[test]
    fn test_corners() {
        let p = projection();
        assert_eq!(p.project(&Vector3::new(-320.0, 240.0, 0.0)), Some((0.0, 0.0)));
        assert_eq!(p.project(&Vector3::new(320.0, -240.0, 0.0)), Some((640.0, 480.0)));
    }

    #[test]
    fn test_clip_range() {
        let p = projection();
        assert!(p.project(&Vector3::new(0.0, 0.0, -500.0)).is_some());
        assert!(p.project(&Vector3::new(0.0, 0.0, 1500.0)).is_some());
        assert!(p.project(&Vector3::new(0.0, 0.0, -501.0)).is_none());
        assert!(p.project(&Vector3::new(0.0, 0.0, 1501.0)).is_none());
        assert!(p.project(&Vector3::new(f64::NAN, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_mapper_and_projection_agree() {
        let p = projection();
        let lm = Landmark::with_depth(0.25, 0.75, 0.1);
        let (px, py) = p.project(&map_to_render_space(&lm, p.extent())).unwrap();
        let (ex, ey) = p.landmark_to_pixel(&lm);
        assert!((px - ex).abs() < 1e-4, "x: {} vs {}", px, ex);
        assert!((py - ey).abs() < 1e-4, "y: {} vs {}", py, ey);
    }
}
