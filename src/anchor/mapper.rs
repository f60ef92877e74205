use nalgebra::Vector3;

use crate::hand::Landmark;

/// ランドマークの奥行きをレンダー空間の Z に変換する係数
pub const DEPTH_SCALE: f64 = 420.0;

/// 描画面のサイズ（ピクセル）。幅・高さとも 1 以上
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderExtent {
    width: u32,
    height: u32,
}

impl RenderExtent {
    /// どちらかが 0 なら None（映像がまだ来ていない）
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// 正規化ランドマークをレンダー空間へ
///
/// 原点は画面中央、X は右、Y は上（画像の Y は下向きなので反転）、
/// Z は奥行きを `DEPTH_SCALE` 倍したもの。
pub fn map_to_render_space(landmark: &Landmark, extent: RenderExtent) -> Vector3<f64> {
    let w = extent.width as f64;
    let h = extent.height as f64;
    Vector3::new(
        landmark.x as f64 * w - w / 2.0,
        h / 2.0 - landmark.y as f64 * h,
        landmark.depth() as f64 * DEPTH_SCALE,
    )
}
