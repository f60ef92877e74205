//! 背景映像・ワイヤーフレームモデル・骨格をキャンバスに合成する

use crate::anchor::RenderExtent;
use crate::asset::ModelAsset;
use crate::hand::{LandmarkSet, PALM_RING};
use crate::overlay::Overlay;
use crate::render::canvas::Canvas;
use crate::render::projection::OrthoProjection;
use crate::render::skeleton::{
    HAND_CONNECTIONS, LANDMARK_COLOR, PALM_RING_COLOR, SKELETON_COLOR, WIREFRAME_COLOR,
};

pub struct OverlayScene {
    backdrop: Canvas,
    frame: Canvas,
    projection: Option<OrthoProjection>,
    model: Option<ModelAsset>,
    overlay: Overlay,
    landmarks: Option<LandmarkSet>,
    draw_landmarks: bool,
}

impl OverlayScene {
    pub fn new(draw_landmarks: bool) -> Self {
        Self {
            backdrop: Canvas::new(0, 0),
            frame: Canvas::new(0, 0),
            projection: None,
            model: None,
            overlay: Overlay::hidden(),
            landmarks: None,
            draw_landmarks,
        }
    }

    pub fn projection(&self) -> Option<&OrthoProjection> {
        self.projection.as_ref()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// 描画面と投影をまとめて作り直す
    pub fn resize(&mut self, extent: RenderExtent) {
        let (w, h) = (extent.width() as usize, extent.height() as usize);
        self.backdrop.resize(w, h);
        self.frame.resize(w, h);
        self.projection = Some(OrthoProjection::new(extent));
    }

    pub fn attach_model(&mut self, model: ModelAsset) {
        self.model = Some(model);
    }

    /// 次に合成する背景
    pub fn backdrop_mut(&mut self) -> &mut Canvas {
        &mut self.backdrop
    }

    pub fn set_overlay(&mut self, overlay: &Overlay) {
        self.overlay = *overlay;
    }

    pub fn set_landmarks(&mut self, hand: Option<&LandmarkSet>) {
        self.landmarks = hand.cloned();
    }

    /// 背景の上にモデルと骨格を描いた結果
    pub fn compose(&mut self) -> &Canvas {
        self.frame.copy_from(&self.backdrop);

        let Some(projection) = self.projection else {
            return &self.frame;
        };

        if let (Some(model), Some(pose)) = (self.model.as_ref(), self.overlay.placement()) {
            for (a, b) in model.segments() {
                let pa = projection.project(&pose.transform_point(a));
                let pb = projection.project(&pose.transform_point(b));
                if let (Some((x0, y0)), Some((x1, y1))) = (pa, pb) {
                    self.frame.draw_line(
                        x0.round() as i32,
                        y0.round() as i32,
                        x1.round() as i32,
                        y1.round() as i32,
                        WIREFRAME_COLOR,
                    );
                }
            }
        }

        if self.draw_landmarks {
            if let Some(hand) = self.landmarks.as_ref() {
                let pixel = |joint| {
                    let (x, y) = projection.landmark_to_pixel(hand.get(joint));
                    (x.round() as i32, y.round() as i32)
                };
                for &(start, end) in HAND_CONNECTIONS.iter() {
                    let (x0, y0) = pixel(start);
                    let (x1, y1) = pixel(end);
                    self.frame.draw_line(x0, y0, x1, y1, SKELETON_COLOR);
                }
                for (i, lm) in hand.as_slice().iter().enumerate() {
                    let (x, y) = projection.landmark_to_pixel(lm);
                    let color = if PALM_RING.iter().any(|&j| j as usize == i) {
                        PALM_RING_COLOR
                    } else {
                        LANDMARK_COLOR
                    };
                    self.frame.draw_circle(x.round() as i32, y.round() as i32, 3, color);
                }
            }
        }

        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::synthesize_pose;
    use crate::scheduler::testing::open_palm;
    use nalgebra::Vector3;

    fn extent() -> RenderExtent {
        RenderExtent::new(640, 480).unwrap()
    }

    fn bar() -> ModelAsset {
        ModelAsset::new(
            vec![Vector3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)],
            vec![(0, 1)],
        )
        .unwrap()
    }

    fn count(canvas: &Canvas, color: u32) -> usize {
        canvas.buffer().iter().filter(|&&p| p == color).count()
    }

    #[test]
    fn test_compose_without_extent_is_empty() {
        let mut scene = OverlayScene::new(true);
        assert!(scene.compose().buffer().is_empty());
    }

    #[test]
    fn test_wireframe_drawn_only_when_visible() {
        let mut scene = OverlayScene::new(false);
        scene.resize(extent());
        scene.attach_model(bar());
        let pose = synthesize_pose(&open_palm(), extent(), 1.0);

        scene.set_overlay(&Overlay {
            visible: false,
            pose: Some(pose),
        });
        assert_eq!(count(scene.compose(), WIREFRAME_COLOR), 0);

        scene.set_overlay(&Overlay {
            visible: true,
            pose: Some(pose),
        });
        assert!(count(scene.compose(), WIREFRAME_COLOR) > 0);
    }

    #[test]
    fn test_backdrop_kept_between_compositions() {
        let mut scene = OverlayScene::new(false);
        scene.resize(extent());
        scene.attach_model(bar());
        scene.backdrop_mut().fill(0x101010);
        let pose = synthesize_pose(&open_palm(), extent(), 1.0);
        scene.set_overlay(&Overlay {
            visible: true,
            pose: Some(pose),
        });
        scene.compose();

        // 非表示に戻したら線は残らない
        scene.set_overlay(&Overlay::hidden());
        let frame = scene.compose();
        assert_eq!(count(frame, WIREFRAME_COLOR), 0);
        assert_eq!(count(frame, 0x101010), 640 * 480);
    }

    #[test]
    fn test_landmarks_drawn_when_enabled() {
        let mut scene = OverlayScene::new(true);
        scene.resize(extent());
        scene.set_landmarks(Some(&open_palm()));
        assert!(count(scene.compose(), PALM_RING_COLOR) > 0);

        scene.set_landmarks(None);
        assert_eq!(count(scene.compose(), PALM_RING_COLOR), 0);
    }
}
