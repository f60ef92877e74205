use anyhow::{bail, Context, Result};
use minifb::{Key, KeyRepeat, ScaleMode, Window, WindowOptions};
use opencv::core::Mat;
use opencv::prelude::*;

use crate::anchor::RenderExtent;
use crate::asset::ModelAsset;
use crate::hand::LandmarkSet;
use crate::overlay::Overlay;
use crate::render::scene::OverlayScene;
use crate::scheduler::OverlayRenderer;

/// minifbを使用したレンダラー
pub struct MinifbRenderer {
    window: Window,
    scene: OverlayScene,
}

impl MinifbRenderer {
    /// ウィンドウを作成。描画面のサイズは最初の映像フレームで決まる
    pub fn new(title: &str, width: usize, height: usize, draw_landmarks: bool) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                scale_mode: ScaleMode::AspectRatioStretch,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self {
            window,
            scene: OverlayScene::new(draw_landmarks),
        })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// 前回の更新以降に押されたキー
    pub fn keys_pressed(&self) -> Vec<Key> {
        self.window.get_keys_pressed(KeyRepeat::No)
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// 描画しないフレームでも入力イベントを処理する
    pub fn pump_events(&mut self) {
        self.window.update();
    }
}

impl OverlayRenderer for MinifbRenderer {
    type Frame = Mat;

    fn resize(&mut self, extent: RenderExtent) {
        self.scene.resize(extent);
    }

    fn attach_model(&mut self, model: ModelAsset) {
        self.scene.attach_model(model);
    }

    /// BGR Mat を背景バッファにコピー
    fn present_frame(&mut self, frame: &Mat) -> Result<()> {
        if frame.channels() != 3 {
            bail!("expected a 3-channel BGR frame, got {} channels", frame.channels());
        }
        let width = frame.cols() as usize;
        let height = frame.rows() as usize;
        let bytes = frame.data_bytes().context("camera frame is not continuous")?;
        self.scene.backdrop_mut().blit_bgr(bytes, width, height)
    }

    fn set_overlay(&mut self, overlay: &Overlay) {
        self.scene.set_overlay(overlay);
    }

    fn show_landmarks(&mut self, hand: Option<&LandmarkSet>) {
        self.scene.set_landmarks(hand);
    }

    /// 合成結果をウィンドウに表示
    fn render(&mut self) -> Result<()> {
        let canvas = self.scene.compose();
        if canvas.width() == 0 {
            self.window.update();
            return Ok(());
        }
        self.window
            .update_with_buffer(canvas.buffer(), canvas.width(), canvas.height())?;
        Ok(())
    }
}
