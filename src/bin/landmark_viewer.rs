use anyhow::{Context, Result};
use opencv::prelude::*;
use std::time::Instant;

use palm_overlay::anchor::{solve_basis, synthesize_pose, RenderExtent};
use palm_overlay::camera::OpenCvCamera;
use palm_overlay::config::Config;
use palm_overlay::hand::HandLandmarkDetector;
use palm_overlay::overlay::Overlay;
use palm_overlay::render::MinifbRenderer;
use palm_overlay::scheduler::{HandTracker, OverlayRenderer};
use palm_overlay::session::CaptureRequest;

/// 手ランドマークと掌の基底を確認するビューア（モデルなし）
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Landmark Viewer");
    println!("Press ESC to exit");

    let config = Config::load_or_default("config.toml");

    println!("Opening camera...");
    let mut camera =
        OpenCvCamera::open_with_config(config.camera.index, &CaptureRequest::from_config(&config.camera))?;
    let (width, height) = camera.resolution();
    println!("Camera resolution: {}x{}", width, height);

    println!("Loading model from {}...", config.tracker.model_path);
    let mut detector = HandLandmarkDetector::new(&config.tracker)?;
    println!("Model loaded");

    let mut renderer = MinifbRenderer::new("Landmark Viewer", width as usize, height as usize, true)?;
    let mut extent: Option<RenderExtent> = None;

    // FPS計測用
    let started = Instant::now();
    let mut frame_count = 0u32;
    let mut hand_count = 0u32;
    let mut fps_timer = Instant::now();

    while renderer.is_open() {
        let frame = match camera.read_frame() {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Frame capture error: {}", e);
                continue;
            }
        };

        let frame_extent = RenderExtent::new(frame.cols() as u32, frame.rows() as u32)
            .context("camera returned an empty frame")?;
        if extent != Some(frame_extent) {
            renderer.resize(frame_extent);
            extent = Some(frame_extent);
        }

        let hands = detector.detect(&frame, started.elapsed().as_secs_f64() * 1000.0)?;
        let hand = hands.first();

        renderer.present_frame(&frame)?;
        renderer.show_landmarks(hand);
        renderer.set_overlay(&Overlay::hidden());
        renderer.render()?;

        frame_count += 1;
        if let Some(hand) = hand {
            hand_count += 1;
            let elapsed = fps_timer.elapsed().as_secs_f32();
            if elapsed >= 1.0 {
                let basis = solve_basis(hand, frame_extent);
                let pose = synthesize_pose(hand, frame_extent, config.overlay.scale_multiplier);
                println!(
                    "normal: ({:.2}, {:.2}, {:.2}), scale: {:.2}",
                    basis.normal.x, basis.normal.y, basis.normal.z, pose.scale
                );
            }
        }

        let elapsed = fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            println!(
                "FPS: {:.1}, hand detected in {}/{} frames",
                frame_count as f32 / elapsed,
                hand_count,
                frame_count
            );
            frame_count = 0;
            hand_count = 0;
            fps_timer = Instant::now();
        }
    }

    println!("Shutting down...");
    Ok(())
}
