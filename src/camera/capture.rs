use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs, VideoCaptureTrait},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::scheduler::{VideoFrame, VideoSource};
use crate::session::{CameraProvider, CaptureRequest};

/// 連続してこの回数読み込みに失敗したらストリーム終了とみなす
const MAX_CONSECUTIVE_FAILURES: u32 = 100;

/// OpenCVを使用したカメラキャプチャ
pub struct OpenCvCamera {
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl OpenCvCamera {
    /// 希望解像度とFPSを指定してカメラを開く
    pub fn open_with_config(index: i32, request: &CaptureRequest) -> Result<Self> {
        let mut capture =
            VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32).context("Failed to open camera")?;

        if !capture.is_opened()? {
            anyhow::bail!("Camera {} is not available", index);
        }

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, request.width as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, request.height as f64)?;
        capture.set(videoio::CAP_PROP_FPS, request.fps as f64)?;
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        let actual_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let actual_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let actual_fps = capture.get(videoio::CAP_PROP_FPS)?;
        info!(
            "camera {} opened: {}x{} @ {} fps (requested {}x{})",
            index, actual_width, actual_height, actual_fps, request.width, request.height
        );

        Ok(Self {
            capture,
            width: actual_width,
            height: actual_height,
        })
    }

    /// ドライバが報告する解像度。実際のフレームと異なる場合がある
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// フレームを読み込む（BGR形式）
    pub fn read_frame(&mut self) -> Result<Mat> {
        let mut frame = Mat::default();
        self.capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if frame.empty() {
            anyhow::bail!("Empty frame received");
        }

        Ok(frame)
    }
}

struct LatestFrame {
    frame: Mat,
    /// ストリーム開始からの秒数
    time: f64,
}

struct Shared {
    latest: Mutex<Option<LatestFrame>>,
    failure: Mutex<Option<CaptureError>>,
    running: AtomicBool,
    alive: AtomicBool,
    /// デバイスを開き終えたか
    opened: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            failure: Mutex::new(None),
            running: AtomicBool::new(true),
            alive: AtomicBool::new(true),
            opened: AtomicBool::new(false),
        }
    }
}

/// 別スレッドでカメラを開いてキャプチャを続け、最新フレームを提供する
///
/// drop するとキャプチャスレッドを止めてデバイスを解放する。
/// デバイスを開いている途中なら待たずにスレッドを切り離し、開き終えた時点で終了させる。
pub struct CameraStream {
    shared: Arc<Shared>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn spawn(index: i32, request: CaptureRequest) -> Self {
        let shared = Arc::new(Shared::new());
        let shared_ref = shared.clone();

        let handle = thread::spawn(move || {
            let camera = match OpenCvCamera::open_with_config(index, &request) {
                Ok(camera) => camera,
                Err(e) => {
                    warn!("{:#}", e);
                    if let Ok(mut failure) = shared_ref.failure.lock() {
                        *failure = Some(CaptureError::Unavailable { index });
                    }
                    shared_ref.alive.store(false, Ordering::Release);
                    return;
                }
            };
            shared_ref.opened.store(true, Ordering::Release);
            capture_loop(camera, &shared_ref);
        });

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// 最初のフレームが届いたか
    pub fn has_frame(&self) -> bool {
        self.shared
            .latest
            .lock()
            .map(|latest| latest.is_some())
            .unwrap_or(false)
    }

    fn take_failure(&self) -> Option<CaptureError> {
        self.shared.failure.lock().ok()?.take()
    }
}

fn capture_loop(mut camera: OpenCvCamera, shared: &Shared) {
    let started = Instant::now();
    let mut failures = 0u32;

    while shared.running.load(Ordering::Acquire) {
        match camera.read_frame() {
            Ok(frame) => {
                failures = 0;
                let time = started.elapsed().as_secs_f64();
                match shared.latest.lock() {
                    Ok(mut latest) => *latest = Some(LatestFrame { frame, time }),
                    Err(_) => break,
                }
            }
            Err(e) => {
                failures += 1;
                debug!("{:#}", e);
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    error!("camera stopped delivering frames: {:#}", e);
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
    shared.alive.store(false, Ordering::Release);
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return;
        };
        // VideoCapture::new はブロックするので、開いている途中なら切り離す
        if !self.shared.opened.load(Ordering::Acquire) && !handle.is_finished() {
            debug!("detaching camera thread that is still opening the device");
            return;
        }
        if handle.join().is_err() {
            warn!("camera thread panicked");
        }
    }
}

impl VideoSource for CameraStream {
    type Frame = Mat;

    /// 最新フレームを取得。カメラスレッドが新フレームを書き込むまで同じフレームが返る
    fn latest_frame(&self) -> Option<VideoFrame<Mat>> {
        let latest = self.shared.latest.lock().ok()?;
        let l = latest.as_ref()?;
        Some(VideoFrame {
            frame: l.frame.clone(),
            time: l.time,
            width: l.frame.cols() as u32,
            height: l.frame.rows() as u32,
        })
    }

    fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }
}

/// 要求ごとにキャプチャスレッドを立て、最初のフレームが届いたら許可とみなす
pub struct OpenCvCameraProvider {
    index: i32,
    open_timeout: Duration,
    pending: Option<(CameraStream, Instant)>,
}

impl OpenCvCameraProvider {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            index: config.index,
            open_timeout: Duration::from_millis(config.open_timeout_ms),
            pending: None,
        }
    }
}

impl CameraProvider for OpenCvCameraProvider {
    type Stream = CameraStream;

    fn request(&mut self, request: &CaptureRequest) -> Result<(), CaptureError> {
        info!("requesting camera {}", self.index);
        self.pending = Some((CameraStream::spawn(self.index, *request), Instant::now()));
        Ok(())
    }

    fn poll(&mut self) -> Option<Result<CameraStream, CaptureError>> {
        let (stream, requested_at) = self.pending.take()?;

        if stream.has_frame() {
            return Some(Ok(stream));
        }
        if let Some(failure) = stream.take_failure() {
            return Some(Err(failure));
        }
        if !stream.is_alive() {
            return Some(Err(CaptureError::Backend("capture thread exited".to_string())));
        }
        if requested_at.elapsed() >= self.open_timeout {
            return Some(Err(CaptureError::NoFrames {
                index: self.index,
                timeout: self.open_timeout,
            }));
        }

        self.pending = Some((stream, requested_at));
        None
    }

    fn cancel(&mut self) {
        self.pending = None;
    }
}
