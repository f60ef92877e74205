//! キャプチャとフレームループの開始・停止

use log::{error, info, warn};
use std::fmt;

use crate::asset::ModelLoader;
use crate::config::CameraConfig;
use crate::error::{CaptureError, SessionError};
use crate::overlay::{Overlay, OverlaySettings};
use crate::scheduler::{
    FrameScheduler, HandTracker, OverlayRenderer, RepaintScheduler, TickOutcome, VideoSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Loading,
    Ready,
    /// 読み込み失敗。オーバーレイはずっと非表示
    Failed,
}

/// ユーザー向けの状態表示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    ModelLoading,
    RequestingCamera,
    Ready,
    CameraUnavailable,
    Stopped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::ModelLoading => "model loading",
            Status::RequestingCamera => "requesting camera",
            Status::Ready => "ready",
            Status::CameraUnavailable => "camera unavailable",
            Status::Stopped => "stopped",
        };
        f.write_str(text)
    }
}

pub trait StatusSink {
    fn publish(&mut self, status: Status);
}

impl StatusSink for Vec<Status> {
    fn publish(&mut self, status: Status) {
        self.push(status);
    }
}

/// 最新の状態を保持し、変化をログに流す
#[derive(Debug, Default)]
pub struct StatusLine {
    current: Option<Status>,
}

impl StatusLine {
    pub fn current(&self) -> Option<Status> {
        self.current
    }
}

impl StatusSink for StatusLine {
    fn publish(&mut self, status: Status) {
        if self.current != Some(status) {
            info!("status: {}", status);
        }
        self.current = Some(status);
    }
}

/// カメラに要求する条件（実際の解像度はストリーム次第）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// 利用者側を向いたカメラを優先
    pub user_facing: bool,
}

impl CaptureRequest {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            fps: config.fps,
            user_facing: true,
        }
    }
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

/// 非同期のカメラ取得
pub trait CameraProvider {
    type Stream: VideoSource;

    /// 取得を開始する。即座に拒否されたらエラー
    fn request(&mut self, request: &CaptureRequest) -> Result<(), CaptureError>;

    /// 取得待ちなら None
    fn poll(&mut self) -> Option<Result<Self::Stream, CaptureError>>;

    /// 取得待ちを破棄する
    fn cancel(&mut self) {}
}

type FrameOf<C> = <<C as CameraProvider>::Stream as VideoSource>::Frame;

pub struct Session<C: CameraProvider, T, R, P, L, S> {
    camera: C,
    stream: Option<C::Stream>,
    scheduler: FrameScheduler<T, R, P>,
    loader: L,
    model: ModelState,
    status: S,
    settings: OverlaySettings,
    capture: CaptureRequest,
    state: SessionState,
}

impl<C, T, R, P, L, S> Session<C, T, R, P, L, S>
where
    C: CameraProvider,
    T: HandTracker<Frame = FrameOf<C>>,
    R: OverlayRenderer<Frame = FrameOf<C>>,
    P: RepaintScheduler,
    L: ModelLoader,
    S: StatusSink,
{
    pub fn new(
        camera: C,
        scheduler: FrameScheduler<T, R, P>,
        loader: L,
        mut status: S,
        settings: OverlaySettings,
        capture: CaptureRequest,
    ) -> Self {
        status.publish(if scheduler.has_tracker() {
            Status::Stopped
        } else {
            Status::ModelLoading
        });
        Self {
            camera,
            stream: None,
            scheduler,
            loader,
            model: ModelState::Loading,
            status,
            settings,
            capture,
            state: SessionState::Stopped,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model_state(&self) -> ModelState {
        self.model
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn overlay(&self) -> &Overlay {
        self.scheduler.overlay()
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn status_sink(&self) -> &S {
        &self.status
    }

    pub fn scheduler(&self) -> &FrameScheduler<T, R, P> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler<T, R, P> {
        &mut self.scheduler
    }

    pub fn is_tracker_ready(&self) -> bool {
        self.scheduler.has_tracker()
    }

    /// 検出モデルの読み込み完了
    pub fn install_tracker(&mut self, tracker: T) {
        self.scheduler.install_tracker(tracker);
        info!("hand tracker ready");
        if self.state == SessionState::Stopped {
            self.status.publish(Status::Stopped);
        }
    }

    pub fn set_scale_multiplier(&mut self, value: f64) {
        self.settings.set_scale_multiplier(value);
    }

    pub fn adjust_scale_multiplier(&mut self, steps: i32) {
        self.settings.adjust_scale_multiplier(steps);
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Stopped {
            return Ok(());
        }
        if !self.scheduler.has_tracker() {
            self.status.publish(Status::ModelLoading);
            return Err(SessionError::TrackerNotReady);
        }

        self.state = SessionState::Starting;
        self.status.publish(Status::RequestingCamera);
        if let Err(e) = self.camera.request(&self.capture) {
            return Err(self.fail_start(e));
        }
        // 即座に許可するカメラもある
        self.pump_camera()
    }

    /// 停止。以後ティックは走らず、ストリームを解放し、非表示で一度描画する
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        if self.state == SessionState::Starting {
            self.camera.cancel();
        }
        self.scheduler.deactivate();
        self.stream = None;
        self.state = SessionState::Stopped;
        self.status.publish(Status::Stopped);
        info!("session stopped");
    }

    /// 開始/停止ボタン
    pub fn toggle(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Stopped {
            self.start()
        } else {
            self.stop();
            Ok(())
        }
    }

    /// 協調ループ 1 回分: モデルとカメラの取得を進め、予約済みティックがあれば実行する
    pub fn poll(&mut self) {
        self.pump_model();
        if let Err(e) = self.pump_camera() {
            warn!("{}", e);
        }
        if self.scheduler.repaint_mut().take_due() {
            self.on_repaint();
        }
    }

    /// 再描画シグナル
    pub fn on_repaint(&mut self) -> TickOutcome {
        if self.state != SessionState::Running {
            return TickOutcome::Idle;
        }
        let Some(stream) = self.stream.as_ref() else {
            return TickOutcome::Idle;
        };
        if !stream.is_alive() {
            error!("camera stream ended");
            self.stop();
            self.status.publish(Status::CameraUnavailable);
            return TickOutcome::Idle;
        }
        let model_ready = self.model == ModelState::Ready;
        self.scheduler.tick(stream, &self.settings, model_ready)
    }

    fn pump_model(&mut self) {
        if self.model != ModelState::Loading {
            return;
        }
        match self.loader.poll() {
            None => {}
            Some(Ok(model)) => {
                info!(
                    "model loaded: {} vertices, {} edges",
                    model.vertices().len(),
                    model.edges().len()
                );
                self.scheduler.renderer_mut().attach_model(model);
                self.model = ModelState::Ready;
            }
            Some(Err(e)) => {
                error!("failed to load model: {}", e);
                self.model = ModelState::Failed;
            }
        }
    }

    fn pump_camera(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Starting {
            return Ok(());
        }
        match self.camera.poll() {
            None => Ok(()),
            Some(Ok(stream)) => {
                info!("camera granted");
                self.stream = Some(stream);
                self.state = SessionState::Running;
                self.status.publish(Status::Ready);
                self.scheduler.activate();
                Ok(())
            }
            Some(Err(e)) => Err(self.fail_start(e)),
        }
    }

    fn fail_start(&mut self, e: CaptureError) -> SessionError {
        warn!("camera request failed: {}", e);
        self.stream = None;
        self.state = SessionState::Stopped;
        self.status.publish(Status::CameraUnavailable);
        SessionError::CameraUnavailable(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::ModelAsset;
    use crate::error::AssetError;
    use crate::scheduler::testing::*;
    use nalgebra::Vector3;
    use std::collections::VecDeque;

    /// 予約された応答を返すカメラ
    #[derive(Default)]
    struct FakeCamera {
        refuse_request: bool,
        responses: VecDeque<Option<Result<FakeVideo, CaptureError>>>,
        requests: usize,
        cancels: usize,
    }

    impl FakeCamera {
        fn granting(video: &FakeVideo) -> Self {
            Self {
                responses: VecDeque::from([Some(Ok(video.clone()))]),
                ..Self::default()
            }
        }
    }

    impl CameraProvider for FakeCamera {
        type Stream = FakeVideo;

        fn request(&mut self, _request: &CaptureRequest) -> Result<(), CaptureError> {
            self.requests += 1;
            if self.refuse_request {
                return Err(CaptureError::Unavailable { index: 0 });
            }
            Ok(())
        }

        fn poll(&mut self) -> Option<Result<FakeVideo, CaptureError>> {
            self.responses.pop_front().flatten()
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    struct FakeLoader(Option<Result<ModelAsset, AssetError>>);

    impl ModelLoader for FakeLoader {
        fn poll(&mut self) -> Option<Result<ModelAsset, AssetError>> {
            self.0.take()
        }
    }

    fn model() -> ModelAsset {
        ModelAsset::new(
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)],
            vec![(0, 1)],
        )
        .unwrap()
    }

    type TestSession =
        Session<FakeCamera, FakeTracker, FakeRenderer, FakeRepaint, FakeLoader, Vec<Status>>;

    struct Harness {
        session: TestSession,
        tracker: FakeTracker,
        renderer: FakeRenderer,
        repaint: FakeRepaint,
    }

    fn harness(camera: FakeCamera, loader: FakeLoader, with_tracker: bool) -> Harness {
        let tracker = FakeTracker::default();
        let renderer = FakeRenderer::default();
        let repaint = FakeRepaint::default();
        let mut scheduler = FrameScheduler::new(renderer.clone(), repaint.clone());
        if with_tracker {
            scheduler.install_tracker(tracker.clone());
        }
        let session = Session::new(
            camera,
            scheduler,
            loader,
            Vec::new(),
            OverlaySettings::default(),
            CaptureRequest::default(),
        );
        Harness {
            session,
            tracker,
            renderer,
            repaint,
        }
    }

    #[test]
    fn test_capture_request_prefers_720p() {
        let request = CaptureRequest::default();
        assert_eq!((request.width, request.height), (1280, 720));
        assert!(request.user_facing);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(Status::ModelLoading.to_string(), "model loading");
        assert_eq!(Status::RequestingCamera.to_string(), "requesting camera");
        assert_eq!(Status::Ready.to_string(), "ready");
        assert_eq!(Status::CameraUnavailable.to_string(), "camera unavailable");
        assert_eq!(Status::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_status_line_keeps_latest() {
        let mut line = StatusLine::default();
        assert_eq!(line.current(), None);
        line.publish(Status::RequestingCamera);
        line.publish(Status::Ready);
        assert_eq!(line.current(), Some(Status::Ready));
    }

    #[test]
    fn test_start_refused_without_tracker() {
        let video = FakeVideo::new(640, 480);
        let mut h = harness(FakeCamera::granting(&video), FakeLoader(None), false);

        let result = h.session.start();
        assert!(matches!(result, Err(SessionError::TrackerNotReady)));
        assert_eq!(h.session.state(), SessionState::Stopped);
        assert_eq!(h.session.status_sink().last(), Some(&Status::ModelLoading));

        h.session.install_tracker(h.tracker.clone());
        assert_eq!(h.session.status_sink().last(), Some(&Status::Stopped));
        h.session.start().unwrap();
        assert_eq!(h.session.state(), SessionState::Running);
    }

    #[test]
    fn test_start_runs_through_starting() {
        let video = FakeVideo::new(640, 480);
        let camera = FakeCamera {
            responses: VecDeque::from([None, Some(Ok(video.clone()))]),
            ..FakeCamera::default()
        };
        let mut h = harness(camera, FakeLoader(None), true);

        h.session.start().unwrap();
        assert_eq!(h.session.state(), SessionState::Starting);
        assert_eq!(h.session.status_sink().last(), Some(&Status::RequestingCamera));
        assert!(!h.repaint.armed.get());

        h.session.poll();
        assert_eq!(h.session.state(), SessionState::Running);
        assert_eq!(h.session.status_sink().last(), Some(&Status::Ready));
        assert!(h.repaint.armed.get());
    }

    #[test]
    fn test_camera_refused_returns_to_stopped() {
        let camera = FakeCamera {
            refuse_request: true,
            ..FakeCamera::default()
        };
        let mut h = harness(camera, FakeLoader(None), true);

        let result = h.session.start();
        assert!(matches!(result, Err(SessionError::CameraUnavailable(_))));
        assert_eq!(h.session.state(), SessionState::Stopped);
        assert_eq!(h.session.status_sink().last(), Some(&Status::CameraUnavailable));
    }

    #[test]
    fn test_camera_failure_while_pending() {
        let camera = FakeCamera {
            responses: VecDeque::from([None, Some(Err(CaptureError::Backend("denied".into())))]),
            ..FakeCamera::default()
        };
        let mut h = harness(camera, FakeLoader(None), true);

        h.session.start().unwrap();
        h.session.poll();
        assert_eq!(h.session.state(), SessionState::Stopped);
        assert_eq!(h.session.status_sink().last(), Some(&Status::CameraUnavailable));

        // 自動リトライはしない。再開はユーザー操作のみ
        h.session.poll();
        assert_eq!(h.session.state(), SessionState::Stopped);
    }

    #[test]
    fn test_running_session_places_overlay() {
        let video = FakeVideo::new(640, 480);
        let mut h = harness(FakeCamera::granting(&video), FakeLoader(Some(Ok(model()))), true);

        h.session.poll();
        assert_eq!(h.session.model_state(), ModelState::Ready);
        assert!(h.renderer.log.borrow().model_attached);

        h.session.start().unwrap();
        h.tracker.push_hands(vec![open_palm()]);
        h.session.poll();
        assert!(h.session.overlay().visible);

        // 次のティックも予約済み
        assert!(h.repaint.armed.get());
    }

    #[test]
    fn test_model_failure_keeps_overlay_hidden() {
        let video = FakeVideo::new(640, 480);
        let loader = FakeLoader(Some(Err(AssetError::Empty)));
        let mut h = harness(FakeCamera::granting(&video), loader, true);

        h.session.start().unwrap();
        h.tracker.push_hands(vec![open_palm()]);
        h.session.poll();

        assert_eq!(h.session.model_state(), ModelState::Failed);
        assert_eq!(h.tracker.calls.get(), 1);
        assert!(!h.session.overlay().visible);
        assert!(h.session.overlay().pose.is_some());
    }

    #[test]
    fn test_stop_hides_overlay_and_halts_ticks() {
        let video = FakeVideo::new(640, 480);
        let mut h = harness(FakeCamera::granting(&video), FakeLoader(Some(Ok(model()))), true);
        h.session.poll();
        h.session.start().unwrap();
        h.tracker.push_hands(vec![open_palm()]);
        h.session.poll();
        assert!(h.session.overlay().visible);
        let renders = h.renderer.log.borrow().renders;

        h.session.stop();
        assert_eq!(h.session.state(), SessionState::Stopped);
        assert_eq!(h.session.status_sink().last(), Some(&Status::Stopped));
        assert_eq!(*h.session.overlay(), Overlay::hidden());
        assert_eq!(h.renderer.log.borrow().renders, renders + 1);
        assert!(!h.repaint.armed.get());

        video.advance();
        h.session.poll();
        assert_eq!(h.session.on_repaint(), TickOutcome::Idle);
        assert_eq!(h.tracker.calls.get(), 1);
        assert_eq!(h.renderer.log.borrow().renders, renders + 1);
    }

    #[test]
    fn test_stop_while_starting_cancels_request() {
        let camera = FakeCamera {
            responses: VecDeque::from([None]),
            ..FakeCamera::default()
        };
        let mut h = harness(camera, FakeLoader(None), true);
        h.session.start().unwrap();
        h.session.stop();
        assert_eq!(h.session.state(), SessionState::Stopped);
        assert_eq!(h.session.status_sink().last(), Some(&Status::Stopped));
        assert_eq!(h.session.camera().requests, 1);
        assert_eq!(h.session.camera().cancels, 1);
        assert!(!h.repaint.armed.get());
    }

    #[test]
    fn test_toggle() {
        let video = FakeVideo::new(640, 480);
        let camera = FakeCamera {
            responses: VecDeque::from([Some(Ok(video.clone())), Some(Ok(video.clone()))]),
            ..FakeCamera::default()
        };
        let mut h = harness(camera, FakeLoader(None), true);

        h.session.toggle().unwrap();
        assert_eq!(h.session.state(), SessionState::Running);
        h.session.toggle().unwrap();
        assert_eq!(h.session.state(), SessionState::Stopped);
        h.session.toggle().unwrap();
        assert_eq!(h.session.state(), SessionState::Running);
    }

    #[test]
    fn test_dead_stream_stops_session() {
        let video = FakeVideo::new(640, 480);
        let mut h = harness(FakeCamera::granting(&video), FakeLoader(None), true);
        h.session.start().unwrap();

        video.alive.set(false);
        assert_eq!(h.session.on_repaint(), TickOutcome::Idle);
        assert_eq!(h.session.state(), SessionState::Stopped);
        assert_eq!(h.session.status_sink().last(), Some(&Status::CameraUnavailable));
    }

    #[test]
    fn test_scale_multiplier_write_applies_next_tick() {
        let video = FakeVideo::new(640, 480);
        let mut h = harness(FakeCamera::granting(&video), FakeLoader(None), true);
        h.session.start().unwrap();
        h.session.set_scale_multiplier(1.0);

        h.tracker.push_hands(vec![open_palm()]);
        h.session.on_repaint();
        let before = h.session.overlay().pose.unwrap().scale;

        h.session.adjust_scale_multiplier(4);
        video.advance();
        h.tracker.push_hands(vec![open_palm()]);
        h.session.on_repaint();
        let after = h.session.overlay().pose.unwrap().scale;
        assert!((after - before * 2.0).abs() < 1e-9);
    }
}
