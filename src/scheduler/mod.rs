//! 再描画ティックごとに 1 フレームを処理する協調的スケジューラ

pub mod pacer;

use anyhow::Result;
use log::{debug, info, warn};
use std::time::Instant;

use crate::anchor::{synthesize_pose, RenderExtent};
use crate::asset::ModelAsset;
use crate::hand::LandmarkSet;
use crate::overlay::{Overlay, OverlaySettings};

pub use pacer::FramePacer;

/// 1 回の読み出しで得たフレームと、そのフレーム自身の時刻・解像度
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame<F> {
    pub frame: F,
    /// 再生時刻（秒）
    pub time: f64,
    pub width: u32,
    pub height: u32,
}

/// ライブ映像
pub trait VideoSource {
    type Frame;

    /// 最新フレーム。時刻と解像度は同じフレームのもの。まだ無ければ None
    fn latest_frame(&self) -> Option<VideoFrame<Self::Frame>>;

    /// キャプチャが致命的に止まったら false
    fn is_alive(&self) -> bool {
        true
    }
}

/// 外部の手検出モデル
pub trait HandTracker {
    type Frame;

    /// 0 個以上の手を返す。先頭以外は使わない
    fn detect(&mut self, frame: &Self::Frame, timestamp_ms: f64) -> Result<Vec<LandmarkSet>>;
}

/// 外部のレンダラー（シーングラフ）
pub trait OverlayRenderer {
    type Frame;

    /// 描画面と投影を新しいサイズに合わせる
    fn resize(&mut self, extent: RenderExtent);

    fn attach_model(&mut self, model: ModelAsset);

    /// 背景に新しい映像フレームを設定
    fn present_frame(&mut self, frame: &Self::Frame) -> Result<()>;

    fn set_overlay(&mut self, overlay: &Overlay);

    /// デバッグ用の骨格表示
    fn show_landmarks(&mut self, _hand: Option<&LandmarkSet>) {}

    fn render(&mut self) -> Result<()>;
}

/// 画面リフレッシュに合わせて次のティックを予約する
pub trait RepaintScheduler {
    fn request_tick(&mut self);

    fn cancel(&mut self);

    /// 次のリフレッシュまで待ち、予約済みティックがあれば消費して true
    fn take_due(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Active,
}

/// 1 ティックの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 非アクティブなので何もしていない
    Idle,
    /// 映像サイズ・フレームがまだ無い
    AwaitingVideo,
    /// 前回と同じフレーム
    DuplicateFrame,
    Processed { hand_detected: bool },
}

pub struct FrameScheduler<T, R, P> {
    tracker: Option<T>,
    renderer: R,
    repaint: P,
    state: SchedulerState,
    extent: Option<RenderExtent>,
    last_video_time: Option<f64>,
    overlay: Overlay,
    clock: Instant,
}

impl<T, R, P> FrameScheduler<T, R, P>
where
    R: OverlayRenderer,
    P: RepaintScheduler,
{
    pub fn new(renderer: R, repaint: P) -> Self {
        Self {
            tracker: None,
            renderer,
            repaint,
            state: SchedulerState::Idle,
            extent: None,
            last_video_time: None,
            overlay: Overlay::hidden(),
            clock: Instant::now(),
        }
    }

    /// 読み込みが終わった検出モデルを設定
    pub fn install_tracker(&mut self, tracker: T) {
        self.tracker = Some(tracker);
    }

    pub fn has_tracker(&self) -> bool {
        self.tracker.is_some()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn extent(&self) -> Option<RenderExtent> {
        self.extent
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn repaint(&self) -> &P {
        &self.repaint
    }

    pub fn repaint_mut(&mut self) -> &mut P {
        &mut self.repaint
    }

    pub fn activate(&mut self) {
        if self.state == SchedulerState::Active {
            return;
        }
        self.state = SchedulerState::Active;
        self.last_video_time = None;
        self.repaint.request_tick();
    }

    /// ティックを止め、オーバーレイを隠して最後に一度だけ描画する
    pub fn deactivate(&mut self) {
        self.state = SchedulerState::Idle;
        self.repaint.cancel();
        self.overlay = Overlay::hidden();
        self.renderer.set_overlay(&self.overlay);
        self.renderer.show_landmarks(None);
        if let Err(e) = self.renderer.render() {
            warn!("final render failed: {:#}", e);
        }
    }

    /// 再描画ティック 1 回分
    ///
    /// ティック内の失敗はログに残して「手なし」として扱い、次のティックは必ず予約する。
    pub fn tick<V>(&mut self, video: &V, settings: &OverlaySettings, model_ready: bool) -> TickOutcome
    where
        V: VideoSource,
        T: HandTracker<Frame = V::Frame>,
        R: OverlayRenderer<Frame = V::Frame>,
    {
        if self.state == SchedulerState::Idle {
            return TickOutcome::Idle;
        }

        let outcome = self.process(video, settings, model_ready);

        if let Err(e) = self.renderer.render() {
            warn!("render failed: {:#}", e);
        }
        self.repaint.request_tick();
        outcome
    }

    fn process<V>(&mut self, video: &V, settings: &OverlaySettings, model_ready: bool) -> TickOutcome
    where
        V: VideoSource,
        T: HandTracker<Frame = V::Frame>,
        R: OverlayRenderer<Frame = V::Frame>,
    {
        let Some(VideoFrame {
            frame,
            time,
            width,
            height,
        }) = video.latest_frame()
        else {
            return TickOutcome::AwaitingVideo;
        };

        // リサイズはマッピングより先
        let Some(extent) = RenderExtent::new(width, height) else {
            return TickOutcome::AwaitingVideo;
        };
        if self.extent != Some(extent) {
            info!("render extent {}x{}", extent.width(), extent.height());
            self.extent = Some(extent);
            self.renderer.resize(extent);
        }

        if self.last_video_time == Some(time) {
            return TickOutcome::DuplicateFrame;
        }
        self.last_video_time = Some(time);

        if let Err(e) = self.renderer.present_frame(&frame) {
            warn!("failed to present frame: {:#}", e);
        }

        let timestamp_ms = self.clock.elapsed().as_secs_f64() * 1000.0;
        let hands = match self.tracker.as_mut() {
            Some(tracker) => tracker.detect(&frame, timestamp_ms).unwrap_or_else(|e| {
                warn!("hand detection failed: {:#}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        let hand = hands.into_iter().next();
        self.renderer.show_landmarks(hand.as_ref());

        let pose = hand
            .as_ref()
            .map(|h| synthesize_pose(h, extent, settings.scale_multiplier()))
            .filter(|pose| {
                let finite = pose.is_finite();
                if !finite {
                    debug!("discarding non-finite pose {:?}", pose);
                }
                finite
            });

        self.overlay = match pose {
            Some(pose) => Overlay {
                visible: model_ready,
                pose: Some(pose),
            },
            None => Overlay::hidden(),
        };
        self.renderer.set_overlay(&self.overlay);

        TickOutcome::Processed {
            hand_detected: hand.is_some(),
        }
    }
}
