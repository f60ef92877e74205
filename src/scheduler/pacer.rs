use std::thread;
use std::time::{Duration, Instant};

use super::RepaintScheduler;

/// 固定レートの画面リフレッシュ
///
/// `take_due` が 1 リフレッシュ分ブロックし、予約があればそのリフレッシュでティックを実行させる。
pub struct FramePacer {
    frame_duration: Duration,
    next_refresh: Instant,
    armed: bool,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        let frame_duration = Duration::from_secs_f64(1.0 / target_fps.max(1) as f64);
        Self {
            frame_duration,
            next_refresh: Instant::now(),
            armed: false,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl RepaintScheduler for FramePacer {
    fn request_tick(&mut self) {
        self.armed = true;
    }

    fn cancel(&mut self) {
        self.armed = false;
    }

    fn take_due(&mut self) -> bool {
        let now = Instant::now();
        if self.next_refresh > now {
            thread::sleep(self.next_refresh - now);
        }
        // 処理が遅れた分は取り戻さない
        self.next_refresh = self.next_refresh.max(now) + self.frame_duration;
        std::mem::take(&mut self.armed)
    }
}
