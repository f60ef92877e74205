use log::warn;

use crate::anchor::OverlayPose;
use crate::config::OverlayConfig;

/// レンダラーへ渡すオーバーレイの状態
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Overlay {
    pub visible: bool,
    pub pose: Option<OverlayPose>,
}

impl Overlay {
    pub fn hidden() -> Self {
        Self::default()
    }

    /// 描画すべき姿勢（非表示なら None）
    pub fn placement(&self) -> Option<&OverlayPose> {
        if self.visible {
            self.pose.as_ref()
        } else {
            None
        }
    }
}

/// UI から書き換えられるスケール倍率
///
/// 書き込みと読み出しは同じ実行コンテキスト上なので同期は不要。
/// 書いた値は次のティックから反映される。
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    scale_multiplier: f64,
    scale_min: f64,
    scale_max: f64,
    scale_step: f64,
}

impl OverlaySettings {
    /// 範囲が非有限・逆転していればデフォルト値で続行する
    pub fn new(scale_multiplier: f64, scale_min: f64, scale_max: f64, scale_step: f64) -> Self {
        let valid = scale_min.is_finite()
            && scale_max.is_finite()
            && scale_step.is_finite()
            && scale_min <= scale_max;
        if !valid {
            warn!(
                "invalid scale range [{}, {}] step {}; using defaults",
                scale_min, scale_max, scale_step
            );
            let defaults = OverlayConfig::default();
            return Self {
                scale_multiplier: defaults.scale_multiplier,
                scale_min: defaults.scale_min,
                scale_max: defaults.scale_max,
                scale_step: defaults.scale_step,
            };
        }

        let scale_multiplier = if scale_multiplier.is_finite() {
            scale_multiplier.clamp(scale_min, scale_max)
        } else {
            warn!("invalid scale multiplier {}; using the range minimum", scale_multiplier);
            scale_min
        };
        Self {
            scale_multiplier,
            scale_min,
            scale_max,
            scale_step,
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(
            config.scale_multiplier,
            config.scale_min,
            config.scale_max,
            config.scale_step,
        )
    }

    pub fn scale_multiplier(&self) -> f64 {
        self.scale_multiplier
    }

    /// 範囲外はクランプ、非有限値は無視
    pub fn set_scale_multiplier(&mut self, value: f64) {
        if value.is_finite() {
            self.scale_multiplier = value.clamp(self.scale_min, self.scale_max);
        }
    }

    /// スライダーを steps 目盛り動かす
    pub fn adjust_scale_multiplier(&mut self, steps: i32) {
        self.set_scale_multiplier(self.scale_multiplier + self.scale_step * steps as f64);
    }
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}
