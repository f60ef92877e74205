use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// カメラデバイス番号
    #[serde(default)]
    pub index: i32,
    /// 希望解像度（実際の解像度はストリームから取得する）
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
    /// 最初のフレーム到着を待つ上限（ミリ秒）
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
}

fn default_camera_width() -> u32 { 1280 }
fn default_camera_height() -> u32 { 720 }
fn default_camera_fps() -> u32 { 30 }
fn default_open_timeout_ms() -> u64 { 5000 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
            fps: default_camera_fps(),
            open_timeout_ms: default_open_timeout_ms(),
        }
    }
}

/// 手のランドマークモデル (ONNX) の設定
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_model_path")]
    pub model_path: String,
    /// モデル入力の一辺（ピクセル）
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// 手の存在スコアの閾値
    #[serde(default = "default_presence_threshold")]
    pub presence_threshold: f32,
    #[serde(default = "default_input_name")]
    pub input_name: String,
    /// [1, 63] のランドマーク出力
    #[serde(default = "default_landmarks_output")]
    pub landmarks_output: String,
    /// [1, 1] の存在スコア出力
    #[serde(default = "default_presence_output")]
    pub presence_output: String,
}

fn default_tracker_model_path() -> String { "models/hand_landmark.onnx".to_string() }
fn default_input_size() -> u32 { 224 }
fn default_presence_threshold() -> f32 { 0.5 }
fn default_input_name() -> String { "input_1".to_string() }
fn default_landmarks_output() -> String { "Identity".to_string() }
fn default_presence_output() -> String { "Identity_1".to_string() }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            model_path: default_tracker_model_path(),
            input_size: default_input_size(),
            presence_threshold: default_presence_threshold(),
            input_name: default_input_name(),
            landmarks_output: default_landmarks_output(),
            presence_output: default_presence_output(),
        }
    }
}

/// スケール倍率の初期値と、UI から変更できる範囲
#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    #[serde(default = "default_scale_multiplier")]
    pub scale_multiplier: f64,
    #[serde(default = "default_scale_min")]
    pub scale_min: f64,
    #[serde(default = "default_scale_max")]
    pub scale_max: f64,
    #[serde(default = "default_scale_step")]
    pub scale_step: f64,
}

fn default_scale_multiplier() -> f64 { 4.0 }
fn default_scale_min() -> f64 { 0.5 }
fn default_scale_max() -> f64 { 8.0 }
fn default_scale_step() -> f64 { 0.25 }

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            scale_multiplier: default_scale_multiplier(),
            scale_min: default_scale_min(),
            scale_max: default_scale_max(),
            scale_step: default_scale_step(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// ワイヤーフレームモデル (JSON)
    #[serde(default = "default_model_path")]
    pub path: String,
}

fn default_model_path() -> String { "assets/heart.json".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self { path: default_model_path() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 再描画ティックの周波数
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

fn default_target_fps() -> u32 { 60 }

impl Default for AppConfig {
    fn default() -> Self {
        Self { target_fps: default_target_fps() }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DebugConfig {
    /// ランドマーク骨格を重ねて描画する
    #[serde(default)]
    pub show_landmarks: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    /// logs/ 以下にログファイルを書き出す
    #[serde(default)]
    pub file: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// 読み込めなければデフォルト値で続行する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}
