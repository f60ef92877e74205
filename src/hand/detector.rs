use anyhow::{bail, Context, Result};
use ndarray::Array4;
use opencv::core::Mat;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::landmark::{HandJoint, Landmark, LandmarkSet};
use super::preprocess::preprocess_for_hand_landmarks;
use crate::config::TrackerConfig;
use crate::scheduler::HandTracker;

/// 1 点あたりの出力値 (x, y, z)
const VALUES_PER_LANDMARK: usize = 3;

/// MediaPipe 形式の手ランドマークモデルによる検出器
///
/// 画像全体を 1 枚の手の切り抜きとして推論する。手が画面の大部分を占める前提。
pub struct HandLandmarkDetector {
    session: Session,
    input_size: u32,
    presence_threshold: f32,
    input_name: String,
    landmarks_output: String,
    presence_output: String,
}

impl HandLandmarkDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.model_path)
            .with_context(|| format!("Failed to load ONNX model: {}", config.model_path))?;

        Ok(Self {
            session,
            input_size: config.input_size,
            presence_threshold: config.presence_threshold,
            input_name: config.input_name.clone(),
            landmarks_output: config.landmarks_output.clone(),
            presence_output: config.presence_output.clone(),
        })
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// 前処理済みテンソルから手を検出
    ///
    /// 入力: [1, input_size, input_size, 3] の f32 テンソル
    /// 出力: 存在スコアが閾値未満なら空
    pub fn detect_tensor(&mut self, input: Array4<f32>) -> Result<Vec<LandmarkSet>> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        let presence: ndarray::ArrayViewD<f32> = outputs[self.presence_output.as_str()]
            .try_extract_array()
            .context("Failed to extract presence tensor")?;
        let score = presence.iter().next().copied().unwrap_or(0.0);
        if score < self.presence_threshold {
            return Ok(Vec::new());
        }

        // 出力は [1, 63] (x, y, z) で入力画像のピクセル単位
        let output: ndarray::ArrayViewD<f32> = outputs[self.landmarks_output.as_str()]
            .try_extract_array()
            .context("Failed to extract landmark tensor")?;
        let values: Vec<f32> = output.iter().copied().collect();
        if values.len() < HandJoint::COUNT * VALUES_PER_LANDMARK {
            bail!("landmark output has {} values", values.len());
        }

        Ok(decode_landmarks(&values, self.input_size as f32)
            .into_iter()
            .collect())
    }
}

/// ピクセル単位の出力を正規化座標に。z も x と同じ尺度で割る
fn decode_landmarks(values: &[f32], input_size: f32) -> Option<LandmarkSet> {
    let landmarks: Vec<Landmark> = values
        .chunks_exact(VALUES_PER_LANDMARK)
        .take(HandJoint::COUNT)
        .map(|v| Landmark::with_depth(v[0] / input_size, v[1] / input_size, v[2] / input_size))
        .collect();
    LandmarkSet::from_slice(&landmarks)
}

impl HandTracker for HandLandmarkDetector {
    type Frame = Mat;

    fn detect(&mut self, frame: &Mat, _timestamp_ms: f64) -> Result<Vec<LandmarkSet>> {
        let input = preprocess_for_hand_landmarks(frame, self.input_size)?;
        self.detect_tensor(input)
    }
}
