use std::time::Duration;
use thiserror::Error;

/// カメラ取得の失敗
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera {index} is not available")]
    Unavailable { index: i32 },
    #[error("camera {index} delivered no frame within {timeout:?}")]
    NoFrames { index: i32, timeout: Duration },
    #[error("capture backend error: {0}")]
    Backend(String),
}

/// セッション開始の失敗
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("hand tracker is still loading")]
    TrackerNotReady,
    #[error("camera unavailable: {0}")]
    CameraUnavailable(#[from] CaptureError),
}

/// モデルアセット読み込みの失敗
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read model {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model has no vertices")]
    Empty,
    #[error("model references vertex {index} but has only {count} vertices")]
    VertexOutOfRange { index: usize, count: usize },
    #[error("model has a non-finite vertex")]
    NonFinite,
    #[error("model loader exited without a result")]
    LoaderGone,
}
