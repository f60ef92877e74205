//! オーバーレイに表示するワイヤーフレームモデル
//!
//! JSON 形式: `{"vertices": [[x, y, z], ...], "edges": [[a, b], ...], "faces": [[a, b, c, ...], ...]}`。
//! `faces` の各多角形は輪郭の辺に展開される。

use nalgebra::Vector3;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::error::AssetError;

/// 正規化後のモデルの最大辺長
pub const MODEL_TARGET_SIZE: f64 = 80.0;

#[derive(Debug, Deserialize)]
struct ModelFile {
    vertices: Vec<[f64; 3]>,
    #[serde(default)]
    edges: Vec<[usize; 2]>,
    #[serde(default)]
    faces: Vec<Vec<usize>>,
}

/// バウンディングボックス中心を原点に、最大辺を `MODEL_TARGET_SIZE` に揃えたモデル
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    vertices: Vec<Vector3<f64>>,
    edges: Vec<(usize, usize)>,
}

impl ModelAsset {
    pub fn new(vertices: Vec<Vector3<f64>>, edges: Vec<(usize, usize)>) -> Result<Self, AssetError> {
        if vertices.is_empty() {
            return Err(AssetError::Empty);
        }
        if vertices.iter().any(|v| v.iter().any(|c| !c.is_finite())) {
            return Err(AssetError::NonFinite);
        }
        let count = vertices.len();
        if let Some(&index) = edges
            .iter()
            .flat_map(|(a, b)| [a, b])
            .find(|&&i| i >= count)
        {
            return Err(AssetError::VertexOutOfRange { index, count });
        }

        Ok(Self {
            vertices: normalize(vertices),
            edges,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, AssetError> {
        let file: ModelFile = serde_json::from_str(content)?;

        let mut edges: Vec<(usize, usize)> = file.edges.iter().map(|e| (e[0], e[1])).collect();
        for face in &file.faces {
            for (i, &a) in face.iter().enumerate() {
                let b = face[(i + 1) % face.len()];
                edges.push((a, b));
            }
        }
        // 面を共有する辺は一本にまとめる
        let mut seen = std::collections::HashSet::new();
        edges.retain(|&(a, b)| a != b && seen.insert((a.min(b), a.max(b))));

        let vertices = file
            .vertices
            .iter()
            .map(|v| Vector3::new(v[0], v[1], v[2]))
            .collect();
        Self::new(vertices, edges)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn vertices(&self) -> &[Vector3<f64>] {
        &self.vertices
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// 各辺の両端点
    pub fn segments(&self) -> impl Iterator<Item = (&Vector3<f64>, &Vector3<f64>)> {
        self.edges
            .iter()
            .map(move |&(a, b)| (&self.vertices[a], &self.vertices[b]))
    }
}

fn normalize(mut vertices: Vec<Vector3<f64>>) -> Vec<Vector3<f64>> {
    let (min, max) = vertices.iter().fold(
        (Vector3::repeat(f64::INFINITY), Vector3::repeat(f64::NEG_INFINITY)),
        |(min, max), v| (min.inf(v), max.sup(v)),
    );
    let center = (min + max) / 2.0;
    let max_axis = (max - min).max();
    let scale = MODEL_TARGET_SIZE / if max_axis > 0.0 { max_axis } else { 1.0 };

    for v in vertices.iter_mut() {
        *v = (*v - center) * scale;
    }
    vertices
}

/// 非同期に解決されるモデル
pub trait ModelLoader {
    /// 未解決なら None。結果は一度だけ返す
    fn poll(&mut self) -> Option<Result<ModelAsset, AssetError>>;
}

/// 別スレッドでファイルを読み込むローダー
pub struct ThreadedModelLoader {
    rx: Option<Receiver<Result<ModelAsset, AssetError>>>,
}

impl ThreadedModelLoader {
    pub fn spawn<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(ModelAsset::load(&path));
        });
        Self { rx: Some(rx) }
    }
}

impl ModelLoader for ThreadedModelLoader {
    fn poll(&mut self) -> Option<Result<ModelAsset, AssetError>> {
        let result = match self.rx.as_ref()?.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(AssetError::LoaderGone),
        };
        self.rx = None;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, Instant};

    const CUBE: &str = r#"{
        "vertices": [[0,0,0],[2,0,0],[2,2,0],[0,2,0],[0,0,4],[2,0,4],[2,2,4],[0,2,4]],
        "faces": [[0,1,2,3],[4,5,6,7],[0,1,5,4],[2,3,7,6],[1,2,6,5],[0,3,7,4]]
    }"#;

    fn wait_for(loader: &mut ThreadedModelLoader) -> Result<ModelAsset, AssetError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = loader.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "loader timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_normalized_to_target_size() {
        let model = ModelAsset::from_json(CUBE).unwrap();
        let max_z = model.vertices().iter().map(|v| v.z).fold(f64::MIN, f64::max);
        let min_z = model.vertices().iter().map(|v| v.z).fold(f64::MAX, f64::min);
        assert!((max_z - 40.0).abs() < 1e-9);
        assert!((min_z + 40.0).abs() < 1e-9);
        let max_x = model.vertices().iter().map(|v| v.x).fold(f64::MIN, f64::max);
        assert!((max_x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_faces_become_unique_edges() {
        let model = ModelAsset::from_json(CUBE).unwrap();
        assert_eq!(model.edges().len(), 12);
        assert_eq!(model.segments().count(), 12);
    }

    #[test]
    fn test_single_point_model() {
        let model = ModelAsset::new(vec![Vector3::new(3.0, 3.0, 3.0)], vec![]).unwrap();
        assert_eq!(model.vertices()[0], Vector3::zeros());
    }

    #[test]
    fn test_rejects_bad_models() {
        assert!(matches!(ModelAsset::new(vec![], vec![]), Err(AssetError::Empty)));
        assert!(matches!(
            ModelAsset::new(vec![Vector3::zeros()], vec![(0, 3)]),
            Err(AssetError::VertexOutOfRange { index: 3, count: 1 })
        ));
        assert!(matches!(
            ModelAsset::new(vec![Vector3::new(f64::NAN, 0.0, 0.0)], vec![]),
            Err(AssetError::NonFinite)
        ));
        assert!(matches!(ModelAsset::from_json("{"), Err(AssetError::Parse(_))));
    }

    #[test]
    fn test_threaded_loader_delivers_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", CUBE).unwrap();

        let mut loader = ThreadedModelLoader::spawn(file.path());
        let model = wait_for(&mut loader).unwrap();
        assert_eq!(model.edges().len(), 12);
        assert!(loader.poll().is_none());
    }

    #[test]
    fn test_threaded_loader_missing_file() {
        let mut loader = ThreadedModelLoader::spawn("does/not/exist.json");
        assert!(matches!(wait_for(&mut loader), Err(AssetError::Io { .. })));
    }
}
