use anyhow::Result;
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size, CV_32FC3},
    imgproc,
    prelude::*,
};

/// OpenCV Mat を手ランドマークモデルの入力テンソルに変換
///
/// - BGR -> RGB
/// - input_size x input_size にリサイズ（縦横比は保たない。正規化座標はそのまま元画像に対応する）
/// - [1, input_size, input_size, 3] の f32 テンソルに変換 (0.0-1.0)
pub fn preprocess_for_hand_landmarks(frame: &Mat, input_size: u32) -> Result<Array4<f32>> {
    let size = input_size as i32;

    // BGR -> RGB
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(size, size),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0 / 255.0, 0.0)?;

    let mut tensor = Array4::<f32>::zeros((1, size as usize, size as usize, 3));

    for y in 0..size {
        for x in 0..size {
            let pixel = float_mat.at_2d::<opencv::core::Vec3f>(y, x)?;
            tensor[[0, y as usize, x as usize, 0]] = pixel[0];
            tensor[[0, y as usize, x as usize, 1]] = pixel[1];
            tensor[[0, y as usize, x as usize, 2]] = pixel[2];
        }
    }

    Ok(tensor)
}
