use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{Frame, Keypoint, KeypointName};

/// Side of the square input SinglePose Lightning expects.
pub const INPUT_SIZE: u32 = 192;
pub const NUM_KEYPOINTS: usize = 17;

#[derive(Clone, Debug, PartialEq)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Letterboxes the frame into an `INPUT_SIZE` square NHWC tensor of raw
/// `[0, 255]` RGB values.
pub fn prepare_frame(frame: &Frame) -> Result<(Array4<f32>, LetterboxInfo)> {
    if frame.width == 0 || frame.height == 0 {
        return Err(anyhow!("empty frame {}x{}", frame.width, frame.height));
    }
    if frame.rgba.len() != frame.expected_len() {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            frame.expected_len()
        ));
    }

    let letterbox = letterbox_for(frame.width, frame.height);
    let new_w = (frame.width as f32 * letterbox.scale).round().max(1.0) as u32;
    let new_h = (frame.height as f32 * letterbox.scale).round().max(1.0) as u32;

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = letterbox.pad_x as usize;
    let pad_y = letterbox.pad_y as usize;
    let side = INPUT_SIZE as usize;
    let mut canvas = vec![0u8; side * side * 4];
    let dst_stride = side * 4;
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize).min(side - pad_y) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        let len = src_stride.min(dst_stride - pad_x * 4);
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + len]
            .copy_from_slice(&resized[src_offset..src_offset + len]);
    }

    let values: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| [px[0] as f32, px[1] as f32, px[2] as f32])
        .collect();
    let input = Array4::<f32>::from_shape_vec((1, side, side, 3), values)
        .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    Ok((input, letterbox))
}

pub fn letterbox_for(width: u32, height: u32) -> LetterboxInfo {
    let scale = INPUT_SIZE as f32 / (width.max(height) as f32);
    let new_w = (width as f32 * scale).round().max(1.0) as u32;
    let new_h = (height as f32 * scale).round().max(1.0) as u32;
    LetterboxInfo {
        scale,
        pad_x: ((INPUT_SIZE as i64 - new_w as i64) / 2).max(0) as f32,
        pad_y: ((INPUT_SIZE as i64 - new_h as i64) / 2).max(0) as f32,
        orig_w: width,
        orig_h: height,
    }
}

/// Decodes MoveNet's `[1, 1, 17, 3]` output. Each row is `(y, x, score)`
/// normalised to the letterboxed input; positions come back in frame pixels.
pub fn decode_keypoints(flat: &[f32], letterbox: &LetterboxInfo) -> Result<Vec<Keypoint>> {
    if flat.len() < NUM_KEYPOINTS * 3 {
        return Err(anyhow!(
            "unexpected keypoint output length: got {}, need {}",
            flat.len(),
            NUM_KEYPOINTS * 3
        ));
    }

    let keypoints = flat
        .chunks_exact(3)
        .take(NUM_KEYPOINTS)
        .zip(KeypointName::ALL)
        .map(|(row, name)| {
            let (x, y) = project(row[1], row[0], letterbox);
            Keypoint::named(name, x, y, row[2].clamp(0.0, 1.0))
        })
        .collect();
    Ok(keypoints)
}

fn project(nx: f32, ny: f32, letterbox: &LetterboxInfo) -> (f32, f32) {
    let input = INPUT_SIZE as f32;
    let px = (nx * input - letterbox.pad_x) / letterbox.scale;
    let py = (ny * input - letterbox.pad_y) / letterbox.scale;
    (
        px.clamp(0.0, letterbox.orig_w.saturating_sub(1) as f32),
        py.clamp(0.0, letterbox.orig_h.saturating_sub(1) as f32),
    )
}
