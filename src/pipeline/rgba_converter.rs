use std::convert::TryFrom;

use anyhow::{Result, anyhow, ensure};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

/// Pixel layouts a camera may hand us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Nv12,
    Yuyv,
    Mjpeg,
    Rgb,
    Bgr,
    Gray,
}

/// Converts one raw camera buffer to tightly packed RGBA8.
pub fn to_rgba(layout: PixelLayout, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    match layout {
        PixelLayout::Nv12 => nv12_to_rgba(data, width, height, pixels),
        PixelLayout::Yuyv => yuyv_to_rgba(data, width, height, pixels),
        PixelLayout::Mjpeg => mjpeg_to_rgba(data),
        PixelLayout::Rgb => packed_to_rgba(data, pixels, 3, |src| [src[0], src[1], src[2]]),
        PixelLayout::Bgr => packed_to_rgba(data, pixels, 3, |src| [src[2], src[1], src[0]]),
        PixelLayout::Gray => packed_to_rgba(data, pixels, 1, |src| [src[0], src[0], src[0]]),
    }
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32, pixels: usize) -> Result<Vec<u8>> {
    let uv_len = pixels / 2;
    ensure!(
        data.len() >= pixels + uv_len,
        "NV12 buffer too small: got {}, expected {}",
        data.len(),
        pixels + uv_len
    );

    let mut rgba = vec![0u8; pixels * 4];
    let image = YuvBiPlanarImage {
        y_plane: &data[..pixels],
        y_stride: width,
        uv_plane: &data[pixels..pixels + uv_len],
        uv_stride: width,
        width,
        height,
    };
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12→RGBA failed: {err:?}"))?;
    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32, pixels: usize) -> Result<Vec<u8>> {
    ensure!(
        data.len() >= pixels * 2,
        "YUYV buffer too small: got {}, expected {}",
        data.len(),
        pixels * 2
    );

    let mut rgba = vec![0u8; pixels * 4];
    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422→RGBA failed: {err:?}"))?;
    Ok(rgba)
}

fn mjpeg_to_rgba(data: &[u8]) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    if let Some(info) = decoder.info() {
        let expected = usize::try_from(info.width)
            .and_then(|w| usize::try_from(info.height).map(|h| w * h * 4))
            .map_err(|_| anyhow!("MJPEG dimensions do not fit usize"))?;
        ensure!(
            rgba.len() >= expected,
            "MJPEG decode produced too few bytes: got {}, expected {}",
            rgba.len(),
            expected
        );
    }
    Ok(rgba)
}

fn packed_to_rgba<F>(data: &[u8], pixels: usize, channels: usize, map: F) -> Result<Vec<u8>>
where
    F: Fn(&[u8]) -> [u8; 3] + Sync,
{
    ensure!(
        data.len() >= pixels * channels,
        "{channels}-channel buffer too small: got {}, expected {}",
        data.len(),
        pixels * channels
    );

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(channels))
        .for_each(|(dst, src)| {
            dst[..3].copy_from_slice(&map(src));
            dst[3] = 255;
        });
    Ok(rgba)
}
