use fast_image_resize as fir;

use crate::types::Frame;

/// A 2D drawing target that is fully redrawn every frame.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// Resets every pixel to transparent black.
    fn clear(&mut self);

    /// Paints `frame` over the whole surface, scaling it when sizes differ.
    fn draw_frame(&mut self, frame: &Frame);

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: [u8; 4]);

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: [u8; 4]);
}

#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0u8; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) as usize) * 4;
        let px = self.rgba.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Snapshot of the current contents, for handing to the window.
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.rgba.clone(), self.width, self.height)
    }

    fn resize_into(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let src_image = fir::images::Image::from_vec_u8(
            frame.width,
            frame.height,
            frame.rgba.clone(),
            fir::PixelType::U8x4,
        )?;
        let mut dst_image = fir::images::Image::new(self.width, self.height, fir::PixelType::U8x4);
        let mut resizer = fir::Resizer::new();
        let resize_options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
        resizer.resize(&src_image, &mut dst_image, Some(&resize_options))?;
        self.rgba = dst_image.into_vec();
        Ok(())
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.rgba.fill(0);
    }

    fn draw_frame(&mut self, frame: &Frame) {
        if frame.rgba.len() != frame.expected_len() || frame.width == 0 || frame.height == 0 {
            log::warn!(
                "skipping malformed {}x{} frame with {} bytes",
                frame.width,
                frame.height,
                frame.rgba.len()
            );
            return;
        }

        if frame.width == self.width && frame.height == self.height {
            self.rgba.copy_from_slice(&frame.rgba);
            return;
        }

        if let Err(err) = self.resize_into(frame) {
            log::warn!("failed to scale frame onto canvas: {err:?}");
            self.clear();
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: [u8; 4]) {
        let reach = radius.max(0.0);
        let outside = |v: f32, extent: u32| v < -reach || v > extent as f32 + reach;
        if !center.0.is_finite()
            || !center.1.is_finite()
            || !reach.is_finite()
            || outside(center.0, self.width)
            || outside(center.1, self.height)
        {
            return;
        }
        draw_circle(
            &mut self.rgba,
            self.width,
            self.height,
            (center.0.round() as i32, center.1.round() as i32),
            radius.round().max(0.0) as i32,
            color,
        );
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: [u8; 4]) {
        let width = if width.is_finite() { width.clamp(1.0, 64.0) } else { 1.0 };
        // Keep the stroke's outer edge inside the clip box.
        let margin = width;
        let min = (-margin, -margin);
        let max = (self.width as f32 + margin, self.height as f32 + margin);
        let Some((from, to)) = clip_segment(from, to, min, max) else {
            return;
        };
        draw_line(
            &mut self.rgba,
            self.width,
            self.height,
            from,
            to,
            color,
            width.round() as i32,
        );
    }
}

/// Liang-Barsky clip of a segment to an axis-aligned box. `None` when the
/// segment misses the box or is not finite. A clipped endpoint lands exactly on
/// the edge that cut it.
fn clip_segment(
    from: (f32, f32),
    to: (f32, f32),
    min: (f32, f32),
    max: (f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
        return None;
    }

    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (dx, dy) = (to.0 as f64 - x0, to.1 as f64 - y0);
    let (min_x, min_y) = (min.0 as f64, min.1 as f64);
    let (max_x, max_y) = (max.0 as f64, max.1 as f64);

    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let (mut start, mut end) = (from, to);
    let point = |t: f64| ((x0 + t * dx) as f32, (y0 + t * dy) as f32);

    // (p, q, edge coordinate, edge is vertical)
    let edges = [
        (-dx, x0 - min_x, min.0, true),
        (dx, max_x - x0, max.0, true),
        (-dy, y0 - min_y, min.1, false),
        (dy, max_y - y0, max.1, false),
    ];
    for (p, q, edge, vertical) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            if r > t0 {
                t0 = r;
                start = snap(point(r), edge, vertical);
            }
        } else {
            if r < t0 {
                return None;
            }
            if r < t1 {
                t1 = r;
                end = snap(point(r), edge, vertical);
            }
        }
    }

    Some((start, end))
}

fn snap(point: (f32, f32), edge: f32, vertical: bool) -> (f32, f32) {
    if vertical {
        (edge, point.1)
    } else {
        (point.0, edge)
    }
}

fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: (f32, f32),
    p1: (f32, f32),
    color: [u8; 4],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0.round() as i32, p0.1.round() as i32);
    let (x1, y1) = (p1.0.round() as i32, p1.1.round() as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = thickness.max(1) / 2;

    loop {
        put_pixel_safe(buffer, width, height, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 4],
) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return;
    }
    let idx = ((uy * width + ux) as usize) * 4;
    if idx + 3 < buffer.len() {
        buffer[idx..idx + 4].copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn circle_marks_center_and_stays_inside_radius() {
        let mut canvas = Canvas::new(20, 20);
        canvas.fill_circle((10.0, 10.0), 5.0, RED);
        assert_eq!(canvas.pixel(10, 10), Some(RED));
        assert_eq!(canvas.pixel(15, 10), Some(RED));
        assert_eq!(canvas.pixel(16, 10), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(14, 14), Some([0, 0, 0, 0]));
    }

    #[test]
    fn line_reaches_both_endpoints() {
        let mut canvas = Canvas::new(10, 10);
        canvas.stroke_line((0.0, 0.0), (9.0, 9.0), 1.0, RED);
        assert_eq!(canvas.pixel(0, 0), Some(RED));
        assert_eq!(canvas.pixel(5, 5), Some(RED));
        assert_eq!(canvas.pixel(9, 9), Some(RED));
        assert_eq!(canvas.pixel(9, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn thick_line_widens_stroke() {
        let mut canvas = Canvas::new(10, 10);
        canvas.stroke_line((0.0, 5.0), (9.0, 5.0), 2.0, RED);
        assert_eq!(canvas.pixel(4, 5), Some(RED));
        assert_eq!(canvas.pixel(4, 4), Some(RED));
        assert_eq!(canvas.pixel(4, 6), Some(RED));
        assert_eq!(canvas.pixel(4, 7), Some([0, 0, 0, 0]));
    }

    #[test]
    fn off_canvas_drawing_is_clipped() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill_circle((-20.0, -20.0), 5.0, RED);
        canvas.stroke_line((-5.0, 3.0), (30.0, 3.0), 1.0, RED);
        assert_eq!(canvas.pixel(0, 3), Some(RED));
        assert_eq!(canvas.pixel(7, 3), Some(RED));
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn far_away_endpoints_are_clipped_to_canvas() {
        let mut canvas = Canvas::new(8, 8);
        canvas.stroke_line((-1.0e30, 3.0), (1.0e30, 3.0), 1.0, RED);
        for x in 0..8 {
            assert_eq!(canvas.pixel(x, 3), Some(RED));
        }
        assert_eq!(canvas.pixel(0, 2), Some([0, 0, 0, 0]));

        canvas.clear();
        canvas.stroke_line((-f32::MAX, 1.0), (f32::MAX, 1.0), 1.0, RED);
        assert_eq!(canvas.pixel(0, 1), Some(RED));
        assert_eq!(canvas.pixel(7, 1), Some(RED));

        canvas.clear();
        canvas.stroke_line((4.0, -5.0e9), (4.0, 2.0), 1.0, RED);
        assert_eq!(canvas.pixel(4, 0), Some(RED));
        assert_eq!(canvas.pixel(4, 2), Some(RED));
        assert_eq!(canvas.pixel(4, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn non_finite_geometry_draws_nothing() {
        let mut canvas = Canvas::new(8, 8);
        canvas.stroke_line((f32::NAN, 1.0), (5.0, 5.0), 1.0, RED);
        canvas.stroke_line((0.0, 0.0), (f32::INFINITY, 5.0), 1.0, RED);
        canvas.fill_circle((f32::NAN, 4.0), 5.0, RED);
        canvas.fill_circle((1.0e20, 4.0), 5.0, RED);
        assert!(canvas.as_rgba().iter().all(|&b| b == 0));
    }

    #[test]
    fn clipping_keeps_segments_that_miss_the_canvas_out() {
        assert!(clip_segment((-10.0, -10.0), (-5.0, 20.0), (-1.0, -1.0), (9.0, 9.0)).is_none());
        let clipped = clip_segment((-10.0, 4.0), (20.0, 4.0), (-1.0, -1.0), (9.0, 9.0));
        assert_eq!(clipped, Some(((-1.0, 4.0), (9.0, 4.0))));
    }

    #[test]
    fn clear_wipes_previous_marks() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill_circle((4.0, 4.0), 2.0, RED);
        canvas.clear();
        assert!(canvas.as_rgba().iter().all(|&b| b == 0));
    }

    #[test]
    fn same_size_frame_is_copied() {
        let mut canvas = Canvas::new(4, 4);
        let frame = Frame::filled(4, 4, [10, 20, 30, 255]);
        canvas.draw_frame(&frame);
        assert_eq!(canvas.as_rgba(), frame.rgba.as_slice());
    }

    #[test]
    fn different_size_frame_is_scaled_to_cover_canvas() {
        let mut canvas = Canvas::new(8, 6);
        canvas.draw_frame(&Frame::filled(4, 3, [200, 200, 200, 255]));
        assert_eq!(canvas.as_rgba().len(), 8 * 6 * 4);
        for y in 0..6 {
            for x in 0..8 {
                assert_eq!(canvas.pixel(x, y), Some([200, 200, 200, 255]));
            }
        }
    }

    #[test]
    fn malformed_frame_leaves_canvas_untouched() {
        let mut canvas = Canvas::new(4, 4);
        let mut frame = Frame::filled(4, 4, [10, 20, 30, 255]);
        frame.rgba.truncate(8);
        canvas.draw_frame(&frame);
        assert!(canvas.as_rgba().iter().all(|&b| b == 0));
    }
}
