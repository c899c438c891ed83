//! Overlay drawing for annotated frames.
//!
//! Everything here is deterministic: the same inputs always produce the same
//! pixels. Text uses a built-in 3x5 bitmap font so no font file is needed.

use crate::{
    landmarks::PixelPoint,
    utils::safe_cast::{f64_to_i32_clamp, u32_to_i32},
};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut, BresenhamLineIter},
    rect::Rect,
};

/// Nose direction line colour
pub const NOSE_LINE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Iris centroid marker colour
pub const IRIS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Eye centre marker colour
pub const EYE_CENTER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Overlay text colour
pub const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Glyph width in font cells
const GLYPH_WIDTH: u32 = 3;

/// Glyph height in font cells
const GLYPH_HEIGHT: u32 = 5;

/// Default pixel size of one font cell
pub const DEFAULT_TEXT_SCALE: u32 = 2;

/// Largest font cell size whose rows fit the 20 px overlay row pitch
pub const MAX_TEXT_SCALE: u32 = 4;

/// Draws lines, point markers and text rows onto frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAnnotator {
    text_scale: u32,
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_SCALE)
    }
}

impl FrameAnnotator {
    /// Create an annotator with the given font cell size, clamped to `1..=MAX_TEXT_SCALE`
    #[must_use]
    pub fn new(text_scale: u32) -> Self {
        Self {
            text_scale: text_scale.clamp(1, MAX_TEXT_SCALE),
        }
    }

    /// Height of a text row in pixels
    #[must_use]
    pub const fn text_height(&self) -> u32 {
        GLYPH_HEIGHT * self.text_scale
    }

    /// Horizontal advance per character in pixels
    #[must_use]
    pub const fn char_advance(&self) -> u32 {
        (GLYPH_WIDTH + 1) * self.text_scale
    }

    /// Rows `[top, bottom)` covered by text drawn on `baseline`
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // Text heights are tiny
    pub const fn text_band(&self, baseline: i32) -> (i32, i32) {
        (baseline - self.text_height() as i32, baseline)
    }

    /// Draw a line with the given stroke thickness.
    ///
    /// The segment is clipped to the frame first so far-away endpoints cost
    /// nothing beyond the visible part.
    pub fn draw_line(&self, frame: &mut RgbImage, from: PixelPoint, to: PixelPoint, color: Rgb<u8>, thickness: u32) {
        let radius = i32::try_from(thickness / 2).unwrap_or(0);
        let Some((start, end)) = clip_segment(frame, from, to, radius) else {
            return;
        };

        if start == end {
            stamp(frame, start, radius, color);
            return;
        }

        #[allow(clippy::cast_possible_truncation)] // Clipped coordinates fit in f32
        let iter = BresenhamLineIter::new((start.0 as f32, start.1 as f32), (end.0 as f32, end.1 as f32));
        for (x, y) in iter {
            stamp(frame, (f64::from(x), f64::from(y)), radius, color);
        }
    }

    /// Mark a single point, drawn as a zero-length line
    pub fn draw_point(&self, frame: &mut RgbImage, at: PixelPoint, color: Rgb<u8>, thickness: u32) {
        self.draw_line(frame, at, at, color, thickness);
    }

    /// Draw text with its bottom-left corner at `origin`.
    ///
    /// Lowercase letters are rendered as uppercase; characters without a
    /// glyph render as `?`.
    pub fn put_text(&self, frame: &mut RgbImage, text: &str, origin: PixelPoint, color: Rgb<u8>) {
        let scale = self.text_scale;
        let (top, _) = self.text_band(origin.y);
        let advance = u32_to_i32(self.char_advance()).unwrap_or(i32::MAX);
        let cell = u32_to_i32(scale).unwrap_or(1);

        let mut x = origin.x;
        for c in text.chars() {
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let px = x + u32_to_i32(col).unwrap_or(0) * cell;
                    let py = top + i32::try_from(row).unwrap_or(0) * cell;
                    draw_filled_rect_mut(frame, Rect::at(px, py).of_size(scale, scale), color);
                }
            }
            x = x.saturating_add(advance);
        }
    }
}

fn stamp(frame: &mut RgbImage, center: (f64, f64), radius: i32, color: Rgb<u8>) {
    let center = (
        f64_to_i32_clamp(center.0.round(), i32::MIN, i32::MAX),
        f64_to_i32_clamp(center.1.round(), i32::MIN, i32::MAX),
    );
    if radius == 0 {
        if let (Ok(x), Ok(y)) = (u32::try_from(center.0), u32::try_from(center.1)) {
            if x < frame.width() && y < frame.height() {
                frame.put_pixel(x, y, color);
            }
        }
    } else {
        draw_filled_circle_mut(frame, center, radius, color);
    }
}

/// Liang-Barsky clip of a segment against the frame grown by `margin`
fn clip_segment(frame: &RgbImage, from: PixelPoint, to: PixelPoint, margin: i32) -> Option<((f64, f64), (f64, f64))> {
    let (x0, y0) = (f64::from(from.x), f64::from(from.y));
    let (dx, dy) = (f64::from(to.x) - x0, f64::from(to.y) - y0);
    let margin = f64::from(margin);
    let (xmin, ymin) = (-margin, -margin);
    let xmax = f64::from(frame.width()) - 1.0 + margin;
    let ymax = f64::from(frame.height()) - 1.0 + margin;

    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [(-dx, x0 - xmin), (dx, xmax - x0), (-dy, y0 - ymin), (dy, ymax - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }

    Some(((x0 + t0 * dx, y0 + t0 * dy), (x0 + t1 * dx, y0 + t1 * dy)))
}

/// 3x5 glyph rows, most significant of the three bits is the left column
#[rustfmt::skip]
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        'A' => [2, 5, 7, 5, 5], 'B' => [6, 5, 6, 5, 6], 'C' => [3, 4, 4, 4, 3],
        'D' => [6, 5, 5, 5, 6], 'E' => [7, 4, 6, 4, 7], 'F' => [7, 4, 6, 4, 4],
        'G' => [3, 4, 5, 5, 3], 'H' => [5, 5, 7, 5, 5], 'I' => [7, 2, 2, 2, 7],
        'J' => [1, 1, 1, 5, 2], 'K' => [5, 5, 6, 5, 5], 'L' => [4, 4, 4, 4, 7],
        'M' => [5, 7, 7, 5, 5], 'N' => [6, 5, 5, 5, 5], 'O' => [2, 5, 5, 5, 2],
        'P' => [6, 5, 6, 4, 4], 'Q' => [2, 5, 5, 6, 3], 'R' => [6, 5, 6, 5, 5],
        'S' => [3, 4, 2, 1, 6], 'T' => [7, 2, 2, 2, 2], 'U' => [5, 5, 5, 5, 7],
        'V' => [5, 5, 5, 5, 2], 'W' => [5, 5, 7, 7, 5], 'X' => [5, 5, 2, 5, 5],
        'Y' => [5, 5, 2, 2, 2], 'Z' => [7, 1, 2, 4, 7],
        '0' => [7, 5, 5, 5, 7], '1' => [2, 6, 2, 2, 7], '2' => [7, 1, 7, 4, 7],
        '3' => [7, 1, 7, 1, 7], '4' => [5, 5, 7, 1, 1], '5' => [7, 4, 7, 1, 7],
        '6' => [7, 4, 7, 5, 7], '7' => [7, 1, 2, 4, 4], '8' => [7, 5, 7, 5, 7],
        '9' => [7, 5, 7, 1, 7],
        ' ' => [0, 0, 0, 0, 0], ':' => [0, 2, 0, 2, 0], '-' => [0, 0, 7, 0, 0],
        '.' => [0, 0, 0, 0, 2], '+' => [0, 2, 7, 2, 0],
        _ => [6, 1, 2, 0, 2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn test_draw_line_marks_endpoints() {
        let mut frame = white(100, 100);
        FrameAnnotator::default().draw_line(
            &mut frame,
            PixelPoint::new(10, 10),
            PixelPoint::new(90, 50),
            NOSE_LINE_COLOR,
            2,
        );
        assert_eq!(*frame.get_pixel(10, 10), NOSE_LINE_COLOR);
        assert_eq!(*frame.get_pixel(90, 50), NOSE_LINE_COLOR);
        assert_eq!(*frame.get_pixel(10, 90), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_draw_line_far_outside_is_clipped() {
        let mut frame = white(64, 48);
        FrameAnnotator::default().draw_line(
            &mut frame,
            PixelPoint::new(32, 24),
            PixelPoint::new(2_000_000_000, 24),
            NOSE_LINE_COLOR,
            2,
        );
        assert_eq!(*frame.get_pixel(63, 24), NOSE_LINE_COLOR);

        // Entirely outside: untouched
        let mut frame = white(64, 48);
        let before = frame.clone();
        FrameAnnotator::default().draw_line(
            &mut frame,
            PixelPoint::new(-500, -500),
            PixelPoint::new(-100, -400),
            NOSE_LINE_COLOR,
            2,
        );
        assert_eq!(frame, before);
    }

    #[test]
    fn test_draw_point() {
        let mut frame = white(20, 20);
        FrameAnnotator::default().draw_point(&mut frame, PixelPoint::new(5, 7), IRIS_COLOR, 3);
        assert_eq!(*frame.get_pixel(5, 7), IRIS_COLOR);
        assert_eq!(*frame.get_pixel(6, 7), IRIS_COLOR);
        assert_eq!(*frame.get_pixel(15, 15), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_put_text_stays_in_band() {
        let annotator = FrameAnnotator::default();
        let mut frame = white(200, 60);
        annotator.put_text(&mut frame, "Head pose: Left", PixelPoint::new(10, 50), TEXT_COLOR);

        let (top, bottom) = annotator.text_band(50);
        let mut inked = 0;
        for (x, y, pixel) in frame.enumerate_pixels() {
            if *pixel == TEXT_COLOR {
                inked += 1;
                let y = i32::try_from(y).unwrap();
                assert!(y >= top && y < bottom, "ink at row {y} outside [{top}, {bottom})");
                assert!(x >= 10);
            }
        }
        assert!(inked > 0);
    }

    #[test]
    fn test_put_text_is_deterministic() {
        let annotator = FrameAnnotator::default();
        let mut a = white(120, 30);
        let mut b = white(120, 30);
        annotator.put_text(&mut a, "X: -12", PixelPoint::new(2, 20), TEXT_COLOR);
        annotator.put_text(&mut b, "x: -12", PixelPoint::new(2, 20), TEXT_COLOR);
        assert_eq!(a, b);
    }

    #[test]
    fn test_text_metrics() {
        let annotator = FrameAnnotator::new(0);
        assert_eq!(annotator.text_height(), 5);
        assert_eq!(annotator.char_advance(), 4);
        assert_eq!(FrameAnnotator::default().text_band(50), (40, 50));
        assert_eq!(FrameAnnotator::new(9).text_height(), 5 * MAX_TEXT_SCALE);
    }

    #[test]
    fn test_overlay_rows_never_collide() {
        use crate::constants::{HEAD_TEXT_ROWS, IRIS_TEXT_ROWS};

        for scale in 1..=MAX_TEXT_SCALE {
            let annotator = FrameAnnotator::new(scale);
            let bands: Vec<(i32, i32)> = HEAD_TEXT_ROWS
                .iter()
                .chain(IRIS_TEXT_ROWS.iter())
                .map(|&baseline| annotator.text_band(baseline))
                .collect();
            for (i, a) in bands.iter().enumerate() {
                assert!(a.0 >= 0, "scale {scale}: band {a:?} starts above the frame");
                for b in &bands[i + 1..] {
                    assert!(a.1 <= b.0 || b.1 <= a.0, "scale {scale}: bands {a:?} and {b:?} overlap");
                }
            }
        }
    }
}
