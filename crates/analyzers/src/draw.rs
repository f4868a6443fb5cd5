//! Overlay drawing shared by the analyzers.

use frameaudit_video::RawFrame;
use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);

/// Height of one status stripe.
const STRIPE_HEIGHT: u32 = 6;

/// Two-pixel line from `from` to `to`.
pub fn thick_line(frame: &mut RawFrame, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
    draw_line_segment_mut(frame, from, to, color);
    draw_line_segment_mut(frame, (from.0, from.1 + 1.0), (to.0, to.1 + 1.0), color);
}

/// Outline of a detection box given as `[x1, y1, x2, y2]` in pixels.
pub fn box_outline(frame: &mut RawFrame, bbox: [f64; 4], color: Rgb<u8>) {
    let [x1, y1, x2, y2] = bbox;
    let width = (x2 - x1).round();
    let height = (y2 - y1).round();
    if width < 1.0 || height < 1.0 {
        return;
    }
    let rect = Rect::at(x1 as i32, y1 as i32).of_size(width as u32, height as u32);
    draw_hollow_rect_mut(frame, rect, color);
    if width > 2.0 && height > 2.0 {
        let inner = Rect::at(x1 as i32 + 1, y1 as i32 + 1).of_size(width as u32 - 2, height as u32 - 2);
        draw_hollow_rect_mut(frame, inner, color);
    }
}

/// Solid stripe across the top of the frame. `slot` picks the row so
/// several analyzers can mark the same image.
pub fn status_stripe(frame: &mut RawFrame, slot: u32, color: Rgb<u8>) {
    let (width, height) = frame.dimensions();
    let top = slot * STRIPE_HEIGHT;
    if width == 0 || top >= height {
        return;
    }
    let rows = STRIPE_HEIGHT.min(height - top);
    draw_filled_rect_mut(frame, Rect::at(0, top as i32).of_size(width, rows), color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripe_is_clipped_to_frame() {
        let mut frame = RawFrame::new(8, 8);
        status_stripe(&mut frame, 1, RED);
        assert_eq!(*frame.get_pixel(0, 6), RED);
        assert_eq!(*frame.get_pixel(0, 5), Rgb([0, 0, 0]));

        // Off-frame slots are ignored.
        status_stripe(&mut frame, 5, GREEN);
    }

    #[test]
    fn test_degenerate_boxes_are_skipped() {
        let mut frame = RawFrame::new(8, 8);
        box_outline(&mut frame, [4.0, 4.0, 4.0, 6.0], ORANGE);
        assert!(frame.pixels().all(|p| *p == Rgb([0, 0, 0])));

        box_outline(&mut frame, [1.0, 1.0, 6.0, 6.0], ORANGE);
        assert_eq!(*frame.get_pixel(1, 1), ORANGE);
        assert_eq!(*frame.get_pixel(2, 2), ORANGE);
    }
}
