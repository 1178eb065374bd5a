use crate::pipeline::types::{landmark, HandObservation, Landmark};
use image::{DynamicImage, Rgb, RgbImage};

const CONNECTION_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LANDMARK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const REFERENCE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const DOT_RADIUS: i64 = 4;
// Normalized coordinates are clamped to one frame's width or height beyond each edge.
const MIN_COORDINATE: f32 = -1.0;
const MAX_COORDINATE: f32 = 2.0;

/// Copies the frame and draws every hand skeleton on it.
pub fn annotate(image: &DynamicImage, hands: &[HandObservation]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for hand in hands {
        draw_hand(&mut canvas, hand);
    }
    canvas
}

fn draw_hand(canvas: &mut RgbImage, hand: &HandObservation) {
    let points: Vec<Option<(i64, i64)>> = hand
        .landmarks
        .iter()
        .map(|point| to_pixel(canvas, point))
        .collect();

    for &(from, to) in landmark::CONNECTIONS.iter() {
        if let (Some(&Some(a)), Some(&Some(b))) = (points.get(from), points.get(to)) {
            draw_line(canvas, a, b, CONNECTION_COLOR);
        }
    }
    for &point in points.iter().flatten() {
        draw_dot(canvas, point, LANDMARK_COLOR);
    }
    for &index in landmark::REFERENCE_JOINTS.iter() {
        if let Some(&Some(point)) = points.get(index) {
            draw_dot(canvas, point, REFERENCE_COLOR);
        }
    }
}

/// Pixel position of a landmark, or `None` when a coordinate is not a number.
fn to_pixel(canvas: &RgbImage, point: &Landmark) -> Option<(i64, i64)> {
    if !point.x.is_finite() || !point.y.is_finite() {
        return None;
    }
    let scale = |value: f32, extent: u32| {
        (value.clamp(MIN_COORDINATE, MAX_COORDINATE) * extent as f32).round() as i64
    };
    Some((scale(point.x, canvas.width()), scale(point.y, canvas.height())))
}

fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(canvas.width()) && y < i64::from(canvas.height()) {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(canvas: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).max(1);
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        let x = from.0 as f64 + (to.0 - from.0) as f64 * t;
        let y = from.1 as f64 + (to.1 - from.1) as f64 * t;
        put(canvas, x.round() as i64, y.round() as i64, color);
    }
}

fn draw_dot(canvas: &mut RgbImage, center: (i64, i64), color: Rgb<u8>) {
    for dy in -DOT_RADIUS..=DOT_RADIUS {
        for dx in -DOT_RADIUS..=DOT_RADIUS {
            if dx * dx + dy * dy <= DOT_RADIUS * DOT_RADIUS {
                put(canvas, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}
