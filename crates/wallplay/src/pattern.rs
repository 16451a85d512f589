//! Synthetic YUV 4:2:0 frames standing in for decoded video.

use glam::UVec2;
use wallconfig::SourcePattern;

/// Planes of one 8-bit, video-range 4:2:0 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternFrame {
    pub size: UVec2,
    pub chroma_size: UVec2,
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
}

const BARS: [[f32; 3]; 8] = [
    [1.0, 1.0, 1.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 1.0],
    [0.0, 1.0, 0.0],
    [1.0, 0.0, 1.0],
    [1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, 0.0],
];

const CHECKER_CELLS: u32 = 8;

/// BT.601 video-range YCbCr of an RGB colour in `[0, 1]`.
fn rgb_to_yuv([r, g, b]: [f32; 3]) -> [u8; 3] {
    let y = 16.0 + 65.481 * r + 128.553 * g + 24.966 * b;
    let u = 128.0 - 37.797 * r - 74.203 * g + 112.0 * b;
    let v = 128.0 + 112.0 * r - 93.786 * g - 18.214 * b;
    [y, u, v].map(|value| value.round().clamp(0.0, 255.0) as u8)
}

fn sample(pattern: SourcePattern, size: UVec2, x: u32, y: u32) -> [u8; 3] {
    match pattern {
        SourcePattern::Bars => {
            let index = (x * BARS.len() as u32 / size.x) as usize;
            rgb_to_yuv(BARS[index.min(BARS.len() - 1)])
        }
        SourcePattern::Gradient => {
            let t = x as f32 / (size.x.max(2) - 1) as f32;
            rgb_to_yuv([t, t, t])
        }
        SourcePattern::Checker => {
            let cell = (size / CHECKER_CELLS).max(UVec2::ONE);
            let level = if (x / cell.x + y / cell.y) % 2 == 0 { 1.0 } else { 0.0 };
            rgb_to_yuv([level; 3])
        }
    }
}

pub fn generate(pattern: SourcePattern, size: UVec2) -> PatternFrame {
    let size = size.max(UVec2::ONE);
    let chroma_size = (size / 2).max(UVec2::ONE);

    let mut y = Vec::with_capacity(size.x as usize * size.y as usize);
    for row in 0..size.y {
        for column in 0..size.x {
            y.push(sample(pattern, size, column, row)[0]);
        }
    }

    let chroma_len = chroma_size.x as usize * chroma_size.y as usize;
    let mut u = Vec::with_capacity(chroma_len);
    let mut v = Vec::with_capacity(chroma_len);
    for row in 0..chroma_size.y {
        for column in 0..chroma_size.x {
            let [_, cb, cr] = sample(
                pattern,
                size,
                (column * 2).min(size.x - 1),
                (row * 2).min(size.y - 1),
            );
            u.push(cb);
            v.push(cr);
        }
    }

    PatternFrame {
        size,
        chroma_size,
        y,
        u,
        v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_sizes_follow_420_subsampling() {
        let frame = generate(SourcePattern::Bars, UVec2::new(64, 48));
        assert_eq!(frame.chroma_size, UVec2::new(32, 24));
        assert_eq!(frame.y.len(), 64 * 48);
        assert_eq!(frame.u.len(), 32 * 24);
        assert_eq!(frame.v.len(), 32 * 24);

        let tiny = generate(SourcePattern::Checker, UVec2::new(1, 1));
        assert_eq!(tiny.chroma_size, UVec2::ONE);
        assert_eq!(tiny.u.len(), 1);
    }

    #[test]
    fn white_and_black_hit_video_range_limits() {
        assert_eq!(rgb_to_yuv([1.0, 1.0, 1.0]), [235, 128, 128]);
        assert_eq!(rgb_to_yuv([0.0, 0.0, 0.0]), [16, 128, 128]);
    }

    #[test]
    fn bars_start_white_and_end_black() {
        let frame = generate(SourcePattern::Bars, UVec2::new(80, 2));
        assert_eq!(frame.y[0], 235);
        assert_eq!(frame.y[79], 16);
    }

    #[test]
    fn gradient_is_neutral_and_increasing() {
        let frame = generate(SourcePattern::Gradient, UVec2::new(16, 4));
        assert!(frame.y[..16].windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(frame.u.iter().chain(&frame.v).all(|value| *value == 128));
    }
}
