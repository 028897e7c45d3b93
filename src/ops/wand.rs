//! Color-similarity selection ("magic wand") over the source image.
//!
//! Grows a region from a seed pixel by comparing every candidate's color to
//! the seed color in RGB space, then unions the result into the mask buffer.
//! The traversal reads *source* colors only — existing mask contents never
//! influence which pixels match, and already-selected pixels stay selected.

use std::collections::VecDeque;

use image::{GrayImage, Luma, Rgba, RgbaImage};

/// User tolerance is a 0–100 scale; one tolerance step widens the accepted
/// Euclidean RGB distance by 2.55 channel units.
const TOLERANCE_SCALE: f32 = 2.55;

/// Select pixels color-similar to the seed and union them into `mask`.
///
/// * `contiguous == true`: breadth-first growth over 4-connected neighbors
///   starting at `seed` — the classic wand.  Terminates for any finite
///   image and any tolerance ≥ 0.
/// * `contiguous == false`: every matching pixel image-wide, connected or
///   not.
///
/// An out-of-bounds seed is a no-op.  Cost is O(W×H) worst case and the
/// call runs to completion synchronously; hosts with very large images can
/// hand in a downsampled copy for the color test while keeping the mask at
/// full resolution.
pub fn flood_select(
    source: &RgbaImage,
    mask: &mut GrayImage,
    seed: (u32, u32),
    tolerance: f32,
    contiguous: bool,
) {
    let (w, h) = source.dimensions();
    debug_assert_eq!((w, h), mask.dimensions());
    let (sx, sy) = seed;
    if sx >= w || sy >= h {
        return;
    }

    let seed_color = *source.get_pixel(sx, sy);
    let threshold = tolerance.max(0.0) * TOLERANCE_SCALE;
    let threshold_sq = threshold * threshold;

    if !contiguous {
        for (x, y, p) in source.enumerate_pixels() {
            if color_distance_sq(p, &seed_color) <= threshold_sq {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        return;
    }

    let wu = w as usize;
    let mut visited = vec![false; wu * h as usize];
    let mut queue = VecDeque::new();

    queue.push_back((sx, sy));
    visited[sy as usize * wu + sx as usize] = true;

    while let Some((x, y)) = queue.pop_front() {
        mask.put_pixel(x, y, Luma([255]));

        let neighbors = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbors {
            if nx >= w || ny >= h {
                continue;
            }
            let vi = ny as usize * wu + nx as usize;
            if visited[vi] {
                continue;
            }
            visited[vi] = true;

            if color_distance_sq(source.get_pixel(nx, ny), &seed_color) <= threshold_sq {
                queue.push_back((nx, ny));
            }
        }
    }
}

/// Squared Euclidean distance between two colors in RGB space.
#[inline]
fn color_distance_sq(a: &Rgba<u8>, b: &Rgba<u8>) -> f32 {
    let dr = a.0[0] as f32 - b.0[0] as f32;
    let dg = a.0[1] as f32 - b.0[1] as f32;
    let db = a.0[2] as f32 - b.0[2] as f32;
    dr * dr + dg * dg + db * db
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(mask: &GrayImage) -> usize {
        mask.as_raw().iter().filter(|&&v| v > 0).count()
    }

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn zero_tolerance_selects_exactly_the_connected_region() {
        // 4×4 image: left half red, right half blue.
        let mut img = solid(4, 4, [0, 0, 255, 255]);
        for y in 0..4 {
            for x in 0..2 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let mut mask = GrayImage::new(4, 4);
        flood_select(&img, &mut mask, (0, 0), 0.0, true);
        assert_eq!(selected(&mask), 8);
        // The blue side stays untouched.
        assert_eq!(mask.get_pixel(3, 0).0[0], 0);
    }

    #[test]
    fn tolerance_is_monotone() {
        // Horizontal gradient of reds.
        let mut img = solid(16, 4, [0, 0, 0, 255]);
        for y in 0..4 {
            for x in 0..16 {
                img.put_pixel(x, y, Rgba([(x * 16) as u8, 0, 0, 255]));
            }
        }
        let mut prev = 0usize;
        for tolerance in [0.0, 5.0, 10.0, 25.0, 50.0, 100.0] {
            let mut mask = GrayImage::new(16, 4);
            flood_select(&img, &mut mask, (0, 0), tolerance, true);
            let count = selected(&mask);
            assert!(count >= prev, "tolerance {} shrank the set", tolerance);
            prev = count;
        }
        // Wide-open tolerance takes the whole gradient.
        assert_eq!(prev, 16 * 4);
    }

    #[test]
    fn result_is_unioned_with_existing_selection() {
        let img = solid(8, 8, [10, 200, 30, 255]);
        let mut mask = GrayImage::new(8, 8);
        mask.put_pixel(7, 7, Luma([255]));
        flood_select(&img, &mut mask, (0, 0), 0.0, true);
        // Everything matches the seed, and the pre-existing pixel survives.
        assert_eq!(selected(&mask), 64);
    }

    #[test]
    fn out_of_bounds_seed_is_a_no_op() {
        let img = solid(8, 8, [50, 50, 50, 255]);
        let mut mask = GrayImage::new(8, 8);
        flood_select(&img, &mut mask, (8, 0), 100.0, true);
        flood_select(&img, &mut mask, (0, 200), 100.0, true);
        assert_eq!(selected(&mask), 0);
    }

    #[test]
    fn non_contiguous_selects_across_gaps() {
        // 5×5 checkerboard: red / black.
        let mut img = solid(5, 5, [0, 0, 0, 255]);
        for y in 0..5 {
            for x in 0..5 {
                if (x + y) % 2 == 0 {
                    img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
                }
            }
        }
        let mut mask = GrayImage::new(5, 5);
        flood_select(&img, &mut mask, (0, 0), 0.0, false);
        assert_eq!(selected(&mask), 13);

        // The contiguous wand from the same seed only gets the seed square.
        let mut mask = GrayImage::new(5, 5);
        flood_select(&img, &mut mask, (0, 0), 0.0, true);
        assert_eq!(selected(&mask), 1);
    }

    #[test]
    fn red_seed_scenario_with_channel_threshold_51() {
        // 800×600: columns 0–299 pure red, 300–399 near-red (within distance
        // 51 of pure red), 400+ blue (far outside).
        let mut img = solid(800, 600, [0, 0, 255, 255]);
        for y in 0..600 {
            for x in 0..300 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
            for x in 300..400 {
                // distance = √(25² + 20² + 20²) ≈ 37.7 ≤ 51
                img.put_pixel(x, y, Rgba([230, 20, 20, 255]));
            }
        }
        let mut mask = GrayImage::new(800, 600);
        // Tolerance 20 on the user scale ⇒ channel threshold 51.
        flood_select(&img, &mut mask, (10, 10), 20.0, true);

        assert_eq!(selected(&mask), 400 * 600);
        assert_eq!(mask.get_pixel(399, 599).0[0], 255);
        assert_eq!(mask.get_pixel(400, 0).0[0], 0);
    }
}
