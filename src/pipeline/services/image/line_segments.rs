//! Progressive probabilistic Hough transform over a binary edge map.
//!
//! Edge points vote one at a time in a shuffled order; as soon as one
//! (angle, distance) cell reaches the vote threshold the line through the
//! point is walked in both directions across the edge map, tolerating gaps of
//! up to `max_line_gap` pixels. Points on the walked corridor are removed from
//! further voting. The shuffle uses a fixed seed, so results are reproducible.
use image::GrayImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SegmentDetectionOptions {
    /// Votes an accumulator cell needs before a line is traced.
    pub vote_threshold: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
    /// Angular resolution in degrees.
    pub theta_step_degrees: f64,
    pub seed: u64,
}

impl Default for SegmentDetectionOptions {
    fn default() -> Self {
        Self {
            vote_threshold: 30,
            min_line_length: 20,
            max_line_gap: 5,
            theta_step_degrees: 1.0,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl LineSegment {
    pub fn length(&self) -> f64 {
        let dx = self.end.0 as f64 - self.start.0 as f64;
        let dy = self.end.1 as f64 - self.start.1 as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

struct Accumulator {
    cos: Vec<f64>,
    sin: Vec<f64>,
    num_rho: usize,
    rho_offset: i64,
    votes: Vec<u32>,
}

impl Accumulator {
    fn new(width: u32, height: u32, theta_step_degrees: f64) -> Self {
        let num_angle = (180.0 / theta_step_degrees).round().max(1.0) as usize;
        let num_rho = ((width + height) * 2 + 1) as usize;
        let (sin, cos) = (0..num_angle)
            .map(|n| (n as f64 * theta_step_degrees).to_radians().sin_cos())
            .unzip();
        Self {
            cos,
            sin,
            num_rho,
            rho_offset: (num_rho as i64 - 1) / 2,
            votes: vec![0; num_angle * num_rho],
        }
    }

    fn cell(&self, angle: usize, x: u32, y: u32) -> usize {
        let rho = (x as f64 * self.cos[angle] + y as f64 * self.sin[angle]).round() as i64;
        angle * self.num_rho + (rho + self.rho_offset) as usize
    }

    /// Adds the point's votes and returns the strongest angle and its count.
    fn vote(&mut self, x: u32, y: u32) -> (usize, u32) {
        let mut best = (0, 0);
        for angle in 0..self.cos.len() {
            let cell = self.cell(angle, x, y);
            self.votes[cell] += 1;
            if self.votes[cell] > best.1 {
                best = (angle, self.votes[cell]);
            }
        }
        best
    }

    fn unvote(&mut self, x: u32, y: u32) {
        for angle in 0..self.cos.len() {
            let cell = self.cell(angle, x, y);
            self.votes[cell] = self.votes[cell].saturating_sub(1);
        }
    }
}

/// Finds straight segments on the foreground pixels of `edges`.
pub fn detect_segments(edges: &GrayImage, options: &SegmentDetectionOptions) -> Vec<LineSegment> {
    let (width, height) = edges.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut pending = GrayImage::from_fn(width, height, |x, y| {
        image::Luma([u8::from(edges.get_pixel(x, y)[0] > 0)])
    });
    let mut points: Vec<(u32, u32)> = pending
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    points.shuffle(&mut StdRng::seed_from_u64(options.seed));

    let mut accumulator = Accumulator::new(width, height, options.theta_step_degrees);
    let mut segments = Vec::new();

    for (x, y) in points {
        if pending.get_pixel(x, y)[0] == 0 {
            continue;
        }
        let (angle, votes) = accumulator.vote(x, y);
        if votes < options.vote_threshold {
            continue;
        }

        // Direction along the line whose normal is at `angle`.
        let (dir_x, dir_y) = (-accumulator.sin[angle], accumulator.cos[angle]);
        let walk = Walk::new(x, y, dir_x, dir_y);

        let ends = [
            walk.find_end(&pending, 1.0, options.max_line_gap),
            walk.find_end(&pending, -1.0, options.max_line_gap),
        ];

        let long_enough = ends[0].0.abs_diff(ends[1].0) >= options.min_line_length
            || ends[0].1.abs_diff(ends[1].1) >= options.min_line_length;

        for (k, sign) in [1.0, -1.0].into_iter().enumerate() {
            walk.clear_until(&mut pending, sign, ends[k], |px, py| {
                if long_enough {
                    accumulator.unvote(px, py);
                }
            });
        }

        if long_enough {
            segments.push(LineSegment {
                start: ends[0],
                end: ends[1],
            });
        }
    }

    segments
}

/// Pixel walk from a seed point, stepping one pixel along the dominant axis.
struct Walk {
    x0: f64,
    y0: f64,
    step_x: f64,
    step_y: f64,
}

impl Walk {
    fn new(x: u32, y: u32, dir_x: f64, dir_y: f64) -> Self {
        let (step_x, step_y) = if dir_x.abs() > dir_y.abs() {
            (dir_x.signum(), dir_y / dir_x.abs())
        } else {
            (dir_x / dir_y.abs(), dir_y.signum())
        };
        Self {
            x0: x as f64,
            y0: y as f64,
            step_x,
            step_y,
        }
    }

    fn position(&self, sign: f64, i: u32, width: u32, height: u32) -> Option<(u32, u32)> {
        let x = (self.x0 + sign * self.step_x * i as f64).round();
        let y = (self.y0 + sign * self.step_y * i as f64).round();
        if x < 0.0 || y < 0.0 || x >= width as f64 || y >= height as f64 {
            None
        } else {
            Some((x as u32, y as u32))
        }
    }

    fn find_end(&self, pending: &GrayImage, sign: f64, max_gap: u32) -> (u32, u32) {
        let (width, height) = pending.dimensions();
        let mut end = (self.x0 as u32, self.y0 as u32);
        let mut gap = 0;
        let mut i = 0;
        while let Some((x, y)) = self.position(sign, i, width, height) {
            if pending.get_pixel(x, y)[0] > 0 {
                gap = 0;
                end = (x, y);
            } else {
                gap += 1;
                if gap > max_gap {
                    break;
                }
            }
            i += 1;
        }
        end
    }

    fn clear_until(
        &self,
        pending: &mut GrayImage,
        sign: f64,
        end: (u32, u32),
        mut on_cleared: impl FnMut(u32, u32),
    ) {
        let (width, height) = pending.dimensions();
        let mut i = 0;
        while let Some((x, y)) = self.position(sign, i, width, height) {
            if pending.get_pixel(x, y)[0] > 0 {
                on_cleared(x, y);
                pending.put_pixel(x, y, image::Luma([0]));
            }
            if (x, y) == end {
                break;
            }
            i += 1;
        }
    }
}
