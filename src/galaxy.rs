//! Procedural galaxy point-cloud generation.
//!
//! A galaxy is a flat disk of points assigned round-robin to evenly spaced
//! spiral arms, with a per-axis jitter offset that tightens toward the core
//! and a color ramp from the center outward. Generation is a pure transform
//! from [`GalaxyParams`] to a [`PointCloud`]; the renderer owns everything
//! GPU-side.
//!
//! The jitter is kept separate from the base position on purpose: the vertex
//! shader twists the base disk over time and adds the offset afterwards, so
//! the spiral animation never disturbs the jitter shape.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Smallest allowed spawn radius when clamping out-of-range input.
pub const MIN_RADIUS: f32 = 0.01;
/// Smallest allowed visual point size when clamping out-of-range input.
pub const MIN_SIZE: f32 = 0.0001;

/// Tunable galaxy parameters.
///
/// All fields are plain data; the debug panel mutates them and the
/// application regenerates the cloud on commit. Out-of-range values are
/// clamped at this boundary (see [`GalaxyParams::clamped`]), never inside
/// the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GalaxyParams {
    /// Number of points in the cloud.
    pub count: u32,
    /// Visual point size (view-space units, scaled per point).
    pub size: f32,
    /// Maximum spawn radius of the disk.
    pub radius: f32,
    /// Number of spiral arms.
    pub branches: u32,
    /// Angular twist factor. Currently not consumed by the generation
    /// formula; kept so existing configurations round-trip unchanged.
    pub spin: f32,
    /// Jitter magnitude, scaled by each point's disk radius.
    pub randomness: f32,
    /// Jitter falloff exponent. Higher values concentrate points near
    /// their base position.
    pub randomness_power: f32,
    /// Color at the galaxy core.
    pub inside_color: Vec3,
    /// Color at the rim.
    pub outside_color: Vec3,
    /// Multiplier on the inside-to-outside interpolation factor. Values
    /// above 1 overshoot past the rim color; that is intentional.
    pub lerp_intensity: f32,
}

impl Default for GalaxyParams {
    fn default() -> Self {
        Self {
            count: 100_000,
            size: 0.005,
            radius: 10.0,
            branches: 4,
            spin: 1.0,
            randomness: 0.5,
            randomness_power: 4.0,
            inside_color: color_from_hex(0x30c2c2),
            outside_color: color_from_hex(0xff035f),
            lerp_intensity: 1.0,
        }
    }
}

impl GalaxyParams {
    /// Clamp every field into its valid range.
    ///
    /// The generator assumes valid parameters; callers feed UI state
    /// through here before regenerating.
    pub fn clamped(mut self) -> Self {
        self.count = self.count.max(1);
        self.size = self.size.max(MIN_SIZE);
        self.radius = self.radius.max(MIN_RADIUS);
        self.branches = self.branches.max(1);
        self.randomness = self.randomness.max(0.0);
        self.randomness_power = self.randomness_power.max(f32::EPSILON);
        self.lerp_intensity = self.lerp_intensity.max(1.0);
        self
    }
}

/// Convert a 24-bit `0xRRGGBB` value to a color vector in [0, 1].
pub fn color_from_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

/// One generated galaxy: per-point attribute arrays, all of equal length.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    /// Base positions on the flat disk.
    pub positions: Vec<Vec3>,
    /// Per-axis jitter offsets, applied by the shader at render time.
    pub jitter: Vec<Vec3>,
    /// Per-point colors.
    pub colors: Vec<Vec3>,
    /// Per-point size multipliers in [0, 1).
    pub scales: Vec<f32>,
}

impl PointCloud {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the cloud holds no points.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Generate a galaxy from entropy-seeded randomness.
///
/// Each call produces a fresh draw; there is no persistent state.
pub fn generate(params: &GalaxyParams) -> PointCloud {
    let mut rng = SmallRng::from_entropy();
    generate_with(params, &mut rng)
}

/// Generate a galaxy from the given random source.
///
/// Per point `i`:
/// 1. draw a disk radius `r` uniformly in `[0, params.radius)`,
/// 2. assign the point to arm `i % branches`, giving evenly spaced arms
///    with uniform density,
/// 3. place it at `(cos(a) * r, 0, sin(a) * r)`,
/// 4. draw a per-axis offset `u^randomness_power * sign * randomness * r`,
///    stored separately from the position,
/// 5. mix the core color toward the rim color by
///    `(r / radius) * lerp_intensity` (unclamped, so the rim may overshoot),
/// 6. draw a size multiplier in `[0, 1)`.
pub fn generate_with<R: Rng>(params: &GalaxyParams, rng: &mut R) -> PointCloud {
    let count = params.count as usize;
    let mut positions = Vec::with_capacity(count);
    let mut jitter = Vec::with_capacity(count);
    let mut colors = Vec::with_capacity(count);
    let mut scales = Vec::with_capacity(count);

    for i in 0..count {
        let radius = rng.gen::<f32>() * params.radius;
        let branch = (i as u32 % params.branches) as f32 / params.branches as f32;
        let branch_angle = branch * TAU;

        positions.push(Vec3::new(
            branch_angle.cos() * radius,
            0.0,
            branch_angle.sin() * radius,
        ));

        jitter.push(Vec3::new(
            jitter_axis(rng, params, radius),
            jitter_axis(rng, params, radius),
            jitter_axis(rng, params, radius),
        ));

        let t = radius / params.radius * params.lerp_intensity;
        colors.push(params.inside_color.lerp(params.outside_color, t));

        scales.push(rng.gen::<f32>());
    }

    PointCloud {
        positions,
        jitter,
        colors,
        scales,
    }
}

fn jitter_axis<R: Rng>(rng: &mut R, params: &GalaxyParams, radius: f32) -> f32 {
    let magnitude = rng.gen::<f32>().powf(params.randomness_power);
    let sign = if rng.gen::<f32>() < 0.5 { 1.0 } else { -1.0 };
    magnitude * sign * params.randomness * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    /// Random source that returns the same word forever. `FixedRng(0)`
    /// makes every uniform draw 0.0; `FixedRng(u32::MAX)` makes every draw
    /// the largest f32 below 1.0.
    struct FixedRng(u32);

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            self.0
        }

        fn next_u64(&mut self) -> u64 {
            ((self.0 as u64) << 32) | self.0 as u64
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let bytes = self.0.to_le_bytes();
            for (i, b) in dest.iter_mut().enumerate() {
                *b = bytes[i % 4];
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn params(count: u32, branches: u32) -> GalaxyParams {
        GalaxyParams {
            count,
            branches,
            ..GalaxyParams::default()
        }
    }

    #[test]
    fn arrays_share_length() {
        let p = params(1000, 3);
        let cloud = generate(&p);
        assert_eq!(cloud.positions.len(), 1000);
        assert_eq!(cloud.jitter.len(), 1000);
        assert_eq!(cloud.colors.len(), 1000);
        assert_eq!(cloud.scales.len(), 1000);
        assert_eq!(cloud.len(), 1000);
    }

    #[test]
    fn scales_stay_in_unit_range() {
        let cloud = generate(&params(5000, 4));
        for s in &cloud.scales {
            assert!(*s >= 0.0 && *s < 1.0, "scale {} out of range", s);
        }
    }

    #[test]
    fn branches_are_round_robin() {
        let p = GalaxyParams {
            randomness: 0.0,
            ..params(12, 4)
        };
        let mut rng = SmallRng::seed_from_u64(11);
        let cloud = generate_with(&p, &mut rng);

        let mut per_branch = [0usize; 4];
        for (i, pos) in cloud.positions.iter().enumerate() {
            let expected = (i % 4) as f32 / 4.0 * TAU;
            // Cross-multiplied angle check avoids dividing by the radius,
            // which may be arbitrarily small.
            let cross = pos.x * expected.sin() - pos.z * expected.cos();
            assert!(cross.abs() < 1e-4, "point {} off its arm: {}", i, cross);
            assert_eq!(pos.y, 0.0);
            per_branch[i % 4] += 1;
        }
        assert_eq!(per_branch, [3, 3, 3, 3]);
    }

    #[test]
    fn zero_randomness_means_zero_jitter() {
        let p = GalaxyParams {
            randomness: 0.0,
            ..params(500, 5)
        };
        let cloud = generate(&p);
        for j in &cloud.jitter {
            assert_eq!(*j, Vec3::ZERO);
        }
    }

    #[test]
    fn zero_draw_lands_on_inside_color() {
        let p = params(16, 4);
        let mut rng = FixedRng(0);
        let cloud = generate_with(&p, &mut rng);
        for (pos, color) in cloud.positions.iter().zip(&cloud.colors) {
            assert_eq!(*pos, Vec3::ZERO);
            assert_eq!(*color, p.inside_color);
        }
        for s in &cloud.scales {
            assert_eq!(*s, 0.0);
        }
    }

    #[test]
    fn max_draw_lands_on_outside_color() {
        let p = GalaxyParams {
            randomness: 0.0,
            lerp_intensity: 1.0,
            ..params(16, 4)
        };
        let mut rng = FixedRng(u32::MAX);
        let cloud = generate_with(&p, &mut rng);
        for (pos, color) in cloud.positions.iter().zip(&cloud.colors) {
            // A u32-backed uniform draw cannot produce exactly 1.0, so the
            // rim is approached to within the sampling epsilon.
            let r = pos.length();
            assert!((r - p.radius).abs() < 1e-3, "radius {} != {}", r, p.radius);
            assert!((*color - p.outside_color).length() < 1e-5);
        }
    }

    #[test]
    fn four_branch_scenario() {
        let p = GalaxyParams {
            count: 4,
            branches: 4,
            radius: 10.0,
            randomness: 0.0,
            randomness_power: 4.0,
            lerp_intensity: 1.0,
            inside_color: color_from_hex(0x000000),
            outside_color: color_from_hex(0xffffff),
            ..GalaxyParams::default()
        };
        let mut rng = FixedRng(u32::MAX);
        let cloud = generate_with(&p, &mut rng);

        let expected = [
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(-10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -10.0),
        ];
        for (pos, want) in cloud.positions.iter().zip(&expected) {
            assert!((*pos - *want).length() < 1e-3, "{:?} != {:?}", pos, want);
        }
        for color in &cloud.colors {
            assert!((*color - Vec3::ONE).length() < 1e-5, "not white: {:?}", color);
        }
        for j in &cloud.jitter {
            assert_eq!(*j, Vec3::ZERO);
        }
    }

    #[test]
    fn seeded_generation_is_repeatable() {
        let p = params(256, 3);
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        let first = generate_with(&p, &mut a);
        let second = generate_with(&p, &mut b);
        assert_eq!(first.positions, second.positions);
        assert_eq!(first.jitter, second.jitter);
        assert_eq!(first.colors, second.colors);
        assert_eq!(first.scales, second.scales);
    }

    #[test]
    fn lerp_overshoot_is_preserved() {
        let p = GalaxyParams {
            lerp_intensity: 3.0,
            inside_color: Vec3::ZERO,
            outside_color: Vec3::ONE,
            randomness: 0.0,
            ..params(8, 4)
        };
        let mut rng = FixedRng(u32::MAX);
        let cloud = generate_with(&p, &mut rng);
        for color in &cloud.colors {
            // t is close to 3.0 at the rim, so channels land near 3.0.
            assert!(color.x > 1.5, "overshoot was clamped: {:?}", color);
        }
    }

    #[test]
    fn clamping_rejects_degenerate_input() {
        let p = GalaxyParams {
            count: 0,
            branches: 0,
            radius: -2.0,
            size: 0.0,
            randomness: -1.0,
            lerp_intensity: 0.0,
            ..GalaxyParams::default()
        }
        .clamped();
        assert_eq!(p.count, 1);
        assert_eq!(p.branches, 1);
        assert_eq!(p.radius, MIN_RADIUS);
        assert_eq!(p.size, MIN_SIZE);
        assert_eq!(p.randomness, 0.0);
        assert_eq!(p.lerp_intensity, 1.0);
    }

    #[test]
    fn hex_colors_decode() {
        assert_eq!(color_from_hex(0x000000), Vec3::ZERO);
        assert_eq!(color_from_hex(0xffffff), Vec3::ONE);
        let teal = color_from_hex(0x30c2c2);
        assert!((teal.x - 48.0 / 255.0).abs() < 1e-6);
        assert!((teal.y - 194.0 / 255.0).abs() < 1e-6);
        assert!((teal.z - 194.0 / 255.0).abs() < 1e-6);
    }
}
