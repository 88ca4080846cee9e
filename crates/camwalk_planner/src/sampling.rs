//! Random draws used by the walk.
//!
//! All functions take the generator explicitly so a whole trajectory is
//! reproducible from one seed and a fixed draw order.

use camwalk_math::Vec3;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::{Normal, StandardNormal};

/// Uniform point in the box `center ± half_extent` (x, y, z drawn in order).
pub fn uniform_in_box<R: Rng + ?Sized>(rng: &mut R, center: Vec3, half_extent: Vec3) -> Vec3 {
    let mut offset = Vec3::ZERO;
    for axis in 0..3 {
        let h = half_extent[axis];
        offset[axis] = rng.gen::<f32>() * 2.0 * h - h;
    }
    center + offset
}

/// `count` independent uniform points in `center ± half_extent`.
pub fn propose_points<R: Rng + ?Sized>(
    rng: &mut R,
    center: Vec3,
    half_extent: Vec3,
    count: usize,
) -> Vec<Vec3> {
    (0..count)
        .map(|_| uniform_in_box(rng, center, half_extent))
        .collect()
}

/// Standard normal draw.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.sample(StandardNormal)
}

/// Nominal up vector plus isotropic Gaussian noise (x, y, z drawn in order).
///
/// A non-positive or non-finite `std_dev` returns the nominal vector
/// without consuming draws.
pub fn perturbed_up_hint<R: Rng + ?Sized>(rng: &mut R, nominal: Vec3, std_dev: f32) -> Vec3 {
    if std_dev <= 0.0 {
        return nominal;
    }
    let Ok(noise) = Normal::new(0.0f32, std_dev) else {
        return nominal;
    };
    nominal + Vec3::new(noise.sample(rng), noise.sample(rng), noise.sample(rng))
}

/// `count` indices into `0..len`, drawn with replacement. Empty if `len == 0`.
pub fn choose_with_replacement<R: Rng + ?Sized>(rng: &mut R, len: usize, count: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    (0..count).map(|_| rng.gen_range(0..len)).collect()
}

/// Index drawn with probability proportional to its weight.
///
/// Returns `None` when no weight is positive (or any is negative/NaN), so
/// the caller can pick its own fallback.
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f32]) -> Option<usize> {
    let dist = WeightedIndex::<f32>::new(weights).ok()?;
    Some(dist.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_in_box_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let center = Vec3::new(1.0, -2.0, 5.0);
        let half = Vec3::new(1.5, 1.5, 0.25);
        for p in propose_points(&mut rng, center, half, 1000) {
            let d = (p - center).abs();
            assert!(d.x <= 1.5 && d.y <= 1.5 && d.z <= 0.25);
        }
    }

    #[test]
    fn test_zero_extent_axis_is_fixed() {
        let mut rng = StdRng::seed_from_u64(42);
        let p = uniform_in_box(&mut rng, Vec3::ONE, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(p.y, 1.0);
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 20_000;
        let samples: Vec<f32> = (0..n).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f32>() / n as f32;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / n as f32;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
        assert!(samples.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_up_hint_without_noise() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(perturbed_up_hint(&mut rng, Vec3::Z, 0.0), Vec3::Z);
        assert_eq!(perturbed_up_hint(&mut rng, Vec3::Z, f32::NAN), Vec3::Z);
    }

    #[test]
    fn test_up_hint_spread() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 5_000;
        let hints: Vec<Vec3> = (0..n).map(|_| perturbed_up_hint(&mut rng, Vec3::Z, 0.1)).collect();
        let mean = hints.iter().copied().sum::<Vec3>() / n as f32;
        assert!((mean - Vec3::Z).abs().max_element() < 0.01, "mean {mean:?}");
        let var_x = hints.iter().map(|h| h.x * h.x).sum::<f32>() / n as f32;
        assert!((var_x - 0.01).abs() < 0.002, "variance {var_x}");
    }

    #[test]
    fn test_choose_with_replacement() {
        let mut rng = StdRng::seed_from_u64(42);
        let picks = choose_with_replacement(&mut rng, 3, 50);
        assert_eq!(picks.len(), 50);
        assert!(picks.iter().all(|&i| i < 3));
        assert!(choose_with_replacement(&mut rng, 0, 5).is_empty());
    }

    #[test]
    fn test_weighted_index() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(weighted_index(&mut rng, &[0.0, 2.0, 0.0]), Some(1));
        }
        assert_eq!(weighted_index(&mut rng, &[0.0, 0.0]), None);
        assert_eq!(weighted_index(&mut rng, &[]), None);
        assert_eq!(weighted_index(&mut rng, &[1.0, f32::NAN]), None);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(
            propose_points(&mut a, Vec3::ZERO, Vec3::ONE, 10),
            propose_points(&mut b, Vec3::ZERO, Vec3::ONE, 10)
        );
    }
}
