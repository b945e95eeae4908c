//! Kinematic curves for the movement phase machines
//!
//! All curves take a phase progress in `[0, 1]` and are evaluated
//! identically on every peer, so observers reproduce the authority's
//! trajectory bit-for-bit from the broadcast parameters.

use crate::{BASE_MOVE_SPEED, SPEED_SCALE_CAP, SPEED_SCALE_EXPONENT};

/// Vertical rise profile: fast early lift flattening toward the apex.
pub fn arc_height(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    (p * std::f32::consts::FRAC_PI_2).sin()
}

/// Horizontal lead-in for rise phases (smoothstep).
pub fn ease_in_out(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    p * p * (3.0 - 2.0 * p)
}

/// Accelerating drop: fraction of the apex-to-ground height covered.
pub fn fall_drop(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    p * p
}

/// Dash deceleration tail: fraction of dash speed remaining.
pub fn brake_falloff(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - p * p
}

/// Distance multiplier from the actor's speed at activation.
///
/// Speed relative to the base run speed is clamped to
/// `[1, SPEED_SCALE_CAP]` and then raised to `SPEED_SCALE_EXPONENT`,
/// so moving faster than base speed pays off super-linearly while
/// standing still never shortens the base distance.
pub fn speed_multiplier(speed: f32) -> f32 {
    let ratio = (speed / BASE_MOVE_SPEED).clamp(1.0, SPEED_SCALE_CAP);
    ratio.powf(SPEED_SCALE_EXPONENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_arc_height_endpoints() {
        assert_approx_eq!(arc_height(0.0), 0.0, 1e-6);
        assert_approx_eq!(arc_height(1.0), 1.0, 1e-6);
    }

    #[test]
    fn test_arc_height_flattens_near_apex() {
        // First half of the rise covers more height than the second half.
        let first = arc_height(0.5) - arc_height(0.0);
        let second = arc_height(1.0) - arc_height(0.5);
        assert!(first > second);
    }

    #[test]
    fn test_ease_in_out_midpoint() {
        assert_approx_eq!(ease_in_out(0.5), 0.5, 1e-6);
        assert_approx_eq!(ease_in_out(0.0), 0.0, 1e-6);
        assert_approx_eq!(ease_in_out(1.0), 1.0, 1e-6);
    }

    #[test]
    fn test_fall_drop_accelerates() {
        let first = fall_drop(0.5) - fall_drop(0.0);
        let second = fall_drop(1.0) - fall_drop(0.5);
        assert!(second > first);
        assert_approx_eq!(fall_drop(1.0), 1.0, 1e-6);
    }

    #[test]
    fn test_brake_falloff_bounds() {
        assert_approx_eq!(brake_falloff(0.0), 1.0, 1e-6);
        assert_approx_eq!(brake_falloff(1.0), 0.0, 1e-6);
    }

    #[test]
    fn test_speed_multiplier_floor_at_base_speed() {
        assert_approx_eq!(speed_multiplier(0.0), 1.0, 1e-6);
        assert_approx_eq!(speed_multiplier(BASE_MOVE_SPEED), 1.0, 1e-6);
    }

    #[test]
    fn test_speed_multiplier_super_linear() {
        let at_double = speed_multiplier(BASE_MOVE_SPEED * 2.0);
        // Exponent > 1 gives more than the linear 2x.
        assert!(at_double > 2.0);
        assert_approx_eq!(at_double, 2.0f32.powf(SPEED_SCALE_EXPONENT), 1e-5);
    }

    #[test]
    fn test_speed_multiplier_clamped_at_cap() {
        let at_cap = speed_multiplier(BASE_MOVE_SPEED * SPEED_SCALE_CAP);
        let beyond = speed_multiplier(BASE_MOVE_SPEED * SPEED_SCALE_CAP * 3.0);
        assert_approx_eq!(at_cap, beyond, 1e-6);
    }

    #[test]
    fn test_curves_clamp_out_of_range_progress() {
        assert_approx_eq!(arc_height(1.5), 1.0, 1e-6);
        assert_approx_eq!(fall_drop(-0.5), 0.0, 1e-6);
        assert_approx_eq!(brake_falloff(2.0), 0.0, 1e-6);
    }
}
