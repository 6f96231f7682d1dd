// Angle normalization into (-pi, pi]
//
// Every yaw reading and every target heading passes through here before it
// is compared or subtracted. Comparing un-normalized angles overflows the
// +/-2pi seam and makes the robot take the long way around.

use std::f32::consts::{PI, TAU};

/// Normalize an angle in radians into the half-open interval `(-pi, pi]`.
///
/// Total over all finite inputs: every real value maps to exactly one
/// representative, and the function is idempotent.
pub fn normalize_angle(theta: f32) -> f32 {
    // Remainder lands in (-tau, tau); one conditional fold finishes the job.
    let mut a = theta % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}
