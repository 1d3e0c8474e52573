//! Type definition of Float, otherwise constants and functions which
//! can be used almost everywhere else in the code.

// see pbrt.h

pub type Float = f32;

pub const MACHINE_EPSILON: Float = std::f32::EPSILON * 0.5;

/// Error propagation.
pub fn gamma(n: i32) -> Float {
    (n as Float * MACHINE_EPSILON) / (1.0 - n as Float * MACHINE_EPSILON)
}

/// Interpolate linearly between two provided values.
pub fn lerp(t: Float, v1: Float, v2: Float) -> Float {
    (1.0 as Float - t) * v1 + t * v2
}
