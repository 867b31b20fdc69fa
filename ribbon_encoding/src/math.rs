// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small vector helpers used by the segment builder and the compute stages.

use std::f32::consts::{FRAC_PI_2, PI};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};

/// Squared lengths below this are treated as zero.
pub const SMALL_NUMBER: f32 = 1e-8;

/// Three component vector with the same layout as a packed `vec3<f32>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector in the direction of `self`, or zero when `self` is
    /// too short to have a meaningful direction.
    pub fn safe_normalize(self) -> Self {
        let len_sq = self.length_squared();
        if len_sq == 1.0 {
            self
        } else if len_sq < SMALL_NUMBER {
            Self::ZERO
        } else {
            self * (1.0 / len_sq.sqrt())
        }
    }

    /// Reflects `self` around `neighbor` so curvature stays continuous at a ribbon end.
    ///
    /// Computes `2 * dot(self, neighbor) * self - neighbor`.
    pub fn reflect_continuity(self, neighbor: Self) -> Self {
        self * (2.0 * self.dot(neighbor)) - neighbor
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 {
        rhs * self
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(value: [f32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

/// Polynomial approximation of `acos`, accurate to roughly 1e-4 radians.
pub fn acos_fast(x: f32) -> f32 {
    let abs = x.abs();
    let res = (-0.156_583 * abs + FRAC_PI_2) * (1.0 - abs).max(0.0).sqrt();
    if x >= 0.0 {
        res
    } else {
        PI - res
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Direction of a segment scaled by `1 / max(min_length, size)`.
///
/// Segments shorter than `min_length` keep a proportionally shorter direction. This only
/// happens for the closing segment of a ribbon.
pub fn segment_direction(delta: Vec3, size: f32, min_length: f32) -> Vec3 {
    let denom = size.max(min_length);
    if denom > 0.0 {
        delta * (1.0 / denom)
    } else {
        Vec3::ZERO
    }
}

/// Rotates a 2D point counter-clockwise by `degrees`.
pub fn rotate_degrees(p: [f32; 2], degrees: f32) -> [f32; 2] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [p[0] * cos - p[1] * sin, p[0] * sin + p[1] * cos]
}
