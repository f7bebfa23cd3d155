use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

/// Position or velocity in world units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn zero() -> Self {
        Vec2 { x: 0.0, y: 0.0 }
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector pointing the same way.
    ///
    /// A zero-length input yields the zero vector. Some vector libraries fall
    /// back to the unit x axis `(1, 0)` here instead; this one does not, so a
    /// dot whose velocity and acceleration cancel stops rather than turning east.
    pub fn normalize_or_zero(&self) -> Self {
        let len_sq = self.length_squared();
        if len_sq > 0.0 {
            *self / len_sq.sqrt()
        } else {
            Vec2::zero()
        }
    }

    /// Squared distance between two points. Neighbour radii are compared against this.
    pub fn distance_squared(&self, other: Vec2) -> f32 {
        (*self - other).length_squared()
    }

    /// Radians from the positive x axis, in `-PI..=PI`. The zero vector reports 0.
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;
    fn div(self, scalar: f32) -> Self {
        Self { x: self.x / scalar, y: self.y / scalar }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn normalize_produces_unit_length() {
        let v = Vec2::new(3.0, -4.0).normalize_or_zero();
        assert_relative_eq!(v.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(v.x, 0.6, epsilon = 1e-6);
        assert_relative_eq!(v.y, -0.8, epsilon = 1e-6);
    }

    #[test]
    fn normalize_of_zero_vector_is_zero_not_unit_x() {
        let n = Vec2::zero().normalize_or_zero();
        assert_eq!(n, Vec2::zero());
        assert_ne!(n, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn squared_distance_skips_the_root() {
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(4.0, 5.0);
        assert_eq!(a.distance_squared(b), 25.0);
        assert_eq!(b.distance_squared(a), 25.0);
    }

    #[test]
    fn assign_operators_accumulate() {
        let mut v = Vec2::new(2.0, 3.0);
        v += Vec2::new(-1.0, 0.5);
        assert_eq!(v, Vec2::new(1.0, 3.5));
        v -= Vec2::new(1.0, 1.0) * 2.0;
        assert_eq!(v, Vec2::new(-1.0, 1.5));
        assert_eq!(v / 0.5, Vec2::new(-2.0, 3.0));
    }

    #[test]
    fn angle_is_measured_from_positive_x() {
        assert_relative_eq!(Vec2::new(1.0, 0.0).angle(), 0.0);
        assert_relative_eq!(Vec2::new(0.0, 2.0).angle(), FRAC_PI_2);
        assert_relative_eq!(Vec2::new(-1.0, 0.0).angle(), PI);
        assert_eq!(Vec2::zero().angle(), 0.0);
    }
}
