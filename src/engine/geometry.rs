//! Small 3D vector and bounding-box math used by ports, the validator,
//! and the placement solver. Millimeters and degrees throughout.

use serde::{Deserialize, Serialize};

/// A 3D vector or point, in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction; zero vectors are returned as-is
    pub fn normalized(&self) -> Vec3 {
        let n = self.norm();
        if n == 0.0 {
            *self
        } else {
            self.scale(1.0 / n)
        }
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        self.sub(other).norm()
    }

    pub fn negated(&self) -> Vec3 {
        self.scale(-1.0)
    }
}

/// Angle between two vectors in degrees, in [0, 180]
pub fn angle_between_deg(a: &Vec3, b: &Vec3) -> f64 {
    let na = a.norm();
    let nb = b.norm();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let cos = (a.dot(b) / (na * nb)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// How far two axes deviate from anti-parallel, in degrees.
///
/// Mating ports face each other, so a perfect mate has axes at 180 deg.
pub fn antiparallel_deviation_deg(a: &Vec3, b: &Vec3) -> f64 {
    180.0 - angle_between_deg(a, b)
}

/// Axis-aligned bounding box, in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        self.min.add(&self.max).scale(0.5)
    }

    pub fn half_size(&self) -> Vec3 {
        self.max.sub(&self.min).scale(0.5)
    }

    /// The box translated by the given offset
    pub fn translated(&self, offset: &Vec3) -> Aabb {
        Aabb::new(self.min.add(offset), self.max.add(offset))
    }

    /// Extent of the box projected onto a unit axis (conservative: uses
    /// the half-size support along the axis)
    pub fn extent_along(&self, axis: &Vec3) -> f64 {
        let h = self.half_size();
        (h.x * axis.x).abs() + (h.y * axis.y).abs() + (h.z * axis.z).abs()
    }

    /// Whether two boxes come closer than the given clearance on every axis
    pub fn overlaps(&self, other: &Aabb, clearance: f64) -> bool {
        let ca = self.center();
        let cb = other.center();
        let ha = self.half_size();
        let hb = other.half_size();

        (ca.x - cb.x).abs() < ha.x + hb.x + clearance
            && (ca.y - cb.y).abs() < ha.y + hb.y + clearance
            && (ca.z - cb.z).abs() < ha.z + hb.z + clearance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_unit_length() {
        let v = Vec3::new(3.0, 4.0, 0.0).normalized();
        assert!((v.norm() - 1.0).abs() < 1e-12);
        assert!((v.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_angle_between_orthogonal() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert!((angle_between_deg(&a, &b) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_antiparallel_deviation() {
        let a = Vec3::new(0.0, 0.0, 1.0);
        let b = Vec3::new(0.0, 0.0, -1.0);
        assert!(antiparallel_deviation_deg(&a, &b).abs() < 1e-9);

        // Parallel axes are maximally deviated from a mate
        assert!((antiparallel_deviation_deg(&a, &a) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_aabb_overlap_with_clearance() {
        let a = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0));
        let b = Aabb::new(Vec3::new(12.0, 0.0, 0.0), Vec3::new(22.0, 10.0, 10.0));

        // 2mm apart: no contact, but within a 5mm clearance
        assert!(!a.overlaps(&b, 0.0));
        assert!(a.overlaps(&b, 5.0));
    }

    #[test]
    fn test_aabb_translated() {
        let a = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        let moved = a.translated(&Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(moved.min.x, 5.0);
        assert_eq!(moved.center().x, 6.0);
    }

    #[test]
    fn test_extent_along_axis() {
        let a = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 4.0, 2.0));
        assert!((a.extent_along(&Vec3::new(1.0, 0.0, 0.0)) - 5.0).abs() < 1e-12);
        assert!((a.extent_along(&Vec3::new(0.0, 0.0, 1.0)) - 1.0).abs() < 1e-12);
    }
}
