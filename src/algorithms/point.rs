/// 二维向量
///
/// 航位推算（PDR）使用的平面坐标/位移，单位为米

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// 平面点或位移向量
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Point2D { x, y }
    }

    /// 原点 / 零向量
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// 向量长度
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// 与另一点的欧几里得距离
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (*self - *other).length()
    }
}

impl Add for Point2D {
    type Output = Point2D;
    fn add(self, other: Point2D) -> Point2D {
        Point2D::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;
    fn sub(self, other: Point2D) -> Point2D {
        Point2D::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Point2D;
    fn mul(self, scalar: f64) -> Point2D {
        Point2D::new(self.x * scalar, self.y * scalar)
    }
}

impl Div<f64> for Point2D {
    type Output = Point2D;
    fn div(self, scalar: f64) -> Point2D {
        Point2D::new(self.x / scalar, self.y / scalar)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Point2D::new(x, y)
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let a = Point2D::new(1.0, 2.0);
        let b = Point2D::new(3.0, 5.0);
        assert_eq!(a + b, Point2D::new(4.0, 7.0));
        assert_eq!(b - a, Point2D::new(2.0, 3.0));
        assert_eq!(a * 2.0, Point2D::new(2.0, 4.0));
        assert_eq!(b / 2.0, Point2D::new(1.5, 2.5));
    }

    #[test]
    fn test_point_distance() {
        let a = Point2D::zero();
        let b = Point2D::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.length(), 5.0);
    }
}
