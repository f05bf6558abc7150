//! 数学基础类型与常量
//!
//! 所有几何计算共享同一组容差常量，避免修剪/延伸在公共边界处产生缝隙或重叠。

use serde::{Deserialize, Serialize};

pub type Point2 = nalgebra::Point2<f64>;
pub type Vector2 = nalgebra::Vector2<f64>;

/// 行列式、近零判断
pub const EPSILON: f64 = 1e-10;

/// 几何邻近判断（点重合、落在曲线上）
pub const GEOMETRY_TOLERANCE: f64 = 1e-6;

/// 参数范围判断（线段 [0,1]、射线 t>0）
pub const PARAM_TOLERANCE: f64 = 1e-9;

/// 角度范围判断
pub const ANGLE_TOLERANCE: f64 = 1e-9;

/// 修剪后短于此长度的子段被丢弃
pub const MIN_SEGMENT_LENGTH: f64 = 1e-3;

/// 偏移后半径/宽/高的下限
pub const MIN_EXTENT: f64 = 1e-3;

pub const TAU: f64 = std::f64::consts::TAU;

/// 两点距离
#[inline]
pub fn distance(a: &Point2, b: &Point2) -> f64 {
    (b - a).norm()
}

/// 两点中点
#[inline]
pub fn midpoint(a: &Point2, b: &Point2) -> Point2 {
    nalgebra::center(a, b)
}

/// 二维叉积
#[inline]
pub fn cross(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// 左法向量（未归一化）
#[inline]
pub fn left_normal(v: &Vector2) -> Vector2 {
    Vector2::new(-v.y, v.x)
}

/// 从中心指向点的角度
#[inline]
pub fn angle_of(center: &Point2, point: &Point2) -> f64 {
    (point.y - center.y).atan2(point.x - center.x)
}

/// 圆上指定角度的点
#[inline]
pub fn point_at_angle(center: &Point2, radius: f64, angle: f64) -> Point2 {
    Point2::new(
        center.x + radius * angle.cos(),
        center.y + radius * angle.sin(),
    )
}

/// 归一化角度到 [0, 2π)
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid 对极小负数可能返回 TAU
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// 从 start 逆时针扫到 end 的角度，范围 (0, 2π]
///
/// start 与 end 相差整圈时视为整圆。
pub fn sweep_between(start: f64, end: f64) -> f64 {
    let sweep = normalize_angle(end - start);
    if sweep < ANGLE_TOLERANCE {
        TAU
    } else {
        sweep
    }
}

/// 判断角度是否落在 start → end（逆时针）的扫掠范围内
///
/// 三个角度都可以是未归一化的（负数或超过 2π）。
pub fn angle_in_sweep(angle: f64, start: f64, end: f64) -> bool {
    let sweep = sweep_between(start, end);
    let rel = normalize_angle(angle - start);
    rel <= sweep + ANGLE_TOLERANCE || rel >= TAU - ANGLE_TOLERANCE
}

/// 向量旋转
#[inline]
pub fn rotate_vector(v: &Vector2, angle: f64) -> Vector2 {
    let (sin, cos) = angle.sin_cos();
    Vector2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// 点绕中心旋转
#[inline]
pub fn rotate_point(point: &Point2, center: &Point2, angle: f64) -> Point2 {
    center + rotate_vector(&(point - center), angle)
}

/// 点关于直线 (a, b) 的镜像
pub fn reflect_point(point: &Point2, a: &Point2, b: &Point2) -> Point2 {
    let axis = b - a;
    let len_sq = axis.norm_squared();
    if len_sq < EPSILON {
        return *point;
    }
    let v = point - a;
    let projected = a + axis * (v.dot(&axis) / len_sq);
    projected + (projected - point)
}

/// 判断两点是否在容差内重合
#[inline]
pub fn points_coincide(a: &Point2, b: &Point2, tolerance: f64) -> bool {
    distance(a, b) <= tolerance
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox2 {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// 空包围盒（min > max）
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::MAX, f64::MAX),
            max: Point2::new(f64::MIN, f64::MIN),
        }
    }

    /// 由两个任意角点构造
    pub fn from_corners(a: Point2, b: Point2) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point2>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(&p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_to_include(&mut self, point: &Point2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    pub fn union(&self, other: &BoundingBox2) -> BoundingBox2 {
        BoundingBox2::new(
            Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2 {
        midpoint(&self.min, &self.max)
    }

    pub fn contains(&self, point: &Point2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// 另一个包围盒是否完全位于本包围盒内
    pub fn contains_box(&self, other: &BoundingBox2) -> bool {
        other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
    }

    pub fn intersects(&self, other: &BoundingBox2) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < EPSILON);
        assert!((normalize_angle(5.0 * PI) - PI).abs() < 1e-9);
        assert!(normalize_angle(TAU).abs() < EPSILON);
    }

    #[test]
    fn test_angle_in_sweep_wraps() {
        // 从 270° 到 90°（跨越 0°）
        assert!(angle_in_sweep(0.0, 3.0 * FRAC_PI_2, FRAC_PI_2));
        assert!(!angle_in_sweep(PI, 3.0 * FRAC_PI_2, FRAC_PI_2));
        // 未归一化的负角度
        assert!(angle_in_sweep(0.1, -FRAC_PI_2, FRAC_PI_2));
        assert!(angle_in_sweep(TAU + 0.1, -FRAC_PI_2, FRAC_PI_2));
    }

    #[test]
    fn test_reflect_point() {
        let p = reflect_point(
            &Point2::new(1.0, 2.0),
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 0.0),
        );
        assert!((p.x - 1.0).abs() < EPSILON);
        assert!((p.y + 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_bbox_contains_and_intersects() {
        let a = BoundingBox2::from_corners(Point2::new(10.0, 10.0), Point2::new(0.0, 0.0));
        let b = BoundingBox2::new(Point2::new(2.0, 2.0), Point2::new(4.0, 4.0));
        let c = BoundingBox2::new(Point2::new(8.0, 8.0), Point2::new(12.0, 12.0));
        assert!(a.contains_box(&b));
        assert!(!a.contains_box(&c));
        assert!(a.intersects(&c));
        assert!(BoundingBox2::empty().is_empty());
    }
}
