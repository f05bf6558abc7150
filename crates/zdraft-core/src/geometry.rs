//! 几何图元定义
//!
//! 支持的基本图元：
//! - 线段 (Line)、构造线 (XLine)、射线 (Ray)
//! - 圆 (Circle)、圆弧 (Arc)、椭圆 (Ellipse)
//! - 矩形 (Rectangle，始终轴对齐)
//! - 多段线 (Polyline)、样条曲线 (Spline)
//! - 文本 (Text)、尺寸标注 (Dimension)、填充 (Hatch)
//! - 块参照 (BlockRef)
//!
//! 坐标系沿用画布约定：x 向右，y 向下。角度为 `atan2(dy, dx)`，
//! "逆时针"指角度增大的方向。

use crate::entity::BlockId;
use crate::error::GeometryError;
use crate::math::{
    angle_in_sweep, angle_of, cross, distance, left_normal, midpoint, normalize_angle,
    point_at_angle, rotate_vector, sweep_between, BoundingBox2, Point2, Vector2, EPSILON, TAU,
};
use crate::properties::Color;
use crate::spline;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// 几何类型枚举
///
/// 新增变体时，所有引擎中的 `match` 都必须处理它。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Line(Line),
    Circle(Circle),
    Arc(Arc),
    Rectangle(Rectangle),
    Polyline(Polyline),
    Ellipse(Ellipse),
    Text(Text),
    Dimension(Dimension),
    Hatch(Hatch),
    Spline(Spline),
    XLine(XLine),
    Ray(Ray),
    BlockRef(BlockRef),
}

impl Geometry {
    /// 获取几何的包围盒
    ///
    /// 无限长图元、空边界以及块参照（需要块表）返回 `None`。
    pub fn bounding_box(&self) -> Option<BoundingBox2> {
        match self {
            Geometry::Line(l) => Some(l.bounding_box()),
            Geometry::Circle(c) => Some(c.bounding_box()),
            Geometry::Arc(a) => Some(a.bounding_box()),
            Geometry::Rectangle(r) => Some(r.bounding_box()),
            Geometry::Polyline(pl) => pl.bounding_box(),
            Geometry::Ellipse(e) => Some(e.bounding_box()),
            Geometry::Text(t) => Some(t.bounding_box()),
            Geometry::Dimension(d) => Some(d.bounding_box()),
            Geometry::Hatch(h) => h.bounding_box(),
            Geometry::Spline(s) => s.bounding_box(),
            Geometry::XLine(_) | Geometry::Ray(_) => None,
            Geometry::BlockRef(_) => None,
        }
    }

    /// 获取几何的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Line(_) => "Line",
            Geometry::Circle(_) => "Circle",
            Geometry::Arc(_) => "Arc",
            Geometry::Rectangle(_) => "Rectangle",
            Geometry::Polyline(_) => "Polyline",
            Geometry::Ellipse(_) => "Ellipse",
            Geometry::Text(_) => "Text",
            Geometry::Dimension(_) => "Dimension",
            Geometry::Hatch(_) => "Hatch",
            Geometry::Spline(_) => "Spline",
            Geometry::XLine(_) => "XLine",
            Geometry::Ray(_) => "Ray",
            Geometry::BlockRef(_) => "BlockRef",
        }
    }

    /// 检查点是否在几何上（考虑容差）
    ///
    /// 块参照没有自身几何，需通过 [`crate::spatial::hit_test`] 展开后测试。
    pub fn contains_point(&self, point: &Point2, tolerance: f64) -> bool {
        match self {
            Geometry::Line(l) => l.distance_to_point(point) <= tolerance,
            Geometry::Circle(c) => c.distance_to_point(point).abs() <= tolerance,
            Geometry::Arc(a) => a.distance_to_point(point) <= tolerance,
            Geometry::Rectangle(r) => r.distance_to_point(point) <= tolerance,
            Geometry::Polyline(pl) => pl.distance_to_point(point) <= tolerance,
            Geometry::Ellipse(e) => e.contains_point(point, tolerance),
            Geometry::Text(t) => t.contains_point(point, tolerance),
            Geometry::Dimension(d) => d.distance_to_point(point) <= tolerance,
            Geometry::Hatch(h) => h.contains_point(point, tolerance),
            Geometry::Spline(s) => s.distance_to_point(point) <= tolerance,
            Geometry::XLine(x) => x.distance_to_point(point) <= tolerance,
            Geometry::Ray(r) => r.distance_to_point(point) <= tolerance,
            Geometry::BlockRef(_) => false,
        }
    }

    /// 容差内判断两个几何是否相同（角度按 2π 取模比较）
    pub fn approx_eq(&self, other: &Geometry, tolerance: f64) -> bool {
        let pt = |a: &Point2, b: &Point2| distance(a, b) <= tolerance;
        let num = |a: f64, b: f64| (a - b).abs() <= tolerance;
        let ang = |a: f64, b: f64| {
            let d = normalize_angle(a - b);
            d <= tolerance || TAU - d <= tolerance
        };
        let pts = |a: &[Point2], b: &[Point2]| {
            a.len() == b.len() && a.iter().zip(b).all(|(p, q)| pt(p, q))
        };
        let dir = |a: &Vector2, b: &Vector2| (a - b).norm() <= tolerance;

        match (self, other) {
            (Geometry::Line(a), Geometry::Line(b)) => pt(&a.start, &b.start) && pt(&a.end, &b.end),
            (Geometry::Circle(a), Geometry::Circle(b)) => {
                pt(&a.center, &b.center) && num(a.radius, b.radius)
            }
            (Geometry::Arc(a), Geometry::Arc(b)) => {
                pt(&a.center, &b.center)
                    && num(a.radius, b.radius)
                    && ang(a.start_angle, b.start_angle)
                    && ang(a.end_angle, b.end_angle)
            }
            (Geometry::Rectangle(a), Geometry::Rectangle(b)) => {
                pt(&a.top_left, &b.top_left) && num(a.width, b.width) && num(a.height, b.height)
            }
            (Geometry::Polyline(a), Geometry::Polyline(b)) => {
                a.closed == b.closed && pts(&a.points, &b.points)
            }
            (Geometry::Ellipse(a), Geometry::Ellipse(b)) => {
                pt(&a.center, &b.center)
                    && num(a.radius_x, b.radius_x)
                    && num(a.radius_y, b.radius_y)
                    && ang(a.rotation, b.rotation)
            }
            (Geometry::Text(a), Geometry::Text(b)) => {
                a.content == b.content
                    && pt(&a.position, &b.position)
                    && num(a.font_size, b.font_size)
                    && ang(a.rotation, b.rotation)
            }
            (Geometry::Dimension(a), Geometry::Dimension(b)) => {
                pt(&a.start, &b.start) && pt(&a.end, &b.end) && num(a.offset, b.offset)
            }
            (Geometry::Hatch(a), Geometry::Hatch(b)) => {
                a.pattern == b.pattern
                    && a.fill_color == b.fill_color
                    && num(a.scale, b.scale)
                    && num(a.opacity, b.opacity)
                    && ang(a.angle, b.angle)
                    && pts(&a.boundary, &b.boundary)
            }
            (Geometry::Spline(a), Geometry::Spline(b)) => {
                a.degree == b.degree && a.closed == b.closed && pts(&a.control_points, &b.control_points)
            }
            (Geometry::XLine(a), Geometry::XLine(b)) => {
                pt(&a.base_point, &b.base_point) && dir(&a.direction, &b.direction)
            }
            (Geometry::Ray(a), Geometry::Ray(b)) => {
                pt(&a.base_point, &b.base_point) && dir(&a.direction, &b.direction)
            }
            (Geometry::BlockRef(a), Geometry::BlockRef(b)) => {
                a.block_id == b.block_id
                    && pt(&a.insert_point, &b.insert_point)
                    && num(a.scale_x, b.scale_x)
                    && num(a.scale_y, b.scale_y)
                    && ang(a.rotation, b.rotation)
            }
            _ => false,
        }
    }

    /// 校验几何数据
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Geometry::Line(l) => {
                check_points("Line", [&l.start, &l.end])?;
                if l.length() < EPSILON {
                    return Err(GeometryError::Degenerate("zero-length line"));
                }
            }
            Geometry::Circle(c) => {
                check_points("Circle", [&c.center])?;
                check_size("Circle", c.radius)?;
            }
            Geometry::Arc(a) => {
                check_points("Arc", [&a.center])?;
                check_size("Arc", a.radius)?;
                if !a.start_angle.is_finite() || !a.end_angle.is_finite() {
                    return Err(GeometryError::NonFinite("Arc"));
                }
            }
            Geometry::Rectangle(r) => {
                check_points("Rectangle", [&r.top_left])?;
                check_size("Rectangle", r.width)?;
                check_size("Rectangle", r.height)?;
            }
            Geometry::Polyline(pl) => {
                check_points("Polyline", pl.points.iter())?;
                check_count("Polyline", 2, pl.points.len())?;
            }
            Geometry::Ellipse(e) => {
                check_points("Ellipse", [&e.center])?;
                check_size("Ellipse", e.radius_x)?;
                check_size("Ellipse", e.radius_y)?;
                if !e.rotation.is_finite() {
                    return Err(GeometryError::NonFinite("Ellipse"));
                }
            }
            Geometry::Text(t) => {
                check_points("Text", [&t.position])?;
                check_size("Text", t.font_size)?;
            }
            Geometry::Dimension(d) => {
                check_points("Dimension", [&d.start, &d.end])?;
                if !d.offset.is_finite() {
                    return Err(GeometryError::NonFinite("Dimension"));
                }
                if distance(&d.start, &d.end) < EPSILON {
                    return Err(GeometryError::Degenerate("zero-length dimension"));
                }
            }
            Geometry::Hatch(h) => {
                check_points("Hatch", h.boundary.iter())?;
                check_count("Hatch", 3, h.boundary.len())?;
                if !(0.0..=1.0).contains(&h.opacity) {
                    return Err(GeometryError::InvalidOpacity(h.opacity));
                }
                check_size("Hatch", h.scale)?;
            }
            Geometry::Spline(s) => {
                check_points("Spline", s.control_points.iter())?;
                check_count("Spline", 2, s.control_points.len())?;
                if s.degree == 0 {
                    return Err(GeometryError::Degenerate("spline of degree 0"));
                }
            }
            Geometry::XLine(x) => {
                check_points("XLine", [&x.base_point])?;
                check_direction("XLine", &x.direction)?;
            }
            Geometry::Ray(r) => {
                check_points("Ray", [&r.base_point])?;
                check_direction("Ray", &r.direction)?;
            }
            Geometry::BlockRef(b) => {
                check_points("BlockRef", [&b.insert_point])?;
                if !b.scale_x.is_finite() || !b.scale_y.is_finite() || !b.rotation.is_finite() {
                    return Err(GeometryError::NonFinite("BlockRef"));
                }
                if b.scale_x.abs() < EPSILON || b.scale_y.abs() < EPSILON {
                    return Err(GeometryError::Degenerate("block reference with zero scale"));
                }
            }
        }
        Ok(())
    }
}

fn check_points<'a>(
    kind: &'static str,
    points: impl IntoIterator<Item = &'a Point2>,
) -> Result<(), GeometryError> {
    if points.into_iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
        Ok(())
    } else {
        Err(GeometryError::NonFinite(kind))
    }
}

fn check_size(kind: &'static str, value: f64) -> Result<(), GeometryError> {
    if !value.is_finite() {
        return Err(GeometryError::NonFinite(kind));
    }
    if value < 0.0 {
        return Err(GeometryError::NegativeSize { kind, value });
    }
    if value < EPSILON {
        return Err(GeometryError::Degenerate(kind));
    }
    Ok(())
}

fn check_count(kind: &'static str, required: usize, actual: usize) -> Result<(), GeometryError> {
    if actual < required {
        Err(GeometryError::TooFewPoints {
            kind,
            required,
            actual,
        })
    } else {
        Ok(())
    }
}

fn check_direction(kind: &'static str, direction: &Vector2) -> Result<(), GeometryError> {
    if !direction.x.is_finite() || !direction.y.is_finite() {
        return Err(GeometryError::NonFinite(kind));
    }
    if direction.norm() < EPSILON {
        return Err(GeometryError::Degenerate(kind));
    }
    Ok(())
}

/// 点到线段的最近点
pub fn closest_point_on_segment(point: &Point2, a: &Point2, b: &Point2) -> Point2 {
    let v = b - a;
    let w = point - a;

    let c1 = w.dot(&v);
    if c1 <= 0.0 {
        return *a;
    }

    let c2 = v.dot(&v);
    if c2 <= c1 {
        return *b;
    }

    a + v * (c1 / c2)
}

/// 点到线段的距离
pub fn segment_distance(point: &Point2, a: &Point2, b: &Point2) -> f64 {
    distance(point, &closest_point_on_segment(point, a, b))
}

/// 点是否在多边形内部（射线法）
pub fn point_in_polygon(point: &Point2, polygon: &[Point2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (&polygon[i], &polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// 线段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
}

impl Line {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    /// 计算线段长度
    pub fn length(&self) -> f64 {
        distance(&self.start, &self.end)
    }

    /// 计算线段方向向量（单位向量）
    pub fn direction(&self) -> Vector2 {
        (self.end - self.start).normalize()
    }

    /// 计算线段中点
    pub fn midpoint(&self) -> Point2 {
        midpoint(&self.start, &self.end)
    }

    /// 参数 t 处的点（t ∈ [0,1] 在线段上）
    pub fn point_at(&self, t: f64) -> Point2 {
        self.start + (self.end - self.start) * t
    }

    /// 点在线段所在直线上的投影参数
    pub fn project(&self, point: &Point2) -> f64 {
        let v = self.end - self.start;
        let len_sq = v.norm_squared();
        if len_sq < EPSILON {
            return 0.0;
        }
        (point - self.start).dot(&v) / len_sq
    }

    /// 计算点到线段的距离
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        segment_distance(point, &self.start, &self.end)
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points([self.start, self.end])
    }
}

/// 圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// 计算点到圆的距离（负值表示在圆内）
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        distance(point, &self.center) - self.radius
    }

    /// 获取圆上指定角度的点
    pub fn point_at_angle(&self, angle: f64) -> Point2 {
        point_at_angle(&self.center, self.radius, angle)
    }

    /// 四个象限点（0°, 90°, 180°, 270°）
    pub fn quadrant_points(&self) -> [Point2; 4] {
        [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2].map(|a| self.point_at_angle(a))
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::new(
            Point2::new(self.center.x - self.radius, self.center.y - self.radius),
            Point2::new(self.center.x + self.radius, self.center.y + self.radius),
        )
    }
}

/// 圆弧
///
/// 从起始角逆时针扫到终止角，跨越 2π 时回绕。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    /// 起始角度（弧度）
    pub start_angle: f64,
    /// 终止角度（弧度）
    pub end_angle: f64,
}

impl Arc {
    pub fn new(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
        }
    }

    /// 从三点创建圆弧（起点、经过点、终点）
    pub fn from_three_points(p1: Point2, p2: Point2, p3: Point2) -> Option<Self> {
        let d = 2.0 * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));

        if d.abs() < EPSILON {
            return None; // 三点共线
        }

        let s1 = p1.x * p1.x + p1.y * p1.y;
        let s2 = p2.x * p2.x + p2.y * p2.y;
        let s3 = p3.x * p3.x + p3.y * p3.y;
        let ux = (s1 * (p2.y - p3.y) + s2 * (p3.y - p1.y) + s3 * (p1.y - p2.y)) / d;
        let uy = (s1 * (p3.x - p2.x) + s2 * (p1.x - p3.x) + s3 * (p2.x - p1.x)) / d;

        let center = Point2::new(ux, uy);
        let radius = distance(&p1, &center);
        let a1 = angle_of(&center, &p1);
        let a2 = angle_of(&center, &p2);
        let a3 = angle_of(&center, &p3);

        // 经过点决定方向
        if angle_in_sweep(a2, a1, a3) {
            Some(Self::new(center, radius, a1, a3))
        } else {
            Some(Self::new(center, radius, a3, a1))
        }
    }

    /// 计算弧长
    pub fn length(&self) -> f64 {
        self.sweep_angle() * self.radius
    }

    /// 计算扫过的角度，范围 (0, 2π]
    pub fn sweep_angle(&self) -> f64 {
        sweep_between(self.start_angle, self.end_angle)
    }

    /// 获取起点
    pub fn start_point(&self) -> Point2 {
        point_at_angle(&self.center, self.radius, self.start_angle)
    }

    /// 获取终点
    pub fn end_point(&self) -> Point2 {
        point_at_angle(&self.center, self.radius, self.end_angle)
    }

    /// 弧的中点
    pub fn midpoint(&self) -> Point2 {
        point_at_angle(
            &self.center,
            self.radius,
            self.start_angle + self.sweep_angle() / 2.0,
        )
    }

    /// 检查角度是否在弧的范围内
    pub fn contains_angle(&self, angle: f64) -> bool {
        angle_in_sweep(angle, self.start_angle, self.end_angle)
    }

    /// 计算点到圆弧的距离
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        let angle = angle_of(&self.center, point);

        if self.contains_angle(angle) {
            (distance(point, &self.center) - self.radius).abs()
        } else {
            // 返回到端点的最小距离
            let d1 = distance(point, &self.start_point());
            let d2 = distance(point, &self.end_point());
            d1.min(d2)
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let mut bbox = BoundingBox2::from_points([self.start_point(), self.end_point()]);

        // 检查象限点
        for angle in [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2] {
            if self.contains_angle(angle) {
                bbox.expand_to_include(&point_at_angle(&self.center, self.radius, angle));
            }
        }

        bbox
    }
}

/// 矩形（轴对齐）
///
/// 覆盖 `[x, x+width] × [y, y+height]`，`top_left` 是画布上的左上角。
/// 旋转后不再轴对齐的矩形会退化为闭合多段线。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub top_left: Point2,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(top_left: Point2, width: f64, height: f64) -> Self {
        Self {
            top_left,
            width,
            height,
        }
    }

    /// 由任意两个对角点创建
    pub fn from_corners(a: Point2, b: Point2) -> Self {
        Self {
            top_left: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// 四个角点：左上、右上、右下、左下
    pub fn corners(&self) -> [Point2; 4] {
        let p = self.top_left;
        [
            p,
            Point2::new(p.x + self.width, p.y),
            Point2::new(p.x + self.width, p.y + self.height),
            Point2::new(p.x, p.y + self.height),
        ]
    }

    /// 四条边，顺序与 [`corners`](Self::corners) 一致
    pub fn edges(&self) -> [Line; 4] {
        let c = self.corners();
        [
            Line::new(c[0], c[1]),
            Line::new(c[1], c[2]),
            Line::new(c[2], c[3]),
            Line::new(c[3], c[0]),
        ]
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            self.top_left.x + self.width / 2.0,
            self.top_left.y + self.height / 2.0,
        )
    }

    /// 点是否在矩形区域内
    pub fn contains(&self, point: &Point2) -> bool {
        self.bounding_box().contains(point)
    }

    /// 点到矩形边框的距离
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        self.edges()
            .iter()
            .map(|e| e.distance_to_point(point))
            .fold(f64::MAX, f64::min)
    }

    /// 转为闭合多段线
    pub fn to_polyline(&self) -> Polyline {
        Polyline::new(self.corners().to_vec(), true)
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::new(
            self.top_left,
            Point2::new(self.top_left.x + self.width, self.top_left.y + self.height),
        )
    }
}

/// 多段线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point2>,
    /// 是否闭合
    pub closed: bool,
}

impl Polyline {
    pub fn new(points: Vec<Point2>, closed: bool) -> Self {
        Self { points, closed }
    }

    /// 线段数量
    pub fn segment_count(&self) -> usize {
        if self.points.len() < 2 {
            return 0;
        }
        if self.closed {
            self.points.len()
        } else {
            self.points.len() - 1
        }
    }

    /// 第 i 条线段的两个端点
    pub fn segment(&self, i: usize) -> (Point2, Point2) {
        let n = self.points.len();
        (self.points[i % n], self.points[(i + 1) % n])
    }

    pub fn segments(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        (0..self.segment_count()).map(move |i| self.segment(i))
    }

    /// 计算总长度
    pub fn length(&self) -> f64 {
        self.segments().map(|(a, b)| distance(&a, &b)).sum()
    }

    /// 全局参数处的点：整数部分是线段序号，小数部分是段内参数
    ///
    /// 闭合多段线允许参数超过线段数（回绕）。
    pub fn point_at(&self, s: f64) -> Point2 {
        let count = self.segment_count();
        if count == 0 {
            return self.points.first().copied().unwrap_or_else(Point2::origin);
        }
        let s = if self.closed {
            s.rem_euclid(count as f64)
        } else {
            s.clamp(0.0, count as f64)
        };
        let i = (s.floor() as usize).min(count - 1);
        let (a, b) = self.segment(i);
        a + (b - a) * (s - i as f64)
    }

    /// 点在多段线上的最近位置（全局参数）
    pub fn project(&self, point: &Point2) -> f64 {
        let mut best = (f64::MAX, 0.0);
        for (i, (a, b)) in self.segments().enumerate() {
            let line = Line::new(a, b);
            let t = line.project(point).clamp(0.0, 1.0);
            let d = distance(point, &line.point_at(t));
            if d < best.0 {
                best = (d, i as f64 + t);
            }
        }
        best.1
    }

    /// 计算点到多段线的距离
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        match self.points.len() {
            0 => f64::MAX,
            1 => distance(point, &self.points[0]),
            _ => self
                .segments()
                .map(|(a, b)| segment_distance(point, &a, &b))
                .fold(f64::MAX, f64::min),
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox2> {
        if self.points.is_empty() {
            return None;
        }
        Some(BoundingBox2::from_points(self.points.iter().copied()))
    }
}

/// 椭圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point2,
    pub radius_x: f64,
    pub radius_y: f64,
    /// X 半轴相对世界 X 轴的旋转（弧度）
    pub rotation: f64,
}

impl Ellipse {
    pub fn new(center: Point2, radius_x: f64, radius_y: f64, rotation: f64) -> Self {
        Self {
            center,
            radius_x,
            radius_y,
            rotation,
        }
    }

    /// 世界坐标转为椭圆局部坐标（去旋转）
    pub fn to_local(&self, point: &Point2) -> Vector2 {
        rotate_vector(&(point - self.center), -self.rotation)
    }

    /// 参数 t 处的点（t 是参数角，不是几何角）
    pub fn point_at_param(&self, t: f64) -> Point2 {
        let local = Vector2::new(self.radius_x * t.cos(), self.radius_y * t.sin());
        self.center + rotate_vector(&local, self.rotation)
    }

    /// 归一化径向距离：1 表示在椭圆上，小于 1 在内部
    pub fn normalized_distance(&self, point: &Point2) -> f64 {
        let local = self.to_local(point);
        ((local.x / self.radius_x).powi(2) + (local.y / self.radius_y).powi(2)).sqrt()
    }

    pub fn contains_point(&self, point: &Point2, tolerance: f64) -> bool {
        let r = self.normalized_distance(point);
        (r - 1.0).abs() * self.radius_x.min(self.radius_y) <= tolerance
    }

    /// 四个轴端点
    pub fn axis_points(&self) -> [Point2; 4] {
        [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2].map(|t| self.point_at_param(t))
    }

    /// 采样为闭合点列（首尾不重复）
    pub fn sample_points(&self, segments: usize) -> Vec<Point2> {
        (0..segments)
            .map(|i| self.point_at_param(2.0 * PI * i as f64 / segments as f64))
            .collect()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let (sin_r, cos_r) = self.rotation.sin_cos();
        let (a, b) = (self.radius_x, self.radius_y);

        // 旋转椭圆在 x, y 方向的极值
        let dx = (a * a * cos_r * cos_r + b * b * sin_r * sin_r).sqrt();
        let dy = (a * a * sin_r * sin_r + b * b * cos_r * cos_r).sqrt();

        BoundingBox2::new(
            Point2::new(self.center.x - dx, self.center.y - dy),
            Point2::new(self.center.x + dx, self.center.y + dy),
        )
    }
}

/// 文本
///
/// `position` 是基线左端点，字形朝 -y（屏幕上方）延伸 `font_size`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub position: Point2,
    pub content: String,
    pub font_size: f64,
    /// 旋转角度（弧度）
    pub rotation: f64,
}

impl Text {
    pub fn new(position: Point2, content: impl Into<String>, font_size: f64) -> Self {
        Self {
            position,
            content: content.into(),
            font_size,
            rotation: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// 估算文本宽度（CJK 字符约等于字高，其余约为字高的 0.6 倍）
    pub fn estimated_width(&self) -> f64 {
        let cjk_count = self.content.chars().filter(|c| Self::is_cjk(*c)).count();
        let other_count = self.content.chars().count() - cjk_count;
        (cjk_count as f64 * self.font_size) + (other_count as f64 * self.font_size * 0.6)
    }

    fn is_cjk(c: char) -> bool {
        matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
    }

    /// 文本框四角（已旋转）
    pub fn corners(&self) -> [Point2; 4] {
        let w = self.estimated_width();
        let h = self.font_size;
        [
            Vector2::new(0.0, 0.0),
            Vector2::new(w, 0.0),
            Vector2::new(w, -h),
            Vector2::new(0.0, -h),
        ]
        .map(|v| self.position + rotate_vector(&v, self.rotation))
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.corners())
    }

    /// 点是否落在（扩展容差后的）文本框内，基线本身也算命中
    pub fn contains_point(&self, point: &Point2, tolerance: f64) -> bool {
        let local = rotate_vector(&(point - self.position), -self.rotation);
        let w = self.estimated_width();
        local.x >= -tolerance
            && local.x <= w + tolerance
            && local.y >= -self.font_size - tolerance
            && local.y <= tolerance
    }
}

/// 对齐尺寸标注
///
/// 标注线平行于 start→end，沿左法向偏移 `offset`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub start: Point2,
    pub end: Point2,
    pub offset: f64,
}

impl Dimension {
    pub fn new(start: Point2, end: Point2, offset: f64) -> Self {
        Self { start, end, offset }
    }

    /// 测量值
    pub fn measurement(&self) -> f64 {
        distance(&self.start, &self.end)
    }

    /// 标注线的两个端点
    pub fn dimension_line(&self) -> (Point2, Point2) {
        let dir = self.end - self.start;
        let len = dir.norm();
        if len < EPSILON {
            return (self.start, self.end);
        }
        let shift = left_normal(&dir) / len * self.offset;
        (self.start + shift, self.end + shift)
    }

    /// 显示文本
    pub fn display_text(&self) -> String {
        format!("{:.2}", self.measurement())
    }

    /// 点到标注线或尺寸界线的最小距离
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        let (d1, d2) = self.dimension_line();
        segment_distance(point, &d1, &d2)
            .min(segment_distance(point, &self.start, &d1))
            .min(segment_distance(point, &self.end, &d2))
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let (d1, d2) = self.dimension_line();
        BoundingBox2::from_points([self.start, self.end, d1, d2])
    }
}

/// 填充图案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HatchPattern {
    /// 实心填充
    #[default]
    Solid,
    /// 平行线
    Lines,
    /// 交叉线
    Cross,
    /// 点阵
    Dots,
}

/// 填充
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hatch {
    /// 边界多边形（隐式闭合）
    pub boundary: Vec<Point2>,
    pub pattern: HatchPattern,
    /// 图案比例
    pub scale: f64,
    /// 图案角度（弧度）
    pub angle: f64,
    pub fill_color: Color,
    /// 不透明度 [0, 1]
    pub opacity: f64,
}

impl Hatch {
    pub fn solid(boundary: Vec<Point2>, fill_color: Color) -> Self {
        Self {
            boundary,
            pattern: HatchPattern::Solid,
            scale: 1.0,
            angle: 0.0,
            fill_color,
            opacity: 1.0,
        }
    }

    /// 边界作为闭合多段线
    pub fn boundary_polyline(&self) -> Polyline {
        Polyline::new(self.boundary.clone(), true)
    }

    /// 区域内部或边界附近均算命中
    pub fn contains_point(&self, point: &Point2, tolerance: f64) -> bool {
        if self.boundary.is_empty() {
            return false;
        }
        point_in_polygon(point, &self.boundary)
            || self.boundary_polyline().distance_to_point(point) <= tolerance
    }

    pub fn bounding_box(&self) -> Option<BoundingBox2> {
        if self.boundary.is_empty() {
            return None;
        }
        Some(BoundingBox2::from_points(self.boundary.iter().copied()))
    }
}

/// 样条曲线
///
/// 求值见 [`crate::spline`]。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub control_points: Vec<Point2>,
    pub degree: usize,
    pub closed: bool,
}

impl Spline {
    pub fn new(control_points: Vec<Point2>, degree: usize, closed: bool) -> Self {
        Self {
            control_points,
            degree,
            closed,
        }
    }

    /// 密集采样点（渲染、命中测试、求交共用）
    pub fn sample_points(&self) -> Vec<Point2> {
        spline::sample_spline(self)
    }

    /// 采样后的折线
    pub fn to_polyline(&self) -> Polyline {
        Polyline::new(self.sample_points(), false)
    }

    /// 没有解析投影，按采样折线逐段计算
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        self.to_polyline().distance_to_point(point)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox2> {
        let samples = self.sample_points();
        if samples.is_empty() {
            return None;
        }
        Some(BoundingBox2::from_points(samples))
    }
}

/// 构造线（双向无限）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XLine {
    pub base_point: Point2,
    /// 单位方向
    pub direction: Vector2,
}

impl XLine {
    /// 创建构造线，方向会被归一化
    pub fn new(base_point: Point2, direction: Vector2) -> Self {
        Self {
            base_point,
            direction: direction.try_normalize(EPSILON).unwrap_or(direction),
        }
    }

    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        cross(&self.direction, &(point - self.base_point)).abs() / self.direction.norm()
    }
}

/// 射线（单向无限）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub base_point: Point2,
    /// 单位方向
    pub direction: Vector2,
}

impl Ray {
    /// 创建射线，方向会被归一化
    pub fn new(base_point: Point2, direction: Vector2) -> Self {
        Self {
            base_point,
            direction: direction.try_normalize(EPSILON).unwrap_or(direction),
        }
    }

    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        let v = point - self.base_point;
        if v.dot(&self.direction) <= 0.0 {
            return v.norm();
        }
        cross(&self.direction, &v).abs() / self.direction.norm()
    }
}

/// 块参照
///
/// 自身不拥有几何，实例化几何由块定义经块变换派生（见 [`crate::block`]）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRef {
    pub block_id: BlockId,
    pub insert_point: Point2,
    pub scale_x: f64,
    pub scale_y: f64,
    /// 旋转角度（弧度）
    pub rotation: f64,
}

impl BlockRef {
    pub fn new(block_id: BlockId, insert_point: Point2) -> Self {
        Self {
            block_id,
            insert_point,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }

    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_length() {
        let line = Line::new(Point2::new(0.0, 0.0), Point2::new(3.0, 4.0));
        assert!((line.length() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_arc_hit_gated_by_angle() {
        // 0..π 的半圆位于 y>0 一侧
        let arc = Arc::new(Point2::origin(), 10.0, 0.0, PI);
        let geom = Geometry::Arc(arc);
        assert!(geom.contains_point(&Point2::new(0.0, 10.0), 0.1));
        assert!(!geom.contains_point(&Point2::new(0.0, -10.0), 0.1));
    }

    #[test]
    fn test_arc_from_three_points_direction() {
        let arc = Arc::from_three_points(
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(-10.0, 0.0),
        )
        .unwrap();
        assert!((arc.radius - 10.0).abs() < 1e-9);
        assert!((arc.sweep_angle() - PI).abs() < 1e-9);
        assert!(arc.contains_angle(FRAC_PI_2));
    }

    #[test]
    fn test_rectangle_corners_and_hit() {
        let rect = Rectangle::from_corners(Point2::new(10.0, 5.0), Point2::new(0.0, 0.0));
        assert_eq!(rect.top_left, Point2::new(0.0, 0.0));
        assert_eq!(rect.corners()[2], Point2::new(10.0, 5.0));
        let geom = Geometry::Rectangle(rect);
        assert!(geom.contains_point(&Point2::new(5.0, 0.05), 0.1));
        // 内部不算命中边框
        assert!(!geom.contains_point(&Point2::new(5.0, 2.5), 0.1));
    }

    #[test]
    fn test_ellipse_normalized_hit() {
        let e = Ellipse::new(Point2::new(0.0, 0.0), 10.0, 5.0, FRAC_PI_2);
        // 旋转 90° 后长轴沿 y
        assert!(e.contains_point(&Point2::new(0.0, 10.0), 0.01));
        assert!(e.contains_point(&Point2::new(5.0, 0.0), 0.01));
        assert!(!e.contains_point(&Point2::new(10.0, 0.0), 0.5));
    }

    #[test]
    fn test_text_hit_uses_rotated_box() {
        let text = Text::new(Point2::new(0.0, 0.0), "ABCD", 10.0);
        // 宽 24，字形朝 -y
        assert!(text.contains_point(&Point2::new(12.0, -5.0), 0.0));
        assert!(!text.contains_point(&Point2::new(12.0, 5.0), 0.5));
        let rotated = text.with_rotation(FRAC_PI_2);
        assert!(rotated.contains_point(&Point2::new(5.0, 12.0), 0.0));
    }

    #[test]
    fn test_dimension_line_offset() {
        let dim = Dimension::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 3.0);
        let (d1, d2) = dim.dimension_line();
        assert!((d1.y - 3.0).abs() < EPSILON);
        assert!((d2.x - 10.0).abs() < EPSILON);
        assert_eq!(dim.display_text(), "10.00");
        assert!(Geometry::Dimension(dim).contains_point(&Point2::new(5.0, 3.0), 0.1));
    }

    #[test]
    fn test_hatch_interior_hit() {
        let hatch = Hatch::solid(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            Color::BLUE,
        );
        assert!(hatch.contains_point(&Point2::new(5.0, 5.0), 0.1));
        assert!(!hatch.contains_point(&Point2::new(15.0, 5.0), 0.1));
    }

    #[test]
    fn test_ray_distance_behind_base() {
        let ray = Ray::new(Point2::origin(), Vector2::new(2.0, 0.0));
        assert!((ray.direction.norm() - 1.0).abs() < EPSILON);
        assert!((ray.distance_to_point(&Point2::new(5.0, 1.0)) - 1.0).abs() < EPSILON);
        assert!((ray.distance_to_point(&Point2::new(-3.0, 4.0)) - 5.0).abs() < EPSILON);
        let xline = XLine::new(Point2::origin(), Vector2::new(1.0, 0.0));
        assert!((xline.distance_to_point(&Point2::new(-3.0, 4.0)) - 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_polyline_point_at_wraps_when_closed() {
        let pl = Rectangle::new(Point2::origin(), 10.0, 10.0).to_polyline();
        let p = pl.point_at(4.5);
        assert!((p.x - 5.0).abs() < EPSILON && p.y.abs() < EPSILON);
        assert!((pl.project(&Point2::new(10.0, 5.0)) - 1.5).abs() < EPSILON);
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let nan_line = Geometry::Line(Line::new(Point2::new(f64::NAN, 0.0), Point2::origin()));
        assert!(matches!(nan_line.validate(), Err(GeometryError::NonFinite(_))));
        let short = Geometry::Polyline(Polyline::new(vec![Point2::origin()], false));
        assert!(matches!(
            short.validate(),
            Err(GeometryError::TooFewPoints { required: 2, .. })
        ));
        let ok = Geometry::Circle(Circle::new(Point2::origin(), 1.0));
        assert!(ok.validate().is_ok());
    }
}
