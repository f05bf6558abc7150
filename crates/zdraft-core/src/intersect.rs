//! 求交例程
//!
//! 所有求交函数返回点集（0、1 或 2 个点），由调用方自行挑选。
//! 有界线段只返回参数在 [0,1] 内的交点，射线只返回 t>0 的交点。

use crate::geometry::{Arc, Circle, Ellipse, Geometry};
use crate::math::{
    angle_of, cross, distance, rotate_vector, Point2, Vector2, EPSILON, GEOMETRY_TOLERANCE,
    PARAM_TOLERANCE,
};

/// 椭圆与非直线图元求交时的采样段数
const ELLIPSE_SAMPLES: usize = 64;

/// 线性图元：`origin + dir * t`，t 受参数范围约束
///
/// 线段、射线、构造线统一用这个结构表示。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linear {
    pub origin: Point2,
    pub dir: Vector2,
    pub t_min: f64,
    pub t_max: f64,
    /// 起点是否开区间（射线要求 t>0）
    pub open_start: bool,
}

impl Linear {
    pub fn segment(a: Point2, b: Point2) -> Self {
        Self {
            origin: a,
            dir: b - a,
            t_min: 0.0,
            t_max: 1.0,
            open_start: false,
        }
    }

    pub fn ray(origin: Point2, dir: Vector2) -> Self {
        Self {
            origin,
            dir,
            t_min: 0.0,
            t_max: f64::INFINITY,
            open_start: true,
        }
    }

    pub fn infinite(origin: Point2, dir: Vector2) -> Self {
        Self {
            origin,
            dir,
            t_min: f64::NEG_INFINITY,
            t_max: f64::INFINITY,
            open_start: false,
        }
    }

    pub fn point_at(&self, t: f64) -> Point2 {
        self.origin + self.dir * t
    }

    /// 点在本图元上的参数（投影）
    pub fn param_of(&self, point: &Point2) -> f64 {
        let len_sq = self.dir.norm_squared();
        if len_sq < EPSILON {
            return 0.0;
        }
        (point - self.origin).dot(&self.dir) / len_sq
    }

    fn accepts(&self, t: f64) -> bool {
        let lower_ok = if self.open_start {
            t > self.t_min + PARAM_TOLERANCE
        } else {
            t >= self.t_min - PARAM_TOLERANCE
        };
        lower_ok && t <= self.t_max + PARAM_TOLERANCE
    }
}

/// 可求交的基本片段
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Linear(Linear),
    Circle(Circle),
    Arc(Arc),
    Ellipse(Ellipse),
}

/// 将几何分解为基本片段
///
/// 文本、尺寸标注没有可用作剪切边的片段；块参照需先实例化。
pub fn pieces(geometry: &Geometry) -> Vec<Piece> {
    let polyline_pieces = |points: &[Point2], closed: bool| -> Vec<Piece> {
        let n = points.len();
        if n < 2 {
            return Vec::new();
        }
        let count = if closed { n } else { n - 1 };
        (0..count)
            .map(|i| Piece::Linear(Linear::segment(points[i], points[(i + 1) % n])))
            .collect()
    };

    match geometry {
        Geometry::Line(l) => vec![Piece::Linear(Linear::segment(l.start, l.end))],
        Geometry::Circle(c) => vec![Piece::Circle(c.clone())],
        Geometry::Arc(a) => vec![Piece::Arc(a.clone())],
        Geometry::Rectangle(r) => r
            .edges()
            .iter()
            .map(|e| Piece::Linear(Linear::segment(e.start, e.end)))
            .collect(),
        Geometry::Polyline(pl) => polyline_pieces(&pl.points, pl.closed),
        Geometry::Ellipse(e) => vec![Piece::Ellipse(e.clone())],
        Geometry::Hatch(h) => polyline_pieces(&h.boundary, true),
        Geometry::Spline(s) => polyline_pieces(&s.sample_points(), false),
        Geometry::XLine(x) => vec![Piece::Linear(Linear::infinite(x.base_point, x.direction))],
        Geometry::Ray(r) => vec![Piece::Linear(Linear::ray(r.base_point, r.direction))],
        Geometry::Text(_) | Geometry::Dimension(_) | Geometry::BlockRef(_) => Vec::new(),
    }
}

/// 两个线性图元求交，返回 (t_a, t_b, 交点)
pub fn linear_linear(a: &Linear, b: &Linear) -> Option<(f64, f64, Point2)> {
    let denom = cross(&a.dir, &b.dir);

    // 平行或重合
    if denom.abs() < EPSILON {
        return None;
    }

    let d = b.origin - a.origin;
    let ta = cross(&d, &b.dir) / denom;
    let tb = cross(&d, &a.dir) / denom;

    if a.accepts(ta) && b.accepts(tb) {
        Some((ta, tb, a.point_at(ta)))
    } else {
        None
    }
}

/// 线性图元与圆求交，返回 (t, 交点)
pub fn linear_circle(line: &Linear, center: &Point2, radius: f64) -> Vec<(f64, Point2)> {
    let d = line.dir;
    let f = line.origin - center;

    let a = d.dot(&d);
    if a < EPSILON {
        return Vec::new();
    }
    let b = 2.0 * f.dot(&d);
    let c = f.dot(&f) - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < -EPSILON {
        return Vec::new();
    }

    let roots = if discriminant.abs() <= EPSILON {
        // 相切
        vec![-b / (2.0 * a)]
    } else {
        let sqrt_disc = discriminant.sqrt();
        vec![(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)]
    };

    roots
        .into_iter()
        .filter(|t| line.accepts(*t))
        .map(|t| (t, line.point_at(t)))
        .collect()
}

/// 线性图元与圆弧求交：先求整圆，再按角度过滤
pub fn linear_arc(line: &Linear, arc: &Arc) -> Vec<(f64, Point2)> {
    linear_circle(line, &arc.center, arc.radius)
        .into_iter()
        .filter(|(_, p)| arc.contains_angle(angle_of(&arc.center, p)))
        .collect()
}

/// 线性图元与椭圆求交
///
/// 变换到椭圆局部坐标并按半轴缩放成单位圆；仿射变换不改变参数 t。
pub fn linear_ellipse(line: &Linear, ellipse: &Ellipse) -> Vec<(f64, Point2)> {
    if ellipse.radius_x < EPSILON || ellipse.radius_y < EPSILON {
        return Vec::new();
    }
    let to_unit = |v: Vector2| -> Vector2 {
        let local = rotate_vector(&v, -ellipse.rotation);
        Vector2::new(local.x / ellipse.radius_x, local.y / ellipse.radius_y)
    };
    let unit_line = Linear {
        origin: Point2::from(to_unit(line.origin - ellipse.center)),
        dir: to_unit(line.dir),
        ..*line
    };
    linear_circle(&unit_line, &Point2::origin(), 1.0)
        .into_iter()
        .map(|(t, _)| (t, line.point_at(t)))
        .collect()
}

/// 圆与圆求交（根轴构造）
pub fn circle_circle(c1: &Circle, c2: &Circle) -> Vec<Point2> {
    let d = distance(&c1.center, &c2.center);

    // 同心或不相交
    if d < EPSILON
        || d > c1.radius + c2.radius + GEOMETRY_TOLERANCE
        || d < (c1.radius - c2.radius).abs() - GEOMETRY_TOLERANCE
    {
        return Vec::new();
    }

    let a = (c1.radius * c1.radius - c2.radius * c2.radius + d * d) / (2.0 * d);
    let h_sq = c1.radius * c1.radius - a * a;
    let dir = (c2.center - c1.center) / d;
    let p = c1.center + dir * a;

    if h_sq <= GEOMETRY_TOLERANCE * GEOMETRY_TOLERANCE {
        // 相切
        return vec![p];
    }

    let h = h_sq.sqrt();
    let perp = Vector2::new(-dir.y, dir.x);
    vec![p + perp * h, p - perp * h]
}

/// 有界线段与线段求交
pub fn segment_segment(a1: &Point2, a2: &Point2, b1: &Point2, b2: &Point2) -> Option<Point2> {
    linear_linear(&Linear::segment(*a1, *a2), &Linear::segment(*b1, *b2)).map(|(_, _, p)| p)
}

/// 两条直线（双向延长）求交；平行时返回 `None`
pub fn line_line(a1: &Point2, a2: &Point2, b1: &Point2, b2: &Point2) -> Option<Point2> {
    linear_linear(
        &Linear::infinite(*a1, a2 - a1),
        &Linear::infinite(*b1, b2 - b1),
    )
    .map(|(_, _, p)| p)
}

/// 射线与线段求交，返回 (射线参数, 交点)
pub fn ray_segment(origin: &Point2, dir: &Vector2, a: &Point2, b: &Point2) -> Option<(f64, Point2)> {
    linear_linear(&Linear::ray(*origin, *dir), &Linear::segment(*a, *b)).map(|(t, _, p)| (t, p))
}

pub fn segment_circle(a: &Point2, b: &Point2, circle: &Circle) -> Vec<Point2> {
    linear_circle(&Linear::segment(*a, *b), &circle.center, circle.radius)
        .into_iter()
        .map(|(_, p)| p)
        .collect()
}

pub fn segment_arc(a: &Point2, b: &Point2, arc: &Arc) -> Vec<Point2> {
    linear_arc(&Linear::segment(*a, *b), arc)
        .into_iter()
        .map(|(_, p)| p)
        .collect()
}

pub fn segment_ellipse(a: &Point2, b: &Point2, ellipse: &Ellipse) -> Vec<Point2> {
    linear_ellipse(&Linear::segment(*a, *b), ellipse)
        .into_iter()
        .map(|(_, p)| p)
        .collect()
}

/// 椭圆采样为闭合线段集合
fn ellipse_segments(ellipse: &Ellipse) -> Vec<Piece> {
    let samples = ellipse.sample_points(ELLIPSE_SAMPLES);
    let n = samples.len();
    (0..n)
        .map(|i| Piece::Linear(Linear::segment(samples[i], samples[(i + 1) % n])))
        .collect()
}

/// 两个基本片段求交
pub fn intersect_pieces(a: &Piece, b: &Piece) -> Vec<Point2> {
    let points_only = |v: Vec<(f64, Point2)>| v.into_iter().map(|(_, p)| p).collect::<Vec<_>>();

    match (a, b) {
        (Piece::Linear(la), Piece::Linear(lb)) => {
            linear_linear(la, lb).map(|(_, _, p)| p).into_iter().collect()
        }
        (Piece::Linear(l), Piece::Circle(c)) | (Piece::Circle(c), Piece::Linear(l)) => {
            points_only(linear_circle(l, &c.center, c.radius))
        }
        (Piece::Linear(l), Piece::Arc(arc)) | (Piece::Arc(arc), Piece::Linear(l)) => {
            points_only(linear_arc(l, arc))
        }
        (Piece::Linear(l), Piece::Ellipse(e)) | (Piece::Ellipse(e), Piece::Linear(l)) => {
            points_only(linear_ellipse(l, e))
        }
        (Piece::Circle(c1), Piece::Circle(c2)) => circle_circle(c1, c2),
        (Piece::Circle(c), Piece::Arc(arc)) | (Piece::Arc(arc), Piece::Circle(c)) => {
            circle_circle(c, &Circle::new(arc.center, arc.radius))
                .into_iter()
                .filter(|p| arc.contains_angle(angle_of(&arc.center, p)))
                .collect()
        }
        (Piece::Arc(a1), Piece::Arc(a2)) => circle_circle(
            &Circle::new(a1.center, a1.radius),
            &Circle::new(a2.center, a2.radius),
        )
        .into_iter()
        .filter(|p| {
            a1.contains_angle(angle_of(&a1.center, p)) && a2.contains_angle(angle_of(&a2.center, p))
        })
        .collect(),
        (Piece::Ellipse(e), other) | (other, Piece::Ellipse(e)) => ellipse_segments(e)
            .iter()
            .flat_map(|seg| intersect_pieces(seg, other))
            .collect(),
    }
}

/// 去除容差内重复的点，保持首次出现的顺序
pub fn dedup_points(points: Vec<Point2>) -> Vec<Point2> {
    let mut result: Vec<Point2> = Vec::with_capacity(points.len());
    for p in points {
        if !result.iter().any(|q| distance(q, &p) <= GEOMETRY_TOLERANCE) {
            result.push(p);
        }
    }
    result
}

/// 两个几何体的全部交点
pub fn intersect_geometry(a: &Geometry, b: &Geometry) -> Vec<Point2> {
    let pieces_a = pieces(a);
    let pieces_b = pieces(b);
    let mut points = Vec::new();
    for pa in &pieces_a {
        for pb in &pieces_b {
            points.extend(intersect_pieces(pa, pb));
        }
    }
    dedup_points(points)
}

/// 片段与几何体的全部交点
pub fn intersect_piece_geometry(piece: &Piece, geometry: &Geometry) -> Vec<Point2> {
    let points = pieces(geometry)
        .iter()
        .flat_map(|other| intersect_pieces(piece, other))
        .collect();
    dedup_points(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Line, Polyline};

    #[test]
    fn test_segment_intersection() {
        let p = segment_segment(
            &Point2::new(0.0, 0.0),
            &Point2::new(10.0, 10.0),
            &Point2::new(0.0, 10.0),
            &Point2::new(10.0, 0.0),
        )
        .unwrap();
        assert!((p.x - 5.0).abs() < EPSILON);
        assert!((p.y - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_bounded_segments_do_not_extend() {
        // 直线相交于 (5,0)，但第二条线段没有到达
        let a1 = Point2::new(0.0, 0.0);
        let a2 = Point2::new(10.0, 0.0);
        let b1 = Point2::new(5.0, 1.0);
        let b2 = Point2::new(5.0, 10.0);
        assert!(segment_segment(&a1, &a2, &b1, &b2).is_none());
        let p = line_line(&a1, &a2, &b1, &b2).unwrap();
        assert!((p.x - 5.0).abs() < EPSILON && p.y.abs() < EPSILON);
    }

    #[test]
    fn test_parallel_lines_have_no_intersection() {
        assert!(line_line(
            &Point2::new(0.0, 0.0),
            &Point2::new(10.0, 0.0),
            &Point2::new(0.0, 1.0),
            &Point2::new(10.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn test_ray_only_forward() {
        let origin = Point2::new(0.0, 0.0);
        let a = Point2::new(-5.0, -1.0);
        let b = Point2::new(-5.0, 1.0);
        assert!(ray_segment(&origin, &Vector2::new(1.0, 0.0), &a, &b).is_none());
        let (t, p) = ray_segment(&origin, &Vector2::new(-1.0, 0.0), &a, &b).unwrap();
        assert!((t - 5.0).abs() < EPSILON);
        assert!((p.x + 5.0).abs() < EPSILON);
        // 起点本身不算交点
        let c = Point2::new(0.0, -1.0);
        let d = Point2::new(0.0, 1.0);
        assert!(ray_segment(&origin, &Vector2::new(1.0, 0.0), &c, &d).is_none());
    }

    #[test]
    fn test_segment_circle() {
        let circle = Circle::new(Point2::origin(), 5.0);
        let pts = segment_circle(&Point2::new(-10.0, 0.0), &Point2::new(10.0, 0.0), &circle);
        assert_eq!(pts.len(), 2);
        // 线段只到圆内
        let pts = segment_circle(&Point2::new(0.0, 0.0), &Point2::new(10.0, 0.0), &circle);
        assert_eq!(pts.len(), 1);
        assert!((pts[0].x - 5.0).abs() < 1e-9);
        // 相切
        let pts = segment_circle(&Point2::new(-10.0, 5.0), &Point2::new(10.0, 5.0), &circle);
        assert_eq!(pts.len(), 1);
    }

    #[test]
    fn test_segment_arc_filters_by_angle() {
        let arc = Arc::new(Point2::origin(), 5.0, 0.0, std::f64::consts::PI);
        // 水平直线 y=3 与整圆交两点，都在 0..π 的 y>0 一侧
        let pts = segment_arc(&Point2::new(-10.0, 3.0), &Point2::new(10.0, 3.0), &arc);
        assert_eq!(pts.len(), 2);
        let pts = segment_arc(&Point2::new(-10.0, -3.0), &Point2::new(10.0, -3.0), &arc);
        assert!(pts.is_empty());
    }

    #[test]
    fn test_segment_ellipse() {
        let e = Ellipse::new(Point2::origin(), 10.0, 5.0, 0.0);
        let pts = segment_ellipse(&Point2::new(0.0, -20.0), &Point2::new(0.0, 20.0), &e);
        assert_eq!(pts.len(), 2);
        assert!(pts.iter().all(|p| (p.y.abs() - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_circle_circle() {
        let c1 = Circle::new(Point2::new(0.0, 0.0), 5.0);
        let c2 = Circle::new(Point2::new(8.0, 0.0), 5.0);
        let pts = circle_circle(&c1, &c2);
        assert_eq!(pts.len(), 2);
        for p in &pts {
            assert!((p.x - 4.0).abs() < 1e-9);
            assert!((p.y.abs() - 3.0).abs() < 1e-9);
        }
        // 外切
        let c3 = Circle::new(Point2::new(10.0, 0.0), 5.0);
        assert_eq!(circle_circle(&c1, &c3).len(), 1);
        // 相离
        let c4 = Circle::new(Point2::new(20.0, 0.0), 5.0);
        assert!(circle_circle(&c1, &c4).is_empty());
    }

    #[test]
    fn test_intersect_geometry_polyline_and_line() {
        let pl = Geometry::Polyline(Polyline::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
            ],
            false,
        ));
        let line = Geometry::Line(Line::new(Point2::new(5.0, -5.0), Point2::new(15.0, 5.0)));
        let pts = intersect_geometry(&pl, &line);
        assert_eq!(pts.len(), 1);
        assert!((pts[0].x - 10.0).abs() < 1e-9 && pts[0].y.abs() < 1e-9);
    }
}
