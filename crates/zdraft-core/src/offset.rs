//! 偏移
//!
//! 按距离生成平行副本，偏移方向由侧点决定。结果总是新实体，原实体不变；
//! 半径、宽高等尺寸收缩到 0 以下时夹到 [`MIN_EXTENT`]。

use crate::entity::Entity;
use crate::geometry::{Arc, Circle, Ellipse, Geometry, Line, Polyline, Ray, Rectangle, XLine};
use crate::math::{left_normal, Point2, Vector2, EPSILON, MIN_EXTENT};
use tracing::debug;

/// 偏移实体
///
/// 距离必须为正的有限值；不支持的类型返回 `None`。
pub fn offset_entity(entity: &Entity, distance: f64, side_point: Point2) -> Option<Entity> {
    if !distance.is_finite() || distance <= EPSILON {
        debug!("偏移距离无效: {}", distance);
        return None;
    }

    let geometry = match &entity.geometry {
        Geometry::Line(line) => {
            let shift = linear_shift(line.start, line.end - line.start, distance, &side_point)?;
            Geometry::Line(Line::new(line.start + shift, line.end + shift))
        }
        Geometry::XLine(xline) => {
            let shift = linear_shift(xline.base_point, xline.direction, distance, &side_point)?;
            Geometry::XLine(XLine::new(xline.base_point + shift, xline.direction))
        }
        Geometry::Ray(ray) => {
            let shift = linear_shift(ray.base_point, ray.direction, distance, &side_point)?;
            Geometry::Ray(Ray::new(ray.base_point + shift, ray.direction))
        }
        Geometry::Circle(circle) => Geometry::Circle(Circle::new(
            circle.center,
            offset_radius(circle.radius, &circle.center, distance, &side_point),
        )),
        Geometry::Arc(arc) => Geometry::Arc(Arc::new(
            arc.center,
            offset_radius(arc.radius, &arc.center, distance, &side_point),
            arc.start_angle,
            arc.end_angle,
        )),
        Geometry::Ellipse(ellipse) => Geometry::Ellipse(offset_ellipse(ellipse, distance, &side_point)),
        Geometry::Rectangle(rect) => Geometry::Rectangle(offset_rectangle(rect, distance, &side_point)),
        Geometry::Polyline(polyline) => {
            Geometry::Polyline(offset_polyline(polyline, distance, &side_point)?)
        }
        other => {
            debug!("{} 不支持偏移", other.type_name());
            return None;
        }
    };

    Some(entity.derive(geometry))
}

/// 直线类的平移量：取离侧点更近的一侧法向
fn linear_shift(origin: Point2, direction: Vector2, distance: f64, side: &Point2) -> Option<Vector2> {
    let normal = left_normal(&direction).try_normalize(EPSILON)?;
    let sign = if (side - origin).dot(&normal) >= 0.0 { 1.0 } else { -1.0 };
    Some(normal * (sign * distance))
}

/// 侧点在圆内则收缩，否则扩大
fn offset_radius(radius: f64, center: &Point2, distance: f64, side: &Point2) -> f64 {
    if crate::math::distance(center, side) < radius {
        (radius - distance).max(MIN_EXTENT)
    } else {
        radius + distance
    }
}

fn offset_ellipse(ellipse: &Ellipse, distance: f64, side: &Point2) -> Ellipse {
    let delta = if ellipse.normalized_distance(side) < 1.0 {
        -distance
    } else {
        distance
    };
    Ellipse::new(
        ellipse.center,
        (ellipse.radius_x + delta).max(MIN_EXTENT),
        (ellipse.radius_y + delta).max(MIN_EXTENT),
        ellipse.rotation,
    )
}

/// 矩形：侧点在内部时每边内缩，否则外扩，中心不变
fn offset_rectangle(rect: &Rectangle, distance: f64, side: &Point2) -> Rectangle {
    let delta = if rect.contains(side) { -distance } else { distance };
    let width = (rect.width + 2.0 * delta).max(MIN_EXTENT);
    let height = (rect.height + 2.0 * delta).max(MIN_EXTENT);
    let center = rect.center();
    Rectangle::new(
        Point2::new(center.x - width / 2.0, center.y - height / 2.0),
        width,
        height,
    )
}

/// 多段线：顶点沿相邻线段法向的平均方向移动，方向由第一段决定
fn offset_polyline(polyline: &Polyline, distance: f64, side: &Point2) -> Option<Polyline> {
    let normals: Vec<Vector2> = polyline
        .segments()
        .map(|(a, b)| left_normal(&(b - a)).try_normalize(EPSILON).unwrap_or_else(Vector2::zeros))
        .collect();
    let first = *normals.first()?;
    let origin = polyline.points[0];
    let sign = if (side - origin).dot(&first) >= 0.0 { 1.0 } else { -1.0 };

    let n = polyline.points.len();
    let segment_count = normals.len();
    let points = (0..n)
        .map(|i| {
            // 顶点 i 的前一段和后一段
            let before = if i > 0 {
                Some(i - 1)
            } else if polyline.closed {
                Some(segment_count - 1)
            } else {
                None
            };
            let after = (i < segment_count).then_some(i);

            let sum = before.map_or(Vector2::zeros(), |s| normals[s])
                + after.map_or(Vector2::zeros(), |s| normals[s]);
            let normal = sum
                .try_normalize(EPSILON)
                .or_else(|| after.or(before).map(|s| normals[s]))
                .unwrap_or_else(Vector2::zeros);
            polyline.points[i] + normal * (sign * distance)
        })
        .collect();

    Some(Polyline::new(points, polyline.closed))
}
