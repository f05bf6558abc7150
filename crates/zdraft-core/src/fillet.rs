//! 圆角与倒角
//!
//! 两条直线先求无界交点（角点），每条线保留远离角点的一侧。
//! 半径或距离为 0 时两条线都修剪到角点。

use crate::document::ModifyResult;
use crate::entity::Entity;
use crate::geometry::{Arc, Geometry, Line};
use crate::intersect::line_line;
use crate::math::{
    angle_of, distance, left_normal, sweep_between, Point2, Vector2, EPSILON, GEOMETRY_TOLERANCE,
    MIN_SEGMENT_LENGTH,
};
use std::f64::consts::PI;
use tracing::debug;

/// 圆心到两条线的距离与半径的允许偏差
const CENTER_TOLERANCE: f64 = 0.5;

/// 直线相对角点的保留部分
struct Leg {
    line: Line,
    corner: Point2,
    /// 从角点指向保留端的单位方向
    dir: Vector2,
    /// 保留部分的长度
    length: f64,
}

impl Leg {
    fn new(line: &Line, corner: Point2) -> Option<Self> {
        let far = if distance(&line.start, &corner) >= distance(&line.end, &corner) {
            line.start
        } else {
            line.end
        };
        let offset = far - corner;
        let length = offset.norm();
        let dir = offset.try_normalize(EPSILON)?;
        Some(Self {
            line: line.clone(),
            corner,
            dir,
            length,
        })
    }

    /// 把靠近角点的端点移到 `point`，保持原方向
    fn trimmed_to(&self, point: Point2) -> Line {
        if distance(&self.line.start, &self.corner) <= distance(&self.line.end, &self.corner) {
            Line::new(point, self.line.end)
        } else {
            Line::new(self.line.start, point)
        }
    }

    /// 点沿保留方向到角点的距离
    fn station(&self, point: &Point2) -> f64 {
        (point - self.corner).dot(&self.dir)
    }
}

fn as_lines<'a>(a: &'a Entity, b: &'a Entity) -> Option<(&'a Line, &'a Line)> {
    if a.id == b.id {
        return None;
    }
    match (&a.geometry, &b.geometry) {
        (Geometry::Line(la), Geometry::Line(lb)) => Some((la, lb)),
        _ => {
            debug!(
                "圆角/倒角只支持两条直线，实际 {} 与 {}",
                a.geometry.type_name(),
                b.geometry.type_name()
            );
            None
        }
    }
}

fn legs(a: &Line, b: &Line) -> Option<(Leg, Leg)> {
    let Some(corner) = line_line(&a.start, &a.end, &b.start, &b.end) else {
        debug!("两条直线平行，没有角点");
        return None;
    };
    Some((Leg::new(a, corner)?, Leg::new(b, corner)?))
}

/// 生成结果：删除两条原线，加入修剪后的线（过短的丢弃）和连接图元
fn build_result(
    a: &Entity,
    b: &Entity,
    line_a: Line,
    line_b: Line,
    connector: Option<Geometry>,
) -> ModifyResult {
    let mut added = Vec::with_capacity(3);
    if line_a.length() >= MIN_SEGMENT_LENGTH {
        added.push(a.derive(Geometry::Line(line_a)));
    }
    if line_b.length() >= MIN_SEGMENT_LENGTH {
        added.push(b.derive(Geometry::Line(line_b)));
    }
    if let Some(geometry) = connector {
        added.push(a.derive(geometry));
    }
    ModifyResult::new(vec![a.id, b.id], added)
}

/// 圆角
pub fn fillet_lines(a: &Entity, b: &Entity, radius: f64) -> Option<ModifyResult> {
    if !radius.is_finite() || radius < 0.0 {
        return None;
    }
    let (line_a, line_b) = as_lines(a, b)?;
    let (leg_a, leg_b) = legs(line_a, line_b)?;

    if radius <= EPSILON {
        let corner = leg_a.corner;
        return Some(build_result(
            a,
            b,
            leg_a.trimmed_to(corner),
            leg_b.trimmed_to(corner),
            None,
        ));
    }

    let normal_a = left_normal(&leg_a.dir);
    let normal_b = left_normal(&leg_b.dir);
    let corner = leg_a.corner;

    // 四种法向组合的偏移线交点
    let mut best: Option<(f64, Point2, Point2, Point2)> = None;
    for sign_a in [1.0, -1.0] {
        for sign_b in [1.0, -1.0] {
            let oa = corner + normal_a * (sign_a * radius);
            let ob = corner + normal_b * (sign_b * radius);
            let Some(center) = line_line(&oa, &(oa + leg_a.dir), &ob, &(ob + leg_b.dir)) else {
                continue;
            };

            let tangent_a = corner + leg_a.dir * leg_a.station(&center);
            let tangent_b = corner + leg_b.dir * leg_b.station(&center);
            if (distance(&center, &tangent_a) - radius).abs() > CENTER_TOLERANCE
                || (distance(&center, &tangent_b) - radius).abs() > CENTER_TOLERANCE
            {
                continue;
            }

            // 切点必须落在保留部分上
            let on_leg = |leg: &Leg, p: &Point2| {
                let s = leg.station(p);
                s > GEOMETRY_TOLERANCE && s <= leg.length + GEOMETRY_TOLERANCE
            };
            if !on_leg(&leg_a, &tangent_a) || !on_leg(&leg_b, &tangent_b) {
                continue;
            }

            let d = distance(&center, &corner);
            if best.as_ref().map_or(true, |(best_d, ..)| d < *best_d) {
                best = Some((d, center, tangent_a, tangent_b));
            }
        }
    }

    let Some((_, center, tangent_a, tangent_b)) = best else {
        debug!("半径 {} 的圆角找不到有效圆心", radius);
        return None;
    };

    let mut start = angle_of(&center, &tangent_a);
    let mut end = angle_of(&center, &tangent_b);
    // 取较短的弧
    if sweep_between(start, end) > PI {
        std::mem::swap(&mut start, &mut end);
    }
    let arc = Arc::new(center, radius, start, end);

    debug!(
        "圆角：圆心 ({:.3}, {:.3})，半径 {}",
        center.x, center.y, radius
    );
    Some(build_result(
        a,
        b,
        leg_a.trimmed_to(tangent_a),
        leg_b.trimmed_to(tangent_b),
        Some(Geometry::Arc(arc)),
    ))
}

/// 倒角
///
/// 距离超过任一条线的保留长度时返回 `None`。
pub fn chamfer_lines(a: &Entity, b: &Entity, chamfer_distance: f64) -> Option<ModifyResult> {
    if !chamfer_distance.is_finite() || chamfer_distance < 0.0 {
        return None;
    }
    let (line_a, line_b) = as_lines(a, b)?;
    let (leg_a, leg_b) = legs(line_a, line_b)?;

    if chamfer_distance <= EPSILON {
        let corner = leg_a.corner;
        return Some(build_result(
            a,
            b,
            leg_a.trimmed_to(corner),
            leg_b.trimmed_to(corner),
            None,
        ));
    }

    if chamfer_distance > leg_a.length || chamfer_distance > leg_b.length {
        debug!(
            "倒角距离 {} 超过线长 ({:.3}, {:.3})",
            chamfer_distance, leg_a.length, leg_b.length
        );
        return None;
    }

    let pa = leg_a.corner + leg_a.dir * chamfer_distance;
    let pb = leg_b.corner + leg_b.dir * chamfer_distance;
    Some(build_result(
        a,
        b,
        leg_a.trimmed_to(pa),
        leg_b.trimmed_to(pb),
        Some(Geometry::Line(Line::new(pa, pb))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Circle;
    use std::f64::consts::FRAC_PI_2;

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Entity {
        Entity::new(Geometry::Line(Line::new(Point2::new(x1, y1), Point2::new(x2, y2))))
    }

    fn lines_of(result: &ModifyResult) -> Vec<Line> {
        result
            .add_entities
            .iter()
            .filter_map(|e| match &e.geometry {
                Geometry::Line(l) => Some(l.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_fillet_right_angle() {
        let a = line(0.0, 0.0, 10.0, 0.0);
        let b = line(10.0, 0.0, 10.0, 10.0);
        let result = fillet_lines(&a, &b, 2.0).unwrap();

        assert_eq!(result.remove_ids, vec![a.id, b.id]);
        assert_eq!(result.add_entities.len(), 3);

        let lines = lines_of(&result);
        assert!(distance(&lines[0].end, &Point2::new(8.0, 0.0)) < 1e-9);
        assert!(distance(&lines[1].start, &Point2::new(10.0, 2.0)) < 1e-9);

        let Geometry::Arc(arc) = &result.add_entities[2].geometry else {
            panic!("expected arc");
        };
        assert!(distance(&arc.center, &Point2::new(8.0, 2.0)) < 1e-9);
        assert!((arc.radius - 2.0).abs() < 1e-9);
        assert!((arc.sweep_angle() - FRAC_PI_2).abs() < 1e-9);
        assert!(distance(&arc.start_point(), &Point2::new(8.0, 0.0)) < 1e-9);
        assert!(distance(&arc.end_point(), &Point2::new(10.0, 2.0)) < 1e-9);
    }

    #[test]
    fn test_fillet_zero_radius_trims_to_corner() {
        // 两条线都没到达角点
        let a = line(0.0, 0.0, 8.0, 0.0);
        let b = line(10.0, 3.0, 10.0, 10.0);
        let result = fillet_lines(&a, &b, 0.0).unwrap();
        let lines = lines_of(&result);
        assert_eq!(result.add_entities.len(), 2);
        assert!(distance(&lines[0].end, &Point2::new(10.0, 0.0)) < 1e-9);
        assert!(distance(&lines[1].start, &Point2::new(10.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_fillet_rejects_parallel_and_oversized() {
        let a = line(0.0, 0.0, 10.0, 0.0);
        let parallel = line(0.0, 5.0, 10.0, 5.0);
        assert!(fillet_lines(&a, &parallel, 1.0).is_none());

        let short = line(10.0, 0.0, 10.0, 1.0);
        assert!(fillet_lines(&a, &short, 5.0).is_none());

        let circle = Entity::new(Geometry::Circle(Circle::new(Point2::origin(), 1.0)));
        assert!(fillet_lines(&a, &circle, 1.0).is_none());
        assert!(fillet_lines(&a, &a, 1.0).is_none());
    }

    #[test]
    fn test_chamfer() {
        let a = line(0.0, 0.0, 10.0, 0.0);
        let b = line(10.0, 0.0, 10.0, 10.0);
        let result = chamfer_lines(&a, &b, 3.0).unwrap();
        let lines = lines_of(&result);
        assert_eq!(lines.len(), 3);
        assert!(distance(&lines[0].end, &Point2::new(7.0, 0.0)) < 1e-9);
        assert!(distance(&lines[1].start, &Point2::new(10.0, 3.0)) < 1e-9);
        assert!(distance(&lines[2].start, &Point2::new(7.0, 0.0)) < 1e-9);
        assert!(distance(&lines[2].end, &Point2::new(10.0, 3.0)) < 1e-9);

        assert!(chamfer_lines(&a, &b, 12.0).is_none());
    }
}
