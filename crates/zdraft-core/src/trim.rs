//! 修剪与延伸
//!
//! 两个操作都不修改原实体：结果是 [`ModifyResult`]，删除目标并加入新的片段。
//!
//! 修剪把目标在与其它可见实体的交点处切开，去掉包含点击位置的那一段。
//! 参数化方式：直线用 `t∈[0,1]`，圆和圆弧用角度，多段线用全局参数
//! `线段序号 + 段内t`。
//!
//! 延伸从靠近点击位置的端点沿切线方向投射射线，取最近的前向交点。

use crate::block::{instantiate, BlockTable};
use crate::document::ModifyResult;
use crate::entity::{Entity, EntityId};
use crate::geometry::{Arc, Circle, Geometry, Line, Polyline};
use crate::intersect::{intersect_geometry, intersect_piece_geometry, Linear, Piece};
use crate::math::{
    angle_of, distance, normalize_angle, Point2, Vector2, ANGLE_TOLERANCE, EPSILON,
    GEOMETRY_TOLERANCE, MIN_SEGMENT_LENGTH, PARAM_TOLERANCE, TAU,
};
use tracing::debug;

/// 剪切边：除目标外所有可见实体的几何，块参照展开为子几何
fn cutting_geometries(target: EntityId, entities: &[&Entity], blocks: &BlockTable) -> Vec<Geometry> {
    let mut cutters = Vec::new();
    for entity in entities.iter().filter(|e| e.visible && e.id != target) {
        match &entity.geometry {
            Geometry::BlockRef(block_ref) => {
                cutters.extend(instantiate(block_ref, blocks).into_iter().map(|c| c.geometry))
            }
            geometry => cutters.push(geometry.clone()),
        }
    }
    cutters
}

fn all_intersections(geometry: &Geometry, cutters: &[Geometry]) -> Vec<Point2> {
    cutters
        .iter()
        .flat_map(|cutter| intersect_geometry(geometry, cutter))
        .collect()
}

/// 排序并合并容差内的重复参数
fn sorted_params(mut params: Vec<f64>, tolerance: f64) -> Vec<f64> {
    params.sort_by(f64::total_cmp);
    params.dedup_by(|b, a| (*b - *a).abs() <= tolerance);
    params
}

/// 修剪实体
///
/// 没有交点、点击段外没有剩余，或者类型不支持修剪时返回 `None`。
pub fn trim_entity(
    target: &Entity,
    click: Point2,
    entities: &[&Entity],
    blocks: &BlockTable,
) -> Option<ModifyResult> {
    let cutters = cutting_geometries(target.id, entities, blocks);

    let kept: Vec<Geometry> = match &target.geometry {
        Geometry::Line(line) => trim_line(line, &click, &cutters)?,
        Geometry::Circle(circle) => trim_circle(circle, &click, &cutters)?,
        Geometry::Arc(arc) => trim_arc(arc, &click, &cutters)?,
        Geometry::Polyline(polyline) if polyline.closed => {
            trim_closed_polyline(polyline, &click, &cutters)?
        }
        Geometry::Polyline(polyline) => trim_open_polyline(polyline, &click, &cutters)?,
        Geometry::Rectangle(rect) => {
            // 炸开为四条边，只修剪被点击的边
            let edges = rect.edges();
            let clicked = edges
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.distance_to_point(&click).total_cmp(&b.distance_to_point(&click))
                })
                .map(|(i, _)| i)?;
            let mut kept = trim_line(&edges[clicked], &click, &cutters)?;
            kept.extend(
                edges
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != clicked)
                    .map(|(_, e)| Geometry::Line(e.clone())),
            );
            kept
        }
        other => {
            debug!("{} 不支持修剪", other.type_name());
            return None;
        }
    };

    debug!(
        "修剪 {} {}：保留 {} 段",
        target.geometry.type_name(),
        target.id,
        kept.len()
    );
    Some(ModifyResult::replace(
        target.id,
        kept.into_iter().map(|g| target.derive(g)).collect(),
    ))
}

fn trim_line(line: &Line, click: &Point2, cutters: &[Geometry]) -> Option<Vec<Geometry>> {
    if line.length() < EPSILON {
        return None;
    }
    let target = Geometry::Line(line.clone());
    let cuts: Vec<f64> = all_intersections(&target, cutters)
        .iter()
        .map(|p| line.project(p))
        .filter(|t| *t > PARAM_TOLERANCE && *t < 1.0 - PARAM_TOLERANCE)
        .collect();
    if cuts.is_empty() {
        debug!("直线没有内部交点，无法修剪");
        return None;
    }

    let mut bounds = vec![0.0];
    bounds.extend(sorted_params(cuts, PARAM_TOLERANCE));
    bounds.push(1.0);

    let t_click = line.project(click).clamp(0.0, 1.0);
    let clicked = bounds
        .windows(2)
        .position(|w| t_click >= w[0] && t_click <= w[1])?;

    Some(
        bounds
            .windows(2)
            .enumerate()
            .filter(|(i, _)| *i != clicked)
            .map(|(_, w)| Line::new(line.point_at(w[0]), line.point_at(w[1])))
            .filter(|l| l.length() >= MIN_SEGMENT_LENGTH)
            .map(Geometry::Line)
            .collect(),
    )
}

fn trim_circle(circle: &Circle, click: &Point2, cutters: &[Geometry]) -> Option<Vec<Geometry>> {
    let target = Geometry::Circle(circle.clone());
    let angles: Vec<f64> = all_intersections(&target, cutters)
        .iter()
        .map(|p| normalize_angle(angle_of(&circle.center, p)))
        .collect();
    let mut angles = sorted_params(angles, ANGLE_TOLERANCE);
    // 首尾在 2π 处相接
    let n = angles.len();
    if n > 1 && TAU - angles[n - 1] + angles[0] <= ANGLE_TOLERANCE {
        angles.pop();
    }
    if angles.len() < 2 {
        debug!("圆至少需要两个交点才能修剪，实际 {}", angles.len());
        return None;
    }

    let click_angle = angle_of(&circle.center, click);
    let n = angles.len();
    let arcs: Vec<Arc> = (0..n)
        .map(|i| Arc::new(circle.center, circle.radius, angles[i], angles[(i + 1) % n]))
        .collect();
    let clicked = arcs.iter().position(|a| a.contains_angle(click_angle))?;

    Some(
        arcs.into_iter()
            .enumerate()
            .filter(|(i, a)| *i != clicked && a.length() >= MIN_SEGMENT_LENGTH)
            .map(|(_, a)| Geometry::Arc(a))
            .collect(),
    )
}

fn trim_arc(arc: &Arc, click: &Point2, cutters: &[Geometry]) -> Option<Vec<Geometry>> {
    let sweep = arc.sweep_angle();
    let target = Geometry::Arc(arc.clone());
    // 相对起始角的偏移
    let cuts: Vec<f64> = all_intersections(&target, cutters)
        .iter()
        .map(|p| normalize_angle(angle_of(&arc.center, p) - arc.start_angle))
        .filter(|rel| *rel > ANGLE_TOLERANCE && *rel < sweep - ANGLE_TOLERANCE)
        .collect();
    if cuts.is_empty() {
        debug!("圆弧没有内部交点，无法修剪");
        return None;
    }

    let mut bounds = vec![0.0];
    bounds.extend(sorted_params(cuts, ANGLE_TOLERANCE));
    bounds.push(sweep);

    let mut rel_click = normalize_angle(angle_of(&arc.center, click) - arc.start_angle);
    if rel_click > sweep {
        // 点击在弧外：归到较近的端点
        rel_click = if rel_click - sweep < TAU - rel_click { sweep } else { 0.0 };
    }
    let clicked = bounds
        .windows(2)
        .position(|w| rel_click >= w[0] && rel_click <= w[1])?;

    Some(
        bounds
            .windows(2)
            .enumerate()
            .filter(|(i, _)| *i != clicked)
            .map(|(_, w)| {
                Arc::new(
                    arc.center,
                    arc.radius,
                    arc.start_angle + w[0],
                    arc.start_angle + w[1],
                )
            })
            .filter(|a| a.length() >= MIN_SEGMENT_LENGTH)
            .map(Geometry::Arc)
            .collect(),
    )
}

/// 多段线各线段上的交点，返回全局参数
fn polyline_cut_params(polyline: &Polyline, cutters: &[Geometry]) -> Vec<f64> {
    let mut params = Vec::new();
    for (i, (a, b)) in polyline.segments().enumerate() {
        let segment = Linear::segment(a, b);
        let piece = Piece::Linear(segment);
        for cutter in cutters {
            for p in intersect_piece_geometry(&piece, cutter) {
                params.push(i as f64 + segment.param_of(&p).clamp(0.0, 1.0));
            }
        }
    }
    params
}

/// 截取全局参数 `[from, to]` 之间的子多段线（闭合多段线允许 `to` 超过线段数）
fn sub_polyline(polyline: &Polyline, from: f64, to: f64) -> Polyline {
    let n = polyline.points.len();
    let mut points = vec![polyline.point_at(from)];
    let first_vertex = from.floor() as i64 + 1;
    let last_vertex = to.ceil() as i64 - 1;
    for k in first_vertex..=last_vertex {
        let k_f = k as f64;
        if k_f > from + PARAM_TOLERANCE && k_f < to - PARAM_TOLERANCE {
            points.push(polyline.points[(k as usize) % n]);
        }
    }
    points.push(polyline.point_at(to));
    Polyline::new(points, false)
}

fn trim_open_polyline(
    polyline: &Polyline,
    click: &Point2,
    cutters: &[Geometry],
) -> Option<Vec<Geometry>> {
    let count = polyline.segment_count() as f64;
    if count == 0.0 {
        return None;
    }
    let cuts: Vec<f64> = polyline_cut_params(polyline, cutters)
        .into_iter()
        .filter(|s| *s > PARAM_TOLERANCE && *s < count - PARAM_TOLERANCE)
        .collect();
    if cuts.is_empty() {
        debug!("多段线没有内部交点，无法修剪");
        return None;
    }

    let mut bounds = vec![0.0];
    bounds.extend(sorted_params(cuts, PARAM_TOLERANCE));
    bounds.push(count);

    let s_click = polyline.project(click);
    let clicked = bounds
        .windows(2)
        .position(|w| s_click >= w[0] && s_click <= w[1])?;

    Some(
        bounds
            .windows(2)
            .enumerate()
            .filter(|(i, _)| *i != clicked)
            .map(|(_, w)| sub_polyline(polyline, w[0], w[1]))
            .filter(|p| p.length() >= MIN_SEGMENT_LENGTH)
            .map(Geometry::Polyline)
            .collect(),
    )
}

fn trim_closed_polyline(
    polyline: &Polyline,
    click: &Point2,
    cutters: &[Geometry],
) -> Option<Vec<Geometry>> {
    let count = polyline.segment_count() as f64;
    if count == 0.0 {
        return None;
    }
    let cuts: Vec<f64> = polyline_cut_params(polyline, cutters)
        .into_iter()
        .map(|s| if s >= count - PARAM_TOLERANCE { 0.0 } else { s })
        .collect();
    let cuts = sorted_params(cuts, PARAM_TOLERANCE);
    if cuts.len() < 2 {
        debug!("闭合多段线至少需要两个交点才能修剪，实际 {}", cuts.len());
        return None;
    }

    // 循环区间：最后一个区间跨过起点
    let n = cuts.len();
    let intervals: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let from = cuts[i];
            let to = if i + 1 < n { cuts[i + 1] } else { cuts[0] + count };
            (from, to)
        })
        .collect();

    let s_click = polyline.project(click);
    let clicked = intervals.iter().position(|(from, to)| {
        (s_click >= *from && s_click <= *to) || (s_click + count >= *from && s_click + count <= *to)
    })?;

    Some(
        intervals
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != clicked)
            .map(|(_, (from, to))| sub_polyline(polyline, from, to))
            .filter(|p| p.length() >= MIN_SEGMENT_LENGTH)
            .map(Geometry::Polyline)
            .collect(),
    )
}

/// 延伸实体
///
/// 支持直线、圆弧和开放多段线；其它类型，或者前方没有边界时返回 `None`。
pub fn extend_entity(
    target: &Entity,
    click: Point2,
    entities: &[&Entity],
    blocks: &BlockTable,
) -> Option<ModifyResult> {
    let boundaries = cutting_geometries(target.id, entities, blocks);

    let extended = match &target.geometry {
        Geometry::Line(line) => {
            let points = extend_polyline_end(&[line.start, line.end], &click, &boundaries)?;
            Geometry::Line(Line::new(points[0], points[1]))
        }
        Geometry::Polyline(polyline) if !polyline.closed => {
            let points = extend_polyline_end(&polyline.points, &click, &boundaries)?;
            Geometry::Polyline(Polyline::new(points, false))
        }
        Geometry::Arc(arc) => Geometry::Arc(extend_arc(arc, &click, &boundaries)?),
        other => {
            debug!("{} 不支持延伸", other.type_name());
            return None;
        }
    };

    Some(ModifyResult::replace(target.id, vec![target.derive(extended)]))
}

/// 沿方向投射射线，返回最近的前向交点
fn cast_ray(origin: Point2, direction: Vector2, boundaries: &[Geometry]) -> Option<Point2> {
    let dir = direction.try_normalize(EPSILON)?;
    let ray = Piece::Linear(Linear::ray(origin, dir));
    boundaries
        .iter()
        .flat_map(|b| intersect_piece_geometry(&ray, b))
        .map(|p| ((p - origin).dot(&dir), p))
        .filter(|(t, _)| *t > GEOMETRY_TOLERANCE)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, p)| p)
}

/// 延伸折线较近的一端
fn extend_polyline_end(
    points: &[Point2],
    click: &Point2,
    boundaries: &[Geometry],
) -> Option<Vec<Point2>> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let mut result = points.to_vec();
    if distance(click, &points[0]) <= distance(click, &points[n - 1]) {
        let hit = cast_ray(points[0], points[0] - points[1], boundaries);
        result[0] = hit.or_else(|| {
            debug!("起点方向没有边界");
            None
        })?;
    } else {
        let hit = cast_ray(points[n - 1], points[n - 1] - points[n - 2], boundaries);
        result[n - 1] = hit.or_else(|| {
            debug!("终点方向没有边界");
            None
        })?;
    }
    Some(result)
}

/// 沿支撑圆延伸圆弧较近的一端
fn extend_arc(arc: &Arc, click: &Point2, boundaries: &[Geometry]) -> Option<Arc> {
    let support = Piece::Circle(Circle::new(arc.center, arc.radius));
    let sweep = arc.sweep_angle();
    let angles: Vec<f64> = boundaries
        .iter()
        .flat_map(|b| intersect_piece_geometry(&support, b))
        .map(|p| angle_of(&arc.center, &p))
        .collect();

    let extend_end = distance(click, &arc.end_point()) < distance(click, &arc.start_point());
    // 从端点向弧外转过的角度，不能再回到弧内
    let best = angles
        .iter()
        .map(|a| {
            if extend_end {
                normalize_angle(a - arc.end_angle)
            } else {
                normalize_angle(arc.start_angle - a)
            }
        })
        .filter(|delta| *delta > ANGLE_TOLERANCE && *delta < TAU - sweep - ANGLE_TOLERANCE)
        .min_by(f64::total_cmp);

    let Some(delta) = best else {
        debug!("圆弧延伸方向没有边界");
        return None;
    };

    Some(if extend_end {
        Arc::new(arc.center, arc.radius, arc.start_angle, arc.end_angle + delta)
    } else {
        Arc::new(arc.center, arc.radius, arc.start_angle - delta, arc.end_angle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Entity {
        Entity::new(Geometry::Line(Line::new(Point2::new(x1, y1), Point2::new(x2, y2))))
    }

    fn assert_point(actual: Point2, x: f64, y: f64) {
        assert!(
            distance(&actual, &Point2::new(x, y)) < 1e-9,
            "expected ({}, {}), got {:?}",
            x,
            y,
            actual
        );
    }

    #[test]
    fn test_trim_line_keeps_far_side() {
        let target = line(0.0, 0.0, 10.0, 0.0);
        let cutter = line(5.0, -5.0, 5.0, 5.0);
        let blocks = BlockTable::new();

        let result = trim_entity(&target, Point2::new(2.0, 0.0), &[&target, &cutter], &blocks).unwrap();
        assert_eq!(result.remove_ids, vec![target.id]);
        assert_eq!(result.add_entities.len(), 1);
        assert_ne!(result.add_entities[0].id, target.id);
        let Geometry::Line(kept) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert_point(kept.start, 5.0, 0.0);
        assert_point(kept.end, 10.0, 0.0);
    }

    #[test]
    fn test_trim_middle_segment_leaves_two_pieces() {
        let target = line(0.0, 0.0, 10.0, 0.0);
        let c1 = line(3.0, -1.0, 3.0, 1.0);
        let c2 = line(7.0, -1.0, 7.0, 1.0);
        let blocks = BlockTable::new();
        let result = trim_entity(&target, Point2::new(5.0, 0.0), &[&target, &c1, &c2], &blocks).unwrap();
        assert_eq!(result.add_entities.len(), 2);
    }

    #[test]
    fn test_trim_without_intersections_or_hidden_cutter() {
        let target = line(0.0, 0.0, 10.0, 0.0);
        let far = line(20.0, -1.0, 20.0, 1.0);
        let hidden = line(5.0, -5.0, 5.0, 5.0).hidden();
        let blocks = BlockTable::new();
        assert!(trim_entity(&target, Point2::new(2.0, 0.0), &[&target, &far, &hidden], &blocks).is_none());
    }

    #[test]
    fn test_trim_circle_into_arc() {
        let circle = Entity::new(Geometry::Circle(Circle::new(Point2::origin(), 5.0)));
        let cutter = line(-10.0, 0.0, 10.0, 0.0);
        let blocks = BlockTable::new();

        // 点击 π/2 处，去掉 (0, π) 这一半
        let result = trim_entity(&circle, Point2::new(0.0, 5.0), &[&circle, &cutter], &blocks).unwrap();
        assert_eq!(result.add_entities.len(), 1);
        let Geometry::Arc(arc) = &result.add_entities[0].geometry else {
            panic!("expected arc");
        };
        assert!((normalize_angle(arc.start_angle) - PI).abs() < 1e-9);
        assert!(normalize_angle(arc.end_angle).abs() < 1e-9);
        assert!(arc.contains_angle(3.0 * FRAC_PI_2));
    }

    #[test]
    fn test_trim_circle_needs_two_cuts() {
        let circle = Entity::new(Geometry::Circle(Circle::new(Point2::origin(), 5.0)));
        // 与圆相切于 (5, 0)
        let tangent = line(5.0, -3.0, 5.0, 3.0);
        let blocks = BlockTable::new();
        assert!(trim_entity(&circle, Point2::new(0.0, 5.0), &[&circle, &tangent], &blocks).is_none());
    }

    #[test]
    fn test_trim_arc() {
        let arc = Entity::new(Geometry::Arc(Arc::new(Point2::origin(), 5.0, 0.0, PI)));
        let cutter = line(0.0, -10.0, 0.0, 10.0);
        let blocks = BlockTable::new();
        // 点击靠近 0 的一侧，保留 [π/2, π]
        let result = trim_entity(&arc, Point2::new(4.0, 3.0), &[&arc, &cutter], &blocks).unwrap();
        let Geometry::Arc(kept) = &result.add_entities[0].geometry else {
            panic!("expected arc");
        };
        assert!((kept.start_angle - FRAC_PI_2).abs() < 1e-9);
        assert!((kept.end_angle - PI).abs() < 1e-9);
    }

    #[test]
    fn test_trim_open_polyline() {
        let polyline = Entity::new(Geometry::Polyline(Polyline::new(
            vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), Point2::new(10.0, 10.0)],
            false,
        )));
        let cutter = line(5.0, -1.0, 5.0, 1.0);
        let blocks = BlockTable::new();
        let result = trim_entity(&polyline, Point2::new(1.0, 0.0), &[&polyline, &cutter], &blocks).unwrap();
        let Geometry::Polyline(kept) = &result.add_entities[0].geometry else {
            panic!("expected polyline");
        };
        assert_eq!(kept.points.len(), 3);
        assert_point(kept.points[0], 5.0, 0.0);
        assert_point(kept.points[1], 10.0, 0.0);
        assert_point(kept.points[2], 10.0, 10.0);
    }

    #[test]
    fn test_trim_closed_polyline_is_cyclic() {
        let square = Entity::new(Geometry::Polyline(Polyline::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            true,
        )));
        // 切掉左侧一条竖边附近的部分
        let cutter = line(2.0, -5.0, 2.0, 15.0);
        let blocks = BlockTable::new();
        let result = trim_entity(&square, Point2::new(0.0, 5.0), &[&square, &cutter], &blocks).unwrap();
        assert_eq!(result.add_entities.len(), 1);
        let Geometry::Polyline(kept) = &result.add_entities[0].geometry else {
            panic!("expected polyline");
        };
        assert!(!kept.closed);
        assert_point(kept.points[0], 2.0, 0.0);
        assert_point(*kept.points.last().unwrap(), 2.0, 10.0);
        assert_eq!(kept.points.len(), 4);
    }

    #[test]
    fn test_trim_rectangle_explodes_edges() {
        let rect = Entity::new(Geometry::Rectangle(Rectangle::new(Point2::origin(), 10.0, 10.0)));
        let cutter = line(5.0, -5.0, 5.0, 5.0);
        let blocks = BlockTable::new();
        let result = trim_entity(&rect, Point2::new(2.0, 0.0), &[&rect, &cutter], &blocks).unwrap();
        // 被点击的上边剩一段，另外三条边原样保留
        assert_eq!(result.add_entities.len(), 4);
        assert!(result
            .add_entities
            .iter()
            .all(|e| matches!(e.geometry, Geometry::Line(_))));
    }

    #[test]
    fn test_extend_line_to_boundary() {
        let target = line(0.0, 0.0, 5.0, 0.0);
        let boundary = line(8.0, -5.0, 8.0, 5.0);
        let behind = line(-3.0, -5.0, -3.0, 5.0);
        let blocks = BlockTable::new();
        let result =
            extend_entity(&target, Point2::new(4.5, 0.0), &[&target, &boundary, &behind], &blocks).unwrap();
        let Geometry::Line(l) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert_point(l.start, 0.0, 0.0);
        assert_point(l.end, 8.0, 0.0);

        let result = extend_entity(&target, Point2::new(0.5, 0.0), &[&target, &boundary, &behind], &blocks).unwrap();
        let Geometry::Line(l) = &result.add_entities[0].geometry else {
            panic!("expected line");
        };
        assert_point(l.start, -3.0, 0.0);
    }

    #[test]
    fn test_extend_arc_along_circle() {
        let arc = Entity::new(Geometry::Arc(Arc::new(Point2::origin(), 5.0, 0.0, FRAC_PI_2)));
        let boundary = line(-10.0, 0.0, 0.0, 0.0);
        let blocks = BlockTable::new();
        let result = extend_entity(&arc, Point2::new(0.0, 5.0), &[&arc, &boundary], &blocks).unwrap();
        let Geometry::Arc(extended) = &result.add_entities[0].geometry else {
            panic!("expected arc");
        };
        assert!((extended.start_angle).abs() < 1e-9);
        assert!((extended.end_angle - PI).abs() < 1e-9);
    }

    #[test]
    fn test_extend_unsupported_or_unbounded() {
        let circle = Entity::new(Geometry::Circle(Circle::new(Point2::origin(), 5.0)));
        let target = line(0.0, 0.0, 5.0, 0.0);
        let blocks = BlockTable::new();
        assert!(extend_entity(&circle, Point2::new(5.0, 0.0), &[&circle, &target], &blocks).is_none());
        assert!(extend_entity(&target, Point2::new(5.0, 0.0), &[&target], &blocks).is_none());
    }
}
