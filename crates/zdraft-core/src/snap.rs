//! 对象捕捉系统
//!
//! 参考 LibreCAD 的设计，实现 CAD 标准的对象捕捉功能。
//!
//! 支持的捕捉类型：
//! - 端点 (Endpoint)
//! - 中点 (Midpoint)
//! - 圆心 (Center)
//! - 象限点 (Quadrant)
//! - 交点 (Intersection)
//! - 垂足 (Perpendicular)
//! - 切点 (Tangent)
//! - 最近点 (Nearest)
//! - 网格点 (Grid)，仅在没有任何特征点时使用
//!
//! 另外提供正交模式与极轴追踪，二者独立于特征/网格捕捉，由调用方按需组合。

use crate::block::{instantiate, BlockTable};
use crate::entity::{Entity, EntityId};
use crate::geometry::{closest_point_on_segment, Arc, Circle, Geometry, Line, Polyline};
use crate::intersect::intersect_geometry;
use crate::math::{angle_of, distance, point_at_angle, Point2, Vector2, EPSILON};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use tracing::trace;

/// 极轴追踪的吸附带宽（度）
pub const POLAR_BAND_DEGREES: f64 = 10.0;

/// 捕捉类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapType {
    /// 端点捕捉
    Endpoint,
    /// 中点捕捉
    Midpoint,
    /// 圆心捕捉
    Center,
    /// 交点捕捉
    Intersection,
    /// 垂足捕捉
    Perpendicular,
    /// 切点捕捉
    Tangent,
    /// 最近点捕捉
    Nearest,
    /// 网格点捕捉
    Grid,
    /// 象限点（圆/弧的0°, 90°, 180°, 270°位置）
    Quadrant,
}

impl SnapType {
    /// 获取捕捉类型的名称
    pub fn name(&self) -> &'static str {
        match self {
            SnapType::Endpoint => "端点",
            SnapType::Midpoint => "中点",
            SnapType::Center => "圆心",
            SnapType::Intersection => "交点",
            SnapType::Perpendicular => "垂足",
            SnapType::Tangent => "切点",
            SnapType::Nearest => "最近点",
            SnapType::Grid => "网格点",
            SnapType::Quadrant => "象限点",
        }
    }

    /// 获取捕捉类型的快捷键
    pub fn shortcut(&self) -> &'static str {
        match self {
            SnapType::Endpoint => "END",
            SnapType::Midpoint => "MID",
            SnapType::Center => "CEN",
            SnapType::Intersection => "INT",
            SnapType::Perpendicular => "PER",
            SnapType::Tangent => "TAN",
            SnapType::Nearest => "NEA",
            SnapType::Grid => "GRI",
            SnapType::Quadrant => "QUA",
        }
    }
}

/// 捕捉点
#[derive(Debug, Clone, PartialEq)]
pub struct SnapPoint {
    /// 捕捉到的世界坐标
    pub point: Point2,
    /// 捕捉类型
    pub snap_type: SnapType,
    /// 关联的实体ID（交点、网格点没有）
    pub entity_id: Option<EntityId>,
    /// 到查询点的距离（用于排序）
    pub distance: f64,
}

impl SnapPoint {
    pub fn new(point: Point2, snap_type: SnapType, entity_id: Option<EntityId>, distance: f64) -> Self {
        Self {
            point,
            snap_type,
            entity_id,
            distance,
        }
    }
}

/// 捕捉掩码（位域，用于快速启用/禁用捕捉类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapMask {
    bits: u16,
}

impl SnapMask {
    pub const ENDPOINT: u16 = 1 << 0;
    pub const MIDPOINT: u16 = 1 << 1;
    pub const CENTER: u16 = 1 << 2;
    pub const INTERSECTION: u16 = 1 << 3;
    pub const PERPENDICULAR: u16 = 1 << 4;
    pub const TANGENT: u16 = 1 << 5;
    pub const NEAREST: u16 = 1 << 6;
    pub const GRID: u16 = 1 << 7;
    pub const QUADRANT: u16 = 1 << 8;

    pub const NONE: SnapMask = SnapMask { bits: 0 };
    pub const ALL: SnapMask = SnapMask { bits: 0x01FF };

    pub fn new(bits: u16) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    fn bit(snap_type: SnapType) -> u16 {
        match snap_type {
            SnapType::Endpoint => Self::ENDPOINT,
            SnapType::Midpoint => Self::MIDPOINT,
            SnapType::Center => Self::CENTER,
            SnapType::Intersection => Self::INTERSECTION,
            SnapType::Perpendicular => Self::PERPENDICULAR,
            SnapType::Tangent => Self::TANGENT,
            SnapType::Nearest => Self::NEAREST,
            SnapType::Grid => Self::GRID,
            SnapType::Quadrant => Self::QUADRANT,
        }
    }

    pub fn is_enabled(&self, snap_type: SnapType) -> bool {
        self.bits & Self::bit(snap_type) != 0
    }

    pub fn set(&mut self, snap_type: SnapType, enabled: bool) {
        let bit = Self::bit(snap_type);
        if enabled {
            self.bits |= bit;
        } else {
            self.bits &= !bit;
        }
    }

    pub fn toggle(&mut self, snap_type: SnapType) {
        let enabled = self.is_enabled(snap_type);
        self.set(snap_type, !enabled);
    }
}

impl Default for SnapMask {
    fn default() -> Self {
        // 默认启用常用的捕捉类型
        Self {
            bits: Self::ENDPOINT | Self::MIDPOINT | Self::CENTER | Self::QUADRANT | Self::INTERSECTION,
        }
    }
}

/// 捕捉设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    /// 对象捕捉总开关
    pub enabled: bool,
    /// 启用的捕捉类型
    pub mask: SnapMask,
    /// 正交模式
    pub ortho: bool,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mask: SnapMask::default(),
            ortho: false,
        }
    }
}

/// 网格设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// 是否捕捉到网格点
    pub snap: bool,
    /// 是否显示网格（渲染器使用）
    pub visible: bool,
    /// 网格间距
    pub spacing: f64,
    /// 每隔多少条网格线画一条主网格线
    pub major_every: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            snap: false,
            visible: true,
            spacing: 10.0,
            major_every: 10,
        }
    }
}

/// 极轴追踪设置（角度以度为单位，便于配置文件编辑）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarSettings {
    pub enabled: bool,
    /// 增量角
    pub increment: f64,
    /// 额外的追踪角
    pub extra_angles: Vec<f64>,
}

impl Default for PolarSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            increment: 45.0,
            extra_angles: Vec::new(),
        }
    }
}

/// 正交模式：保留增量绝对值较大的轴
pub fn apply_ortho(start: &Point2, point: &Point2) -> Point2 {
    let d = point - start;
    if d.x.abs() >= d.y.abs() {
        Point2::new(point.x, start.y)
    } else {
        Point2::new(start.x, point.y)
    }
}

/// 极轴追踪结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarSnap {
    pub point: Point2,
    /// 吸附到的追踪角（度，[0, 360)）
    pub angle: f64,
}

/// 极轴追踪：光标方向与最近追踪角相差不超过 10° 时吸附，保持光标到起点的距离
///
/// 未启用时返回 `None`。
pub fn polar_snap(start: &Point2, cursor: &Point2, polar: &PolarSettings) -> Option<PolarSnap> {
    if !polar.enabled {
        return None;
    }
    let length = distance(start, cursor);
    if length < EPSILON {
        return None;
    }
    let cursor_angle = angle_of(start, cursor).to_degrees().rem_euclid(360.0);

    let mut tracking: Vec<f64> = Vec::new();
    if polar.increment > EPSILON {
        let steps = (360.0 / polar.increment).ceil() as usize;
        tracking.extend((0..steps).map(|k| k as f64 * polar.increment));
    }
    tracking.extend(polar.extra_angles.iter().map(|a| a.rem_euclid(360.0)));

    let circular_diff = |a: f64, b: f64| {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    };

    let (angle, diff) = tracking
        .into_iter()
        .map(|a| (a, circular_diff(a, cursor_angle)))
        .min_by(|x, y| x.1.total_cmp(&y.1))?;

    if diff > POLAR_BAND_DEGREES {
        return None;
    }
    let point = point_at_angle(start, length, angle.to_radians());
    Some(PolarSnap { point, angle })
}

/// 网格吸附：取最近的网格交点
pub fn nearest_grid_point(point: &Point2, spacing: f64) -> Point2 {
    if spacing <= EPSILON {
        return *point;
    }
    Point2::new(
        (point.x / spacing).round() * spacing,
        (point.y / spacing).round() * spacing,
    )
}

/// 捕捉引擎
///
/// 负责计算和管理对象捕捉
#[derive(Debug, Clone)]
pub struct SnapEngine {
    settings: SnapSettings,
    grid: GridSettings,
    /// 缓存的候选捕捉点
    candidates: Vec<SnapPoint>,
}

impl SnapEngine {
    pub fn new(settings: SnapSettings, grid: GridSettings) -> Self {
        Self {
            settings,
            grid,
            candidates: Vec::with_capacity(64),
        }
    }

    pub fn settings(&self) -> &SnapSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SnapSettings {
        &mut self.settings
    }

    pub fn grid(&self) -> &GridSettings {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut GridSettings {
        &mut self.grid
    }

    /// 寻找最佳捕捉点
    ///
    /// # 参数
    /// - `point`: 查询点（世界坐标）
    /// - `entities`: 要搜索的实体列表，不可见实体被跳过
    /// - `blocks`: 块表，用于展开块参照
    /// - `tolerance`: 世界坐标容差
    /// - `reference_point`: 参考点（用于垂足、切点等计算）
    ///
    /// 距离最近的候选胜出，距离相同时保留先出现的（先实体、后候选）。
    pub fn find_snap_point(
        &mut self,
        point: Point2,
        entities: &[&Entity],
        blocks: &BlockTable,
        tolerance: f64,
        reference_point: Option<Point2>,
    ) -> Option<SnapPoint> {
        self.candidates.clear();

        if self.settings.enabled {
            // 1. 收集所有实体的特征点
            for entity in entities.iter().filter(|e| e.visible) {
                self.collect_entity_snap_points(entity, blocks, point, tolerance, reference_point);
            }

            // 2. 交点捕捉（需要成对的实体）
            if self.settings.mask.is_enabled(SnapType::Intersection) {
                self.collect_intersection_points(entities, blocks, point, tolerance);
            }
        }

        // 3. 找到最近的捕捉点
        let best = self
            .candidates
            .iter()
            .filter(|p| p.distance <= tolerance)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .cloned();

        if let Some(snap) = best {
            trace!("捕捉到{} ({:.3}, {:.3})", snap.snap_type.name(), snap.point.x, snap.point.y);
            return Some(snap);
        }

        // 4. 没有特征点时退回网格
        if self.grid.snap {
            return self.snap_to_grid(point, tolerance);
        }
        None
    }

    /// 收集单个实体的捕捉点
    fn collect_entity_snap_points(
        &mut self,
        entity: &Entity,
        blocks: &BlockTable,
        mouse: Point2,
        tolerance: f64,
        reference_point: Option<Point2>,
    ) {
        match &entity.geometry {
            Geometry::BlockRef(block_ref) => {
                self.push(block_ref.insert_point, SnapType::Endpoint, Some(entity.id), mouse, tolerance);
                // 实例化子实体的特征点归属到块参照
                for child in instantiate(block_ref, blocks) {
                    self.collect_geometry_snap_points(
                        &child.geometry,
                        entity.id,
                        mouse,
                        tolerance,
                        reference_point,
                    );
                }
            }
            geometry => {
                self.collect_geometry_snap_points(geometry, entity.id, mouse, tolerance, reference_point)
            }
        }
    }

    fn collect_geometry_snap_points(
        &mut self,
        geometry: &Geometry,
        id: EntityId,
        mouse: Point2,
        tolerance: f64,
        reference_point: Option<Point2>,
    ) {
        let id = Some(id);
        match geometry {
            Geometry::Line(line) => {
                self.collect_segment_snap_points(line, id, mouse, tolerance, reference_point);
            }
            Geometry::Circle(circle) => {
                self.collect_circle_snap_points(circle, id, mouse, tolerance, reference_point);
            }
            Geometry::Arc(arc) => {
                self.collect_arc_snap_points(arc, id, mouse, tolerance, reference_point);
            }
            Geometry::Rectangle(rect) => {
                self.collect_polyline_snap_points(&rect.to_polyline(), id, mouse, tolerance, reference_point);
                self.push(rect.center(), SnapType::Center, id, mouse, tolerance);
            }
            Geometry::Polyline(polyline) => {
                self.collect_polyline_snap_points(polyline, id, mouse, tolerance, reference_point);
            }
            Geometry::Ellipse(ellipse) => {
                self.push(ellipse.center, SnapType::Center, id, mouse, tolerance);
                for p in ellipse.axis_points() {
                    self.push(p, SnapType::Quadrant, id, mouse, tolerance);
                }
            }
            Geometry::Text(text) => {
                // 文本只捕捉插入点
                self.push(text.position, SnapType::Endpoint, id, mouse, tolerance);
            }
            Geometry::Dimension(dim) => {
                // 标注捕捉定义点
                self.push(dim.start, SnapType::Endpoint, id, mouse, tolerance);
                self.push(dim.end, SnapType::Endpoint, id, mouse, tolerance);
            }
            Geometry::Hatch(hatch) => {
                for &p in &hatch.boundary {
                    self.push(p, SnapType::Endpoint, id, mouse, tolerance);
                }
            }
            Geometry::Spline(spline) => {
                for &p in &spline.control_points {
                    self.push(p, SnapType::Endpoint, id, mouse, tolerance);
                }
                if self.settings.mask.is_enabled(SnapType::Nearest) {
                    let sampled = spline.to_polyline();
                    self.collect_nearest_on_polyline(&sampled, id, mouse, tolerance);
                }
            }
            Geometry::XLine(xline) => {
                self.push(xline.base_point, SnapType::Endpoint, id, mouse, tolerance);
                self.collect_infinite_snap_points(xline.base_point, xline.direction, false, id, mouse, tolerance, reference_point);
            }
            Geometry::Ray(ray) => {
                self.push(ray.base_point, SnapType::Endpoint, id, mouse, tolerance);
                self.collect_infinite_snap_points(ray.base_point, ray.direction, true, id, mouse, tolerance, reference_point);
            }
            Geometry::BlockRef(_) => {
                // 嵌套参照已由 instantiate 展开
            }
        }
    }

    /// 候选点启用且在容差内时加入
    fn push(
        &mut self,
        point: Point2,
        snap_type: SnapType,
        entity_id: Option<EntityId>,
        mouse: Point2,
        tolerance: f64,
    ) {
        if !self.settings.mask.is_enabled(snap_type) {
            return;
        }
        let dist = distance(&point, &mouse);
        if dist <= tolerance {
            self.candidates.push(SnapPoint::new(point, snap_type, entity_id, dist));
        }
    }

    /// 线段的捕捉点
    fn collect_segment_snap_points(
        &mut self,
        line: &Line,
        id: Option<EntityId>,
        mouse: Point2,
        tolerance: f64,
        reference_point: Option<Point2>,
    ) {
        self.push(line.start, SnapType::Endpoint, id, mouse, tolerance);
        self.push(line.end, SnapType::Endpoint, id, mouse, tolerance);
        self.push(line.midpoint(), SnapType::Midpoint, id, mouse, tolerance);

        if let Some(ref_point) = reference_point {
            if let Some(perp) = perpendicular_to_segment(line, &ref_point) {
                self.push(perp, SnapType::Perpendicular, id, mouse, tolerance);
            }
        }

        let nearest = closest_point_on_segment(&mouse, &line.start, &line.end);
        self.push(nearest, SnapType::Nearest, id, mouse, tolerance);
    }

    /// 圆的捕捉点
    fn collect_circle_snap_points(
        &mut self,
        circle: &Circle,
        id: Option<EntityId>,
        mouse: Point2,
        tolerance: f64,
        reference_point: Option<Point2>,
    ) {
        self.push(circle.center, SnapType::Center, id, mouse, tolerance);

        for point in circle.quadrant_points() {
            self.push(point, SnapType::Quadrant, id, mouse, tolerance);
        }

        if let Some(ref_point) = reference_point {
            for tangent in tangent_points_to_circle(circle, &ref_point) {
                self.push(tangent, SnapType::Tangent, id, mouse, tolerance);
            }
        }

        // 最近点（圆上）
        if let Some(dir) = (mouse - circle.center).try_normalize(EPSILON) {
            self.push(circle.center + dir * circle.radius, SnapType::Nearest, id, mouse, tolerance);
        }
    }

    /// 圆弧的捕捉点
    fn collect_arc_snap_points(
        &mut self,
        arc: &Arc,
        id: Option<EntityId>,
        mouse: Point2,
        tolerance: f64,
        reference_point: Option<Point2>,
    ) {
        self.push(arc.start_point(), SnapType::Endpoint, id, mouse, tolerance);
        self.push(arc.end_point(), SnapType::Endpoint, id, mouse, tolerance);
        self.push(arc.center, SnapType::Center, id, mouse, tolerance);
        self.push(arc.midpoint(), SnapType::Midpoint, id, mouse, tolerance);

        for angle in [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2] {
            if arc.contains_angle(angle) {
                let point = point_at_angle(&arc.center, arc.radius, angle);
                self.push(point, SnapType::Quadrant, id, mouse, tolerance);
            }
        }

        if let Some(ref_point) = reference_point {
            let support = Circle::new(arc.center, arc.radius);
            for tangent in tangent_points_to_circle(&support, &ref_point) {
                if arc.contains_angle(angle_of(&arc.center, &tangent)) {
                    self.push(tangent, SnapType::Tangent, id, mouse, tolerance);
                }
            }
        }

        if arc.contains_angle(angle_of(&arc.center, &mouse)) {
            if let Some(dir) = (mouse - arc.center).try_normalize(EPSILON) {
                self.push(arc.center + dir * arc.radius, SnapType::Nearest, id, mouse, tolerance);
            }
        }
    }

    /// 多段线的捕捉点
    fn collect_polyline_snap_points(
        &mut self,
        polyline: &Polyline,
        id: Option<EntityId>,
        mouse: Point2,
        tolerance: f64,
        reference_point: Option<Point2>,
    ) {
        // 顶点（端点）
        for &vertex in &polyline.points {
            self.push(vertex, SnapType::Endpoint, id, mouse, tolerance);
        }

        // 线段中点
        for (a, b) in polyline.segments() {
            self.push(nalgebra::center(&a, &b), SnapType::Midpoint, id, mouse, tolerance);
        }

        if let Some(ref_point) = reference_point {
            for (a, b) in polyline.segments() {
                if let Some(perp) = perpendicular_to_segment(&Line::new(a, b), &ref_point) {
                    self.push(perp, SnapType::Perpendicular, id, mouse, tolerance);
                }
            }
        }

        self.collect_nearest_on_polyline(polyline, id, mouse, tolerance);
    }

    fn collect_nearest_on_polyline(
        &mut self,
        polyline: &Polyline,
        id: Option<EntityId>,
        mouse: Point2,
        tolerance: f64,
    ) {
        if !self.settings.mask.is_enabled(SnapType::Nearest) || polyline.segment_count() == 0 {
            return;
        }
        let nearest = polyline.point_at(polyline.project(&mouse));
        self.push(nearest, SnapType::Nearest, id, mouse, tolerance);
    }

    /// 构造线/射线的垂足与最近点
    #[allow(clippy::too_many_arguments)]
    fn collect_infinite_snap_points(
        &mut self,
        base: Point2,
        direction: Vector2,
        one_sided: bool,
        id: Option<EntityId>,
        mouse: Point2,
        tolerance: f64,
        reference_point: Option<Point2>,
    ) {
        let project = |p: &Point2| -> Option<Point2> {
            let len_sq = direction.norm_squared();
            if len_sq < EPSILON {
                return None;
            }
            let t = (p - base).dot(&direction) / len_sq;
            if one_sided && t < 0.0 {
                return None;
            }
            Some(base + direction * t)
        };

        if let Some(perp) = reference_point.as_ref().and_then(project) {
            self.push(perp, SnapType::Perpendicular, id, mouse, tolerance);
        }
        if let Some(nearest) = project(&mouse) {
            self.push(nearest, SnapType::Nearest, id, mouse, tolerance);
        }
    }

    /// 收集交点
    ///
    /// 交点同时落在两条曲线上，只需考虑经过查询点容差范围的几何。
    fn collect_intersection_points(
        &mut self,
        entities: &[&Entity],
        blocks: &BlockTable,
        mouse: Point2,
        tolerance: f64,
    ) {
        let mut nearby: Vec<Geometry> = Vec::new();
        for entity in entities.iter().filter(|e| e.visible) {
            match &entity.geometry {
                Geometry::BlockRef(block_ref) => nearby.extend(
                    instantiate(block_ref, blocks)
                        .into_iter()
                        .map(|child| child.geometry)
                        .filter(|g| g.contains_point(&mouse, tolerance)),
                ),
                geometry if geometry.contains_point(&mouse, tolerance) => {
                    nearby.push(geometry.clone());
                }
                _ => {}
            }
        }

        // 双重循环检查所有几何对
        for i in 0..nearby.len() {
            for j in (i + 1)..nearby.len() {
                for point in intersect_geometry(&nearby[i], &nearby[j]) {
                    // 交点涉及两个实体
                    self.push(point, SnapType::Intersection, None, mouse, tolerance);
                }
            }
        }
    }

    /// 网格捕捉
    fn snap_to_grid(&self, mouse: Point2, tolerance: f64) -> Option<SnapPoint> {
        let grid_point = nearest_grid_point(&mouse, self.grid.spacing);
        let dist = distance(&grid_point, &mouse);
        if dist <= tolerance {
            Some(SnapPoint::new(grid_point, SnapType::Grid, None, dist))
        } else {
            None
        }
    }
}

impl Default for SnapEngine {
    fn default() -> Self {
        Self::new(SnapSettings::default(), GridSettings::default())
    }
}

/// 从参考点到线段的垂足（必须落在线段上）
fn perpendicular_to_segment(line: &Line, ref_point: &Point2) -> Option<Point2> {
    let v = line.end - line.start;
    let c2 = v.dot(&v);
    if c2 < EPSILON {
        return None;
    }
    let b = (ref_point - line.start).dot(&v) / c2;
    (0.0..=1.0).contains(&b).then(|| line.start + v * b)
}

/// 从圆外一点到圆的两个切点
fn tangent_points_to_circle(circle: &Circle, point: &Point2) -> Vec<Point2> {
    let d = distance(point, &circle.center);

    // 点在圆内，没有切点
    if d <= circle.radius || d < EPSILON {
        return Vec::new();
    }

    let base_angle = angle_of(&circle.center, point);
    // 切点与圆心连线和圆心-外点连线的夹角
    let offset = (circle.radius / d).acos();

    vec![
        circle.point_at_angle(base_angle + offset),
        circle.point_at_angle(base_angle - offset),
    ]
}
