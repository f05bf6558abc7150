//! 变换引擎：平移、镜像、旋转、缩放、阵列
//!
//! 所有变换都归结为一个 2D 仿射矩阵 [`Transform2D`]：点值字段逐点映射，
//! 角度、半径、字高、标注偏移等标量字段按矩阵的旋转/缩放分量同步更新。
//! 结果总是新实体，原实体保持不变。

use crate::entity::Entity;
use crate::geometry::{
    Arc, BlockRef, Circle, Dimension, Ellipse, Geometry, Hatch, Line, Polyline, Ray, Rectangle,
    Spline, Text, XLine,
};
use crate::math::{
    left_normal, rotate_point, rotate_vector, Point2, Vector2, ANGLE_TOLERANCE, EPSILON,
    GEOMETRY_TOLERANCE, TAU,
};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// 2D 仿射变换（齐次 3x3 矩阵）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    matrix: Matrix3<f64>,
}

impl Transform2D {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// 平移
    pub fn translation(delta: Vector2) -> Self {
        Self::from_matrix(Matrix3::new_translation(&delta))
    }

    /// 绕点旋转
    pub fn rotation_about(center: Point2, angle: f64) -> Self {
        Self::translation(center.coords)
            .pre(Matrix3::new_rotation(angle))
            .pre(Matrix3::new_translation(&-center.coords))
    }

    /// 以点为基点缩放（允许非均匀）
    pub fn scale_about(center: Point2, sx: f64, sy: f64) -> Self {
        Self::translation(center.coords)
            .pre(Matrix3::new_nonuniform_scaling(&Vector2::new(sx, sy)))
            .pre(Matrix3::new_translation(&-center.coords))
    }

    /// 关于直线 (a, b) 的镜像
    ///
    /// 轴线退化时返回 `None`。
    pub fn mirror(a: Point2, b: Point2) -> Option<Self> {
        let axis = (b - a).try_normalize(EPSILON)?;
        let (c, s) = (axis.x * axis.x - axis.y * axis.y, 2.0 * axis.x * axis.y);
        #[rustfmt::skip]
        let reflect = Matrix3::new(
            c,   s,  0.0,
            s,  -c,  0.0,
            0.0, 0.0, 1.0,
        );
        Some(
            Self::translation(a.coords)
                .pre(reflect)
                .pre(Matrix3::new_translation(&-a.coords)),
        )
    }

    /// 块实例变换：`(p - base)` 缩放、旋转后平移到 `insert`
    pub fn block(base: Point2, insert: Point2, sx: f64, sy: f64, rotation: f64) -> Self {
        Self::translation(insert.coords)
            .pre(Matrix3::new_rotation(rotation))
            .pre(Matrix3::new_nonuniform_scaling(&Vector2::new(sx, sy)))
            .pre(Matrix3::new_translation(&-base.coords))
    }

    /// 右乘：先执行 `m`，再执行自身
    fn pre(self, m: Matrix3<f64>) -> Self {
        Self::from_matrix(self.matrix * m)
    }

    /// 组合：先执行自身，再执行 `next`
    pub fn then(&self, next: &Transform2D) -> Transform2D {
        Transform2D::from_matrix(next.matrix * self.matrix)
    }

    pub fn apply_point(&self, point: &Point2) -> Point2 {
        self.matrix.transform_point(point)
    }

    pub fn apply_vector(&self, vector: &Vector2) -> Vector2 {
        self.matrix.transform_vector(vector)
    }

    /// 线性部分行列式为负（包含镜像）
    pub fn is_mirroring(&self) -> bool {
        let m = &self.matrix;
        m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)] < 0.0
    }

    /// X 轴映射后的方向角
    pub fn rotation_angle(&self) -> f64 {
        self.matrix[(1, 0)].atan2(self.matrix[(0, 0)])
    }

    /// X 轴方向的缩放量（半径、字高按此缩放）
    pub fn x_scale(&self) -> f64 {
        Vector2::new(self.matrix[(0, 0)], self.matrix[(1, 0)]).norm()
    }

    /// Y 轴方向的缩放量
    pub fn y_scale(&self) -> f64 {
        Vector2::new(self.matrix[(0, 1)], self.matrix[(1, 1)]).norm()
    }

    /// 映射方向角；镜像时 `θ → 2α − θ`，不做归一化
    pub fn map_angle(&self, angle: f64) -> f64 {
        if self.is_mirroring() {
            self.rotation_angle() - angle
        } else {
            angle + self.rotation_angle()
        }
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// 矩形角点变换后：仍轴对齐则保持矩形，否则退化为闭合多段线
pub fn rectangle_or_polyline(corners: [Point2; 4]) -> Geometry {
    let axis_aligned = (0..4).all(|i| {
        let d = corners[(i + 1) % 4] - corners[i];
        d.x.abs() <= GEOMETRY_TOLERANCE || d.y.abs() <= GEOMETRY_TOLERANCE
    });
    if axis_aligned {
        Geometry::Rectangle(Rectangle::from_corners(corners[0], corners[2]))
    } else {
        Geometry::Polyline(Polyline::new(corners.to_vec(), true))
    }
}

/// 按仿射变换映射几何
pub fn transform_geometry(geometry: &Geometry, t: &Transform2D) -> Geometry {
    let p = |pt: &Point2| t.apply_point(pt);
    let map_all = |pts: &[Point2]| pts.iter().map(|pt| t.apply_point(pt)).collect::<Vec<_>>();
    let mirroring = t.is_mirroring();

    match geometry {
        Geometry::Line(l) => Geometry::Line(Line::new(p(&l.start), p(&l.end))),
        Geometry::Circle(c) => Geometry::Circle(Circle::new(p(&c.center), c.radius * t.x_scale())),
        Geometry::Arc(a) => {
            let start = t.map_angle(a.start_angle);
            let end = t.map_angle(a.end_angle);
            // 镜像会反转扫掠方向，交换起止角保持逆时针约定
            let (start, end) = if mirroring { (end, start) } else { (start, end) };
            Geometry::Arc(Arc::new(p(&a.center), a.radius * t.x_scale(), start, end))
        }
        Geometry::Rectangle(r) => rectangle_or_polyline(r.corners().map(|c| p(&c))),
        Geometry::Polyline(pl) => Geometry::Polyline(Polyline::new(map_all(&pl.points), pl.closed)),
        Geometry::Ellipse(e) => {
            let u = Vector2::new(e.rotation.cos(), e.rotation.sin());
            let v = left_normal(&u);
            Geometry::Ellipse(Ellipse::new(
                p(&e.center),
                e.radius_x * t.apply_vector(&u).norm(),
                e.radius_y * t.apply_vector(&v).norm(),
                t.map_angle(e.rotation),
            ))
        }
        Geometry::Text(tx) => Geometry::Text(Text {
            position: p(&tx.position),
            content: tx.content.clone(),
            font_size: tx.font_size * t.x_scale(),
            rotation: t.map_angle(tx.rotation),
        }),
        Geometry::Dimension(d) => {
            let offset = d.offset * t.x_scale();
            Geometry::Dimension(Dimension::new(
                p(&d.start),
                p(&d.end),
                if mirroring { -offset } else { offset },
            ))
        }
        Geometry::Hatch(h) => Geometry::Hatch(Hatch {
            boundary: map_all(&h.boundary),
            angle: t.map_angle(h.angle),
            scale: h.scale * t.x_scale(),
            ..h.clone()
        }),
        Geometry::Spline(s) => {
            Geometry::Spline(Spline::new(map_all(&s.control_points), s.degree, s.closed))
        }
        Geometry::XLine(x) => {
            Geometry::XLine(XLine::new(p(&x.base_point), t.apply_vector(&x.direction)))
        }
        Geometry::Ray(r) => Geometry::Ray(Ray::new(p(&r.base_point), t.apply_vector(&r.direction))),
        Geometry::BlockRef(b) => {
            let scale_y = b.scale_y * t.y_scale();
            Geometry::BlockRef(BlockRef {
                block_id: b.block_id,
                insert_point: p(&b.insert_point),
                scale_x: b.scale_x * t.x_scale(),
                scale_y: if mirroring { -scale_y } else { scale_y },
                rotation: t.map_angle(b.rotation),
            })
        }
    }
}

/// 平移几何
pub fn translate_geometry(geometry: &Geometry, delta: Vector2) -> Geometry {
    transform_geometry(geometry, &Transform2D::translation(delta))
}

/// 关于直线 (a, b) 镜像几何，轴线退化时返回 `None`
pub fn mirror_geometry(geometry: &Geometry, a: Point2, b: Point2) -> Option<Geometry> {
    Transform2D::mirror(a, b).map(|t| transform_geometry(geometry, &t))
}

/// 绕基点旋转几何
pub fn rotate_geometry(geometry: &Geometry, center: Point2, angle: f64) -> Geometry {
    transform_geometry(geometry, &Transform2D::rotation_about(center, angle))
}

/// 以基点均匀缩放几何，比例必须为正
pub fn scale_geometry(geometry: &Geometry, center: Point2, factor: f64) -> Option<Geometry> {
    if !factor.is_finite() || factor <= EPSILON {
        debug!("拒绝缩放比例 {}", factor);
        return None;
    }
    Some(transform_geometry(
        geometry,
        &Transform2D::scale_about(center, factor, factor),
    ))
}

pub fn translate_entity(entity: &Entity, delta: Vector2) -> Entity {
    entity.derive(translate_geometry(&entity.geometry, delta))
}

pub fn mirror_entity(entity: &Entity, a: Point2, b: Point2) -> Option<Entity> {
    mirror_geometry(&entity.geometry, a, b).map(|g| entity.derive(g))
}

pub fn rotate_entity(entity: &Entity, center: Point2, angle: f64) -> Entity {
    entity.derive(rotate_geometry(&entity.geometry, center, angle))
}

pub fn scale_entity(entity: &Entity, center: Point2, factor: f64) -> Option<Entity> {
    scale_geometry(&entity.geometry, center, factor).map(|g| entity.derive(g))
}

/// 矩形阵列参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangularArray {
    pub rows: usize,
    pub columns: usize,
    /// 行间距（沿阵列局部 y）
    pub row_spacing: f64,
    /// 列间距（沿阵列局部 x）
    pub column_spacing: f64,
    /// 整个网格的旋转角（弧度）
    pub angle: f64,
}

/// 矩形阵列：返回除 [0,0] 单元（原对象）外的所有副本
pub fn rectangular_array(entities: &[Entity], params: &RectangularArray) -> Vec<Entity> {
    let mut copies = Vec::new();
    for row in 0..params.rows {
        for column in 0..params.columns {
            if row == 0 && column == 0 {
                continue;
            }
            let local = Vector2::new(
                column as f64 * params.column_spacing,
                row as f64 * params.row_spacing,
            );
            let delta = rotate_vector(&local, params.angle);
            copies.extend(entities.iter().map(|e| translate_entity(e, delta)));
        }
    }
    trace!("矩形阵列生成 {} 个副本", copies.len());
    copies
}

/// 环形阵列参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarArray {
    pub center: Point2,
    /// 总项数（含原对象）
    pub count: usize,
    /// 填充角度（弧度），±2π 为整圆
    pub total_angle: f64,
    /// 副本是否随阵列角度自转
    pub rotate_items: bool,
}

impl PolarArray {
    /// 相邻两项之间的角度
    ///
    /// 整圆时首尾项重合，所以按 `count` 等分；否则首尾分别落在两端，按 `count - 1` 等分。
    pub fn step_angle(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        if (self.total_angle.abs() - TAU).abs() <= ANGLE_TOLERANCE {
            self.total_angle / self.count as f64
        } else {
            self.total_angle / (self.count - 1) as f64
        }
    }
}

/// 不自转时用于计算平移量的锚点
fn array_anchor(geometry: &Geometry) -> Point2 {
    match geometry {
        Geometry::XLine(x) => x.base_point,
        Geometry::Ray(r) => r.base_point,
        Geometry::BlockRef(b) => b.insert_point,
        other => other
            .bounding_box()
            .map(|bbox| bbox.center())
            .unwrap_or_else(Point2::origin),
    }
}

/// 环形阵列：返回 `count - 1` 个副本；`count < 2` 时为空
pub fn polar_array(entities: &[Entity], params: &PolarArray) -> Vec<Entity> {
    if params.count < 2 {
        debug!("环形阵列项数 {} < 2，不生成副本", params.count);
        return Vec::new();
    }
    let step = params.step_angle();
    let mut copies = Vec::with_capacity(entities.len() * (params.count - 1));
    for i in 1..params.count {
        let angle = step * i as f64;
        for entity in entities {
            let copy = if params.rotate_items {
                rotate_entity(entity, params.center, angle)
            } else {
                let anchor = array_anchor(&entity.geometry);
                let moved = rotate_point(&anchor, &params.center, angle);
                translate_entity(entity, moved - anchor)
            };
            copies.push(copy);
        }
    }
    trace!("环形阵列生成 {} 个副本，步长 {:.4} rad", copies.len(), step);
    copies
}
