//! 样条求值
//!
//! 两种求值器共同支撑 `Spline` 图元：
//! - 均匀 B 样条（De Boor 算法）：开放样条使用夹紧节点向量，闭合样条回绕控制点
//! - Catmull–Rom 插值：控制点较少时用于渲染、预览与命中测试
//!
//! 渲染、命中测试、求交都使用同一份采样结果。

use crate::geometry::Spline;
use crate::math::{Point2, Vector2, EPSILON};

/// Catmull–Rom 每段采样数
pub const CATMULL_ROM_SAMPLES: usize = 16;

/// B 样条每个控制点对应的采样数
pub const BSPLINE_SAMPLES_PER_POINT: usize = 16;

/// 少于该数量的控制点使用 Catmull–Rom
pub const MIN_BSPLINE_POINTS: usize = 4;

/// 实际使用的阶数：不超过控制点数 - 1，至少为 1
pub fn effective_degree(point_count: usize, degree: usize) -> usize {
    degree.clamp(1, point_count.saturating_sub(1).max(1))
}

/// 夹紧节点向量，定义域 [0, 1]
pub fn clamped_knots(point_count: usize, degree: usize) -> Vec<f64> {
    let n = point_count;
    let p = degree;
    let interior = n.saturating_sub(p + 1);
    let mut knots = Vec::with_capacity(n + p + 1);
    knots.extend(std::iter::repeat(0.0).take(p + 1));
    for i in 1..=interior {
        knots.push(i as f64 / (interior + 1) as f64);
    }
    knots.extend(std::iter::repeat(1.0).take(p + 1));
    knots
}

/// 均匀节点向量 0, 1, 2, ...
pub fn uniform_knots(count: usize) -> Vec<f64> {
    (0..count).map(|i| i as f64).collect()
}

/// 查找参数 t 所在的节点区间 [knots[k], knots[k+1])
fn find_span(knots: &[f64], degree: usize, point_count: usize, t: f64) -> usize {
    let last = point_count - 1;
    if t >= knots[point_count] {
        return last;
    }
    let mut span = degree;
    while span < last && knots[span + 1] <= t {
        span += 1;
    }
    span
}

/// De Boor 算法
///
/// 要求 `knots.len() == points.len() + degree + 1` 且 `points.len() > degree`。
pub fn de_boor(points: &[Point2], degree: usize, knots: &[f64], t: f64) -> Point2 {
    let p = degree;
    let k = find_span(knots, p, points.len(), t);

    let mut d: Vec<Point2> = (0..=p).map(|j| points[j + k - p]).collect();

    for r in 1..=p {
        for j in (r..=p).rev() {
            let i = j + k - p;
            let denom = knots[i + p - r + 1] - knots[i];
            let alpha = if denom.abs() < EPSILON {
                0.0
            } else {
                (t - knots[i]) / denom
            };
            d[j] = d[j - 1] + (d[j] - d[j - 1]) * alpha;
        }
    }

    d[p]
}

/// 在归一化参数 u ∈ [0, 1] 处求 B 样条上的点
pub fn evaluate_bspline(points: &[Point2], degree: usize, closed: bool, u: f64) -> Option<Point2> {
    let n = points.len();
    match n {
        0 => return None,
        1 => return Some(points[0]),
        _ => {}
    }
    let p = effective_degree(n, degree);
    let u = u.clamp(0.0, 1.0);

    if closed {
        // 回绕前 p 个控制点，使用均匀节点向量，定义域 [p, n+p]
        let wrapped: Vec<Point2> = points.iter().chain(points.iter().take(p)).copied().collect();
        let knots = uniform_knots(wrapped.len() + p + 1);
        let t = p as f64 + u * n as f64;
        Some(de_boor(&wrapped, p, &knots, t))
    } else {
        let knots = clamped_knots(n, p);
        Some(de_boor(points, p, &knots, u))
    }
}

/// 等参数采样 B 样条
pub fn sample_bspline(points: &[Point2], degree: usize, closed: bool, samples: usize) -> Vec<Point2> {
    if points.len() < 2 || samples == 0 {
        return points.to_vec();
    }
    (0..=samples)
        .filter_map(|i| evaluate_bspline(points, degree, closed, i as f64 / samples as f64))
        .collect()
}

/// Catmull–Rom 单段求值，t ∈ [0, 1] 从 p1 到 p2
pub fn catmull_rom_point(p0: &Point2, p1: &Point2, p2: &Point2, p3: &Point2, t: f64) -> Point2 {
    let t2 = t * t;
    let t3 = t2 * t;
    let v0 = p0.coords;
    let v1 = p1.coords;
    let v2 = p2.coords;
    let v3 = p3.coords;

    let v: Vector2 = (v1 * 2.0
        + (v2 - v0) * t
        + (v0 * 2.0 - v1 * 5.0 + v2 * 4.0 - v3) * t2
        + (-v0 + v1 * 3.0 - v2 * 3.0 + v3) * t3)
        * 0.5;
    Point2::from(v)
}

/// Catmull–Rom 插值采样
///
/// 开放曲线复制首尾点补齐窗口，闭合曲线回绕。
pub fn catmull_rom(points: &[Point2], closed: bool, samples_per_segment: usize) -> Vec<Point2> {
    let n = points.len();
    if n < 2 || samples_per_segment == 0 {
        return points.to_vec();
    }

    let padded: Vec<Point2> = if closed {
        std::iter::once(points[n - 1])
            .chain(points.iter().copied())
            .chain([points[0], points[1 % n]])
            .collect()
    } else {
        std::iter::once(points[0])
            .chain(points.iter().copied())
            .chain(std::iter::once(points[n - 1]))
            .collect()
    };

    let segments = if closed { n } else { n - 1 };
    let mut result = Vec::with_capacity(segments * samples_per_segment + 1);
    for i in 0..segments {
        let (p0, p1, p2, p3) = (&padded[i], &padded[i + 1], &padded[i + 2], &padded[i + 3]);
        for s in 0..samples_per_segment {
            let t = s as f64 / samples_per_segment as f64;
            result.push(catmull_rom_point(p0, p1, p2, p3, t));
        }
    }
    result.push(if closed { points[0] } else { points[n - 1] });
    result
}

/// 样条的密集采样
pub fn sample_spline(spline: &Spline) -> Vec<Point2> {
    let points = &spline.control_points;
    if points.len() < MIN_BSPLINE_POINTS {
        catmull_rom(points, spline.closed, CATMULL_ROM_SAMPLES)
    } else {
        sample_bspline(
            points,
            spline.degree,
            spline.closed,
            BSPLINE_SAMPLES_PER_POINT * points.len(),
        )
    }
}

/// 修改单个控制点，返回新样条；整条曲线按需重新求值
pub fn edit_control_point(spline: &Spline, index: usize, point: Point2) -> Option<Spline> {
    if index >= spline.control_points.len() {
        return None;
    }
    let mut edited = spline.clone();
    edited.control_points[index] = point;
    Some(edited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::distance;

    fn wave() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(20.0, -10.0),
            Point2::new(30.0, 10.0),
            Point2::new(40.0, 0.0),
        ]
    }

    #[test]
    fn test_clamped_knots_shape() {
        let knots = clamped_knots(5, 3);
        assert_eq!(knots.len(), 9);
        assert_eq!(&knots[..4], &[0.0; 4]);
        assert_eq!(&knots[5..], &[1.0; 4]);
        assert!((knots[4] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_open_bspline_interpolates_ends() {
        let pts = wave();
        let first = evaluate_bspline(&pts, 3, false, 0.0).unwrap();
        let last = evaluate_bspline(&pts, 3, false, 1.0).unwrap();
        assert!(distance(&first, &pts[0]) < 1e-9);
        assert!(distance(&last, &pts[4]) < 1e-9);
    }

    #[test]
    fn test_degree_is_clamped() {
        // 3 个点、请求 5 阶 => 二次 Bézier
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 20.0),
            Point2::new(20.0, 0.0),
        ];
        let mid = evaluate_bspline(&pts, 5, false, 0.5).unwrap();
        assert!((mid.x - 10.0).abs() < 1e-9);
        assert!((mid.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_closed_bspline_is_periodic() {
        let pts = wave();
        let start = evaluate_bspline(&pts, 3, true, 0.0).unwrap();
        let end = evaluate_bspline(&pts, 3, true, 1.0).unwrap();
        assert!(distance(&start, &end) < 1e-9);
    }

    #[test]
    fn test_sampling_is_continuous() {
        let spline = Spline::new(wave(), 3, false);
        let samples = sample_spline(&spline);
        assert_eq!(samples.len(), BSPLINE_SAMPLES_PER_POINT * 5 + 1);
        let max_gap = samples
            .windows(2)
            .map(|w| distance(&w[0], &w[1]))
            .fold(0.0, f64::max);
        assert!(max_gap < 2.0, "max gap {max_gap}");
        assert!(distance(&samples[0], &spline.control_points[0]) < 1e-9);
        assert!(distance(samples.last().unwrap(), &spline.control_points[4]) < 1e-9);
    }

    #[test]
    fn test_catmull_rom_passes_through_points() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 5.0),
            Point2::new(20.0, 0.0),
        ];
        let spline = Spline::new(pts.clone(), 3, false);
        let samples = sample_spline(&spline);
        assert_eq!(samples.len(), 2 * CATMULL_ROM_SAMPLES + 1);
        assert!(distance(&samples[0], &pts[0]) < EPSILON);
        assert!(distance(&samples[CATMULL_ROM_SAMPLES], &pts[1]) < EPSILON);
        assert!(distance(samples.last().unwrap(), &pts[2]) < EPSILON);
    }

    #[test]
    fn test_closed_catmull_rom_returns_to_start() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, 8.0),
        ];
        let samples = catmull_rom(&pts, true, 8);
        assert_eq!(samples.len(), 3 * 8 + 1);
        assert!(distance(&samples[0], samples.last().unwrap()) < EPSILON);
    }

    #[test]
    fn test_edit_control_point_is_copy_on_write() {
        let spline = Spline::new(wave(), 3, false);
        let edited = edit_control_point(&spline, 2, Point2::new(20.0, 30.0)).unwrap();
        assert_eq!(spline.control_points[2], Point2::new(20.0, -10.0));
        assert_eq!(edited.control_points[2], Point2::new(20.0, 30.0));
        assert!(edit_control_point(&spline, 9, Point2::origin()).is_none());
    }
}
