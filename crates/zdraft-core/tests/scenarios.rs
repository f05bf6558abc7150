//! 端到端场景：文档 + 编辑算法 + 写时复制

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use zdraft_core::math::{distance, MIN_EXTENT};
use zdraft_core::prelude::*;
use zdraft_core::spline::sample_spline;

fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Entity {
    Entity::new(Geometry::Line(Line::new(Point2::new(x1, y1), Point2::new(x2, y2))))
}

fn close(a: &Point2, x: f64, y: f64) -> bool {
    distance(a, &Point2::new(x, y)) < 1e-9
}

#[test]
fn fillet_two_lines_in_document() {
    let mut doc = Document::new();
    let a = doc.add_entity(line(0.0, 0.0, 10.0, 0.0));
    let b = doc.add_entity(line(10.0, 0.0, 10.0, 10.0));

    let result = fillet_lines(doc.get(a).unwrap(), doc.get(b).unwrap(), 2.0).unwrap();
    let next = doc.apply(&result);

    assert_eq!(doc.len(), 2);
    assert_eq!(next.len(), 3);
    assert!(next.get(a).is_none() && next.get(b).is_none());

    let mut lines = 0;
    for entity in next.entities() {
        match &entity.geometry {
            Geometry::Line(l) => {
                // 两条线都缩短 2
                assert!((l.length() - 8.0).abs() < 1e-9);
                lines += 1;
            }
            Geometry::Arc(arc) => {
                assert!(close(&arc.center, 8.0, 2.0));
                assert!((arc.radius - 2.0).abs() < 1e-9);
                // 与两条线相切
                assert!(close(&arc.start_point(), 8.0, 0.0));
                assert!(close(&arc.end_point(), 10.0, 2.0));
            }
            other => panic!("unexpected {}", other.type_name()),
        }
    }
    assert_eq!(lines, 2);
}

#[test]
fn trim_line_at_cutter() {
    let mut doc = Document::new();
    let target = doc.add_entity(line(0.0, 0.0, 10.0, 0.0));
    doc.add_entity(line(5.0, -5.0, 5.0, 5.0));

    let visible = doc.visible_entities();
    let result = trim_entity(
        doc.get(target).unwrap(),
        Point2::new(2.0, 0.0),
        &visible,
        doc.blocks(),
    )
    .unwrap();
    let next = doc.apply(&result);

    let Geometry::Line(kept) = &next.entities()[1].geometry else {
        panic!("expected line");
    };
    assert!(close(&kept.start, 5.0, 0.0));
    assert!(close(&kept.end, 10.0, 0.0));
}

#[test]
fn mutual_trim_meets_at_intersection() {
    let mut doc = Document::new();
    let h = doc.add_entity(line(0.0, 5.0, 10.0, 5.0));
    let v = doc.add_entity(line(3.0, 0.0, 3.0, 10.0));

    // 先修剪水平线的左段
    let visible = doc.visible_entities();
    let first = trim_entity(doc.get(h).unwrap(), Point2::new(1.0, 5.0), &visible, doc.blocks()).unwrap();
    let doc = doc.apply(&first);
    let h2 = first.add_entities[0].id;

    // 再修剪竖直线的上段，剪切边是修剪后的水平线
    let visible = doc.visible_entities();
    let second = trim_entity(doc.get(v).unwrap(), Point2::new(3.0, 1.0), &visible, doc.blocks()).unwrap();
    let doc = doc.apply(&second);

    let Geometry::Line(horizontal) = &doc.get(h2).unwrap().geometry else {
        panic!("expected line");
    };
    let Geometry::Line(vertical) = &second.add_entities[0].geometry else {
        panic!("expected line");
    };
    assert!(close(&horizontal.start, 3.0, 5.0));
    assert!(close(&vertical.start, 3.0, 5.0));
}

#[test]
fn mirror_twice_is_identity() {
    let shapes = vec![
        line(1.0, 2.0, 7.0, -3.0),
        Entity::new(Geometry::Arc(Arc::new(Point2::new(2.0, 1.0), 3.0, 0.3, 2.2))),
        Entity::new(Geometry::Polyline(Polyline::new(
            vec![Point2::new(0.0, 0.0), Point2::new(4.0, 1.0), Point2::new(2.0, 5.0)],
            true,
        ))),
        Entity::new(Geometry::Ellipse(Ellipse::new(Point2::new(-2.0, 4.0), 5.0, 2.0, 0.4))),
    ];
    let a = Point2::new(-1.0, -1.0);
    let b = Point2::new(3.0, 5.0);

    for shape in &shapes {
        let once = mirror_entity(shape, a, b).unwrap();
        let twice = mirror_entity(&once, a, b).unwrap();
        assert!(
            twice.geometry.approx_eq(&shape.geometry, 1e-9),
            "{} changed after two mirrors",
            shape.geometry.type_name()
        );
    }
}

#[test]
fn rotate_round_trip_and_full_turn() {
    let circle = Entity::new(Geometry::Circle(Circle::new(Point2::new(4.0, 1.0), 2.0)));
    let center = Point2::new(-3.0, 2.0);

    let there = rotate_entity(&circle, center, 0.7);
    let back = rotate_entity(&there, center, -0.7);
    assert!(back.geometry.approx_eq(&circle.geometry, 1e-9));

    let full = rotate_entity(&circle, center, TAU);
    assert!(full.geometry.approx_eq(&circle.geometry, 1e-9));
}

#[test]
fn rotated_rectangle_becomes_polyline() {
    let rect = Entity::new(Geometry::Rectangle(Rectangle::new(Point2::origin(), 4.0, 2.0)));
    let tilted = rotate_entity(&rect, Point2::origin(), PI / 6.0);
    assert!(matches!(&tilted.geometry, Geometry::Polyline(p) if p.closed && p.points.len() == 4));

    let quarter = rotate_entity(&rect, Point2::origin(), FRAC_PI_2);
    assert!(matches!(quarter.geometry, Geometry::Rectangle(_)));
}

#[test]
fn circle_offset_both_ways() {
    let circle = Entity::new(Geometry::Circle(Circle::new(Point2::origin(), 5.0)));
    let radius_of = |e: &Entity| match &e.geometry {
        Geometry::Circle(c) => c.radius,
        _ => panic!("expected circle"),
    };

    let out = offset_entity(&circle, 1.5, Point2::new(20.0, 0.0)).unwrap();
    assert!((radius_of(&out) - 6.5).abs() < 1e-9);
    let inward = offset_entity(&circle, 1.5, Point2::new(0.5, 0.0)).unwrap();
    assert!((radius_of(&inward) - 3.5).abs() < 1e-9);
    let clamped = offset_entity(&circle, 9.0, Point2::new(0.5, 0.0)).unwrap();
    assert!((radius_of(&clamped) - MIN_EXTENT).abs() < 1e-12);
}

#[test]
fn polar_array_full_circle() {
    let dot = Entity::new(Geometry::Circle(Circle::new(Point2::new(10.0, 0.0), 1.0)));
    let params = PolarArray {
        center: Point2::origin(),
        count: 6,
        total_angle: TAU,
        rotate_items: true,
    };
    let copies = polar_array(std::slice::from_ref(&dot), &params);
    assert_eq!(copies.len(), 5);
    for (k, copy) in copies.iter().enumerate() {
        let Geometry::Circle(c) = &copy.geometry else {
            panic!("expected circle");
        };
        let angle = (k + 1) as f64 * TAU / 6.0;
        assert!(close(&c.center, 10.0 * angle.cos(), 10.0 * angle.sin()));
        assert_ne!(copy.id, dot.id);
    }
}

#[test]
fn snap_only_within_tolerance() {
    let settings = KernelSettings::default();
    let mut engine = SnapEngine::new(settings.snap.clone(), settings.grid.clone());
    let doc = {
        let mut doc = Document::new();
        doc.add_entity(line(0.0, 0.0, 10.0, 0.0));
        doc.add_entity(Entity::new(Geometry::Circle(Circle::new(Point2::new(30.0, 0.0), 4.0))));
        doc
    };
    let visible = doc.visible_entities();

    let hit = engine
        .find_snap_point(Point2::new(30.3, 0.2), &visible, doc.blocks(), 1.0, None)
        .unwrap();
    assert_eq!(hit.snap_type, SnapType::Center);
    assert!(hit.distance <= 1.0);

    assert!(engine
        .find_snap_point(Point2::new(20.0, 7.0), &visible, doc.blocks(), 1.0, None)
        .is_none());
}

#[test]
fn spline_is_continuous_and_interpolates_ends() {
    let spline = Spline::new(
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 8.0),
            Point2::new(6.0, -4.0),
            Point2::new(9.0, 5.0),
            Point2::new(12.0, 0.0),
        ],
        3,
        false,
    );
    let samples = sample_spline(&spline);
    assert!(close(&samples[0], 0.0, 0.0));
    assert!(close(samples.last().unwrap(), 12.0, 0.0));
    // 相邻采样点距离有界
    let max_step = samples
        .windows(2)
        .map(|w| distance(&w[0], &w[1]))
        .fold(0.0, f64::max);
    assert!(max_step < 2.0);
}

#[test]
fn exploded_block_matches_instances() {
    let mut doc = Document::new();
    let block_id = doc.add_block(BlockDefinition::new(
        "frame",
        Point2::new(1.0, 1.0),
        vec![line(1.0, 1.0, 5.0, 1.0), Entity::new(Geometry::Circle(Circle::new(Point2::new(3.0, 3.0), 1.0)))],
    ));
    let reference = doc.add_entity(Entity::new(Geometry::BlockRef(
        BlockRef::new(block_id, Point2::new(20.0, 20.0))
            .with_scale(2.0, 2.0)
            .with_rotation(FRAC_PI_2),
    )));

    let Geometry::BlockRef(block_ref) = &doc.get(reference).unwrap().geometry else {
        panic!("expected block reference");
    };
    let instances = instantiate(block_ref, doc.blocks());
    let result = doc.explode_block_ref(reference).unwrap();
    assert_eq!(instances.len(), result.add_entities.len());
    for (instance, exploded) in instances.iter().zip(&result.add_entities) {
        assert!(instance.geometry.approx_eq(&exploded.geometry, 1e-9));
    }
}
