use sketch_solver::builder;
use sketch_solver::{ConstraintKind, Sketch};
use test_harness::{sample_sketch, SketchReport, SketchWorkbench};

#[test]
fn sample_report_counts() {
    let sample = sample_sketch().unwrap();
    let report = SketchReport::from_sketch(&sample.sketch).unwrap();

    assert_eq!(report.point_count, 14);
    assert_eq!(report.segment_count, 5);
    assert_eq!(report.circle_count, 2);
    assert_eq!(report.param_count, 30);
    assert_eq!(report.constraint_entries.len(), 17);
    assert_eq!(report.constraint_entries[0].kind, ConstraintKind::Fix);
    assert!(report.total_error() > 0.0);
}

#[test]
fn unsatisfied_is_worst_first() {
    let sample = sample_sketch().unwrap();
    let report = SketchReport::from_sketch(&sample.sketch).unwrap();

    let open = report.unsatisfied(1e-6);
    assert!(!open.is_empty());
    assert!(open.windows(2).all(|w| w[0].residual >= w[1].residual));
    // The origin fix holds from the start.
    assert!(open.iter().all(|e| e.kind != ConstraintKind::Fix));
}

#[test]
fn fresh_rect_has_nothing_unsatisfied() {
    let mut sketch = Sketch::new();
    builder::add_rect(&mut sketch, 10.0, 10.0, 80.0, 120.0);
    let report = SketchReport::from_sketch(&sketch).unwrap();

    assert_eq!(report.constraint_entries.len(), 8);
    assert_eq!(report.total_error(), 0.0);
    assert!(report.unsatisfied(1e-12).is_empty());
}

#[test]
fn text_lists_constraints_and_oracles() {
    let mut w = SketchWorkbench::new();
    w.circle("c", 0.0, 0.0, 5.0).unwrap();
    w.point("p", 9.0, 0.0).unwrap();
    w.point_on_circle("p", "c").unwrap();

    let text = w.report().unwrap().to_text();
    assert!(text.starts_with("=== Sketch Report ===\n"));
    assert!(text.contains("Geometry: 2 points, 0 segments, 1 circles (5 params)"));
    assert!(text.contains("point_on_circle"));
    assert!(text.contains("[PASS] references"));
    assert!(text.contains("[PASS] finite_params"));
    assert_eq!(format!("{}", w.report().unwrap()), text);
}
