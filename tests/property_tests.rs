//! Property-based tests covering the core tracking invariants: geometry,
//! assignment, Kalman round-trips and id uniqueness under arbitrary inputs.

use bytetrack_rs::tracker::{GatingMetric, KalmanFilter, Rect};
use bytetrack_rs::{BYTETracker, Detection, TrackerConfig};
use proptest::prelude::*;

fn box_strategy() -> impl Strategy<Value = (f32, f32, f32, f32)> {
    (0.0f32..500.0, 0.0f32..500.0, 1.0f32..200.0, 1.0f32..200.0)
        .prop_map(|(x, y, w, h)| (x, y, x + w, y + h))
}

// ============================================================================
// Geometry (IoU)
// ============================================================================

#[test]
fn proptest_iou_is_bounded_and_symmetric() {
    proptest!(|(a in box_strategy(), b in box_strategy())| {
        let rect_a = Rect::from_tlbr(a.0, a.1, a.2, a.3);
        let rect_b = Rect::from_tlbr(b.0, b.1, b.2, b.3);

        let iou_ab = rect_a.iou(&rect_b);
        let iou_ba = rect_b.iou(&rect_a);

        prop_assert!((0.0..=1.0).contains(&iou_ab));
        prop_assert!((iou_ab - iou_ba).abs() < 1e-6);
    });
}

#[test]
fn proptest_iou_diagonal_is_one() {
    proptest!(|(a in box_strategy())| {
        let rect = Rect::from_tlbr(a.0, a.1, a.2, a.3);
        prop_assert!((rect.iou(&rect) - 1.0).abs() < 1e-5);
    });
}

#[test]
fn proptest_tlwh_tlbr_round_trip() {
    proptest!(|(a in box_strategy())| {
        let rect = Rect::from_tlbr(a.0, a.1, a.2, a.3);
        let tlbr = rect.to_tlbr();
        let round_tripped = Rect::from_tlbr(tlbr[0], tlbr[1], tlbr[2], tlbr[3]);
        prop_assert!((rect.x - round_tripped.x).abs() < 1e-4);
        prop_assert!((rect.y - round_tripped.y).abs() < 1e-4);
        prop_assert!((rect.width - round_tripped.width).abs() < 1e-4);
        prop_assert!((rect.height - round_tripped.height).abs() < 1e-4);
    });
}

// ============================================================================
// Kalman filter round-trips
// ============================================================================

#[test]
fn proptest_initiate_then_project_returns_measurement() {
    proptest!(|(cx in -1000.0f64..1000.0, cy in -1000.0f64..1000.0, a in 0.1f64..3.0, h in 1.0f64..500.0)| {
        let kf = KalmanFilter::new();
        let measurement = [cx, cy, a, h];
        let (mean, cov) = kf.initiate(measurement);
        let (projected_mean, _) = kf.project(&mean, &cov);
        for i in 0..4 {
            prop_assert!((projected_mean[i] - measurement[i]).abs() < 1e-6);
        }
    });
}

#[test]
fn proptest_predict_then_update_recovers_projected_mean() {
    proptest!(|(cx in -1000.0f64..1000.0, cy in -1000.0f64..1000.0, a in 0.1f64..3.0, h in 1.0f64..500.0)| {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([cx, cy, a, h]);
        let (pred_mean, pred_cov) = kf.predict(&mean, &cov);
        let (projected_mean, _) = kf.project(&pred_mean, &pred_cov);
        let z = [projected_mean[0], projected_mean[1], projected_mean[2], projected_mean[3]];
        let updated = kf.update(&pred_mean, &pred_cov, z);
        prop_assert!(updated.is_ok());
        let (updated_mean, _) = updated.unwrap();
        for i in 0..4 {
            prop_assert!((updated_mean[i] - pred_mean[i]).abs() < 1e-4);
        }
    });
}

#[test]
fn proptest_gating_distance_never_negative() {
    proptest!(|(cx in -1000.0f64..1000.0, cy in -1000.0f64..1000.0, a in 0.1f64..3.0, h in 1.0f64..500.0)| {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([cx, cy, a, h]);
        let measurements = ndarray::Array2::from_shape_vec((1, 4), vec![cx + 1.0, cy - 1.0, a, h]).unwrap();
        let gaussian = kf.gating_distance(&mean, &cov, &measurements, false, GatingMetric::Gaussian).unwrap();
        let maha = kf.gating_distance(&mean, &cov, &measurements, false, GatingMetric::Mahalanobis).unwrap();
        prop_assert!(gaussian[0] >= 0.0);
        prop_assert!(maha[0] >= 0.0);
    });
}

// ============================================================================
// Tracker-level invariants
// ============================================================================

#[test]
fn proptest_track_ids_are_unique_and_positive() {
    proptest!(|(scores in prop::collection::vec(0.2f32..1.0, 1..6))| {
        let mut tracker = BYTETracker::new(TrackerConfig::default()).unwrap();
        let detections: Vec<Detection> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| {
                let x = i as f32 * 300.0;
                Detection::new(x, 0.0, x + 100.0, 100.0, score)
            })
            .collect();

        let tracks = tracker.update(detections).unwrap();
        let mut ids: Vec<u64> = tracks.iter().map(|t| t.track_id).collect();
        ids.sort_unstable();
        let mut unique = ids.clone();
        unique.dedup();
        prop_assert_eq!(ids.len(), unique.len());
        prop_assert!(ids.iter().all(|&id| id > 0));
    });
}

#[test]
fn proptest_update_is_deterministic() {
    proptest!(|(scores in prop::collection::vec(0.2f32..1.0, 1..4))| {
        let detections: Vec<Detection> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| {
                let x = i as f32 * 300.0;
                Detection::new(x, 0.0, x + 100.0, 100.0, score)
            })
            .collect();

        let mut tracker_a = BYTETracker::new(TrackerConfig::default()).unwrap();
        let mut tracker_b = BYTETracker::new(TrackerConfig::default()).unwrap();

        let result_a = tracker_a.update(detections.clone()).unwrap();
        let result_b = tracker_b.update(detections).unwrap();

        let ids_a: Vec<u64> = result_a.iter().map(|t| t.track_id).collect();
        let ids_b: Vec<u64> = result_b.iter().map(|t| t.track_id).collect();
        prop_assert_eq!(ids_a, ids_b);
    });
}
