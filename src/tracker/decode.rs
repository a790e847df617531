//! Boundary adapter turning a raw detector output matrix into `Detection`s.
//!
//! This is the only place in the crate that interprets a detector's raw
//! tensor layout; everything downstream of [`decode_detections`] only ever
//! sees [`Detection`].

use ndarray::Array2;

use crate::error::TrackerError;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;

/// Detector output column layout, tagged once at the boundary rather than
/// re-dispatched deep in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorOutput {
    /// 5 columns: `(x1, y1, x2, y2, score)`.
    ScoreOnly,
    /// >= 6 columns: `(x1, y1, x2, y2, objectness, class_conf, ...)`.
    ObjClass,
}

impl DetectorOutput {
    fn from_columns(cols: usize) -> Result<Self, TrackerError> {
        match cols {
            5 => Ok(Self::ScoreOnly),
            c if c >= 6 => Ok(Self::ObjClass),
            c => Err(TrackerError::InvalidInputShape(c)),
        }
    }
}

/// Decode a raw detector output matrix into scale-corrected [`Detection`]s.
///
/// `img_info` is `(original_height, original_width)`; `img_size` is
/// `(target_height, target_width)` the detector ran at. The boxes in
/// `output_results` are divided by `scale = min(img_size.0/img_info.0,
/// img_size.1/img_info.1)` to undo the detector's letterbox resize.
///
/// Rejects a matrix with fewer than 5 columns, a non-finite/non-positive
/// scale, or any row with a non-finite box or score, without constructing
/// any `Detection` from a partially-validated row.
pub fn decode_detections(
    output_results: &Array2<f64>,
    img_info: (f64, f64),
    img_size: (f64, f64),
) -> Result<Vec<Detection>, TrackerError> {
    let (rows, cols) = output_results.dim();
    let layout = DetectorOutput::from_columns(cols)?;

    let scale = (img_size.0 / img_info.0).min(img_size.1 / img_info.1);
    if !scale.is_finite() || scale <= 0.0 {
        return Err(TrackerError::InvalidScale { img_info, img_size });
    }

    let mut detections = Vec::with_capacity(rows);
    for i in 0..rows {
        let x1 = output_results[[i, 0]];
        let y1 = output_results[[i, 1]];
        let x2 = output_results[[i, 2]];
        let y2 = output_results[[i, 3]];
        let score = match layout {
            DetectorOutput::ScoreOnly => output_results[[i, 4]],
            DetectorOutput::ObjClass => output_results[[i, 4]] * output_results[[i, 5]],
        };

        let values = [x1, y1, x2, y2, score];
        if !values.iter().all(|v| v.is_finite()) {
            return Err(TrackerError::NonFiniteDetection {
                index: i,
                detail: format!("{values:?}"),
            });
        }

        let bbox = Rect::from_tlbr(
            (x1 / scale) as f32,
            (y1 / scale) as f32,
            (x2 / scale) as f32,
            (y2 / scale) as f32,
        );
        detections.push(Detection::from_rect(bbox, score as f32));
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_score_only_layout_with_scale_correction() {
        let output = Array2::from_shape_vec(
            (1, 5),
            vec![20.0, 20.0, 120.0, 220.0, 0.9],
        )
        .unwrap();
        let dets = decode_detections(&output, (100.0, 100.0), (50.0, 50.0)).unwrap();
        assert_eq!(dets.len(), 1);
        assert!((dets[0].bbox.x - 10.0).abs() < 1e-6);
        assert!((dets[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn decodes_obj_class_layout_as_product_of_scores() {
        let output =
            Array2::from_shape_vec((1, 6), vec![0.0, 0.0, 10.0, 10.0, 0.8, 0.5]).unwrap();
        let dets = decode_detections(&output, (100.0, 100.0), (100.0, 100.0)).unwrap();
        assert!((dets[0].score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn rejects_too_few_columns() {
        let output = Array2::from_shape_vec((1, 4), vec![0.0, 0.0, 10.0, 10.0]).unwrap();
        let err = decode_detections(&output, (100.0, 100.0), (100.0, 100.0)).unwrap_err();
        assert_eq!(err, TrackerError::InvalidInputShape(4));
    }

    #[test]
    fn rejects_non_finite_row() {
        let output =
            Array2::from_shape_vec((1, 5), vec![0.0, 0.0, 10.0, 10.0, f64::NAN]).unwrap();
        let err = decode_detections(&output, (100.0, 100.0), (100.0, 100.0)).unwrap_err();
        assert!(matches!(err, TrackerError::NonFiniteDetection { index: 0, .. }));
    }

    #[test]
    fn rejects_degenerate_scale() {
        let output = Array2::from_shape_vec((1, 5), vec![0.0, 0.0, 10.0, 10.0, 0.9]).unwrap();
        let err = decode_detections(&output, (0.0, 100.0), (100.0, 100.0)).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidScale { .. }));
    }
}
