//! Error types for the tracker and its Kalman filter.

use thiserror::Error;

/// Errors surfaced by [`crate::tracker::TrackerConfig`] validation and by
/// [`crate::tracker::BYTETracker::update`] / the detection decode boundary.
///
/// These are all structural: the caller gets an `Err` and the tracker's
/// internal lists are left untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackerError {
    #[error("invalid track_thresh {0}: must be finite and in (0, 1]")]
    InvalidTrackThresh(f32),

    #[error("invalid match_thresh {0}: must be finite and in (0, 1]")]
    InvalidMatchThresh(f32),

    #[error("invalid track_buffer {0}: must be greater than zero")]
    InvalidTrackBuffer(u32),

    #[error("invalid frame_rate {0}: must be finite and greater than zero")]
    InvalidFrameRate(f32),

    #[error("detection matrix has {0} columns, need at least 5 (x1,y1,x2,y2,score)")]
    InvalidInputShape(usize),

    #[error(
        "invalid image scale: img_info={img_info:?}, img_size={img_size:?} yields a non-finite or non-positive scale factor"
    )]
    InvalidScale {
        img_info: (f64, f64),
        img_size: (f64, f64),
    },

    #[error("detection {index} has a non-finite box or score: {detail}")]
    NonFiniteDetection { index: usize, detail: String },
}

/// Errors local to the Kalman filter. Numerical failures here are recovered
/// per-track by the caller (see [`crate::tracker::STrack::update`]); they
/// never propagate out of [`crate::tracker::BYTETracker::update`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KalmanError {
    #[error("non-finite value in kalman measurement or state")]
    NonFiniteState,

    #[error("projected covariance is not positive definite; cholesky factorization failed")]
    NonPositiveDefinite,

    #[error("unknown gating metric: {0:?}")]
    UnknownMetric(String),
}
