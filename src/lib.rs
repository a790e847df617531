//! A Rust implementation of the ByteTrack multi-object tracking algorithm.
//!
//! ByteTrack associates per-frame object detections into persistent
//! identities using a two-stage cascade: high-confidence detections are
//! matched first, then leftover tracks get a second chance against
//! low-confidence detections that would otherwise be discarded. Box motion
//! is predicted between frames with a constant-velocity Kalman filter.
//!
//! The core pipeline lives in [`tracker`]; [`integration`] wires an
//! arbitrary detection backend to it.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{KalmanError, TrackerError};
pub use tracker::{BYTETracker, Detection, STrack, TrackerConfig};
