mod byte_tracker;
mod decode;
mod kalman_filter;
mod matching;
mod rect;
mod strack;
mod track_state;

pub use byte_tracker::{BYTETracker, TrackerConfig};
pub use kalman_filter::{GatingMetric, KalmanFilter};
pub use matching::Detection;
pub use rect::Rect;
pub use strack::{STrack, TrackIdCounter};
pub use track_state::TrackState;
