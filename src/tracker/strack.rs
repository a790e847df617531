//! Single object track (STrack) for multi-object tracking.

use ndarray::{Array1, Array2};

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Tracker-instance-local source of unique track ids.
///
/// Each [`crate::tracker::BYTETracker`] owns one of these instead of a
/// process-wide counter, so two trackers running concurrently (e.g. one per
/// camera) never collide on ids, and a freshly constructed tracker always
/// starts back at id 1.
#[derive(Debug, Clone, Default)]
pub struct TrackIdCounter(u64);

impl TrackIdCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// Single object track.
#[derive(Debug, Clone)]
pub struct STrack {
    /// Unique track identifier
    pub track_id: u64,
    /// Current track state
    pub state: TrackState,
    /// Whether the track has been activated (confirmed)
    pub is_activated: bool,
    /// Detection confidence score
    pub score: f32,
    /// Current frame ID
    pub frame_id: u32,
    /// Frame ID when track was started
    pub start_frame: u32,
    /// Number of frames since track was last (re-)activated
    pub tracklet_len: u32,
    /// Kalman filter state mean (8-dim)
    pub mean: Option<Array1<f64>>,
    /// Kalman filter state covariance (8x8)
    pub covariance: Option<Array2<f64>>,
    /// Original detection bounding box (TLWH format)
    pub tlwh: Rect,
    /// Reserved for multi-camera fusion; carried but not used by the core
    /// tracking algorithm.
    pub location: (f64, f64),
}

impl STrack {
    /// Create a new STrack from a detection.
    pub fn new(tlwh: Rect, score: f32) -> Self {
        Self {
            track_id: 0,
            state: TrackState::New,
            is_activated: false,
            score,
            frame_id: 0,
            start_frame: 0,
            tracklet_len: 0,
            mean: None,
            covariance: None,
            tlwh,
            location: (f64::INFINITY, f64::INFINITY),
        }
    }

    /// Get the current bounding box in TLWH format.
    pub fn tlwh(&self) -> Rect {
        match &self.mean {
            Some(mean) => {
                let cx = mean[0] as f32;
                let cy = mean[1] as f32;
                let aspect = mean[2] as f32;
                let h = mean[3] as f32;
                Rect::from_xyah(cx, cy, aspect, h)
            }
            None => self.tlwh,
        }
    }

    pub fn rect(&self) -> Rect {
        self.tlwh()
    }

    pub fn end_frame(&self) -> u32 {
        self.frame_id
    }

    pub fn activate(
        &mut self,
        kalman_filter: &KalmanFilter,
        frame_id: u32,
        id_counter: &mut TrackIdCounter,
    ) {
        self.track_id = id_counter.next();

        let xyah = self.tlwh.to_xyah();
        let xyah_f64 = [
            xyah[0] as f64,
            xyah[1] as f64,
            xyah[2] as f64,
            xyah[3] as f64,
        ];
        let (mean, covariance) = kalman_filter.initiate(xyah_f64);

        self.mean = Some(mean);
        self.covariance = Some(covariance);
        self.tracklet_len = 0;
        self.state = TrackState::Tracked;

        if frame_id == 1 {
            self.is_activated = true;
        }

        self.frame_id = frame_id;
        self.start_frame = frame_id;

        log::debug!("track {} activated at frame {}", self.track_id, frame_id);
    }

    pub fn re_activate(
        &mut self,
        new_track: &STrack,
        kalman_filter: &KalmanFilter,
        frame_id: u32,
        new_id: bool,
        id_counter: &mut TrackIdCounter,
    ) {
        let xyah = new_track.tlwh.to_xyah();
        let xyah_f64 = [
            xyah[0] as f64,
            xyah[1] as f64,
            xyah[2] as f64,
            xyah[3] as f64,
        ];

        if let (Some(mean), Some(cov)) = (&self.mean, &self.covariance) {
            match kalman_filter.update(mean, cov, xyah_f64) {
                Ok((new_mean, new_cov)) => {
                    self.mean = Some(new_mean);
                    self.covariance = Some(new_cov);
                }
                Err(err) => {
                    log::warn!(
                        "kalman re-activation update failed for track {}: {err}; keeping prior geometry",
                        self.track_id
                    );
                }
            }
        }

        self.tracklet_len = 0;
        self.state = TrackState::Tracked;
        self.is_activated = true;
        self.frame_id = frame_id;
        self.score = new_track.score;

        if new_id {
            self.track_id = id_counter.next();
        }

        log::debug!("track {} re-activated at frame {}", self.track_id, frame_id);
    }

    pub fn update(&mut self, new_track: &STrack, kalman_filter: &KalmanFilter, frame_id: u32) {
        self.frame_id = frame_id;
        self.tracklet_len += 1;

        let xyah = new_track.tlwh.to_xyah();
        let xyah_f64 = [
            xyah[0] as f64,
            xyah[1] as f64,
            xyah[2] as f64,
            xyah[3] as f64,
        ];

        if let (Some(mean), Some(cov)) = (&self.mean, &self.covariance) {
            match kalman_filter.update(mean, cov, xyah_f64) {
                Ok((new_mean, new_cov)) => {
                    self.mean = Some(new_mean);
                    self.covariance = Some(new_cov);
                }
                Err(err) => {
                    log::warn!(
                        "kalman update failed for track {}: {err}; keeping prior geometry",
                        self.track_id
                    );
                }
            }
        }

        self.state = TrackState::Tracked;
        self.is_activated = true;
        self.score = new_track.score;
    }

    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        if let (Some(mean), Some(cov)) = (&self.mean, &self.covariance) {
            let mut mean_to_predict = mean.clone();
            if self.state != TrackState::Tracked {
                mean_to_predict[7] = 0.0;
            }
            let (new_mean, new_cov) = kalman_filter.predict(&mean_to_predict, cov);
            self.mean = Some(new_mean);
            self.covariance = Some(new_cov);
        }
    }

    pub fn mark_lost(&mut self) {
        self.state = TrackState::Lost;
        log::debug!("track {} lost at frame {}", self.track_id, self.frame_id);
    }

    pub fn mark_removed(&mut self) {
        self.state = TrackState::Removed;
        log::debug!("track {} removed at frame {}", self.track_id, self.frame_id);
    }

    /// Batched prediction over a slice of tracks: applies the per-track
    /// `vh`-zeroing rule for non-`Tracked` states, then routes the motion
    /// step through [`KalmanFilter::multi_predict`] instead of looping calls
    /// to [`Self::predict`] one at a time.
    pub fn multi_predict(stracks: &mut [STrack], kalman_filter: &KalmanFilter) {
        let indices: Vec<usize> = (0..stracks.len())
            .filter(|&i| stracks[i].mean.is_some())
            .collect();
        if indices.is_empty() {
            return;
        }

        let means: Vec<Array1<f64>> = indices
            .iter()
            .map(|&i| {
                let mut mean = stracks[i].mean.as_ref().unwrap().clone();
                if stracks[i].state != TrackState::Tracked {
                    mean[7] = 0.0;
                }
                mean
            })
            .collect();
        let covs: Vec<Array2<f64>> = indices
            .iter()
            .map(|&i| stracks[i].covariance.as_ref().unwrap().clone())
            .collect();

        let (new_means, new_covs) = kalman_filter.multi_predict(&means, &covs);

        for (k, &i) in indices.iter().enumerate() {
            stracks[i].mean = Some(new_means[k].clone());
            stracks[i].covariance = Some(new_covs[k].clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_counter_is_instance_local_and_monotonic() {
        let mut a = TrackIdCounter::new();
        let mut b = TrackIdCounter::new();
        assert_eq!(a.next(), 1);
        assert_eq!(a.next(), 2);
        assert_eq!(b.next(), 1);
    }

    #[test]
    fn activate_sets_is_activated_only_on_frame_one() {
        let kf = KalmanFilter::new();
        let mut counter = TrackIdCounter::new();
        let mut track = STrack::new(Rect::new(0.0, 0.0, 10.0, 20.0), 0.9);
        track.activate(&kf, 3, &mut counter);
        assert!(!track.is_activated);

        let mut track2 = STrack::new(Rect::new(0.0, 0.0, 10.0, 20.0), 0.9);
        track2.activate(&kf, 1, &mut counter);
        assert!(track2.is_activated);
    }

    #[test]
    fn multi_predict_matches_single_predict() {
        let kf = KalmanFilter::new();
        let mut counter = TrackIdCounter::new();
        let mut t1 = STrack::new(Rect::new(0.0, 0.0, 10.0, 20.0), 0.9);
        t1.activate(&kf, 1, &mut counter);
        let mut t2 = STrack::new(Rect::new(50.0, 50.0, 30.0, 40.0), 0.8);
        t2.activate(&kf, 1, &mut counter);

        let mut expected = t1.clone();
        expected.predict(&kf);

        let mut batch = vec![t1, t2];
        STrack::multi_predict(&mut batch, &kf);

        assert_eq!(batch[0].mean, expected.mean);
    }
}
