//! Kalman filter for bounding box tracking using ndarray, with a
//! Cholesky-based correction step for numerical stability.

use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::error::KalmanError;

/// Distance metric used by [`KalmanFilter::gating_distance`].
///
/// A typed enum rather than a string, so invalid metrics are a compile-time
/// impossibility at call sites that construct one directly. Callers that
/// receive the metric as configuration data (e.g. a string) go through
/// [`TryFrom<&str>`], which is where the "unknown metric" error actually
/// surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatingMetric {
    /// Squared Euclidean distance in projected (measurement) space.
    Gaussian,
    /// Squared Mahalanobis distance using the projected covariance.
    Mahalanobis,
}

impl TryFrom<&str> for GatingMetric {
    type Error = KalmanError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "gaussian" => Ok(Self::Gaussian),
            "maha" => Ok(Self::Mahalanobis),
            other => Err(KalmanError::UnknownMetric(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let ndim = 4;
        let mut motion_mat = Array2::eye(2 * ndim);
        for i in 0..ndim {
            motion_mat[[i, ndim + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((ndim, 2 * ndim));
        for i in 0..ndim {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(8);
        for i in 0..4 {
            mean[i] = measurement[i];
        }

        let h = measurement[3];
        let std = [
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1e-5,
            10.0 * self.std_weight_velocity * h,
        ];

        let mut cov = Array2::zeros((8, 8));
        for i in 0..8 {
            cov[[i, i]] = std[i] * std[i];
        }

        (mean, cov)
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ];

        let mut motion_cov = Array2::zeros((8, 8));
        for i in 0..8 {
            motion_cov[[i, i]] = std[i] * std[i];
        }

        let new_mean = self.motion_mat.dot(mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + motion_cov;

        (new_mean, new_covariance)
    }

    /// Batched `predict`: yields the same result as calling [`Self::predict`]
    /// once per `(mean, covariance)` pair, since each track's process noise
    /// depends only on its own height. The tracker's per-frame prediction
    /// step calls into this directly rather than having tracks loop over
    /// individual `predict` calls themselves.
    pub fn multi_predict(
        &self,
        means: &[Array1<f64>],
        covariances: &[Array2<f64>],
    ) -> (Vec<Array1<f64>>, Vec<Array2<f64>>) {
        means
            .iter()
            .zip(covariances.iter())
            .map(|(mean, cov)| self.predict(mean, cov))
            .unzip()
    }

    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-1,
            self.std_weight_position * h,
        ];

        let mut innovation_cov = Array2::zeros((4, 4));
        for i in 0..4 {
            innovation_cov[[i, i]] = std[i] * std[i];
        }

        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + innovation_cov;

        (mean_proj, covariance_proj)
    }

    /// Kalman correction step. Factors the projected covariance with a
    /// Cholesky decomposition and solves for the gain rather than inverting
    /// it directly; returns `Err` (recoverable by the caller — see
    /// [`crate::tracker::STrack::update`]) if the projected covariance isn't
    /// positive definite.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Result<(Array1<f64>, Array2<f64>), KalmanError> {
        if !measurement.iter().all(|v| v.is_finite()) || !mean.iter().all(|v| v.is_finite()) {
            return Err(KalmanError::NonFiniteState);
        }

        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = &measurement_arr - &projected_mean;

        let s = to_dmatrix(&projected_cov);
        let chol = Cholesky::new(s).ok_or(KalmanError::NonPositiveDefinite)?;

        // K = P H^T S^-1; since H = [I 0], P H^T is the first four columns
        // of P (8x4). Solve S X = (P H^T)^T = H P so that K = X^T, instead
        // of inverting S directly.
        let pht = covariance.dot(&self.update_mat.t()); // 8x4
        let rhs = to_dmatrix(&pht).transpose(); // 4x8
        let gain_t = chol.solve(&rhs); // 4x8
        let kalman_gain = from_dmatrix(&gain_t.transpose()); // 8x4

        let new_mean = mean + kalman_gain.dot(&innovation);
        let new_covariance = covariance - kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        Ok((new_mean, new_covariance))
    }

    /// Squared gating distance between `mean`/`covariance` and each row of
    /// `measurements` (K x 4, or K x 2 projected positions if
    /// `only_position` is set).
    pub fn gating_distance(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurements: &Array2<f64>,
        only_position: bool,
        metric: GatingMetric,
    ) -> Result<Array1<f64>, KalmanError> {
        let (mean_proj, cov_proj) = self.project(mean, covariance);

        let dim = if only_position { 2 } else { 4 };
        let mean_proj = mean_proj.slice(ndarray::s![..dim]).to_owned();
        let cov_proj = cov_proj.slice(ndarray::s![..dim, ..dim]).to_owned();
        let measurements = measurements.slice(ndarray::s![.., ..dim]).to_owned();

        let k = measurements.nrows();
        let mut diff = Array2::<f64>::zeros((k, dim));
        for i in 0..k {
            for j in 0..dim {
                diff[[i, j]] = measurements[[i, j]] - mean_proj[j];
            }
        }

        match metric {
            GatingMetric::Gaussian => {
                let mut out = Array1::<f64>::zeros(k);
                for i in 0..k {
                    out[i] = (0..dim).map(|j| diff[[i, j]] * diff[[i, j]]).sum();
                }
                Ok(out)
            }
            GatingMetric::Mahalanobis => {
                let cov_d = to_dmatrix(&cov_proj);
                let chol = Cholesky::new(cov_d).ok_or(KalmanError::NonPositiveDefinite)?;
                let mut out = Array1::<f64>::zeros(k);
                for i in 0..k {
                    let row = DVector::from_iterator(dim, (0..dim).map(|j| diff[[i, j]]));
                    let x = chol.solve(&row);
                    out[i] = row.dot(&x);
                }
                Ok(out)
            }
        }
    }
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    DMatrix::from_fn(rows, cols, |r, c| a[[r, c]])
}

fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(r, c)| m[(r, c)])
}
