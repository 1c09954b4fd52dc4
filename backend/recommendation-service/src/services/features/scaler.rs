use ndarray::{Array1, Array2, Axis};

/// Zero-mean / unit-variance column scaling fit over the whole catalog.
///
/// Uses the population standard deviation; constant columns get a scale of 1.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(data: &Array2<f64>) -> Self {
        let cols = data.ncols();
        if data.nrows() == 0 {
            return Self {
                mean: Array1::zeros(cols),
                scale: Array1::ones(cols),
            };
        }

        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(cols));
        let scale = data.std_axis(Axis(0), 0.0).mapv(|s| {
            if s.is_finite() && s > f64::EPSILON {
                s
            } else {
                1.0
            }
        });

        Self { mean, scale }
    }

    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        (data - &self.mean) / &self.scale
    }

    pub fn fit_transform(data: &Array2<f64>) -> Array2<f64> {
        Self::fit(data).transform(data)
    }
}
