use failure::format_err;
use ndarray::prelude::*;
use ndarray::concatenate;

use crate::configurations::LogRegConfig;
use crate::errors::*;

/// The multiclass probability estimates are derived from binary (one-vs.-rest)
/// estimates
pub struct MulticlassLogisticRegression {
    /// matrix with shape (f + 1, c), the first row being the intercept
    /// ------------------------
    ///
    /// - f = number of features
    /// - c = number of classes
    weights: Array2<f32>,
}

impl MulticlassLogisticRegression {
    fn nb_features(&self) -> usize {
        // without intercept
        self.weights.dim().0 - 1
    }

    fn nb_classes(&self) -> usize {
        self.weights.dim().1
    }
}

impl MulticlassLogisticRegression {
    pub fn new(intercept: Array1<f32>, weights: Array2<f32>) -> Result<Self> {
        let nb_classes = intercept.dim();
        if weights.dim().1 != nb_classes {
            return Err(format_err!(
                "Expected {} classes in weights but found {}",
                nb_classes,
                weights.dim().1
            ));
        }
        let reshaped_intercept = intercept.into_shape((1, nb_classes))?;
        let weights_with_intercept =
            concatenate(Axis(0), &[reshaped_intercept.view(), weights.view()])?;
        Ok(Self {
            weights: weights_with_intercept,
        })
    }

    /// Batch gradient descent on the one-vs-rest log loss, with L2 penalty
    /// on the coefficients
    pub fn fit(
        features: &Array2<f32>,
        labels: &[usize],
        nb_classes: usize,
        config: &LogRegConfig,
    ) -> Result<Self> {
        let (nb_samples, nb_features) = features.dim();
        if nb_samples != labels.len() {
            return Err(format_err!(
                "Found {} labels for {} samples",
                labels.len(),
                nb_samples
            ));
        }
        let mut targets = Array2::<f32>::zeros((nb_samples, nb_classes));
        for (sample, label) in labels.iter().enumerate() {
            targets[[sample, *label]] = 1.0;
        }
        let with_intercept = concatenate(
            Axis(1),
            &[Array2::<f32>::ones((nb_samples, 1)).view(), features.view()],
        )?;
        let mut weights = Array2::<f32>::zeros((nb_features + 1, nb_classes));
        for _ in 0..config.nb_iterations {
            let mut errors = with_intercept.dot(&weights);
            errors.mapv_inplace(logit);
            errors -= &targets;
            let mut gradient = with_intercept.t().dot(&errors) / nb_samples.max(1) as f32;
            let mut penalty = weights.clone() * config.l2_penalty;
            penalty.row_mut(0).fill(0.0);
            gradient += &penalty;
            weights.scaled_add(-config.learning_rate, &gradient);
        }
        Ok(Self { weights })
    }

    pub fn run(&self, features: &ArrayView1<f32>) -> Result<Array1<f32>> {
        if features.dim() != self.nb_features() {
            return Err(format_err!(
                "Expected {} features but found {}",
                self.nb_features(),
                features.dim()
            ));
        }
        let mut result = self.weights.slice(s![1.., ..]).t().dot(features);
        result += &self.weights.row(0);
        result.mapv_inplace(logit);
        Ok(result)
    }

    pub fn intercept(&self) -> Vec<f32> {
        self.weights.row(0).to_vec()
    }

    /// One row of coefficients per class
    pub fn coeffs(&self) -> Vec<Vec<f32>> {
        self.weights
            .slice(s![1.., ..])
            .t()
            .outer_iter()
            .map(|class_coeffs| class_coeffs.to_vec())
            .collect()
    }

    pub fn classes_count(&self) -> usize {
        self.nb_classes()
    }
}

fn logit(x: f32) -> f32 {
    1. / (1. + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::assert_epsilon_eq_array1;
    use ndarray::array;

    #[test]
    fn multiclass_logistic_regression_works() {
        // Given
        let intercept = array![0.98, 0.32, -0.76];
        let weights = array![
            [2.5, -0.6, 0.5],
            [1.2, 1.2, -2.7],
            [1.5, 0.1, -3.2],
            [-0.9, 1.4, 1.8]
        ];

        let features = array![0.4, -2.3, 1.9, 1.3];
        let regression = MulticlassLogisticRegression::new(intercept, weights).unwrap();

        // When
        let predictions = regression.run(&features.view()).unwrap();

        // Then
        let expected_predictions = array![0.7109495, 0.3384968, 0.8710191];
        assert_epsilon_eq_array1(&predictions, &expected_predictions, 1e-06);
    }

    #[test]
    fn run_checks_features_dimension() {
        let regression =
            MulticlassLogisticRegression::new(array![0.1, 0.2], array![[1.0, 2.0]]).unwrap();
        assert!(regression.run(&array![1.0, 2.0].view()).is_err());
    }

    #[test]
    fn fit_separates_classes() {
        // Given
        let features = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0], [0.1, 0.8]];
        let labels = vec![0, 0, 1, 1];

        // When
        let regression =
            MulticlassLogisticRegression::fit(&features, &labels, 2, &LogRegConfig::default())
                .unwrap();
        let first = regression.run(&array![1.0, 0.0].view()).unwrap();
        let second = regression.run(&array![0.0, 1.0].view()).unwrap();

        // Then
        assert_eq!(2, regression.classes_count());
        assert!(first[0] > first[1]);
        assert!(second[1] > second[0]);
    }

    #[test]
    fn coefficients_are_exported_per_class() {
        // Given
        let intercept = array![0.5, -0.5];
        let weights = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

        // When
        let regression = MulticlassLogisticRegression::new(intercept, weights).unwrap();

        // Then
        assert_eq!(vec![0.5, -0.5], regression.intercept());
        assert_eq!(
            vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]],
            regression.coeffs()
        );
    }
}
