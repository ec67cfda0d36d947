use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::train::termination::TerminationCriterion;

/// Trait for gradient-based optimizers.
///
/// Optimizers only compute updated parameters; the training loop decides
/// when to call them and hands the result back to the model.
pub trait Optimizer<P> {
    /// Performs an optimization step using the update rule:
    /// ```text
    /// params_new = params - learning_rate * gradients
    /// ```
    ///
    /// Returns a new owned instance of updated parameters.
    fn step(&self, params: &P, gradients: &P) -> P;
}

fn default_batch_size() -> usize {
    100
}

/// Stochastic Gradient Descent over dataset batches.
///
/// Besides the update rule this carries the loop settings the training
/// driver reads: the batch size and when to stop.
///
/// # Example
/// ```rust
/// use ndarray::array;
/// use topoprep::optimizer::{Optimizer, Sgd};
/// use topoprep::train::TerminationCriterion;
///
/// let sgd = Sgd::new(0.5, 10, TerminationCriterion::EpochCounter { max_epochs: 3 });
/// let updated = sgd.step(&array![1.0, 2.0], &array![2.0, -2.0]);
/// assert_eq!(updated, array![0.0, 3.0]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub termination_criterion: TerminationCriterion,
}

impl Sgd {
    pub fn new(
        learning_rate: f64,
        batch_size: usize,
        termination_criterion: TerminationCriterion,
    ) -> Self {
        Self {
            learning_rate,
            batch_size,
            termination_criterion,
        }
    }

    /// Check hyperparameters, returning a description of the first bad one.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        self.termination_criterion.validate()
    }
}

impl Optimizer<Array1<f64>> for Sgd {
    fn step(&self, params: &Array1<f64>, gradients: &Array1<f64>) -> Array1<f64> {
        params - &(gradients * self.learning_rate)
    }
}
