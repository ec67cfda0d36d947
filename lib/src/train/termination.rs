//! Rules that decide when training stops.
//!
//! A criterion looks only at the objective history recorded so far, one
//! value per finished epoch, so it carries no state of its own and can be
//! edited between runs.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminationCriterion {
    /// Stop once the objective has failed to drop below
    /// `(1 - prop_decrease) * best` for `n` consecutive epochs.
    MonitorBased {
        #[serde(default = "default_prop_decrease")]
        prop_decrease: f64,
        #[serde(default = "default_n")]
        n: usize,
    },
    /// Stop after a fixed number of epochs.
    EpochCounter { max_epochs: usize },
}

fn default_prop_decrease() -> f64 {
    0.01
}

fn default_n() -> usize {
    1
}

impl Default for TerminationCriterion {
    fn default() -> Self {
        TerminationCriterion::MonitorBased {
            prop_decrease: default_prop_decrease(),
            n: default_n(),
        }
    }
}

impl TerminationCriterion {
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            TerminationCriterion::MonitorBased { prop_decrease, n } => {
                if !(0.0..1.0).contains(&prop_decrease) {
                    return Err(format!(
                        "prop_decrease must lie in [0, 1), got {}",
                        prop_decrease
                    ));
                }
                if n == 0 {
                    return Err("n must be positive".to_string());
                }
            }
            TerminationCriterion::EpochCounter { max_epochs } => {
                if max_epochs == 0 {
                    return Err("max_epochs must be positive".to_string());
                }
            }
        }
        Ok(())
    }

    /// Whether another epoch should run given the objectives seen so far.
    pub fn continue_learning(&self, history: &[f64]) -> bool {
        match *self {
            TerminationCriterion::MonitorBased { prop_decrease, n } => {
                let mut best = f64::INFINITY;
                let mut countdown = n;
                for &value in history {
                    if value < (1.0 - prop_decrease) * best {
                        countdown = n;
                    } else {
                        countdown = countdown.saturating_sub(1);
                    }
                    if value < best {
                        best = value;
                    }
                }
                countdown > 0
            }
            TerminationCriterion::EpochCounter { max_epochs } => history.len() < max_epochs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_counter() {
        let criterion = TerminationCriterion::EpochCounter { max_epochs: 2 };
        assert!(criterion.continue_learning(&[]));
        assert!(criterion.continue_learning(&[1.0]));
        assert!(!criterion.continue_learning(&[1.0, 0.5]));
    }

    #[test]
    fn test_monitor_based_stops_after_n_stale_epochs() {
        let criterion = TerminationCriterion::MonitorBased {
            prop_decrease: 0.1,
            n: 2,
        };
        assert!(criterion.continue_learning(&[]));
        assert!(criterion.continue_learning(&[10.0]));
        // 8.0 < 9.0 resets the countdown
        assert!(criterion.continue_learning(&[10.0, 8.0]));
        // 7.5 is an improvement but not by 10%
        assert!(criterion.continue_learning(&[10.0, 8.0, 7.5]));
        assert!(!criterion.continue_learning(&[10.0, 8.0, 7.5, 7.4]));
    }

    #[test]
    fn test_monitor_based_tracks_best_from_small_gains() {
        let criterion = TerminationCriterion::MonitorBased {
            prop_decrease: 0.5,
            n: 1,
        };
        assert!(criterion.continue_learning(&[4.0]));
        assert!(criterion.continue_learning(&[4.0, 1.9]));
        assert!(!criterion.continue_learning(&[4.0, 1.9, 1.0]));
    }

    #[test]
    fn test_monitor_based_nan_counts_as_stale() {
        let criterion = TerminationCriterion::MonitorBased {
            prop_decrease: 0.0,
            n: 1,
        };
        assert!(!criterion.continue_learning(&[f64::NAN]));
    }

    #[test]
    fn test_validate() {
        assert!(TerminationCriterion::default().validate().is_ok());
        assert!(TerminationCriterion::MonitorBased { prop_decrease: 1.0, n: 1 }
            .validate()
            .is_err());
        assert!(TerminationCriterion::MonitorBased { prop_decrease: 0.1, n: 0 }
            .validate()
            .is_err());
        assert!(TerminationCriterion::EpochCounter { max_epochs: 0 }
            .validate()
            .is_err());
    }

    #[test]
    fn test_json_format() {
        let criterion: TerminationCriterion =
            serde_json::from_str(r#"{"type": "monitor_based", "prop_decrease": 0.01, "n": 5}"#).unwrap();
        assert_eq!(
            criterion,
            TerminationCriterion::MonitorBased {
                prop_decrease: 0.01,
                n: 5
            }
        );
    }
}
