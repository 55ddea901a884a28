//! Pre-trained match outcome classifier.
//!
//! The artifact is a bagged forest of decision trees serialized as JSON. Each
//! tree is a flat node list; split nodes route on `features[feature] <= threshold`
//! (left) and leaves carry a class distribution aligned with `classes`.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Number of features the serving path feeds in: `[home_goals, away_goals]`.
pub const FEATURE_COUNT: usize = 2;

/// Match outcome classes shared by the live-data fetcher, training and inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Outcome {
    AwayWin,
    HomeWin,
    Draw,
}

impl Outcome {
    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            0 => Some(Outcome::AwayWin),
            1 => Some(Outcome::HomeWin),
            2 => Some(Outcome::Draw),
            _ => None,
        }
    }

    pub fn class(self) -> u8 {
        match self {
            Outcome::AwayWin => 0,
            Outcome::HomeWin => 1,
            Outcome::Draw => 2,
        }
    }

    /// Text stored with a prediction and returned to the client.
    pub fn label(self, home_team: &str, away_team: &str) -> String {
        match self {
            Outcome::HomeWin => format!("{} Wins", home_team),
            Outcome::AwayWin => format!("{} Wins", away_team),
            Outcome::Draw => "Draw".to_string(),
        }
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> Self {
        outcome.class()
    }
}

impl TryFrom<u8> for Outcome {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_class(value).ok_or_else(|| format!("Invalid outcome class: {}", value))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model: {0}")]
    Invalid(String),

    #[error("Expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
}

/// Seam between the prediction pipeline and whatever model backs it.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<u8, ModelError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Node 0 is the root.
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_distribution(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        // Indices are validated on load to point forward, so this terminates.
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub classes: Vec<u8>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let forest: RandomForest = serde_json::from_str(raw)?;
        forest.validate()?;
        Ok(forest)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let raw = serde_json::to_string(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_features != FEATURE_COUNT {
            return Err(ModelError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: self.n_features,
            });
        }
        if self.classes.is_empty() {
            return Err(ModelError::Invalid("no classes".to_string()));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("no trees".to_string()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::Invalid(format!("tree {} is empty", t)));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.n_features {
                            return Err(ModelError::Invalid(format!(
                                "tree {} node {} splits on unknown feature {}",
                                t, i, feature
                            )));
                        }
                        // Children must come after their parent; rules out cycles.
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(ModelError::Invalid(format!(
                                    "tree {} node {} has out-of-order child {}",
                                    t, i, child
                                )));
                            }
                        }
                    }
                    Node::Leaf { distribution } => {
                        if distribution.len() != self.classes.len() {
                            return Err(ModelError::Invalid(format!(
                                "tree {} leaf {} has {} probabilities for {} classes",
                                t,
                                i,
                                distribution.len(),
                                self.classes.len()
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Mean class distribution across all trees.
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (total, p) in totals.iter_mut().zip(tree.leaf_distribution(features)) {
                *total += p;
            }
        }

        let n = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }
}

impl Classifier for RandomForest {
    fn predict(&self, features: &[f64]) -> Result<u8, ModelError> {
        let proba = self.predict_proba(features)?;

        // First maximum wins ties.
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }

        Ok(self.classes[best])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Home side ahead -> home win, away side ahead -> away win, level -> draw.
    fn goal_difference_forest() -> RandomForest {
        let tree = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 4,
                },
                Node::Split {
                    feature: 1,
                    threshold: 0.5,
                    left: 2,
                    right: 3,
                },
                Node::Leaf {
                    distribution: vec![0.0, 0.0, 1.0],
                },
                Node::Leaf {
                    distribution: vec![1.0, 0.0, 0.0],
                },
                Node::Leaf {
                    distribution: vec![0.1, 0.8, 0.1],
                },
            ],
        };

        RandomForest {
            n_features: 2,
            classes: vec![0, 1, 2],
            trees: vec![tree.clone(), tree],
        }
    }

    #[test]
    fn predicts_by_mean_distribution() {
        let forest = goal_difference_forest();
        assert_eq!(forest.predict(&[2.0, 0.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[0.0, 1.0]).unwrap(), 0);
        assert_eq!(forest.predict(&[0.0, 0.0]).unwrap(), 2);

        let proba = forest.predict_proba(&[3.0, 1.0]).unwrap();
        assert!((proba[1] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn ties_go_to_the_first_class() {
        let forest = RandomForest {
            n_features: 2,
            classes: vec![0, 1, 2],
            trees: vec![DecisionTree {
                nodes: vec![Node::Leaf {
                    distribution: vec![0.4, 0.4, 0.2],
                }],
            }],
        };
        assert_eq!(forest.predict(&[1.0, 1.0]).unwrap(), 0);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let forest = goal_difference_forest();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(ModelError::FeatureCount {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn loads_json_artifact() {
        let raw = r#"{
            "n_features": 2,
            "classes": [0, 1, 2],
            "trees": [{"nodes": [
                {"kind": "split", "feature": 0, "threshold": 1.5, "left": 1, "right": 2},
                {"kind": "leaf", "distribution": [0.0, 0.0, 1.0]},
                {"kind": "leaf", "distribution": [0.0, 1.0, 0.0]}
            ]}]
        }"#;

        let forest = RandomForest::from_json(raw).unwrap();
        assert_eq!(forest.predict(&[2.0, 0.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[1.0, 0.0]).unwrap(), 2);
    }

    #[test]
    fn rejects_cyclic_trees() {
        let raw = r#"{
            "n_features": 2,
            "classes": [0, 1, 2],
            "trees": [{"nodes": [
                {"kind": "split", "feature": 0, "threshold": 1.5, "left": 0, "right": 1},
                {"kind": "leaf", "distribution": [0.0, 0.0, 1.0]}
            ]}]
        }"#;
        assert!(matches!(
            RandomForest::from_json(raw),
            Err(ModelError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_mismatched_leaf_width() {
        let raw = r#"{
            "n_features": 2,
            "classes": [0, 1, 2],
            "trees": [{"nodes": [{"kind": "leaf", "distribution": [1.0]}]}]
        }"#;
        assert!(matches!(
            RandomForest::from_json(raw),
            Err(ModelError::Invalid(_))
        ));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(Outcome::from_class(1).unwrap().label("Arsenal", "Chelsea"), "Arsenal Wins");
        assert_eq!(Outcome::from_class(0).unwrap().label("Arsenal", "Chelsea"), "Chelsea Wins");
        assert_eq!(Outcome::from_class(2).unwrap().label("Arsenal", "Chelsea"), "Draw");
        assert_eq!(Outcome::from_class(7), None);
    }

    #[test]
    fn save_and_load_round_trip_through_disk() {
        let forest = goal_difference_forest();
        let path = std::env::temp_dir().join(format!("forest-{}.json", uuid::Uuid::new_v4()));

        forest.save(&path).unwrap();
        let loaded = RandomForest::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.trees.len(), forest.trees.len());
        assert_eq!(loaded.classes, forest.classes);
        for features in [[2.0, 0.0], [0.0, 1.0], [0.0, 0.0]] {
            assert_eq!(
                loaded.predict(&features).unwrap(),
                forest.predict(&features).unwrap()
            );
        }
    }
}
