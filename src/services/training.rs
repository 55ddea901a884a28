//! Offline training of the forest artifact consumed by `/predict`.
//!
//! Samples are `[home_goals, away_goals] -> winner` taken from the live
//! snapshot, the same feature vector the serving path builds. Team names are
//! not features, so no label encoding of team names takes place here.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::services::classifier::{
    DecisionTree, ModelError, Node, Outcome, RandomForest, FEATURE_COUNT,
};
use crate::services::football_data::{FootballDataClient, LiveMatch, MatchFeed};

const CLASSES: [Outcome; 3] = [Outcome::AwayWin, Outcome::HomeWin, Outcome::Draw];

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("No match data available for training")]
    NoData,

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub features: [f64; FEATURE_COUNT],
    pub label: Outcome,
}

impl From<&LiveMatch> for Sample {
    fn from(m: &LiveMatch) -> Self {
        Self {
            features: [m.home_team_score as f64, m.away_team_score as f64],
            label: m.winner,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Fixed seed for reproducible forests; random when `None`.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 32,
            min_samples_split: 2,
            seed: None,
        }
    }
}

fn class_index(outcome: Outcome) -> usize {
    CLASSES
        .iter()
        .position(|c| *c == outcome)
        .unwrap_or_default()
}

fn class_counts(samples: &[Sample], indices: &[usize]) -> [usize; 3] {
    let mut counts = [0; 3];
    for &i in indices {
        counts[class_index(samples[i].label)] += 1;
    }
    counts
}

fn gini(counts: &[usize; 3], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

struct Split {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Best threshold on `feature`, if any split lowers impurity.
fn best_split_on(samples: &[Sample], indices: &[usize], feature: usize) -> Option<(f64, f64)> {
    let mut values: Vec<f64> = indices.iter().map(|&i| samples[i].features[feature]).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();

    let parent = gini(&class_counts(samples, indices), indices.len());
    let mut best: Option<(f64, f64)> = None;

    for pair in values.windows(2) {
        let threshold = (pair[0] + pair[1]) / 2.0;
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| samples[i].features[feature] <= threshold);

        let n = indices.len() as f64;
        let impurity = gini(&class_counts(samples, &left), left.len()) * left.len() as f64 / n
            + gini(&class_counts(samples, &right), right.len()) * right.len() as f64 / n;

        if impurity < parent - 1e-12 && best.map_or(true, |(_, b)| impurity < b) {
            best = Some((threshold, impurity));
        }
    }

    best
}

fn find_split(samples: &[Sample], indices: &[usize], rng: &mut StdRng) -> Option<Split> {
    // One candidate feature per split; fall through to the others only when it cannot split.
    let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
    features.shuffle(rng);

    for feature in features {
        if let Some((threshold, _)) = best_split_on(samples, indices, feature) {
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| samples[i].features[feature] <= threshold);
            return Some(Split {
                feature,
                threshold,
                left,
                right,
            });
        }
    }

    None
}

fn grow(
    samples: &[Sample],
    indices: Vec<usize>,
    depth: usize,
    config: &TrainingConfig,
    rng: &mut StdRng,
    nodes: &mut Vec<Node>,
) -> usize {
    let counts = class_counts(samples, &indices);
    let total = indices.len().max(1) as f64;
    let idx = nodes.len();
    nodes.push(Node::Leaf {
        distribution: counts.iter().map(|&c| c as f64 / total).collect(),
    });

    let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
    if pure || depth >= config.max_depth || indices.len() < config.min_samples_split {
        return idx;
    }

    let Some(split) = find_split(samples, &indices, rng) else {
        return idx;
    };

    let left = grow(samples, split.left, depth + 1, config, rng, nodes);
    let right = grow(samples, split.right, depth + 1, config, rng, nodes);
    nodes[idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };

    idx
}

/// Fit a bagged forest of CART trees (Gini impurity, bootstrap resampling).
pub fn train_forest(samples: &[Sample], config: &TrainingConfig) -> Result<RandomForest, TrainingError> {
    if samples.is_empty() {
        return Err(TrainingError::NoData);
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let n = samples.len();
    let trees = (0..config.n_trees.max(1))
        .map(|_| {
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut nodes = Vec::new();
            grow(samples, bootstrap, 0, config, &mut rng, &mut nodes);
            DecisionTree { nodes }
        })
        .collect();

    let forest = RandomForest {
        n_features: FEATURE_COUNT,
        classes: CLASSES.iter().map(|c| c.class()).collect(),
        trees,
    };

    // Same checks the server runs when loading the artifact.
    forest.validate()?;
    Ok(forest)
}

/// `train` command: fetch the live snapshot, fit a forest and write it to `output`.
pub async fn run(config: &Config, output: &str, n_trees: usize) -> anyhow::Result<()> {
    let feed = FootballDataClient::new(&config.football_api)?;

    let matches = feed.live_matches().await.ok_or(TrainingError::NoData)?;
    let samples: Vec<Sample> = matches.iter().map(Sample::from).collect();
    tracing::info!("Training on {} match(es)", samples.len());

    let forest = train_forest(
        &samples,
        &TrainingConfig {
            n_trees,
            ..TrainingConfig::default()
        },
    )?;

    forest.save(output)?;
    tracing::info!("Model with {} trees saved to {}", forest.trees.len(), output);

    Ok(())
}
