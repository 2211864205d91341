//! Bagged CART ensemble for binary classification (Gini impurity).
//!
//! Trees are stored as flat node arenas so the fitted model serialises to a
//! plain JSON document. Probabilities are the mean of per-tree leaf class
//! frequencies and the predicted label is their arg-max, so the label and the
//! probability pair always agree.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::error::{CardioError, CardioResult};
use crate::data::domain::{check_labels, NUM_CLASSES};

use super::domain::ForestConfig;

/// Class probabilities, indexed by label.
pub type Proba = [f64; NUM_CLASSES];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: Proba,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single fitted tree; `nodes[0]` is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_value(&self, row: &[f64]) -> CardioResult<&Proba> {
        let mut idx = 0;
        // Each hop moves to a strictly later node, so this terminates.
        loop {
            match self.nodes.get(idx).ok_or(CardioError::NotFitted)? {
                Node::Leaf { value } => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).ok_or(CardioError::NotFitted)?;
                    let next = if *value <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    if next <= idx {
                        return Err(CardioError::NotFitted);
                    }
                    idx = next;
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Fitted ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub config: ForestConfig,
    n_features: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on already-scaled rows.
    pub fn fit(cfg: &ForestConfig, rows: &[Vec<f64>], labels: &[u8]) -> CardioResult<Self> {
        if rows.is_empty() {
            return Err(CardioError::EmptyDataset);
        }
        if rows.len() != labels.len() {
            return Err(CardioError::DimensionMismatch {
                expected: rows.len(),
                got: labels.len(),
            });
        }
        let n_features = rows[0].len();
        if n_features == 0 {
            return Err(CardioError::DimensionMismatch {
                expected: 1,
                got: 0,
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(CardioError::DimensionMismatch {
                expected: n_features,
                got: bad.len(),
            });
        }
        check_labels(labels)?;

        let mut seeds = StdRng::seed_from_u64(cfg.seed);
        let mut trees = Vec::with_capacity(cfg.n_estimators);
        let mut importances = vec![0.0; n_features];

        for _ in 0..cfg.n_estimators {
            let mut builder = TreeBuilder {
                rows,
                labels,
                cfg,
                max_features: cfg.max_features.resolve(n_features),
                rng: StdRng::seed_from_u64(seeds.gen()),
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };

            let mut sample: Vec<usize> = if cfg.bootstrap {
                (0..rows.len())
                    .map(|_| builder.rng.gen_range(0..rows.len()))
                    .collect()
            } else {
                (0..rows.len()).collect()
            };
            builder.grow(&mut sample, 0);

            let tree_total: f64 = builder.importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, imp) in importances.iter_mut().zip(&builder.importances) {
                    *acc += imp / tree_total;
                }
            }
            trees.push(DecisionTree {
                nodes: builder.nodes,
            });
        }

        normalise(&mut importances);
        debug!(
            trees = trees.len(),
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            "forest fitted"
        );

        Ok(Self {
            config: cfg.clone(),
            n_features,
            trees,
            importances,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean decrease in impurity per feature; sums to 1 unless no tree split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn predict_proba(&self, row: &[f64]) -> CardioResult<Proba> {
        if row.len() != self.n_features {
            return Err(CardioError::DimensionMismatch {
                expected: self.n_features,
                got: row.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(CardioError::NotFitted);
        }

        let mut acc = [0.0; NUM_CLASSES];
        for tree in &self.trees {
            let value = tree.leaf_value(row)?;
            for (a, v) in acc.iter_mut().zip(value) {
                *a += v;
            }
        }
        let n = self.trees.len() as f64;
        Ok(acc.map(|a| a / n))
    }

    pub fn predict(&self, row: &[f64]) -> CardioResult<u8> {
        self.predict_proba(row).map(|p| arg_max(&p))
    }

    pub fn predict_all(&self, rows: &[Vec<f64>]) -> CardioResult<Vec<u8>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

/// Index of the largest probability; ties go to the lower label.
pub fn arg_max(proba: &Proba) -> u8 {
    let mut best = 0;
    for (i, p) in proba.iter().enumerate().skip(1) {
        if *p > proba[best] {
            best = i;
        }
    }
    best as u8
}

fn normalise(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

fn gini(counts: &[usize; NUM_CLASSES], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity_left: f64,
    impurity_right: f64,
    n_left: usize,
    score: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
    cfg: &'a ForestConfig,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl TreeBuilder<'_> {
    fn counts(&self, sample: &[usize]) -> [usize; NUM_CLASSES] {
        let mut counts = [0; NUM_CLASSES];
        for &i in sample {
            counts[self.labels[i] as usize] += 1;
        }
        counts
    }

    /// Grow the subtree for `sample` and return its node index.
    fn grow(&mut self, sample: &mut [usize], depth: usize) -> usize {
        let n = sample.len();
        let counts = self.counts(sample);
        let impurity = gini(&counts, n);

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: counts.map(|c| c as f64 / n as f64),
        });

        let depth_ok = self.cfg.max_depth.map_or(true, |max| depth < max);
        let can_split = depth_ok
            && impurity > 0.0
            && n >= self.cfg.min_samples_split
            && n >= 2 * self.cfg.min_samples_leaf;
        if !can_split {
            return idx;
        }

        let Some(best) = self.best_split(sample, impurity) else {
            return idx;
        };

        self.importances[best.feature] += n as f64 * impurity
            - best.n_left as f64 * best.impurity_left
            - (n - best.n_left) as f64 * best.impurity_right;

        let rows = self.rows;
        sample.sort_by(|&a, &b| rows[a][best.feature].total_cmp(&rows[b][best.feature]));
        let (left_sample, right_sample) = sample.split_at_mut(best.n_left);

        let left = self.grow(left_sample, depth + 1);
        let right = self.grow(right_sample, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&mut self, sample: &[usize], parent_impurity: f64) -> Option<SplitCandidate> {
        let n = sample.len();
        let n_features = self.importances.len();
        let min_leaf = self.cfg.min_samples_leaf;
        let total = self.counts(sample);
        let features = index::sample(&mut self.rng, n_features, self.max_features);

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = sample.to_vec();

        for feature in features.iter() {
            let rows = self.rows;
            sorted.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

            let mut left = [0usize; NUM_CLASSES];
            for pos in 0..n - 1 {
                left[self.labels[sorted[pos]] as usize] += 1;

                let here = rows[sorted[pos]][feature];
                let next = rows[sorted[pos + 1]][feature];
                if here >= next {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let mut right = total;
                for (r, l) in right.iter_mut().zip(&left) {
                    *r -= l;
                }
                let impurity_left = gini(&left, n_left);
                let impurity_right = gini(&right, n_right);
                let score =
                    (n_left as f64 * impurity_left + n_right as f64 * impurity_right) / n as f64;

                if score >= parent_impurity - 1e-12 {
                    continue;
                }
                if best.as_ref().map_or(true, |b| score < b.score) {
                    let mid = here + (next - here) / 2.0;
                    best = Some(SplitCandidate {
                        feature,
                        threshold: if mid < next { mid } else { here },
                        impurity_left,
                        impurity_right,
                        n_left,
                        score,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::domain::MaxFeatures;

    /// Label is 1 when the first feature is positive; the second is noise.
    fn separable(n: usize) -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rng = StdRng::seed_from_u64(9);
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let x = (i as f64 - n as f64 / 2.0) / 10.0;
            rows.push(vec![x, rng.gen_range(-1.0..1.0)]);
            labels.push(u8::from(x > 0.0));
        }
        (rows, labels)
    }

    fn small_cfg() -> ForestConfig {
        ForestConfig {
            n_estimators: 15,
            max_features: MaxFeatures::All,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn learns_a_threshold() {
        let (rows, labels) = separable(80);
        let forest = RandomForest::fit(&small_cfg(), &rows, &labels).expect("fit");
        assert_eq!(forest.predict(&[3.0, 0.0]).expect("predict"), 1);
        assert_eq!(forest.predict(&[-3.0, 0.0]).expect("predict"), 0);

        let preds = forest.predict_all(&rows).expect("predict");
        let correct = preds.iter().zip(&labels).filter(|(p, y)| p == y).count();
        assert!(correct >= 76, "only {correct}/80 correct");
    }

    #[test]
    fn probabilities_sum_to_one_and_match_label() {
        let (rows, labels) = separable(60);
        let forest = RandomForest::fit(&ForestConfig::default(), &rows, &labels).expect("fit");
        for row in &rows {
            let p = forest.predict_proba(row).expect("proba");
            assert!((p[0] + p[1] - 1.0).abs() < 1e-9);
            assert_eq!(forest.predict(row).expect("predict"), arg_max(&p));
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let (rows, labels) = separable(50);
        let a = RandomForest::fit(&small_cfg(), &rows, &labels).expect("fit");
        let b = RandomForest::fit(&small_cfg(), &rows, &labels).expect("fit");
        assert_eq!(a, b);
    }

    #[test]
    fn importances_favour_the_informative_feature() {
        let (rows, labels) = separable(100);
        let forest = RandomForest::fit(&small_cfg(), &rows, &labels).expect("fit");
        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn depth_and_leaf_size_limits_hold() {
        let (rows, labels) = separable(120);
        let cfg = ForestConfig {
            max_depth: Some(2),
            ..small_cfg()
        };
        let forest = RandomForest::fit(&cfg, &rows, &labels).expect("fit");
        assert!(forest.trees().iter().all(|t| t.depth() <= 2));
    }

    #[test]
    fn pure_input_yields_single_leaf_trees() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let forest = RandomForest::fit(&small_cfg(), &rows, &[1, 1, 1]).expect("fit");
        assert!(forest.trees().iter().all(|t| t.nodes.len() == 1));
        assert_eq!(forest.predict_proba(&[0.0]).expect("proba"), [0.0, 1.0]);
        assert_eq!(forest.feature_importances(), &[0.0]);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let (rows, labels) = separable(20);
        let forest = RandomForest::fit(&small_cfg(), &rows, &labels).expect("fit");
        assert!(matches!(
            forest.predict_proba(&[1.0]),
            Err(CardioError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn labels_beyond_binary_are_rejected() {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0]];
        let err = RandomForest::fit(&small_cfg(), &rows, &[0, 1, 3]).expect_err("label 3");
        assert!(matches!(err, CardioError::InvalidLabel { row: 3, .. }));
    }

    #[test]
    fn ties_resolve_to_no_disease() {
        assert_eq!(arg_max(&[0.5, 0.5]), 0);
        assert_eq!(arg_max(&[0.4, 0.6]), 1);
    }

    #[test]
    fn survives_a_json_round_trip() {
        let (rows, labels) = separable(30);
        let forest = RandomForest::fit(&small_cfg(), &rows, &labels).expect("fit");
        let json = serde_json::to_string(&forest).expect("serialize");
        let back: RandomForest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(
            back.predict_proba(&rows[3]).expect("proba"),
            forest.predict_proba(&rows[3]).expect("proba")
        );
    }
}
