//! XGBoost JSON model reader and tree-ensemble evaluation.
//!
//! Reads the native JSON produced by `Booster.save_model("model.json")`
//! (format 1.0 and later) for tree boosters (`gbtree`, `dart`) trained with
//! `multi:softprob`, `multi:softmax` or `binary:logistic`, and evaluates the
//! ensemble the way the reference predictor does: features are compared as
//! `f32`, a node sends a row left when `value < split_condition`, and missing
//! values follow the node's default direction.
use log::debug;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::error::{Stage, TransformError};
use crate::math::Array2;
use crate::models::classifier_trait::{Classification, Classifier};

// =============================================================================
// Foreign types: the subset of the XGBoost JSON layout needed for inference
// =============================================================================

/// Accepts `0.5`, `"0.5"`, `"[5E-1]"`, `"[5E-1,2.5E-1]"` and `[0.5, 0.25]`.
fn deserialize_base_score<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    fn parse_str(s: &str) -> Option<Vec<f32>> {
        let t = s.trim();
        let inner = t
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(t);
        inner
            .split(',')
            .map(|part| part.trim().parse::<f32>().ok())
            .collect()
    }

    let value = Value::deserialize(deserializer)?;
    let scores = match value {
        Value::Number(n) => n.as_f64().map(|f| vec![f as f32]),
        Value::String(s) => parse_str(&s),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Number(n) => n.as_f64().map(|f| f as f32),
                Value::String(s) => s.trim().parse::<f32>().ok(),
                _ => None,
            })
            .collect(),
        _ => None,
    };
    match scores {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SerdeError::custom(
            "base_score must be a number, a numeric string, or a list of numbers",
        )),
    }
}

/// `default_left` is written as 0/1 integers by newer releases and as
/// booleans by older ones.
fn deserialize_flags<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|value| match value {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => n
                .as_i64()
                .map(|i| i != 0)
                .ok_or_else(|| SerdeError::custom("invalid number for flag")),
            other => Err(SerdeError::custom(format!("unsupported flag value {}", other))),
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct XgbTree {
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub split_indices: Vec<i64>,
    pub split_conditions: Vec<f32>,
    #[serde(deserialize_with = "deserialize_flags")]
    pub default_left: Vec<bool>,
    #[serde(default)]
    pub split_type: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XgbModelTrees {
    pub trees: Vec<XgbTree>,
    pub tree_info: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XgbDartTrees {
    pub model: XgbModelTrees,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum XgbGradientBooster {
    Gbtree {
        model: XgbModelTrees,
    },
    Dart {
        gbtree: XgbDartTrees,
        weight_drop: Vec<f32>,
    },
    Gblinear {},
}

#[derive(Debug, Clone, Deserialize)]
pub struct XgbObjective {
    pub name: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct XgbLearnerModelParam {
    #[serde(deserialize_with = "deserialize_base_score")]
    pub base_score: Vec<f32>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub num_class: i64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub num_feature: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XgbLearner {
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub gradient_booster: XgbGradientBooster,
    pub objective: XgbObjective,
    pub learner_model_param: XgbLearnerModelParam,
}

/// Top-level XGBoost JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct XgbModel {
    #[serde(default)]
    pub version: Vec<u32>,
    pub learner: XgbLearner,
}

// =============================================================================
// Native representation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    MultiSoftprob,
    MultiSoftmax,
    BinaryLogistic,
}

impl Objective {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "multi:softprob" => Some(Objective::MultiSoftprob),
            "multi:softmax" => Some(Objective::MultiSoftmax),
            "binary:logistic" => Some(Objective::BinaryLogistic),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Objective::MultiSoftprob => "multi:softprob",
            Objective::MultiSoftmax => "multi:softmax",
            Objective::BinaryLogistic => "binary:logistic",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    /// Split threshold for inner nodes, leaf value for leaves.
    value: f32,
    default_left: bool,
}

impl Node {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.left < 0
    }
}

#[derive(Debug, Clone)]
struct RegTree {
    nodes: Vec<Node>,
}

impl RegTree {
    fn from_xgb(tree: &XgbTree, tree_idx: usize, n_features: usize) -> Result<Self, String> {
        let n = tree.left_children.len();
        if n == 0 {
            return Err(format!("tree {} has no nodes", tree_idx));
        }
        let lengths = [
            tree.right_children.len(),
            tree.split_indices.len(),
            tree.split_conditions.len(),
            tree.default_left.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(format!("tree {} has node arrays of unequal length", tree_idx));
        }
        if tree.split_type.iter().any(|&t| t != 0) {
            return Err(format!("tree {} uses categorical splits", tree_idx));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = tree.left_children[i];
            let right = tree.right_children[i];
            let leaf = left < 0;
            if !leaf {
                // children always follow their parent, which also rules out cycles
                for child in [left, right] {
                    if child <= i as i32 || child as usize >= n {
                        return Err(format!(
                            "tree {}: node {} references child {} but the tree has {} nodes",
                            tree_idx, i, child, n
                        ));
                    }
                }
                let feature = tree.split_indices[i];
                if feature < 0 || feature as usize >= n_features {
                    return Err(format!(
                        "tree {}: node {} splits on feature {} but the model has {} features",
                        tree_idx, i, feature, n_features
                    ));
                }
            }
            nodes.push(Node {
                left,
                right,
                feature: if leaf { 0 } else { tree.split_indices[i] as usize },
                value: tree.split_conditions[i],
                default_left: tree.default_left[i],
            });
        }
        Ok(Self { nodes })
    }

    #[inline]
    fn predict_leaf(&self, row: &[f32]) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                return node.value;
            }
            let fvalue = row[node.feature];
            let go_left = if fvalue.is_nan() {
                node.default_left
            } else {
                fvalue < node.value
            };
            let next = if go_left { node.left } else { node.right };
            idx = next as usize;
        }
    }
}

/// Gradient-boosted tree classifier loaded from XGBoost JSON.
#[derive(Debug, Clone)]
pub struct XGBoostClassifier {
    objective: Objective,
    n_features: usize,
    n_classes: usize,
    /// Initial margin per output group.
    base_margin: Vec<f32>,
    trees: Vec<RegTree>,
    tree_groups: Vec<usize>,
    tree_weights: Vec<f32>,
    feature_names: Vec<String>,
}

impl XGBoostClassifier {
    /// Parse and validate a model from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let model: XgbModel = serde_json::from_str(json).map_err(|e| e.to_string())?;
        Self::from_model(model)
    }

    /// Convert a parsed model, checking every node and tree-group index.
    pub fn from_model(model: XgbModel) -> Result<Self, String> {
        let learner = model.learner;
        let objective = Objective::from_name(&learner.objective.name).ok_or_else(|| {
            format!(
                "unsupported objective '{}'; expected multi:softprob, multi:softmax or binary:logistic",
                learner.objective.name
            )
        })?;

        let param = learner.learner_model_param;
        if param.num_feature <= 0 {
            return Err(format!("num_feature must be positive, got {}", param.num_feature));
        }
        let n_features = param.num_feature as usize;

        let (n_classes, n_groups) = match objective {
            Objective::BinaryLogistic => (2, 1),
            Objective::MultiSoftprob | Objective::MultiSoftmax => {
                if param.num_class < 2 {
                    return Err(format!(
                        "multi-class objective needs num_class >= 2, got {}",
                        param.num_class
                    ));
                }
                (param.num_class as usize, param.num_class as usize)
            }
        };

        let (trees, weights) = match learner.gradient_booster {
            XgbGradientBooster::Gbtree { model } => {
                let weights = vec![1.0; model.trees.len()];
                (model, weights)
            }
            XgbGradientBooster::Dart {
                gbtree,
                weight_drop,
            } => (gbtree.model, weight_drop),
            XgbGradientBooster::Gblinear {} => {
                return Err("gblinear boosters are not supported".to_string())
            }
        };

        if trees.trees.is_empty() {
            return Err("model contains no trees".to_string());
        }
        if trees.tree_info.len() != trees.trees.len() || weights.len() != trees.trees.len() {
            return Err(format!(
                "model has {} trees but {} tree_info entries and {} weights",
                trees.trees.len(),
                trees.tree_info.len(),
                weights.len()
            ));
        }
        // every output group owns at least one tree
        if n_groups > trees.trees.len() {
            return Err(format!(
                "model declares {} output groups but only has {} trees",
                n_groups,
                trees.trees.len()
            ));
        }

        let mut tree_groups = Vec::with_capacity(trees.tree_info.len());
        let mut group_seen = vec![false; n_groups];
        for (i, &group) in trees.tree_info.iter().enumerate() {
            if group < 0 || group as usize >= n_groups {
                return Err(format!(
                    "tree {} belongs to output group {} but the model has {}",
                    i, group, n_groups
                ));
            }
            group_seen[group as usize] = true;
            tree_groups.push(group as usize);
        }
        if let Some(group) = group_seen.iter().position(|seen| !seen) {
            return Err(format!("output group {} has no trees", group));
        }

        let base_margin = match (objective, param.base_score.as_slice()) {
            (Objective::BinaryLogistic, [p, ..]) => {
                let p = p.clamp(1e-7, 1.0 - 1e-7);
                vec![(p / (1.0 - p)).ln()]
            }
            (_, [b]) => vec![*b; n_groups],
            (_, scores) if scores.len() == n_groups => scores.to_vec(),
            (_, scores) => {
                return Err(format!(
                    "base_score has {} entries for {} output groups",
                    scores.len(),
                    n_groups
                ))
            }
        };

        let native_trees = trees
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| RegTree::from_xgb(t, i, n_features))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Loaded XGBoost model: objective={}, features={}, classes={}, trees={}",
            objective.name(),
            n_features,
            n_classes,
            native_trees.len()
        );

        Ok(Self {
            objective,
            n_features,
            n_classes,
            base_margin,
            trees: native_trees,
            tree_groups,
            tree_weights: weights,
            feature_names: learner.feature_names,
        })
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature names stored in the model, empty when trained on a bare matrix.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Raw per-group margins for one row.
    pub fn predict_margin(&self, row: &[f32]) -> Vec<f32> {
        let mut margins = self.base_margin.clone();
        for ((tree, &group), &weight) in self
            .trees
            .iter()
            .zip(self.tree_groups.iter())
            .zip(self.tree_weights.iter())
        {
            margins[group] += weight * tree.predict_leaf(row);
        }
        margins
    }

    fn margins_to_probabilities(&self, margins: &[f32]) -> Vec<f64> {
        match self.objective {
            Objective::BinaryLogistic => {
                let p = 1.0 / (1.0 + (-(margins[0] as f64)).exp());
                vec![1.0 - p, p]
            }
            Objective::MultiSoftprob | Objective::MultiSoftmax => softmax(margins),
        }
    }
}

fn softmax(margins: &[f32]) -> Vec<f64> {
    let max = margins
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = margins.iter().map(|&m| (m as f64 - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

impl Classifier for XGBoostClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn classify(&self, x: &Array2<f64>) -> Result<Vec<Classification>, TransformError> {
        if x.ncols() != self.n_features {
            return Err(TransformError::new(
                Stage::Classification,
                format!("expected {} columns, got {}", self.n_features, x.ncols()),
            ));
        }

        let mut out = Vec::with_capacity(x.nrows());
        let mut row32 = vec![0f32; self.n_features];
        for (r, row) in x.rows().enumerate() {
            for (dst, &v) in row32.iter_mut().zip(row.iter()) {
                *dst = v as f32;
            }
            let margins = self.predict_margin(&row32);
            let probabilities = self.margins_to_probabilities(&margins);
            if probabilities.iter().any(|p| !p.is_finite()) {
                return Err(TransformError::new(
                    Stage::Classification,
                    format!("row {} produced non-finite probabilities", r),
                ));
            }
            out.push(Classification::from_probabilities(probabilities));
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "xgboost"
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("objective", self.objective.name().to_string()),
            ("trees", self.trees.len().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stump(feature: i64, threshold: f32, left: f32, right: f32) -> Value {
        json!({
            "tree_param": {"num_nodes": "3", "num_feature": "2", "num_deleted": "0", "size_leaf_vector": "1"},
            "id": 0,
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "parents": [2147483647, 0, 0],
            "split_indices": [feature, 0, 0],
            "split_conditions": [threshold, left, right],
            "default_left": [1, 0, 0],
            "split_type": [0, 0, 0],
            "base_weights": [0.0, left, right],
            "loss_changes": [1.0, 0.0, 0.0],
            "sum_hessian": [1.0, 1.0, 1.0]
        })
    }

    fn three_class_model() -> Value {
        json!({
            "version": [2, 0, 3],
            "learner": {
                "feature_names": [],
                "feature_types": [],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": "3"},
                        "trees": [
                            stump(0, 0.0, 1.0, -1.0),
                            stump(0, 0.0, -1.0, 1.0),
                            stump(1, 0.5, 0.0, 2.0)
                        ],
                        "tree_info": [0, 1, 2]
                    }
                },
                "objective": {"name": "multi:softprob", "softmax_multiclass_param": {"num_class": "3"}},
                "learner_model_param": {
                    "base_score": "5E-1",
                    "boost_from_average": "1",
                    "num_class": "3",
                    "num_feature": "2",
                    "num_target": "1"
                }
            }
        })
    }

    fn load(value: Value) -> Result<XGBoostClassifier, String> {
        XGBoostClassifier::from_json_str(&value.to_string())
    }

    #[test]
    fn base_score_accepts_all_encodings() {
        let parse = |v: Value| -> Vec<f32> {
            let p: XgbLearnerModelParam = serde_json::from_value(json!({
                "base_score": v, "num_class": 3, "num_feature": "2"
            }))
            .unwrap();
            p.base_score
        };
        assert_eq!(parse(json!(0.5)), vec![0.5]);
        assert_eq!(parse(json!("5E-1")), vec![0.5]);
        assert_eq!(parse(json!("[5E-1]")), vec![0.5]);
        assert_eq!(parse(json!("[1E0,2E0]")), vec![1.0, 2.0]);
        assert_eq!(parse(json!([0.25, 0.75])), vec![0.25, 0.75]);
    }

    #[test]
    fn default_left_accepts_bools_and_ints() {
        let mut tree = stump(0, 0.0, 1.0, 2.0);
        tree["default_left"] = json!([true, false, false]);
        let parsed: XgbTree = serde_json::from_value(tree).unwrap();
        assert_eq!(parsed.default_left, vec![true, false, false]);
    }

    #[test]
    fn softprob_model_routes_rows_through_stumps() {
        let model = load(three_class_model()).unwrap();
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.num_trees(), 3);

        // feature 0 below threshold -> class 0 gets +1, class 1 gets -1
        let x = Array2::from_shape_vec((2, 2), vec![-1.0, 0.0, 1.0, 1.0]).unwrap();
        let out = model.classify(&x).unwrap();
        assert_eq!(out[0].class_index, 0);
        assert_eq!(out[1].class_index, 2);
        for c in &out {
            let sum: f64 = c.probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn missing_value_follows_default_direction() {
        let model = load(three_class_model()).unwrap();
        let margins = model.predict_margin(&[f32::NAN, 0.0]);
        // default_left on the root of every stump
        assert_eq!(margins, vec![1.5, -0.5, 0.5]);
    }

    #[test]
    fn split_is_strictly_less_than() {
        let model = load(three_class_model()).unwrap();
        let at_threshold = model.predict_margin(&[0.0, 0.5]);
        assert_eq!(at_threshold, vec![-0.5, 1.5, 2.5]);
    }

    #[test]
    fn binary_logistic_yields_two_probabilities() {
        let mut value = three_class_model();
        value["learner"]["objective"] = json!({"name": "binary:logistic"});
        value["learner"]["learner_model_param"]["num_class"] = json!("0");
        value["learner"]["gradient_booster"]["model"]["trees"] = json!([stump(0, 0.0, -2.0, 2.0)]);
        value["learner"]["gradient_booster"]["model"]["tree_info"] = json!([0]);
        let model = load(value).unwrap();
        assert_eq!(model.n_classes(), 2);

        let out = model
            .classify(&Array2::row_vector(vec![1.0, 0.0]))
            .unwrap();
        let p = 1.0 / (1.0 + (-2.0f64).exp());
        assert!((out[0].probabilities[1] - p).abs() < 1e-6);
        assert_eq!(out[0].class_index, 1);
    }

    #[test]
    fn dart_weights_scale_leaves() {
        let mut value = three_class_model();
        let trees = value["learner"]["gradient_booster"]["model"].clone();
        value["learner"]["gradient_booster"] = json!({
            "name": "dart",
            "gbtree": {"name": "gbtree", "model": trees},
            "weight_drop": [0.5, 0.5, 0.5]
        });
        let model = load(value).unwrap();
        assert_eq!(model.predict_margin(&[-1.0, 0.0]), vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn rejects_unsupported_objective() {
        let mut value = three_class_model();
        value["learner"]["objective"] = json!({"name": "reg:squarederror"});
        assert!(load(value).unwrap_err().contains("unsupported objective"));
    }

    #[test]
    fn rejects_split_on_unknown_feature() {
        let mut value = three_class_model();
        value["learner"]["gradient_booster"]["model"]["trees"][2] = stump(5, 0.0, 0.0, 1.0);
        assert!(load(value).unwrap_err().contains("feature 5"));
    }

    #[test]
    fn rejects_backward_child_reference() {
        let mut value = three_class_model();
        value["learner"]["gradient_booster"]["model"]["trees"][0]["left_children"] = json!([0, -1, -1]);
        assert!(load(value).unwrap_err().contains("references child"));
    }

    #[test]
    fn rejects_tree_group_out_of_range() {
        let mut value = three_class_model();
        value["learner"]["gradient_booster"]["model"]["tree_info"] = json!([0, 1, 3]);
        assert!(load(value).unwrap_err().contains("output group"));
    }

    #[test]
    fn rejects_class_count_larger_than_ensemble() {
        let mut value = three_class_model();
        value["learner"]["learner_model_param"]["num_class"] = json!("4000000000000");
        assert!(load(value).unwrap_err().contains("output groups"));
    }

    #[test]
    fn rejects_output_group_without_trees() {
        let mut value = three_class_model();
        value["learner"]["gradient_booster"]["model"]["tree_info"] = json!([0, 1, 1]);
        assert_eq!(load(value).unwrap_err(), "output group 2 has no trees");
    }

    #[test]
    fn classify_rejects_wrong_width() {
        let model = load(three_class_model()).unwrap();
        let err = model
            .classify(&Array2::row_vector(vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert_eq!(err.stage, Stage::Classification);
    }
}
