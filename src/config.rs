use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::fusion::FusionStrategy;

pub const DEFAULT_LEXICAL_FILE: &str = "bm25_test.json";
pub const DEFAULT_BATCH_TOP_K: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub weight: f64,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>, weight: f64) -> Self {
        Self {
            path: path.into(),
            weight,
        }
    }
}

/// Validated inputs of one fusion run. The first source is the dense model
/// ranking, the second the lexical ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionSpec {
    sources: Vec<SourceSpec>,
    strategy: FusionStrategy,
    top_k: usize,
}

impl FusionSpec {
    pub fn new(
        sources: Vec<SourceSpec>,
        strategy: FusionStrategy,
        top_k: usize,
    ) -> Result<Self, ConfigError> {
        let weights = sources
            .iter()
            .map(|source| source.weight)
            .collect::<Vec<f64>>();
        validate_fusion(strategy, sources.len(), &weights, top_k)?;

        Ok(Self {
            sources,
            strategy,
            top_k,
        })
    }

    pub fn sources(&self) -> &[SourceSpec] {
        &self.sources
    }

    pub fn strategy(&self) -> FusionStrategy {
        self.strategy
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn weights(&self) -> Vec<f64> {
        self.sources.iter().map(|source| source.weight).collect()
    }
}

pub fn validate_fusion(
    strategy: FusionStrategy,
    source_count: usize,
    weights: &[f64],
    top_k: usize,
) -> Result<(), ConfigError> {
    if top_k == 0 {
        return Err(ConfigError::NonPositiveTopK);
    }
    if source_count == 0 {
        return Err(ConfigError::NoSources);
    }
    if weights.len() != source_count {
        return Err(ConfigError::WeightCount(weights.len(), source_count));
    }
    if let Some((index, value)) = weights
        .iter()
        .enumerate()
        .find(|(_, weight)| !weight.is_finite())
    {
        return Err(ConfigError::NonFiniteWeight {
            index,
            value: *value,
        });
    }
    if let Some(expected) = strategy.required_sources()
        && expected != source_count
    {
        return Err(ConfigError::SourceCount {
            strategy: strategy.as_str(),
            expected,
            actual: source_count,
        });
    }
    Ok(())
}

/// Batch fusion plan, read from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct FusionPlan {
    pub results_dir: PathBuf,
    #[serde(default = "default_strategy_tag")]
    pub strategy: String,
    #[serde(default = "default_batch_top_k")]
    pub top_k: usize,
    /// Lexical file used for discovered models.
    #[serde(default = "default_lexical_file", alias = "bm25")]
    pub lexical: String,
    #[serde(default = "default_discovered_model_weight")]
    pub model_weight: f64,
    #[serde(default = "default_weight", alias = "bm25_weight")]
    pub lexical_weight: f64,
    /// Explicit pairs; when empty, model files are discovered in `results_dir`.
    #[serde(default)]
    pub pairs: Vec<PairSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairSpec {
    pub model: String,
    #[serde(default = "default_weight")]
    pub model_weight: f64,
    #[serde(default = "default_lexical_file", alias = "bm25")]
    pub lexical: String,
    #[serde(default = "default_weight", alias = "bm25_weight")]
    pub lexical_weight: f64,
    pub output: String,
}

/// One resolved fusion of a batch: its spec and where the result goes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFusion {
    pub spec: FusionSpec,
    pub output_path: PathBuf,
}

impl FusionPlan {
    pub fn strategy(&self) -> Result<FusionStrategy, ConfigError> {
        self.strategy.parse::<FusionStrategy>()
    }

    /// Resolves explicit pairs. Output names gain a `<strategy>_` prefix
    /// unless they already carry it.
    pub fn resolve_pairs(&self) -> Result<Vec<PlannedFusion>, ConfigError> {
        let strategy = self.strategy()?;
        let prefix = format!("{}_", strategy.as_str());

        self.pairs
            .iter()
            .map(|pair| {
                let output = if pair.output.starts_with(&prefix) {
                    pair.output.clone()
                } else {
                    format!("{prefix}{}", pair.output)
                };
                let spec = FusionSpec::new(
                    vec![
                        SourceSpec::new(self.results_dir.join(&pair.model), pair.model_weight),
                        SourceSpec::new(
                            self.results_dir.join(&pair.lexical),
                            pair.lexical_weight,
                        ),
                    ],
                    strategy,
                    self.top_k,
                )?;
                Ok(PlannedFusion {
                    spec,
                    output_path: self.results_dir.join(output),
                })
            })
            .collect()
    }

    /// Pairs every discovered model file with the plan's lexical file.
    pub fn resolve_discovered(
        &self,
        model_files: &[String],
    ) -> Result<Vec<PlannedFusion>, ConfigError> {
        let strategy = self.strategy()?;
        let lexical_path = self.results_dir.join(&self.lexical);

        model_files
            .iter()
            .map(|model_file| {
                let spec = FusionSpec::new(
                    vec![
                        SourceSpec::new(self.results_dir.join(model_file), self.model_weight),
                        SourceSpec::new(&lexical_path, self.lexical_weight),
                    ],
                    strategy,
                    self.top_k,
                )?;
                let output = format!("ensemble_{}_bm25.json", model_name(Path::new(model_file)));
                Ok(PlannedFusion {
                    spec,
                    output_path: self.results_dir.join(output),
                })
            })
            .collect()
    }
}

/// File stem without a trailing `_test` split marker.
pub fn model_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    stem.strip_suffix("_test").unwrap_or(stem).to_string()
}

fn default_strategy_tag() -> String {
    FusionStrategy::Sum.as_str().to_string()
}

fn default_batch_top_k() -> usize {
    DEFAULT_BATCH_TOP_K
}

fn default_lexical_file() -> String {
    DEFAULT_LEXICAL_FILE.to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_discovered_model_weight() -> f64 {
    1.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_top_k_and_bad_weights() {
        let sources = vec![
            SourceSpec::new("dense.json", 1.0),
            SourceSpec::new("bm25.json", 1.0),
        ];
        assert!(matches!(
            FusionSpec::new(sources.clone(), FusionStrategy::Product, 0),
            Err(ConfigError::NonPositiveTopK)
        ));

        let nan_weight = vec![
            SourceSpec::new("dense.json", f64::NAN),
            SourceSpec::new("bm25.json", 1.0),
        ];
        assert!(matches!(
            FusionSpec::new(nan_weight, FusionStrategy::Sum, 10),
            Err(ConfigError::NonFiniteWeight { index: 0, .. })
        ));

        let spec = FusionSpec::new(sources, FusionStrategy::ProductRank, 10)
            .expect("valid spec");
        assert_eq!(spec.weights(), vec![1.0, 1.0]);
    }

    #[test]
    fn product_strategies_need_exactly_two_sources() {
        let three = vec![
            SourceSpec::new("a.json", 1.0),
            SourceSpec::new("b.json", 1.0),
            SourceSpec::new("c.json", 1.0),
        ];
        assert!(matches!(
            FusionSpec::new(three.clone(), FusionStrategy::ProductBm25Rank, 5),
            Err(ConfigError::SourceCount { expected: 2, actual: 3, .. })
        ));
        assert!(FusionSpec::new(three, FusionStrategy::Sum, 5).is_ok());
    }

    #[test]
    fn plan_pairs_get_strategy_prefix_once() {
        let plan: FusionPlan = serde_json::from_str(
            r#"{
                "results_dir": "results/private_test",
                "strategy": "product_rank",
                "top_k": 1000,
                "pairs": [
                    {"model": "bge_512.json", "bm25": "bm25_512.json", "output": "ensemble_bge.json"},
                    {"model": "gte.json", "model_weight": 1.2, "output": "product_rank_gte.json"}
                ]
            }"#,
        )
        .expect("plan should deserialize");

        let planned = plan.resolve_pairs().expect("pairs resolve");
        assert_eq!(planned.len(), 2);
        assert_eq!(
            planned[0].output_path,
            PathBuf::from("results/private_test/product_rank_ensemble_bge.json")
        );
        assert_eq!(
            planned[0].spec.sources()[1].path,
            PathBuf::from("results/private_test/bm25_512.json")
        );
        assert_eq!(
            planned[1].output_path,
            PathBuf::from("results/private_test/product_rank_gte.json")
        );
        assert_eq!(planned[1].spec.weights(), vec![1.2, 1.0]);
        assert_eq!(planned[1].spec.top_k(), 1000);
    }

    #[test]
    fn unknown_plan_strategy_is_a_config_error() {
        let plan: FusionPlan =
            serde_json::from_str(r#"{"results_dir": "r", "strategy": "max"}"#)
                .expect("plan should deserialize");
        assert!(matches!(
            plan.resolve_pairs(),
            Err(ConfigError::UnknownStrategy(tag)) if tag == "max"
        ));
    }

    #[test]
    fn discovered_models_use_ensemble_names() {
        let plan: FusionPlan =
            serde_json::from_str(r#"{"results_dir": "results/test"}"#).expect("plan");
        let planned = plan
            .resolve_discovered(&["bge_m3_test.json".to_string()])
            .expect("discovered pairs resolve");

        assert_eq!(planned[0].spec.strategy(), FusionStrategy::Sum);
        assert_eq!(planned[0].spec.weights(), vec![1.1, 1.0]);
        assert_eq!(
            planned[0].output_path,
            PathBuf::from("results/test/ensemble_bge_m3_bm25.json")
        );
        assert_eq!(model_name(Path::new("gte_base.json")), "gte_base");
    }
}
