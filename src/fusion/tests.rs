use std::collections::HashMap;

use super::*;
use crate::error::Error;
use crate::model::ChunkId;
use crate::scores::{ScoreBounds, rank_map};

fn source(queries: &[(i64, &[(&str, f64)])]) -> ScoreMap {
    queries
        .iter()
        .map(|(qid, entries)| {
            let scores = entries
                .iter()
                .map(|(id, score)| ScoredChunk::new(*id, *score))
                .collect::<QueryScores>();
            (QueryId::Number(*qid), scores)
        })
        .collect()
}

fn ranked(fused: &ScoreMap, qid: i64) -> Vec<(String, f64)> {
    fused
        .get(&QueryId::Number(qid))
        .expect("query present in fused output")
        .entries()
        .iter()
        .map(|entry| (entry.chunk_id.to_string(), entry.score))
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn strategy_tags_parse_from_plan_spellings() {
    assert_eq!("sum".parse::<FusionStrategy>().expect("sum"), FusionStrategy::Sum);
    assert_eq!(
        "product-bm25-rank".parse::<FusionStrategy>().expect("kebab"),
        FusionStrategy::ProductBm25Rank
    );
    assert_eq!(
        " Product_Rank ".parse::<FusionStrategy>().expect("mixed case"),
        FusionStrategy::ProductRank
    );
    assert!("rrf".parse::<FusionStrategy>().is_err());
}

#[test]
fn min_max_maps_global_extremes_to_zero_and_one() {
    let dense = source(&[
        (1, &[("1_0", 10.0), ("2_0", 6.0)]),
        (2, &[("3_0", 2.0)]),
    ]);
    let sources = [FusionSource::new(&dense)];

    let bounds = ScoreBounds::of(&dense).expect("non-empty source");
    assert_eq!((bounds.min, bounds.max), (2.0, 10.0));

    let fused = fuse(&sources, &[1.0], FusionStrategy::Sum, 10).expect("fusion");
    assert_eq!(ranked(&fused, 1), vec![("1_0".to_string(), 1.0), ("2_0".to_string(), 0.5)]);
    assert_eq!(ranked(&fused, 2), vec![("3_0".to_string(), 0.0)]);
}

#[test]
fn min_max_sums_weighted_contributions_and_keeps_single_source_chunks() {
    let dense = source(&[(1, &[("1_0", 1.0), ("2_0", 0.0)])]);
    let lexical = source(&[(1, &[("2_0", 20.0), ("3_0", 10.0), ("4_0", 0.0)])]);
    let sources = [FusionSource::new(&dense), FusionSource::new(&lexical)];

    let fused = fuse(&sources, &[2.0, 1.0], FusionStrategy::Sum, 10).expect("fusion");
    let scores = ranked(&fused, 1).into_iter().collect::<HashMap<String, f64>>();

    assert_close(scores["1_0"], 2.0);
    assert_close(scores["2_0"], 1.0);
    assert_close(scores["3_0"], 0.5);
    assert_close(scores["4_0"], 0.0);
}

#[test]
fn degenerate_source_contributes_zero() {
    let dense = source(&[(1, &[("1_0", 0.7)]), (2, &[("2_0", 0.7)])]);
    let lexical = source(&[(1, &[("1_0", 4.0), ("3_0", 2.0)])]);
    let sources = [FusionSource::new(&dense), FusionSource::new(&lexical)];

    let fused = fuse(&sources, &[1.0, 1.0], FusionStrategy::Sum, 10).expect("fusion");
    assert_eq!(
        ranked(&fused, 1),
        vec![("1_0".to_string(), 1.0), ("3_0".to_string(), 0.0)]
    );
    assert_eq!(ranked(&fused, 2), vec![("2_0".to_string(), 0.0)]);
}

#[test]
fn product_multiplies_shared_chunks_and_weights_single_source_chunks() {
    let dense = source(&[(1, &[("1_0", 0.9), ("2_0", 0.5)])]);
    let lexical = source(&[(1, &[("2_0", 12.0), ("3_0", 3.0)])]);
    let sources = [FusionSource::new(&dense), FusionSource::new(&lexical)];

    let fused = fuse(&sources, &[2.0, 0.5], FusionStrategy::Product, 10).expect("fusion");
    let scores = ranked(&fused, 1).into_iter().collect::<HashMap<String, f64>>();

    assert_close(scores["2_0"], (2.0 * 0.5) * (0.5 * 12.0));
    assert_close(scores["1_0"], 2.0 * 0.9);
    assert_close(scores["3_0"], 0.5 * 3.0);
}

#[test]
fn product_of_disjoint_sources_is_the_union_of_weighted_scores() {
    let dense = source(&[(1, &[("1_0", 0.8), ("2_0", 0.4)]), (2, &[("5_0", 0.3)])]);
    let lexical = source(&[(1, &[("3_0", 6.0)]), (3, &[("6_0", 1.0)])]);
    let sources = [FusionSource::new(&dense), FusionSource::new(&lexical)];

    let fused = fuse(&sources, &[1.5, 0.1], FusionStrategy::Product, 10).expect("fusion");

    let query = ranked(&fused, 1);
    assert_eq!(query.len(), 3);
    let scores = query.into_iter().collect::<HashMap<String, f64>>();
    assert_close(scores["1_0"], 1.5 * 0.8);
    assert_close(scores["2_0"], 1.5 * 0.4);
    assert_close(scores["3_0"], 0.1 * 6.0);

    assert_eq!(fused.len(), 3);
    assert_close(ranked(&fused, 2)[0].1, 1.5 * 0.3);
    assert_close(ranked(&fused, 3)[0].1, 0.1 * 1.0);
}

#[test]
fn dense_rank_decay_applies_to_shared_and_dense_only_chunks() {
    let dense = source(&[(1, &[("1_0", 0.5), ("2_0", 0.9), ("3_0", 0.6)])]);
    let lexical = source(&[(1, &[("2_0", 4.0), ("9_0", 2.0)])]);
    let dense_ranks = rank_map(&dense);
    let lexical_ranks = rank_map(&lexical);
    let sources = [
        FusionSource::with_ranks(&dense, &dense_ranks),
        FusionSource::with_ranks(&lexical, &lexical_ranks),
    ];

    let fused = fuse(&sources, &[1.0, 1.0], FusionStrategy::ProductRank, 10).expect("fusion");
    let scores = ranked(&fused, 1).into_iter().collect::<HashMap<String, f64>>();

    assert_close(scores["1_0"], 0.5);
    assert_close(scores["2_0"], 0.9 * 4.0 / 2.0);
    assert_close(scores["3_0"], 0.6 / 3.0);
    assert_close(scores["9_0"], 2.0);
}

#[test]
fn lexical_rank_decay_applies_to_shared_and_lexical_only_chunks() {
    let dense = source(&[(1, &[("1_0", 0.5), ("2_0", 0.9)])]);
    let lexical = source(&[(1, &[("9_0", 8.0), ("2_0", 4.0)])]);
    let lexical_ranks = rank_map(&lexical);
    let sources = [
        FusionSource::new(&dense),
        FusionSource::with_ranks(&lexical, &lexical_ranks),
    ];

    let fused =
        fuse(&sources, &[1.0, 1.0], FusionStrategy::ProductBm25Rank, 10).expect("fusion");
    let scores = ranked(&fused, 1).into_iter().collect::<HashMap<String, f64>>();

    assert_close(scores["1_0"], 0.5);
    assert_close(scores["2_0"], 0.9 * 4.0 / 2.0);
    assert_close(scores["9_0"], 8.0);
}

#[test]
fn rank_decay_without_ranks_reduces_to_plain_product() {
    let dense = source(&[(1, &[("1_0", 0.5), ("2_0", 0.9), ("3_0", 0.2)])]);
    let lexical = source(&[(1, &[("2_0", 4.0), ("4_0", 1.0)]), (2, &[("5_0", 3.0)])]);
    let no_ranks = RankMap::new();

    let plain = fuse(
        &[FusionSource::new(&dense), FusionSource::new(&lexical)],
        &[1.2, 0.8],
        FusionStrategy::Product,
        10,
    )
    .expect("plain product");

    for strategy in [FusionStrategy::ProductRank, FusionStrategy::ProductBm25Rank] {
        let decayed = fuse(
            &[
                FusionSource::with_ranks(&dense, &no_ranks),
                FusionSource::with_ranks(&lexical, &no_ranks),
            ],
            &[1.2, 0.8],
            strategy,
            10,
        )
        .expect("decayed product");
        assert_eq!(decayed, plain, "{} should fall back", strategy.as_str());
    }
}

#[test]
fn output_is_truncated_and_sorted_descending() {
    let dense = source(&[(1, &[("1_0", 0.1), ("2_0", 0.9), ("3_0", 0.5), ("4_0", 0.7)])]);
    let lexical = source(&[(1, &[])]);
    let sources = [FusionSource::new(&dense), FusionSource::new(&lexical)];

    let fused = fuse(&sources, &[1.0, 1.0], FusionStrategy::Product, 2).expect("fusion");
    let ids = ranked(&fused, 1)
        .into_iter()
        .map(|(id, _)| id)
        .collect::<Vec<String>>();
    assert_eq!(ids, vec!["2_0", "4_0"]);
}

#[test]
fn equal_scores_keep_generation_order() {
    // Shared chunks come first, then dense-only, then lexical-only, each in
    // source order.
    let dense = source(&[(1, &[("1_0", 1.0), ("2_0", 2.0), ("3_0", 1.0)])]);
    let lexical = source(&[(1, &[("4_0", 2.0), ("2_0", 0.5)])]);
    let sources = [FusionSource::new(&dense), FusionSource::new(&lexical)];

    let fused = fuse(&sources, &[1.0, 1.0], FusionStrategy::Product, 10).expect("fusion");
    let ids = ranked(&fused, 1)
        .into_iter()
        .map(|(id, _)| id)
        .collect::<Vec<String>>();
    assert_eq!(ids, vec!["4_0", "2_0", "1_0", "3_0"]);

    let tied = source(&[(1, &[("7_0", 5.0), ("8_0", 5.0)])]);
    let other = source(&[(1, &[("9_0", 5.0), ("7_0", 5.0)])]);
    let sources = [FusionSource::new(&tied), FusionSource::new(&other)];
    let fused = fuse(&sources, &[1.0, 1.0], FusionStrategy::Sum, 10).expect("fusion");
    let ids = ranked(&fused, 1)
        .into_iter()
        .map(|(id, _)| id)
        .collect::<Vec<String>>();
    assert_eq!(ids, vec!["7_0", "8_0", "9_0"]);
}

#[test]
fn queries_without_chunks_stay_empty() {
    let dense = source(&[(1, &[]), (2, &[("1_0", 1.0)])]);
    let lexical = source(&[(1, &[])]);
    let sources = [FusionSource::new(&dense), FusionSource::new(&lexical)];

    let fused = fuse(&sources, &[1.0, 1.0], FusionStrategy::Sum, 5).expect("fusion");
    assert!(ranked(&fused, 1).is_empty());
    assert_eq!(ranked(&fused, 2).len(), 1);
}

#[test]
fn invalid_configuration_is_rejected_before_fusing() {
    let dense = source(&[(1, &[("1_0", 1.0)])]);
    let sources = [FusionSource::new(&dense)];

    let error = fuse(&sources, &[1.0], FusionStrategy::Product, 5).expect_err("one source");
    assert!(matches!(
        error,
        Error::Config(ConfigError::SourceCount { expected: 2, actual: 1, .. })
    ));

    let error = fuse(&sources, &[1.0], FusionStrategy::Sum, 0).expect_err("zero top-k");
    assert!(matches!(error, Error::Config(ConfigError::NonPositiveTopK)));

    let error = fuse(&sources, &[f64::INFINITY], FusionStrategy::Sum, 3).expect_err("inf weight");
    assert!(matches!(
        error,
        Error::Config(ConfigError::NonFiniteWeight { index: 0, .. })
    ));
}

#[test]
fn fused_chunk_ids_are_unique_per_query() {
    let dense = source(&[(1, &[("1_0", 0.3), ("1_1", 0.2)])]);
    let lexical = source(&[(1, &[("1_1", 2.0), ("1_0", 1.0)])]);
    let sources = [FusionSource::new(&dense), FusionSource::new(&lexical)];

    for strategy in [FusionStrategy::Sum, FusionStrategy::Product] {
        let fused = fuse(&sources, &[1.0, 1.0], strategy, 10).expect("fusion");
        let query = fused.get(&QueryId::Number(1)).expect("query 1");
        assert_eq!(query.len(), 2);
        assert!(query.contains(&ChunkId::new("1_0")));
    }
}
