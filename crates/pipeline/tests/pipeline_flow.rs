//! End-to-end pipeline tests over the in-memory store

mod common;

use common::{coordinator, seed_records, wait_for_score};
use primelit_common::db::models::NOISE_LABEL;
use primelit_common::db::{MemoryStore, Store};
use primelit_common::errors::{AppError, ScoreStatus};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn first_search_on_empty_history_scores_one() {
    let store = Arc::new(MemoryStore::new());
    let (records, series) = seed_records();
    let coordinator = coordinator(store.clone(), records, series, false);

    let search_id = coordinator
        .run_search(
            "CRISPR sickle cell disease therapy",
            "crispr; sickle cell; gene therapy",
            3,
            None,
        )
        .await
        .unwrap();

    let score = wait_for_score(&coordinator, search_id).await;

    // First entry in history: every normalized component is 1.0
    assert!((score.novelty_score - 1.0).abs() < 1e-9);
    assert!((score.citation_velocity_score - 1.0).abs() < 1e-9);
    assert!((score.recency_score - 1.0).abs() < 1e-9);
    assert!((score.overall_score - 1.0).abs() < 1e-9);

    // The raw components behind it: novelty 1.0 (empty complement),
    // velocity = mean of slopes {6.5, 0, 1.0}, recency from ages
    // {1, 1, 4} with tau 5
    let record = coordinator.rescore(search_id).await.unwrap();
    assert!((record.raw.novelty - 1.0).abs() < 1e-9);
    assert!((record.raw.citation - 2.5).abs() < 1e-9);

    let tau = 5.0f64;
    let expected_recency = (2.0 * (-1.0 / tau).exp() + (-4.0 / tau).exp()) / 3.0;
    assert!((record.raw.recency - expected_recency).abs() < 1e-9);
}

#[tokio::test]
async fn duplicate_ingest_grows_no_articles() {
    let store = Arc::new(MemoryStore::new());
    let (records, series) = seed_records();
    let coordinator = coordinator(store.clone(), records, series, false);

    let first = coordinator
        .run_search("idea", "crispr; sickle cell", 3, None)
        .await
        .unwrap();
    let second = coordinator
        .run_search("idea", "crispr; sickle cell", 3, None)
        .await
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(store.article_count(), 3);
    assert_eq!(store.link_count(first), 3);
    assert_eq!(store.link_count(second), 3);

    wait_for_score(&coordinator, first).await;
    wait_for_score(&coordinator, second).await;
}

#[tokio::test]
async fn failed_fetch_leaves_search_row_scorable() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(store.clone(), Vec::new(), Default::default(), true);

    let err = coordinator
        .run_search("idea", "crispr", 3, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermanentRemote { .. }));

    // The search row was created before the fetch and survives
    let (searches, total) = store.list_searches(0, 10).await.unwrap();
    assert_eq!(total, 1);
    let search_id = searches[0].search_id;
    assert_eq!(store.link_count(search_id), 0);

    // Scoring the empty search yields the boundary raw values
    let record = coordinator.rescore(search_id).await.unwrap();
    assert_eq!(record.raw.novelty, 1.0);
    assert_eq!(record.raw.citation, 0.0);
    assert_eq!(record.raw.recency, 0.0);
}

#[tokio::test]
async fn overall_score_is_the_contract_combination() {
    let store = Arc::new(MemoryStore::new());
    let (records, series) = seed_records();
    let coordinator = coordinator(store.clone(), records, series, false);

    let search_id = coordinator
        .run_search("idea", "crispr", 3, None)
        .await
        .unwrap();
    let score = wait_for_score(&coordinator, search_id).await;

    for value in [
        score.novelty_score,
        score.citation_velocity_score,
        score.recency_score,
        score.overall_score,
    ] {
        assert!((0.0..=1.0).contains(&value));
    }

    let expected = 0.4 * score.novelty_score
        + 0.4 * score.citation_velocity_score
        + 0.2 * score.recency_score;
    assert!((score.overall_score - expected).abs() < 1e-6);
}

#[tokio::test]
async fn small_population_stays_unclustered() {
    let store = Arc::new(MemoryStore::new());
    let (records, series) = seed_records();
    let coordinator = coordinator(store.clone(), records, series, false);

    let search_id = coordinator
        .run_search("idea", "crispr", 3, None)
        .await
        .unwrap();
    wait_for_score(&coordinator, search_id).await;

    // Three vectors against the default min_cluster_size of five:
    // everything is noise and no cluster rows exist
    let vectors = store.all_vectors().await.unwrap();
    assert_eq!(vectors.len(), 3);
    assert!(vectors.iter().all(|v| v.cluster_label == Some(NOISE_LABEL)));
    assert!(store.list_clusters().await.unwrap().is_empty());
}

#[tokio::test]
async fn get_score_distinguishes_not_ready_from_unknown() {
    let store = Arc::new(MemoryStore::new());
    let (records, series) = seed_records();
    let coordinator = coordinator(store.clone(), records, series, false);

    // Unknown search id
    let err = coordinator.get_score(41).await.unwrap_err();
    assert!(matches!(err, AppError::SearchNotFound { id: 41 }));

    // Existing but unscored search
    let search_id = store.create_search("idea", "kw", 3, None).await.unwrap();
    assert_eq!(
        coordinator.get_score(search_id).await.unwrap(),
        ScoreStatus::NotReady
    );
}

#[tokio::test]
async fn read_passthroughs_reflect_the_store() {
    let store = Arc::new(MemoryStore::new());
    let (records, series) = seed_records();
    let coordinator = coordinator(store.clone(), records, series, false);

    let search_id = coordinator
        .run_search("idea", "crispr", 3, None)
        .await
        .unwrap();
    wait_for_score(&coordinator, search_id).await;

    let (articles, total) = coordinator.list_articles(0, 10).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(articles.len(), 3);

    let article = coordinator.get_article("101").await.unwrap().unwrap();
    assert_eq!(
        article.title,
        "CRISPR gene editing for sickle cell disease"
    );
    assert!(coordinator.get_article("999").await.unwrap().is_none());

    let (searches, _) = coordinator.list_searches(0, 10).await.unwrap();
    assert_eq!(searches[0].keyword_text, "crispr");
}

#[tokio::test]
async fn shutdown_drains_and_stops_new_scoring() {
    let store = Arc::new(MemoryStore::new());
    let (records, series) = seed_records();
    let coordinator = coordinator(store.clone(), records, series, false);

    let scored = coordinator
        .run_search("idea", "crispr", 3, None)
        .await
        .unwrap();
    coordinator.shutdown(Duration::from_secs(5)).await;

    // The in-flight scoring task was drained to completion
    assert!(coordinator.get_score(scored).await.unwrap().is_ready());

    // New searches still ingest, but scoring is no longer scheduled
    let unscored = coordinator
        .run_search("idea", "gene therapy", 3, None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        coordinator.get_score(unscored).await.unwrap(),
        ScoreStatus::NotReady
    );
}
