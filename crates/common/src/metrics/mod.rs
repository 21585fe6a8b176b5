//! Metrics and observability utilities
//!
//! Provides metric registration and recording helpers with
//! standardized naming conventions. Exporter installation is the
//! host's concern; this module only uses the `metrics` facade.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all PrimeLit metrics
pub const METRICS_PREFIX: &str = "primelit";

/// Register all metric descriptions
pub fn register_metrics() {
    // Search / ingest metrics
    describe_counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        Unit::Count,
        "Total searches run through the pipeline"
    );

    describe_counter!(
        format!("{}_articles_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total articles upserted during ingest"
    );

    describe_counter!(
        format!("{}_enrichment_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Per-article enrichment steps that failed and were skipped"
    );

    describe_histogram!(
        format!("{}_ingest_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end ingest latency per search"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    // Clustering metrics
    describe_histogram!(
        format!("{}_clustering_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Full clustering pass latency in seconds"
    );

    describe_gauge!(
        format!("{}_clusters_active", METRICS_PREFIX),
        Unit::Count,
        "Number of persisted clusters after the last pass"
    );

    describe_gauge!(
        format!("{}_clustered_noise_points", METRICS_PREFIX),
        Unit::Count,
        "Vectors labeled as noise after the last pass"
    );

    // Scoring metrics
    describe_counter!(
        format!("{}_scoring_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total scoring passes"
    );

    describe_histogram!(
        format!("{}_scoring_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Scoring pass latency per search"
    );

    tracing::info!("Metrics registered");
}

/// Record one completed ingest
pub fn record_ingest(duration_secs: f64, articles: usize) {
    counter!(format!("{}_searches_total", METRICS_PREFIX)).increment(1);

    counter!(format!("{}_articles_ingested_total", METRICS_PREFIX)).increment(articles as u64);

    histogram!(format!("{}_ingest_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record one isolated enrichment failure
pub fn record_enrichment_failure(step: &str) {
    counter!(
        format!("{}_enrichment_failures_total", METRICS_PREFIX),
        "step" => step.to_string()
    )
    .increment(1);
}

/// Record an embedding call
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

/// Record one clustering pass
pub fn record_clustering(duration_secs: f64, clusters: usize, noise: usize) {
    histogram!(format!("{}_clustering_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_clusters_active", METRICS_PREFIX)).set(clusters as f64);

    gauge!(format!("{}_clustered_noise_points", METRICS_PREFIX)).set(noise as f64);
}

/// Record one scoring pass
pub fn record_scoring(duration_secs: f64) {
    counter!(format!("{}_scoring_runs_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_scoring_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}
