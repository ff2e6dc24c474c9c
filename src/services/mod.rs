mod enrichment;
mod error;
mod export;
mod ingest;
mod kpi;
mod recommendations;
mod snapshots;

#[cfg(test)]
mod tests;

pub use enrichment::{CoercionPolicy, EnrichmentService, enrich_rows};
pub use error::{ServiceError, ServiceResult};
pub use export::ExportService;
pub use ingest::{IngestService, IngestSummary};
pub use kpi::KpiService;
pub use recommendations::RecommendationService;
pub use snapshots::{MonthSnapshot, SnapshotStore};

/// Round to 2 decimal places (currency amounts).
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 4 decimal places (ratios and percentage changes).
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Round to 1 decimal place (display percentages).
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
