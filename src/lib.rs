//! costpilot: cost analytics and optimization recommendations for cloud
//! billing data.
//!
//! Billing line items are ingested into a relational store, enriched with
//! ownership metadata, and queried through a small functional surface: KPI
//! aggregations (monthly breakdowns, owner coverage, trends, unit-cost
//! deltas) and three recommendation detectors (idle resources, cost spikes,
//! tagging gaps).

pub mod config;
pub mod db;
pub mod models;
pub mod services;
