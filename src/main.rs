use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use costpilot::{
    config::{CopilotConfig, DatabaseConfig, LogFormat, ObservabilityConfig},
    db::DbPool,
    models::GroupBy,
    services::{
        EnrichmentService, ExportService, IngestService, KpiService, MonthSnapshot,
        RecommendationService, ServiceResult, SnapshotStore,
    },
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "costpilot", version, about = "Cost analytics and optimization recommendations for cloud billing data")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when the
    /// file does not exist.
    #[arg(short, long, default_value = "costpilot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the billing/resources join: row counts and cost conservation
    EnrichCheck,

    /// Cost per owner for one month, highest first
    MonthlyOwner {
        #[arg(long)]
        month: String,
    },

    /// Cost per environment for one month, highest first
    MonthlyEnv {
        #[arg(long)]
        month: String,
    },

    /// Fraction of one month's cost attributable to a known owner
    OwnerCoverage {
        #[arg(long)]
        month: String,
    },

    /// Cost pivot over the six most recent months
    SixTrend {
        #[arg(long, value_enum, default_value = "owner")]
        group_by: GroupBy,
    },

    /// The n most expensive resource cohorts in one month
    TopN {
        #[arg(long)]
        month: String,
        #[arg(long, default_value_t = 10)]
        n: usize,
    },

    /// Resource-months with significant unit-cost changes
    UnitChanges {
        #[arg(long, default_value_t = 0.2)]
        threshold: f64,
    },

    /// Run all detectors and print the merged recommendation report
    Recommendations,

    /// Ingest a billing CSV export
    Ingest {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Upsert resource metadata from a CSV file
    IngestResources {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Export latest-month KPI CSVs
    ExportCsvs {
        #[arg(long, default_value = "data/exports")]
        out: PathBuf,
    },

    /// Compute and cache KPIs for one month
    CacheMonth {
        #[arg(long)]
        month: String,
    },

    /// Print the cached KPIs for one month, if present
    ShowCache {
        #[arg(long)]
        month: String,
    },

    /// Drop the cached KPIs for one month
    InvalidateCache {
        #[arg(long)]
        month: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = if args.config.exists() {
        match CopilotConfig::from_file(&args.config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        CopilotConfig::default()
    };

    init_tracing(&config.observability);

    match run(args.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: CopilotConfig) -> ServiceResult<()> {
    let db = Arc::new(DbPool::from_config(&config.database).await?);
    if let DatabaseConfig::Sqlite(cfg) = &config.database
        && cfg.run_migrations
    {
        db.run_migrations().await?;
    }

    match command {
        Command::EnrichCheck => {
            let report = EnrichmentService::new(db).report().await?;
            println!("billing rows:   {}", report.billing_rows);
            println!("resources rows: {}", report.resource_rows);
            println!("enriched rows:  {}", report.enriched_rows);
            println!("total cost before join: {:.4}", report.total_cost_before);
            println!("total cost after join:  {:.4}", report.total_cost_after);
        }
        Command::MonthlyOwner { month } => {
            let rows = KpiService::new(db).monthly_cost_by_owner(&month).await?;
            print_json(&rows)?;
        }
        Command::MonthlyEnv { month } => {
            let rows = KpiService::new(db).monthly_cost_by_env(&month).await?;
            print_json(&rows)?;
        }
        Command::OwnerCoverage { month } => {
            let coverage = KpiService::new(db).owner_coverage(&month).await?;
            print_json(&coverage)?;
        }
        Command::SixTrend { group_by } => {
            let trend = KpiService::new(db).six_month_trend(group_by).await?;
            print_json(&trend)?;
        }
        Command::TopN { month, n } => {
            let drivers = KpiService::new(db).top_n_cost_drivers(&month, n).await?;
            print_json(&drivers)?;
        }
        Command::UnitChanges { threshold } => {
            let changes = KpiService::new(db).unit_cost_changes(threshold).await?;
            print_json(&changes)?;
        }
        Command::Recommendations => {
            let report = RecommendationService::new(db, config.detectors)
                .get_all_recommendations()
                .await?;
            print_json(&report)?;
        }
        Command::Ingest { input } => {
            let summary = IngestService::new(db).ingest_csv(&input).await?;
            print_json(&summary)?;
        }
        Command::IngestResources { input } => {
            let applied = IngestService::new(db).ingest_resources_csv(&input).await?;
            println!("Upserted {applied} resource rows");
        }
        Command::ExportCsvs { out } => {
            let written = ExportService::new(db).export_csvs(&out).await?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Command::CacheMonth { month } => {
            let kpi = KpiService::new(db);
            let snapshot = MonthSnapshot {
                month: month.clone(),
                by_owner: kpi.monthly_cost_by_owner(&month).await?,
                by_env: kpi.monthly_cost_by_env(&month).await?,
                coverage: kpi.owner_coverage(&month).await?,
            };
            SnapshotStore::new(&config.snapshots).write_month(&snapshot)?;
            println!("Cached KPIs for {month}");
        }
        Command::ShowCache { month } => {
            match SnapshotStore::new(&config.snapshots).load_month(&month)? {
                Some(snapshot) => print_json(&snapshot)?,
                None => println!("No cached KPIs for {month}"),
            }
        }
        Command::InvalidateCache { month } => {
            if SnapshotStore::new(&config.snapshots).invalidate(&month)? {
                println!("Invalidated cached KPIs for {month}");
            } else {
                println!("No cached KPIs for {month}");
            }
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> ServiceResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the config
/// filter, which wins over the configured level.
fn init_tracing(config: &ObservabilityConfig) {
    let logging = &config.logging;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = logging
            .filter
            .clone()
            .unwrap_or_else(|| logging.level.as_str().to_string());
        EnvFilter::new(directives)
    });

    match logging.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json();
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer().compact();
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
    }
}
