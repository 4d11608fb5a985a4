use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod batch;
mod catalog;
mod config;
mod db;
mod error;
mod ids;
mod models;
mod predict;
mod report;
mod risk;
mod server;
mod settings;
mod store;
mod submit;

use crate::batch::ResultFilter;
use crate::config::Config;
use crate::db::PgStore;
use crate::error::SubmitError;
use crate::ids::TimestampIds;
use crate::risk::RiskThresholds;
use crate::store::RecordStore;
use crate::submit::{RecordSubmitter, SubmissionForm};

#[derive(Parser)]
#[command(name = "academic-risk")]
#[command(about = "Academic risk classification from attendance and subject scores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Submit one student's attendance and scores and store the prediction
    Predict {
        #[arg(long)]
        year: u32,
        #[arg(long)]
        attendance_s1: Option<String>,
        #[arg(long)]
        attendance_s2: Option<String>,
        /// Subject score as `key=value`, e.g. `--score maths=78`
        #[arg(long = "score", value_parser = parse_score)]
        scores: Vec<(String, String)>,
    },
    /// Show a stored prediction
    Show {
        #[arg(long)]
        id: Uuid,
    },
    /// Classify every student in a CSV dataset
    Bulk {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = ResultFilter::All)]
        filter: ResultFilter,
        /// Write all results to this CSV file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Inspect or change the risk thresholds
    Thresholds {
        #[command(subcommand)]
        action: ThresholdAction,
    },
    /// Serve the prediction HTTP endpoints
    Serve,
}

#[derive(Subcommand)]
enum ThresholdAction {
    Show,
    Set(ThresholdArgs),
    Reset,
}

#[derive(Args)]
struct ThresholdArgs {
    #[arg(long)]
    high_risk_percentage: Option<f64>,
    #[arg(long)]
    high_risk_attendance: Option<f64>,
    #[arg(long)]
    risk_percentage: Option<f64>,
    #[arg(long)]
    risk_attendance: Option<f64>,
    #[arg(long)]
    low_risk_percentage: Option<f64>,
    #[arg(long)]
    low_risk_attendance: Option<f64>,
}

impl ThresholdArgs {
    fn apply(&self, thresholds: &mut RiskThresholds) {
        let updates = [
            (self.high_risk_percentage, &mut thresholds.high_risk.percentage),
            (self.high_risk_attendance, &mut thresholds.high_risk.attendance),
            (self.risk_percentage, &mut thresholds.risk.percentage),
            (self.risk_attendance, &mut thresholds.risk.attendance),
            (self.low_risk_percentage, &mut thresholds.low_risk.percentage),
            (self.low_risk_attendance, &mut thresholds.low_risk.attendance),
        ];
        for (value, slot) in updates {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

fn parse_score(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to a Postgres instance")?;

    db::connect(database_url, config.max_connections)
        .await
        .context("failed to connect to Postgres")
}

/// Bulk analysis works offline: the configured thresholds are used when the
/// database is reachable, the defaults otherwise.
async fn bulk_thresholds(config: &Config) -> RiskThresholds {
    if config.database_url.is_none() {
        tracing::info!("no DATABASE_URL set, using default risk thresholds");
        return RiskThresholds::default();
    }

    let loaded = match connect(config).await {
        Ok(pool) => settings::load_thresholds(&PgStore::new(pool))
            .await
            .map_err(anyhow::Error::from),
        Err(err) => Err(err),
    };
    match loaded {
        Ok(thresholds) => thresholds,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "using default risk thresholds");
            RiskThresholds::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academic_risk_monitor=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Predict {
            year,
            attendance_s1,
            attendance_s2,
            scores,
        } => {
            let store = PgStore::new(connect(&config).await?);
            let thresholds = settings::load_thresholds(&store).await?;
            let form = SubmissionForm {
                year,
                attendance_s1,
                attendance_s2,
                scores: scores.into_iter().collect::<HashMap<_, _>>(),
            };

            let ids = TimestampIds;
            match RecordSubmitter::new(&store, &ids).submit(&form, &thresholds).await {
                Ok(prediction) => {
                    println!("Prediction generated successfully!");
                    print!("{}", report::render_prediction(&prediction));
                }
                Err(SubmitError::Validation(err)) => anyhow::bail!("{err}"),
                Err(err) => return Err(err).context("failed to process data"),
            }
        }
        Commands::Show { id } => {
            let store = PgStore::new(connect(&config).await?);
            let prediction = store.fetch_prediction(id).await?;
            print!("{}", report::render_lookup(prediction.as_ref()));
        }
        Commands::Bulk { csv, filter, out } => {
            let thresholds = bulk_thresholds(&config).await;

            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let results = batch::analyze_csv(file, &thresholds)
                .context("failed to process file, please check the format")?;

            let summary = batch::summarize(&results);
            let filtered = batch::filter_results(&results, filter);
            print!("{}", report::render_batch(&filtered, summary, filter));

            if let Some(out) = out {
                let writer = std::fs::File::create(&out)
                    .with_context(|| format!("failed to create {}", out.display()))?;
                batch::export_csv(&results, writer)?;
                println!("Results written to {}.", out.display());
            }
        }
        Commands::Thresholds { action } => {
            let store = PgStore::new(connect(&config).await?);
            let thresholds = match action {
                ThresholdAction::Show => settings::load_thresholds(&store).await?,
                ThresholdAction::Set(args) => {
                    let mut thresholds = settings::load_thresholds(&store).await?;
                    args.apply(&mut thresholds);
                    settings::save_thresholds(&store, &thresholds).await?;
                    println!("Settings saved.");
                    thresholds
                }
                ThresholdAction::Reset => {
                    let thresholds = settings::reset_thresholds(&store).await?;
                    println!("Settings reset to defaults.");
                    thresholds
                }
            };
            print!("{}", report::render_thresholds(&thresholds));
        }
        Commands::Serve => {
            let store = PgStore::new(connect(&config).await?);
            let state = server::AppState::new(store);
            server::serve(state, config.bind_addr()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_arguments_split_on_equals() {
        assert_eq!(
            parse_score("maths = 78.5"),
            Ok(("maths".to_string(), "78.5".to_string()))
        );
        assert!(parse_score("maths").is_err());
    }

    #[test]
    fn threshold_args_override_only_given_values() {
        let cli = Cli::try_parse_from([
            "academic-risk",
            "thresholds",
            "set",
            "--risk-attendance",
            "60",
        ])
        .unwrap();
        let Commands::Thresholds {
            action: ThresholdAction::Set(args),
        } = cli.command
        else {
            panic!("expected thresholds set");
        };

        let mut thresholds = RiskThresholds::default();
        args.apply(&mut thresholds);
        assert_eq!(thresholds.risk.attendance, 60.0);
        assert_eq!(thresholds.risk.percentage, 50.0);
        assert_eq!(thresholds.high_risk, RiskThresholds::default().high_risk);
    }

    #[tokio::test]
    async fn bulk_uses_defaults_when_database_is_unreachable() {
        let config = Config {
            database_url: Some("not a postgres url".to_string()),
            port: 0,
            max_connections: 1,
        };
        assert_eq!(bulk_thresholds(&config).await, RiskThresholds::default());
    }

    #[tokio::test]
    async fn bulk_uses_defaults_without_database() {
        let config = Config {
            database_url: None,
            port: 0,
            max_connections: 1,
        };
        assert_eq!(bulk_thresholds(&config).await, RiskThresholds::default());
    }

    #[test]
    fn predict_command_collects_scores() {
        let cli = Cli::try_parse_from([
            "academic-risk",
            "predict",
            "--year",
            "1",
            "--attendance-s1",
            "80",
            "--score",
            "maths=70",
            "--score",
            "physics=65",
        ])
        .unwrap();
        let Commands::Predict { year, scores, .. } = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(year, 1);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[1], ("physics".to_string(), "65".to_string()));
    }
}
