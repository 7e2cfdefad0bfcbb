use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use competency_cohort_stats::config::Config;
use competency_cohort_stats::db::{self, PgRepository};
use competency_cohort_stats::report;
use competency_cohort_stats::sources::{self, Catalog};
use competency_cohort_stats::store::SummaryStore;
use competency_cohort_stats::Recalculator;

#[derive(Parser)]
#[command(name = "competency-cohort-stats")]
#[command(about = "Competency score aggregation and cohort statistics", long_about = None)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[arg(long, env = "COMPETENCY_DB_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Students loaded per page during cohort recalculation
    #[arg(long, env = "COMPETENCY_PAGE_SIZE", default_value_t = 200)]
    page_size: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo semester with diagnostic, course, and program activity
    Seed,
    /// Recompute one student's competency summaries for a semester
    RecalcStudent {
        #[arg(long)]
        semester: Uuid,
        #[arg(long)]
        student: Uuid,
    },
    /// Recompute every student's summaries, then the cohort statistics
    RecalcCohort {
        #[arg(long)]
        semester: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Print cohort statistics for a semester
    Stats {
        #[arg(long)]
        semester: Uuid,
        #[arg(long)]
        competency: Option<Uuid>,
        #[arg(long)]
        json: bool,
    },
    /// Print stored competency summaries
    #[command(group(
        ArgGroup::new("scope")
            .args(["semester", "student"])
            .required(true)
            .multiple(false)
    ))]
    Summaries {
        #[arg(long)]
        semester: Option<Uuid>,
        #[arg(long)]
        student: Option<Uuid>,
        #[arg(long, requires = "semester")]
        competency: Option<Uuid>,
    },
    /// Generate a markdown cohort report
    Report {
        #[arg(long)]
        semester: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export a semester's summaries as CSV
    Export {
        #[arg(long)]
        semester: Uuid,
        #[arg(long, default_value = "summaries.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "competency_cohort_stats=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.database_url, cli.max_connections, cli.page_size)
        .context("invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let repo = Arc::new(PgRepository::new(pool.clone()));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let semester = db::seed(&pool).await?;
            println!("Seed data inserted for semester {semester}.");
        }
        Commands::RecalcStudent { semester, student } => {
            let recalculator = Recalculator::new(repo, config.page_size);
            let report = recalculator
                .recalculate_student(semester, student)
                .await
                .with_context(|| format!("failed to recalculate student {student}"))?;
            println!(
                "Recalculated {} competencies for {student} ({} failed).",
                report.succeeded, report.failed
            );
        }
        Commands::RecalcCohort { semester, json } => {
            info!(%semester, page_size = config.page_size, "starting cohort recalculation");
            let recalculator = Recalculator::new(repo, config.page_size);
            let report = recalculator
                .recalculate_cohort(semester)
                .await
                .with_context(|| format!("failed to recalculate semester {semester}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Processed {} students: {} units succeeded, {} failed, {} cohort stats written.",
                    report.students, report.succeeded, report.failed, report.stats_written
                );
            }
        }
        Commands::Stats {
            semester,
            competency,
            json,
        } => {
            sources::ensure_semester(repo.as_ref(), semester).await?;
            let stats = match competency {
                Some(competency_id) => {
                    repo.competency(competency_id).await?;
                    repo.cohort_stat(semester, competency_id)
                        .await?
                        .into_iter()
                        .collect()
                }
                None => repo.cohort_stats(semester).await?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            if stats.is_empty() {
                println!("No cohort statistics for this semester. Run recalc-cohort first.");
                return Ok(());
            }

            let names: std::collections::HashMap<Uuid, String> = repo
                .competencies()
                .await?
                .into_iter()
                .map(|c| (c.id, format!("{} {}", c.code, c.name)))
                .collect();
            for stat in &stats {
                println!(
                    "- {}: {}/{} scored, mean {:.2}, median {:.2}, stddev {:.2}, max {:.2}",
                    names
                        .get(&stat.competency_id)
                        .map(String::as_str)
                        .unwrap_or("unknown competency"),
                    stat.calculated_count,
                    stat.target_count,
                    stat.mean,
                    stat.median,
                    stat.stddev,
                    stat.max_score
                );
            }
        }
        Commands::Summaries {
            semester,
            student,
            competency,
        } => {
            if let Some(semester) = semester {
                sources::ensure_semester(repo.as_ref(), semester).await?;
            }
            let summaries = match (semester, student, competency) {
                (Some(semester), _, Some(competency)) => {
                    repo.summaries_by_competency(semester, competency).await?
                }
                (Some(semester), _, None) => repo.summaries_by_semester(semester).await?,
                (None, Some(student), _) => repo.summaries_by_student(student).await?,
                (None, None, _) => anyhow::bail!("either --semester or --student is required"),
            };

            if summaries.is_empty() {
                println!("No competency summaries found.");
                return Ok(());
            }
            for summary in &summaries {
                println!(
                    "- {} / {} / {}: total {:.2} (skill {:.2}, aptitude {:.2}, curricular {:.2}, extra {:.2}, self {:.2})",
                    summary.semester_id,
                    summary.student_id,
                    summary.competency_id,
                    summary.total_score,
                    summary.diagnosis_skill_score,
                    summary.diagnosis_aptitude_score,
                    summary.curricular_score,
                    summary.extra_score,
                    summary.self_extra_score
                );
            }
        }
        Commands::Report { semester, out } => {
            sources::ensure_semester(repo.as_ref(), semester).await?;
            let competencies = repo.competencies().await?;
            let stats = repo.cohort_stats(semester).await?;
            let summaries = repo.summaries_by_semester(semester).await?;
            let report = report::build_report(semester, &competencies, &stats, &summaries);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { semester, out } => {
            sources::ensure_semester(repo.as_ref(), semester).await?;
            let summaries = repo.summaries_by_semester(semester).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let written = report::write_summaries_csv(file, &summaries)?;
            println!("Exported {written} summaries to {}.", out.display());
        }
    }

    Ok(())
}
