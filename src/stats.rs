use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::models::CohortStat;
use crate::sources::{self, Catalog};
use crate::store::SummaryStore;

/// Population statistics over one competency's total scores.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Distribution {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub max: f64,
}

impl Distribution {
    /// Empty input yields all zeros.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let raw_mean = mean(&sorted);
        Self {
            count: sorted.len(),
            mean: round2(raw_mean),
            median: median(&sorted),
            stddev: round2(population_stddev(&sorted, raw_mean)),
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Rounds to two decimals, halves away from zero.
///
/// Works on the shortest decimal form of `value`, so `1.005` becomes `1.01`
/// even though its binary value sits just below the midpoint.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let text = value.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    if fraction.len() <= 2 {
        return value;
    }

    let Ok(mut cents) = format!("{whole}{}", &fraction[..2]).parse::<u128>() else {
        return value;
    };
    if fraction.as_bytes()[2] >= b'5' {
        cents += 1;
    }
    (cents as f64 / 100.0).copysign(value)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Expects ascending input.
fn median(sorted: &[f64]) -> f64 {
    let len = sorted.len();
    if len == 0 {
        return 0.0;
    }
    let mid = len / 2;
    if len % 2 == 0 {
        round2((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        sorted[mid]
    }
}

fn population_stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Recomputes and stores one `CohortStat` per competency for the semester.
///
/// Competencies without any summary still get an all-zero row. Returns the
/// number of rows written.
#[instrument(skip(repo))]
pub async fn calculate<R>(repo: &R, semester_id: Uuid) -> Result<usize>
where
    R: Catalog + SummaryStore + ?Sized,
{
    sources::ensure_semester(repo, semester_id).await?;

    let target_count = repo.count_students().await?;
    let competencies = repo.competencies().await?;
    let mut written = 0;

    for competency in &competencies {
        let totals = repo.summary_totals(semester_id, competency.id).await?;
        let distribution = Distribution::from_scores(&totals);
        let stat = CohortStat {
            semester_id,
            competency_id: competency.id,
            target_count,
            calculated_count: distribution.count as i64,
            mean: distribution.mean,
            median: distribution.median,
            stddev: distribution.stddev,
            max_score: distribution.max,
            calculated_at: Utc::now(),
        };
        repo.upsert_cohort_stat(&stat).await?;
        written += 1;
    }

    info!(
        %semester_id,
        competencies = written,
        target_count,
        "cohort statistics updated"
    );

    Ok(written)
}
