use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CohortStat, CompetencySummary};

/// Keyed storage for computed summaries and cohort statistics.
///
/// Both upserts insert when the key is absent and otherwise overwrite every
/// score field and `calculated_at`. A dangling semester, student, or
/// competency reference fails with `NotFound` and writes nothing.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn upsert_summary(&self, summary: &CompetencySummary) -> Result<()>;

    async fn upsert_cohort_stat(&self, stat: &CohortStat) -> Result<()>;

    /// Total scores of every stored summary for one (semester, competency).
    async fn summary_totals(&self, semester_id: Uuid, competency_id: Uuid) -> Result<Vec<f64>>;

    async fn summaries_by_student(&self, student_id: Uuid) -> Result<Vec<CompetencySummary>>;

    async fn summaries_by_semester(&self, semester_id: Uuid) -> Result<Vec<CompetencySummary>>;

    async fn summaries_by_competency(
        &self,
        semester_id: Uuid,
        competency_id: Uuid,
    ) -> Result<Vec<CompetencySummary>>;

    async fn cohort_stats(&self, semester_id: Uuid) -> Result<Vec<CohortStat>>;

    async fn cohort_stat(&self, semester_id: Uuid, competency_id: Uuid)
        -> Result<Option<CohortStat>>;
}
