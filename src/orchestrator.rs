use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::composer;
use crate::error::{EngineError, Result};
use crate::models::{Competency, CompetencySummary, RecalculationReport};
use crate::sources::{self, Catalog, ScoreSources};
use crate::stats;
use crate::store::SummaryStore;
use crate::weights::WeightResolver;

/// Everything the recalculation pipeline reads from and writes to.
pub trait Repository: Catalog + ScoreSources + WeightResolver + SummaryStore {}

impl<T> Repository for T where T: Catalog + ScoreSources + WeightResolver + SummaryStore {}

pub struct Recalculator<R: ?Sized> {
    repo: Arc<R>,
    page_size: u32,
}

impl<R> Recalculator<R>
where
    R: Repository + ?Sized,
{
    pub fn new(repo: Arc<R>, page_size: u32) -> Self {
        Self {
            repo,
            page_size: page_size.max(1),
        }
    }

    /// Recomputes every competency summary of one student for one semester.
    ///
    /// A missing semester or student aborts before anything is written. Each
    /// competency is its own write; a failing one is logged and counted.
    #[instrument(skip(self))]
    pub async fn recalculate_student(
        &self,
        semester_id: Uuid,
        student_id: Uuid,
    ) -> Result<RecalculationReport> {
        sources::ensure_semester(self.repo.as_ref(), semester_id).await?;
        if !self.repo.student_exists(student_id).await? {
            return Err(EngineError::not_found("student", student_id));
        }

        let competencies = self.repo.competencies().await?;
        let report = self
            .recalculate_units(semester_id, student_id, &competencies)
            .await;

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "student recalculation finished"
        );
        Ok(report)
    }

    /// Recomputes every student of the institution page by page, then
    /// refreshes the cohort statistics of the semester.
    ///
    /// Safe to re-run from scratch after an interruption.
    #[instrument(skip(self))]
    pub async fn recalculate_cohort(&self, semester_id: Uuid) -> Result<RecalculationReport> {
        sources::ensure_semester(self.repo.as_ref(), semester_id).await?;

        let competencies = self.repo.competencies().await?;
        let mut report = RecalculationReport::default();
        let mut cursor = None;

        loop {
            let page = self.repo.students_after(cursor, self.page_size).await?;
            let Some(last) = page.last().copied() else {
                break;
            };

            for student_id in &page {
                let unit = self
                    .recalculate_units(semester_id, *student_id, &competencies)
                    .await;
                report.merge(&unit);
            }

            debug!(students = report.students, "cohort page processed");
            if page.len() < self.page_size as usize {
                break;
            }
            cursor = Some(last);
        }

        report.stats_written = stats::calculate(self.repo.as_ref(), semester_id).await?;

        info!(
            students = report.students,
            succeeded = report.succeeded,
            failed = report.failed,
            stats_written = report.stats_written,
            "cohort recalculation finished"
        );
        Ok(report)
    }

    async fn recalculate_units(
        &self,
        semester_id: Uuid,
        student_id: Uuid,
        competencies: &[Competency],
    ) -> RecalculationReport {
        let mut report = RecalculationReport {
            students: 1,
            ..RecalculationReport::default()
        };

        for competency in competencies {
            match self
                .recalculate_unit(semester_id, student_id, competency)
                .await
            {
                Ok(()) => report.succeeded += 1,
                Err(err) if err.is_not_found() => {
                    warn!(
                        %semester_id,
                        %student_id,
                        competency = %competency.code,
                        error = %err,
                        "competency recalculation skipped, reference missing"
                    );
                    report.failed += 1;
                }
                Err(err) => {
                    error!(
                        %semester_id,
                        %student_id,
                        competency = %competency.code,
                        error = %err,
                        "competency recalculation failed"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    async fn recalculate_unit(
        &self,
        semester_id: Uuid,
        student_id: Uuid,
        competency: &Competency,
    ) -> Result<()> {
        let components =
            composer::compose(self.repo.as_ref(), semester_id, student_id, competency).await?;
        let summary = CompetencySummary::from_components(
            semester_id,
            student_id,
            competency.id,
            &components,
            Utc::now(),
        );
        self.repo.upsert_summary(&summary).await
    }
}
