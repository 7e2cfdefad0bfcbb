use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::models::{Competency, DiagnosticAnswer, Enrollment, ExtracurricularApplication};

/// Semester, student, and competency reference data.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn semester_exists(&self, semester_id: Uuid) -> Result<bool>;

    async fn student_exists(&self, student_id: Uuid) -> Result<bool>;

    /// Every competency, ordered by code.
    async fn competencies(&self) -> Result<Vec<Competency>>;

    async fn count_students(&self) -> Result<i64>;

    /// Up to `limit` student ids greater than `after`, in ascending order.
    async fn students_after(&self, after: Option<Uuid>, limit: u32) -> Result<Vec<Uuid>>;
}

/// Fails with `NotFound` unless the semester exists.
pub async fn ensure_semester<C>(catalog: &C, semester_id: Uuid) -> Result<()>
where
    C: Catalog + ?Sized,
{
    if catalog.semester_exists(semester_id).await? {
        Ok(())
    } else {
        Err(EngineError::not_found("semester", semester_id))
    }
}

/// Raw activity the composer turns into scores.
#[async_trait]
pub trait ScoreSources: Send + Sync {
    /// The diagnostic run of a semester. More than one run is a
    /// configuration error rather than an arbitrary pick.
    async fn diagnostic_run(&self, semester_id: Uuid) -> Result<Option<Uuid>>;

    async fn diagnostic_submission(&self, run_id: Uuid, student_id: Uuid) -> Result<Option<Uuid>>;

    async fn diagnostic_answers(&self, submission_id: Uuid) -> Result<Vec<DiagnosticAnswer>>;

    async fn enrollments(&self, semester_id: Uuid, student_id: Uuid) -> Result<Vec<Enrollment>>;

    async fn extracurricular_applications(
        &self,
        semester_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<ExtracurricularApplication>>;
}
