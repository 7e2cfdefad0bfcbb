use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::weights::CompetencyWeights;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Competency {
    pub id: Uuid,
    /// Short code such as `C1`, used to pick the weight slot of a diagnostic question.
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionDomain {
    Skill,
    Aptitude,
}

impl FromStr for QuestionDomain {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SKILL" => Ok(QuestionDomain::Skill),
            "APTITUDE" => Ok(QuestionDomain::Aptitude),
            other => Err(EngineError::InvalidData(format!(
                "unknown question domain `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    Scale,
    ShortAnswer,
}

impl FromStr for QuestionKind {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SCALE" => Ok(QuestionKind::Scale),
            "SHORT_ANSWER" => Ok(QuestionKind::ShortAnswer),
            other => Err(EngineError::InvalidData(format!(
                "unknown question kind `{other}`"
            ))),
        }
    }
}

/// Stored enrollment status. Anything unrecognised is kept as `Other` and
/// contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentStatus {
    Enrolled,
    Dropped,
    Other(String),
}

impl From<&str> for EnrollmentStatus {
    fn from(value: &str) -> Self {
        match value {
            "ENROLLED" => EnrollmentStatus::Enrolled,
            "DROPPED" => EnrollmentStatus::Dropped,
            other => EnrollmentStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationStatus {
    Applied,
    Cancelled,
    Rejected,
    Other(String),
}

impl From<&str> for ApplicationStatus {
    fn from(value: &str) -> Self {
        match value {
            "APPLIED" => ApplicationStatus::Applied,
            "CANCELLED" => ApplicationStatus::Cancelled,
            "REJECTED" => ApplicationStatus::Rejected,
            other => ApplicationStatus::Other(other.to_string()),
        }
    }
}

/// One answer on a diagnostic submission, joined with its question metadata.
#[derive(Debug, Clone)]
pub struct DiagnosticAnswer {
    pub question_id: Uuid,
    pub domain: QuestionDomain,
    pub kind: QuestionKind,
    pub scale_value: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Enrollment {
    pub offering_id: Uuid,
    pub status: EnrollmentStatus,
    pub raw_score: Option<f64>,
}

/// An extracurricular application with the points earned on each completed session.
#[derive(Debug, Clone)]
pub struct ExtracurricularApplication {
    pub offering_id: Uuid,
    pub status: ApplicationStatus,
    pub earned_points: Vec<f64>,
}

/// Raw per-competency components produced by the composer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComponentScores {
    pub diagnosis_skill: f64,
    pub diagnosis_aptitude: f64,
    pub curricular: f64,
    pub extra: f64,
    pub self_extra: f64,
}

impl ComponentScores {
    pub fn diagnosis(&self) -> f64 {
        self.diagnosis_skill + self.diagnosis_aptitude
    }

    pub fn total(&self) -> f64 {
        self.diagnosis() + self.curricular + self.extra + self.self_extra
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetencySummary {
    pub semester_id: Uuid,
    pub student_id: Uuid,
    pub competency_id: Uuid,
    pub diagnosis_skill_score: f64,
    pub diagnosis_aptitude_score: f64,
    pub diagnosis_score: f64,
    pub curricular_score: f64,
    pub extra_score: f64,
    pub self_extra_score: f64,
    pub total_score: f64,
    pub calculated_at: DateTime<Utc>,
}

impl CompetencySummary {
    /// Builds a row whose derived fields come from the same components being stored.
    pub fn from_components(
        semester_id: Uuid,
        student_id: Uuid,
        competency_id: Uuid,
        components: &ComponentScores,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            semester_id,
            student_id,
            competency_id,
            diagnosis_skill_score: components.diagnosis_skill,
            diagnosis_aptitude_score: components.diagnosis_aptitude,
            diagnosis_score: components.diagnosis(),
            curricular_score: components.curricular,
            extra_score: components.extra,
            self_extra_score: components.self_extra,
            total_score: components.total(),
            calculated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortStat {
    pub semester_id: Uuid,
    pub competency_id: Uuid,
    pub target_count: i64,
    pub calculated_count: i64,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub max_score: f64,
    pub calculated_at: DateTime<Utc>,
}

/// Outcome of a recalculation run, counted per (student, competency) unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecalculationReport {
    pub students: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub stats_written: usize,
}

impl RecalculationReport {
    pub fn merge(&mut self, other: &RecalculationReport) {
        self.students += other.students;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.stats_written += other.stats_written;
    }
}
