//! In-memory repository used by the unit tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::models::{
    CohortStat, Competency, CompetencySummary, DiagnosticAnswer, Enrollment,
    ExtracurricularApplication,
};
use crate::sources::{Catalog, ScoreSources};
use crate::store::SummaryStore;
use crate::weights::{CompetencyWeights, WeightResolver};

#[derive(Default)]
struct State {
    semesters: BTreeSet<Uuid>,
    students: BTreeSet<Uuid>,
    competencies: Vec<Competency>,
    runs: Vec<(Uuid, Uuid)>,
    submissions: HashMap<(Uuid, Uuid), Uuid>,
    answers: HashMap<Uuid, Vec<DiagnosticAnswer>>,
    question_weights: HashMap<Uuid, CompetencyWeights>,
    enrollments: HashMap<(Uuid, Uuid), Vec<Enrollment>>,
    applications: HashMap<(Uuid, Uuid), Vec<ExtracurricularApplication>>,
    course_weights: HashMap<(Uuid, Uuid), i32>,
    extra_weights: HashMap<(Uuid, Uuid), i32>,
    summaries: BTreeMap<(Uuid, Uuid, Uuid), CompetencySummary>,
    stats: BTreeMap<(Uuid, Uuid), CohortStat>,
    failing_student: Option<Uuid>,
    failing_units: BTreeSet<(Uuid, Uuid)>,
    pages_served: usize,
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_semester(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().semesters.insert(id);
        id
    }

    pub fn add_student(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().students.insert(id);
        id
    }

    pub fn add_competency(&self, code: &str) -> Competency {
        let competency = Competency {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: format!("Competency {code}"),
        };
        let mut state = self.state.lock().unwrap();
        state.competencies.push(competency.clone());
        state.competencies.sort_by(|a, b| a.code.cmp(&b.code));
        competency
    }

    pub fn add_run(&self, semester_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().runs.push((id, semester_id));
        id
    }

    pub fn add_submission(&self, run_id: Uuid, student_id: Uuid, answers: Vec<DiagnosticAnswer>) {
        let id = Uuid::new_v4();
        let mut state = self.state.lock().unwrap();
        state.submissions.insert((run_id, student_id), id);
        state.answers.insert(id, answers);
    }

    pub fn set_question_weights(&self, question_id: Uuid, weights: CompetencyWeights) {
        self.state
            .lock()
            .unwrap()
            .question_weights
            .insert(question_id, weights);
    }

    pub fn add_enrollment(&self, semester_id: Uuid, student_id: Uuid, enrollment: Enrollment) {
        self.state
            .lock()
            .unwrap()
            .enrollments
            .entry((semester_id, student_id))
            .or_default()
            .push(enrollment);
    }

    pub fn add_application(
        &self,
        semester_id: Uuid,
        student_id: Uuid,
        application: ExtracurricularApplication,
    ) {
        self.state
            .lock()
            .unwrap()
            .applications
            .entry((semester_id, student_id))
            .or_default()
            .push(application);
    }

    pub fn set_course_weight(&self, offering_id: Uuid, competency_id: Uuid, weight: i32) {
        self.state
            .lock()
            .unwrap()
            .course_weights
            .insert((offering_id, competency_id), weight);
    }

    pub fn set_extra_weight(&self, offering_id: Uuid, competency_id: Uuid, weight: i32) {
        self.state
            .lock()
            .unwrap()
            .extra_weights
            .insert((offering_id, competency_id), weight);
    }

    /// Makes every summary write for this student fail with a database error.
    pub fn fail_writes_for(&self, student_id: Uuid) {
        self.state.lock().unwrap().failing_student = Some(student_id);
    }

    /// Makes the summary write of one (student, competency) pair fail.
    pub fn fail_write_for_competency(&self, student_id: Uuid, competency_id: Uuid) {
        self.state
            .lock()
            .unwrap()
            .failing_units
            .insert((student_id, competency_id));
    }

    pub fn summary(
        &self,
        semester_id: Uuid,
        student_id: Uuid,
        competency_id: Uuid,
    ) -> Option<CompetencySummary> {
        self.state
            .lock()
            .unwrap()
            .summaries
            .get(&(semester_id, student_id, competency_id))
            .cloned()
    }

    pub fn summary_count(&self) -> usize {
        self.state.lock().unwrap().summaries.len()
    }

    pub fn pages_served(&self) -> usize {
        self.state.lock().unwrap().pages_served
    }
}

#[async_trait]
impl Catalog for MemoryRepository {
    async fn semester_exists(&self, semester_id: Uuid) -> Result<bool> {
        Ok(self.state.lock().unwrap().semesters.contains(&semester_id))
    }

    async fn student_exists(&self, student_id: Uuid) -> Result<bool> {
        Ok(self.state.lock().unwrap().students.contains(&student_id))
    }

    async fn competencies(&self) -> Result<Vec<Competency>> {
        Ok(self.state.lock().unwrap().competencies.clone())
    }

    async fn count_students(&self) -> Result<i64> {
        Ok(self.state.lock().unwrap().students.len() as i64)
    }

    async fn students_after(&self, after: Option<Uuid>, limit: u32) -> Result<Vec<Uuid>> {
        let mut state = self.state.lock().unwrap();
        state.pages_served += 1;
        Ok(state
            .students
            .iter()
            .filter(|id| after.map_or(true, |cursor| **id > cursor))
            .take(limit as usize)
            .copied()
            .collect())
    }
}

#[async_trait]
impl ScoreSources for MemoryRepository {
    async fn diagnostic_run(&self, semester_id: Uuid) -> Result<Option<Uuid>> {
        let state = self.state.lock().unwrap();
        let runs: Vec<Uuid> = state
            .runs
            .iter()
            .filter(|(_, semester)| *semester == semester_id)
            .map(|(run, _)| *run)
            .collect();
        match runs.as_slice() {
            [] => Ok(None),
            [run] => Ok(Some(*run)),
            _ => Err(EngineError::Configuration(format!(
                "semester {semester_id} has {} diagnostic runs",
                runs.len()
            ))),
        }
    }

    async fn diagnostic_submission(&self, run_id: Uuid, student_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .submissions
            .get(&(run_id, student_id))
            .copied())
    }

    async fn diagnostic_answers(&self, submission_id: Uuid) -> Result<Vec<DiagnosticAnswer>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .answers
            .get(&submission_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn enrollments(&self, semester_id: Uuid, student_id: Uuid) -> Result<Vec<Enrollment>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .enrollments
            .get(&(semester_id, student_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn extracurricular_applications(
        &self,
        semester_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<ExtracurricularApplication>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .applications
            .get(&(semester_id, student_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl WeightResolver for MemoryRepository {
    async fn question_weights(&self, question_id: Uuid) -> Result<CompetencyWeights> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .question_weights
            .get(&question_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn course_weight(&self, offering_id: Uuid, competency_id: Uuid) -> Result<Option<i32>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .course_weights
            .get(&(offering_id, competency_id))
            .copied())
    }

    async fn extracurricular_weight(
        &self,
        offering_id: Uuid,
        competency_id: Uuid,
    ) -> Result<Option<i32>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .extra_weights
            .get(&(offering_id, competency_id))
            .copied())
    }
}

#[async_trait]
impl SummaryStore for MemoryRepository {
    async fn upsert_summary(&self, summary: &CompetencySummary) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_student == Some(summary.student_id)
            || state
                .failing_units
                .contains(&(summary.student_id, summary.competency_id))
        {
            return Err(EngineError::Database(sqlx::Error::PoolTimedOut));
        }
        if !state.semesters.contains(&summary.semester_id) {
            return Err(EngineError::not_found("semester", summary.semester_id));
        }
        if !state.students.contains(&summary.student_id) {
            return Err(EngineError::not_found("student", summary.student_id));
        }
        if !state.competencies.iter().any(|c| c.id == summary.competency_id) {
            return Err(EngineError::not_found("competency", summary.competency_id));
        }
        state.summaries.insert(
            (summary.semester_id, summary.student_id, summary.competency_id),
            summary.clone(),
        );
        Ok(())
    }

    async fn upsert_cohort_stat(&self, stat: &CohortStat) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.semesters.contains(&stat.semester_id) {
            return Err(EngineError::not_found("semester", stat.semester_id));
        }
        state
            .stats
            .insert((stat.semester_id, stat.competency_id), stat.clone());
        Ok(())
    }

    async fn summary_totals(&self, semester_id: Uuid, competency_id: Uuid) -> Result<Vec<f64>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .summaries
            .values()
            .filter(|s| s.semester_id == semester_id && s.competency_id == competency_id)
            .map(|s| s.total_score)
            .collect())
    }

    async fn summaries_by_student(&self, student_id: Uuid) -> Result<Vec<CompetencySummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .summaries
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn summaries_by_semester(&self, semester_id: Uuid) -> Result<Vec<CompetencySummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .summaries
            .values()
            .filter(|s| s.semester_id == semester_id)
            .cloned()
            .collect())
    }

    async fn summaries_by_competency(
        &self,
        semester_id: Uuid,
        competency_id: Uuid,
    ) -> Result<Vec<CompetencySummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .summaries
            .values()
            .filter(|s| s.semester_id == semester_id && s.competency_id == competency_id)
            .cloned()
            .collect())
    }

    async fn cohort_stats(&self, semester_id: Uuid) -> Result<Vec<CohortStat>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .stats
            .values()
            .filter(|s| s.semester_id == semester_id)
            .cloned()
            .collect())
    }

    async fn cohort_stat(
        &self,
        semester_id: Uuid,
        competency_id: Uuid,
    ) -> Result<Option<CohortStat>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .stats
            .get(&(semester_id, competency_id))
            .cloned())
    }
}
