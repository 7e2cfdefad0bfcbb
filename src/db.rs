use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::models::{
    ApplicationStatus, CohortStat, Competency, CompetencySummary, DiagnosticAnswer, Enrollment,
    EnrollmentStatus, ExtracurricularApplication,
};
use crate::sources::{Catalog, ScoreSources};
use crate::store::SummaryStore;
use crate::weights::{CompetencyWeights, WeightResolver};

const FOREIGN_KEY_VIOLATION: &str = "23503";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed implementation of every engine trait.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn competency(&self, competency_id: Uuid) -> Result<Competency> {
        let row = sqlx::query("SELECT id, code, name FROM competency_engine.competencies WHERE id = $1")
            .bind(competency_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| EngineError::not_found("competency", competency_id))?;

        Ok(competency_from_row(&row))
    }
}

fn competency_from_row(row: &PgRow) -> Competency {
    Competency {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
    }
}

fn summary_from_row(row: &PgRow) -> CompetencySummary {
    CompetencySummary {
        semester_id: row.get("semester_id"),
        student_id: row.get("student_id"),
        competency_id: row.get("competency_id"),
        diagnosis_skill_score: row.get("diagnosis_skill_score"),
        diagnosis_aptitude_score: row.get("diagnosis_aptitude_score"),
        diagnosis_score: row.get("diagnosis_score"),
        curricular_score: row.get("curricular_score"),
        extra_score: row.get("extra_score"),
        self_extra_score: row.get("self_extra_score"),
        total_score: row.get("total_score"),
        calculated_at: row.get("calculated_at"),
    }
}

fn cohort_stat_from_row(row: &PgRow) -> CohortStat {
    CohortStat {
        semester_id: row.get("semester_id"),
        competency_id: row.get("competency_id"),
        target_count: row.get("target_count"),
        calculated_count: row.get("calculated_count"),
        mean: row.get("mean"),
        median: row.get("median"),
        stddev: row.get("stddev"),
        max_score: row.get("max_score"),
        calculated_at: row.get("calculated_at"),
    }
}

/// Turns a foreign-key violation into `NotFound` for whichever reference dangled.
fn map_write_error(
    err: sqlx::Error,
    semester_id: Uuid,
    student_id: Option<Uuid>,
    competency_id: Uuid,
) -> EngineError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            if let Some(missing) =
                missing_reference(db_err.constraint(), semester_id, student_id, competency_id)
            {
                return missing;
            }
        }
    }
    EngineError::Database(err)
}

/// Maps the output tables' named foreign keys (see the migration) to the
/// entity they point at. Unknown constraints stay database errors.
fn missing_reference(
    constraint: Option<&str>,
    semester_id: Uuid,
    student_id: Option<Uuid>,
    competency_id: Uuid,
) -> Option<EngineError> {
    match (constraint?, student_id) {
        ("competency_summaries_semester_fk" | "cohort_stats_semester_fk", _) => {
            Some(EngineError::not_found("semester", semester_id))
        }
        ("competency_summaries_student_fk", Some(student_id)) => {
            Some(EngineError::not_found("student", student_id))
        }
        ("competency_summaries_competency_fk" | "cohort_stats_competency_fk", _) => {
            Some(EngineError::not_found("competency", competency_id))
        }
        _ => None,
    }
}

const SUMMARY_COLUMNS: &str = "semester_id, student_id, competency_id, diagnosis_skill_score, \
     diagnosis_aptitude_score, diagnosis_score, curricular_score, extra_score, \
     self_extra_score, total_score, calculated_at";

const COHORT_STAT_COLUMNS: &str = "semester_id, competency_id, target_count, calculated_count, \
     mean, median, stddev, max_score, calculated_at";

#[async_trait]
impl Catalog for PgRepository {
    async fn semester_exists(&self, semester_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM competency_engine.semesters WHERE id = $1) AS found",
        )
        .bind(semester_id)
        .fetch_one(&self.pool)
        .await?
        .get("found");
        Ok(exists)
    }

    async fn student_exists(&self, student_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM competency_engine.students WHERE id = $1) AS found",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?
        .get("found");
        Ok(exists)
    }

    async fn competencies(&self) -> Result<Vec<Competency>> {
        let rows = sqlx::query("SELECT id, code, name FROM competency_engine.competencies ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(competency_from_row).collect())
    }

    async fn count_students(&self) -> Result<i64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS total FROM competency_engine.students")
            .fetch_one(&self.pool)
            .await?
            .get("total");
        Ok(count)
    }

    async fn students_after(&self, after: Option<Uuid>, limit: u32) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM competency_engine.students
            WHERE $1::uuid IS NULL OR id > $1
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}

#[async_trait]
impl ScoreSources for PgRepository {
    async fn diagnostic_run(&self, semester_id: Uuid) -> Result<Option<Uuid>> {
        let rows = sqlx::query("SELECT id FROM competency_engine.diagnostic_runs WHERE semester_id = $1")
            .bind(semester_id)
            .fetch_all(&self.pool)
            .await?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(Some(row.get("id"))),
            _ => Err(EngineError::Configuration(format!(
                "semester {semester_id} has {} diagnostic runs",
                rows.len()
            ))),
        }
    }

    async fn diagnostic_submission(&self, run_id: Uuid, student_id: Uuid) -> Result<Option<Uuid>> {
        let row = sqlx::query(
            "SELECT id FROM competency_engine.diagnostic_submissions WHERE run_id = $1 AND student_id = $2",
        )
        .bind(run_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.get("id")))
    }

    async fn diagnostic_answers(&self, submission_id: Uuid) -> Result<Vec<DiagnosticAnswer>> {
        let rows = sqlx::query(
            r#"
            SELECT a.question_id, q.domain, q.question_type, a.scale_value
            FROM competency_engine.diagnostic_answers a
            JOIN competency_engine.diagnostic_questions q ON q.id = a.question_id
            WHERE a.submission_id = $1
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            answers.push(DiagnosticAnswer {
                question_id: row.get("question_id"),
                domain: row.get::<String, _>("domain").parse()?,
                kind: row.get::<String, _>("question_type").parse()?,
                scale_value: row.get("scale_value"),
            });
        }
        Ok(answers)
    }

    async fn enrollments(&self, semester_id: Uuid, student_id: Uuid) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query(
            r#"
            SELECT e.offering_id, e.status, e.raw_score
            FROM competency_engine.enrollments e
            JOIN competency_engine.course_offerings o ON o.id = e.offering_id
            WHERE o.semester_id = $1 AND e.student_id = $2
            "#,
        )
        .bind(semester_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let mut enrollments = Vec::with_capacity(rows.len());
        for row in rows {
            enrollments.push(Enrollment {
                offering_id: row.get("offering_id"),
                status: EnrollmentStatus::from(row.get::<&str, _>("status")),
                raw_score: row.get("raw_score"),
            });
        }
        Ok(enrollments)
    }

    async fn extracurricular_applications(
        &self,
        semester_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<ExtracurricularApplication>> {
        let rows = sqlx::query(
            r#"
            SELECT a.offering_id, a.status,
                   COALESCE(
                       array_agg(c.earned_point ORDER BY c.session_no)
                           FILTER (WHERE c.id IS NOT NULL),
                       '{}'::double precision[]
                   ) AS earned_points
            FROM competency_engine.extracurricular_applications a
            JOIN competency_engine.extracurricular_offerings o ON o.id = a.offering_id
            LEFT JOIN competency_engine.extracurricular_completions c ON c.application_id = a.id
            WHERE o.semester_id = $1 AND a.student_id = $2
            GROUP BY a.id, a.offering_id, a.status
            "#,
        )
        .bind(semester_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let mut applications = Vec::with_capacity(rows.len());
        for row in rows {
            applications.push(ExtracurricularApplication {
                offering_id: row.get("offering_id"),
                status: ApplicationStatus::from(row.get::<&str, _>("status")),
                earned_points: row.get("earned_points"),
            });
        }
        Ok(applications)
    }
}

#[async_trait]
impl WeightResolver for PgRepository {
    async fn question_weights(&self, question_id: Uuid) -> Result<CompetencyWeights> {
        let rows = sqlx::query(
            "SELECT competency_code, max_score FROM competency_engine.question_competency_weights WHERE question_id = $1",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get::<String, _>("competency_code"),
                    row.get::<i32, _>("max_score"),
                )
            })
            .collect())
    }

    async fn course_weight(&self, offering_id: Uuid, competency_id: Uuid) -> Result<Option<i32>> {
        let row = sqlx::query(
            "SELECT weight FROM competency_engine.course_competency_weights WHERE offering_id = $1 AND competency_id = $2",
        )
        .bind(offering_id)
        .bind(competency_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.get("weight")))
    }

    async fn extracurricular_weight(
        &self,
        offering_id: Uuid,
        competency_id: Uuid,
    ) -> Result<Option<i32>> {
        let row = sqlx::query(
            "SELECT weight FROM competency_engine.extracurricular_competency_weights WHERE offering_id = $1 AND competency_id = $2",
        )
        .bind(offering_id)
        .bind(competency_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.get("weight")))
    }
}

#[async_trait]
impl SummaryStore for PgRepository {
    async fn upsert_summary(&self, summary: &CompetencySummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO competency_engine.competency_summaries
            (semester_id, student_id, competency_id, diagnosis_skill_score,
             diagnosis_aptitude_score, diagnosis_score, curricular_score, extra_score,
             self_extra_score, total_score, calculated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (semester_id, student_id, competency_id) DO UPDATE
            SET diagnosis_skill_score = EXCLUDED.diagnosis_skill_score,
                diagnosis_aptitude_score = EXCLUDED.diagnosis_aptitude_score,
                diagnosis_score = EXCLUDED.diagnosis_score,
                curricular_score = EXCLUDED.curricular_score,
                extra_score = EXCLUDED.extra_score,
                self_extra_score = EXCLUDED.self_extra_score,
                total_score = EXCLUDED.total_score,
                calculated_at = EXCLUDED.calculated_at
            "#,
        )
        .bind(summary.semester_id)
        .bind(summary.student_id)
        .bind(summary.competency_id)
        .bind(summary.diagnosis_skill_score)
        .bind(summary.diagnosis_aptitude_score)
        .bind(summary.diagnosis_score)
        .bind(summary.curricular_score)
        .bind(summary.extra_score)
        .bind(summary.self_extra_score)
        .bind(summary.total_score)
        .bind(summary.calculated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            map_write_error(
                err,
                summary.semester_id,
                Some(summary.student_id),
                summary.competency_id,
            )
        })?;
        Ok(())
    }

    async fn upsert_cohort_stat(&self, stat: &CohortStat) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO competency_engine.cohort_stats
            (semester_id, competency_id, target_count, calculated_count,
             mean, median, stddev, max_score, calculated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (semester_id, competency_id) DO UPDATE
            SET target_count = EXCLUDED.target_count,
                calculated_count = EXCLUDED.calculated_count,
                mean = EXCLUDED.mean,
                median = EXCLUDED.median,
                stddev = EXCLUDED.stddev,
                max_score = EXCLUDED.max_score,
                calculated_at = EXCLUDED.calculated_at
            "#,
        )
        .bind(stat.semester_id)
        .bind(stat.competency_id)
        .bind(stat.target_count)
        .bind(stat.calculated_count)
        .bind(stat.mean)
        .bind(stat.median)
        .bind(stat.stddev)
        .bind(stat.max_score)
        .bind(stat.calculated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| map_write_error(err, stat.semester_id, None, stat.competency_id))?;
        Ok(())
    }

    async fn summary_totals(&self, semester_id: Uuid, competency_id: Uuid) -> Result<Vec<f64>> {
        let rows = sqlx::query(
            "SELECT total_score FROM competency_engine.competency_summaries WHERE semester_id = $1 AND competency_id = $2",
        )
        .bind(semester_id)
        .bind(competency_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("total_score")).collect())
    }

    async fn summaries_by_student(&self, student_id: Uuid) -> Result<Vec<CompetencySummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM competency_engine.competency_summaries \
             WHERE student_id = $1 ORDER BY semester_id, competency_id"
        );
        let rows = sqlx::query(&query)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn summaries_by_semester(&self, semester_id: Uuid) -> Result<Vec<CompetencySummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM competency_engine.competency_summaries \
             WHERE semester_id = $1 ORDER BY student_id, competency_id"
        );
        let rows = sqlx::query(&query)
            .bind(semester_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn summaries_by_competency(
        &self,
        semester_id: Uuid,
        competency_id: Uuid,
    ) -> Result<Vec<CompetencySummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM competency_engine.competency_summaries \
             WHERE semester_id = $1 AND competency_id = $2 ORDER BY total_score DESC"
        );
        let rows = sqlx::query(&query)
            .bind(semester_id)
            .bind(competency_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn cohort_stats(&self, semester_id: Uuid) -> Result<Vec<CohortStat>> {
        let query = format!(
            "SELECT {COHORT_STAT_COLUMNS} FROM competency_engine.cohort_stats \
             WHERE semester_id = $1 ORDER BY competency_id"
        );
        let rows = sqlx::query(&query)
            .bind(semester_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(cohort_stat_from_row).collect())
    }

    async fn cohort_stat(
        &self,
        semester_id: Uuid,
        competency_id: Uuid,
    ) -> Result<Option<CohortStat>> {
        let query = format!(
            "SELECT {COHORT_STAT_COLUMNS} FROM competency_engine.cohort_stats \
             WHERE semester_id = $1 AND competency_id = $2"
        );
        let row = sqlx::query(&query)
            .bind(semester_id)
            .bind(competency_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(cohort_stat_from_row))
    }
}

// Both return the stored id so a pre-existing row with the same code or
// email is reused instead of the fixed seed id.
const SEED_COMPETENCY: &str = r#"
    INSERT INTO competency_engine.competencies (id, code, name)
    VALUES ($1, $2, $3)
    ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
    RETURNING id
"#;

const SEED_STUDENT: &str = r#"
    INSERT INTO competency_engine.students (id, full_name, email)
    VALUES ($1, $2, $3)
    ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
    RETURNING id
"#;

pub const SEED_SEMESTER: Uuid = Uuid::from_u128(0x7a1c_0000_0000_4000_8000_000000002026);

/// Inserts a small demo semester. Re-running reuses the competencies and
/// students already stored under the same code or email.
pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    sqlx::query(
        "INSERT INTO competency_engine.semesters (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
    )
    .bind(SEED_SEMESTER)
    .bind("2026 Spring")
    .execute(pool)
    .await?;

    let competencies = [
        ("C1", "Problem Solving"),
        ("C2", "Communication"),
        ("C3", "Collaboration"),
        ("C4", "Creativity"),
        ("C5", "Self Management"),
        ("C6", "Global Citizenship"),
    ];
    let mut competency_ids = Vec::new();
    for (index, (code, name)) in competencies.iter().enumerate() {
        let id: Uuid = sqlx::query(SEED_COMPETENCY)
        .bind(Uuid::from_u128(0xc0de_0000_0000_4000_8000_000000000001 + index as u128))
        .bind(*code)
        .bind(*name)
        .fetch_one(pool)
        .await?
        .get("id");
        competency_ids.push(id);
    }

    let students = [
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@campus.example.edu",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "jules.moreno@campus.example.edu",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@campus.example.edu",
        ),
    ];
    let mut student_ids = Vec::new();
    for (id, name, email) in &students {
        let id: Uuid = sqlx::query(SEED_STUDENT)
        .bind(*id)
        .bind(*name)
        .bind(*email)
        .fetch_one(pool)
        .await?
        .get("id");
        student_ids.push(id);
    }

    let run_id = Uuid::from_u128(0xd1a6_0000_0000_4000_8000_000000000001);
    sqlx::query(
        "INSERT INTO competency_engine.diagnostic_runs (id, semester_id, title) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
    )
    .bind(run_id)
    .bind(SEED_SEMESTER)
    .bind("Spring competency self-assessment")
    .execute(pool)
    .await?;

    let questions: [(u128, &str, &str, &[(&str, i32)]); 3] = [
        (1, "SKILL", "SCALE", &[("C1", 3), ("C2", 1)]),
        (2, "APTITUDE", "SCALE", &[("C3", 2), ("C4", 2)]),
        (3, "SKILL", "SHORT_ANSWER", &[("C5", 1)]),
    ];
    for (suffix, domain, question_type, weights) in questions {
        let question_id = Uuid::from_u128(0x9e57_0000_0000_4000_8000_000000000000 + suffix);
        sqlx::query(
            r#"
            INSERT INTO competency_engine.diagnostic_questions
            (id, run_id, domain, question_type, prompt)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(question_id)
        .bind(run_id)
        .bind(domain)
        .bind(question_type)
        .bind(format!("Seed question {suffix}"))
        .execute(pool)
        .await?;

        for (code, max_score) in weights {
            sqlx::query(
                r#"
                INSERT INTO competency_engine.question_competency_weights
                (question_id, competency_code, max_score)
                VALUES ($1, $2, $3)
                ON CONFLICT (question_id, competency_code) DO NOTHING
                "#,
            )
            .bind(question_id)
            .bind(*code)
            .bind(*max_score)
            .execute(pool)
            .await?;
        }
    }

    // Two of the three students answered the diagnostic.
    for (student_index, scale_values) in [(0usize, [4, 5]), (1usize, [2, 3])] {
        let student_id = student_ids[student_index];
        let submission_id: Uuid = sqlx::query(
            r#"
            INSERT INTO competency_engine.diagnostic_submissions (id, run_id, student_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (run_id, student_id) DO UPDATE SET submitted_at = EXCLUDED.submitted_at
            RETURNING id
            "#,
        )
        .bind(Uuid::from_u128(
            0x5b00_0000_0000_4000_8000_000000000000 + student_index as u128,
        ))
        .bind(run_id)
        .bind(student_id)
        .fetch_one(pool)
        .await?
        .get("id");

        for (suffix, scale_value) in [(1u128, scale_values[0]), (2u128, scale_values[1])] {
            sqlx::query(
                r#"
                INSERT INTO competency_engine.diagnostic_answers
                (id, submission_id, question_id, scale_value)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (submission_id, question_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(submission_id)
            .bind(Uuid::from_u128(0x9e57_0000_0000_4000_8000_000000000000 + suffix))
            .bind(scale_value)
            .execute(pool)
            .await?;
        }
    }

    let course_id = Uuid::from_u128(0xc005_0000_0000_4000_8000_000000000001);
    sqlx::query(
        "INSERT INTO competency_engine.course_offerings (id, semester_id, title) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
    )
    .bind(course_id)
    .bind(SEED_SEMESTER)
    .bind("Data Structures")
    .execute(pool)
    .await?;
    for (competency_index, weight) in [(0usize, 2), (1usize, 1)] {
        sqlx::query(
            r#"
            INSERT INTO competency_engine.course_competency_weights (offering_id, competency_id, weight)
            VALUES ($1, $2, $3)
            ON CONFLICT (offering_id, competency_id) DO NOTHING
            "#,
        )
        .bind(course_id)
        .bind(competency_ids[competency_index])
        .bind(weight)
        .execute(pool)
        .await?;
    }
    let grades = [(0usize, Some(80.0)), (1, Some(92.5)), (2, None)];
    for (student_index, raw_score) in grades {
        sqlx::query(
            r#"
            INSERT INTO competency_engine.enrollments (id, offering_id, student_id, status, raw_score)
            VALUES ($1, $2, $3, 'ENROLLED', $4)
            ON CONFLICT (offering_id, student_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(student_ids[student_index])
        .bind(raw_score)
        .execute(pool)
        .await?;
    }

    let program_id = Uuid::from_u128(0xe8a0_0000_0000_4000_8000_000000000001);
    sqlx::query(
        "INSERT INTO competency_engine.extracurricular_offerings (id, semester_id, title) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
    )
    .bind(program_id)
    .bind(SEED_SEMESTER)
    .bind("Peer Mentoring Program")
    .execute(pool)
    .await?;
    for (competency_index, weight) in [(2usize, 2), (4usize, 1)] {
        sqlx::query(
            r#"
            INSERT INTO competency_engine.extracurricular_competency_weights (offering_id, competency_id, weight)
            VALUES ($1, $2, $3)
            ON CONFLICT (offering_id, competency_id) DO NOTHING
            "#,
        )
        .bind(program_id)
        .bind(competency_ids[competency_index])
        .bind(weight)
        .execute(pool)
        .await?;
    }
    for (student_index, points) in [(1usize, vec![5.0, 5.0, 2.5]), (2usize, vec![5.0])] {
        let application_id: Uuid = sqlx::query(
            r#"
            INSERT INTO competency_engine.extracurricular_applications (id, offering_id, student_id, status)
            VALUES ($1, $2, $3, 'APPLIED')
            ON CONFLICT (offering_id, student_id) DO UPDATE SET status = EXCLUDED.status
            RETURNING id
            "#,
        )
        .bind(Uuid::from_u128(
            0xa991_0000_0000_4000_8000_000000000000 + student_index as u128,
        ))
        .bind(program_id)
        .bind(student_ids[student_index])
        .fetch_one(pool)
        .await?
        .get("id");

        for (session_no, earned_point) in points.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO competency_engine.extracurricular_completions
                (id, application_id, session_no, earned_point)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (application_id, session_no) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(application_id)
            .bind(session_no as i32 + 1)
            .bind(earned_point)
            .execute(pool)
            .await?;
        }
    }

    Ok(SEED_SEMESTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATION: &str = include_str!("../migrations/0001_competency_engine.sql");

    #[test]
    fn named_foreign_keys_map_to_missing_entity() {
        let semester = Uuid::new_v4();
        let student = Uuid::new_v4();
        let competency = Uuid::new_v4();
        let lookup = |constraint| {
            missing_reference(Some(constraint), semester, Some(student), competency)
                .unwrap()
                .to_string()
        };

        assert_eq!(
            lookup("competency_summaries_semester_fk"),
            format!("semester not found: {semester}")
        );
        assert_eq!(
            lookup("competency_summaries_student_fk"),
            format!("student not found: {student}")
        );
        assert_eq!(
            lookup("competency_summaries_competency_fk"),
            format!("competency not found: {competency}")
        );
        assert_eq!(
            lookup("cohort_stats_semester_fk"),
            format!("semester not found: {semester}")
        );
        assert_eq!(
            lookup("cohort_stats_competency_fk"),
            format!("competency not found: {competency}")
        );
    }

    #[test]
    fn unknown_constraint_is_not_a_missing_reference() {
        let id = Uuid::new_v4();
        assert!(missing_reference(None, id, Some(id), id).is_none());
        assert!(missing_reference(Some("competency_summaries_pkey"), id, Some(id), id).is_none());
        assert!(missing_reference(Some("competency_summaries_student_fk"), id, None, id).is_none());
    }

    #[test]
    fn migration_declares_mapped_constraint_names() {
        for name in [
            "CONSTRAINT competency_summaries_semester_fk",
            "CONSTRAINT competency_summaries_student_fk",
            "CONSTRAINT competency_summaries_competency_fk",
            "CONSTRAINT cohort_stats_semester_fk",
            "CONSTRAINT cohort_stats_competency_fk",
        ] {
            assert!(MIGRATION.contains(name), "migration is missing {name}");
        }
    }

    #[test]
    fn seed_upserts_return_stored_ids() {
        for statement in [SEED_COMPETENCY, SEED_STUDENT] {
            assert!(statement.contains("DO UPDATE SET"));
            assert!(statement.contains("RETURNING id"));
            assert!(!statement.contains("DO NOTHING"));
        }
    }
}
