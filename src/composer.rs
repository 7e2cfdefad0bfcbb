use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    ApplicationStatus, Competency, ComponentScores, EnrollmentStatus, QuestionDomain,
    QuestionKind,
};
use crate::sources::ScoreSources;
use crate::weights::WeightResolver;

/// Combines a student's activity in one semester into component scores for a
/// single competency. Absent runs, submissions, weights, or raw scores add zero.
pub async fn compose<S>(
    sources: &S,
    semester_id: Uuid,
    student_id: Uuid,
    competency: &Competency,
) -> Result<ComponentScores>
where
    S: ScoreSources + WeightResolver + ?Sized,
{
    let mut scores = ComponentScores::default();

    let (skill, aptitude) = diagnosis_scores(sources, semester_id, student_id, competency).await?;
    scores.diagnosis_skill = skill;
    scores.diagnosis_aptitude = aptitude;
    scores.curricular = curricular_score(sources, semester_id, student_id, competency.id).await?;
    scores.extra = extracurricular_score(sources, semester_id, student_id, competency.id).await?;
    // Self-reported activity has no source yet.
    scores.self_extra = 0.0;

    debug!(
        %semester_id,
        %student_id,
        competency = %competency.code,
        total = scores.total(),
        "composed competency scores"
    );

    Ok(scores)
}

async fn diagnosis_scores<S>(
    sources: &S,
    semester_id: Uuid,
    student_id: Uuid,
    competency: &Competency,
) -> Result<(f64, f64)>
where
    S: ScoreSources + WeightResolver + ?Sized,
{
    let Some(run_id) = sources.diagnostic_run(semester_id).await? else {
        return Ok((0.0, 0.0));
    };
    let Some(submission_id) = sources.diagnostic_submission(run_id, student_id).await? else {
        return Ok((0.0, 0.0));
    };

    let mut skill = 0.0;
    let mut aptitude = 0.0;

    for answer in sources.diagnostic_answers(submission_id).await? {
        if answer.kind != QuestionKind::Scale {
            continue;
        }
        let Some(scale_value) = answer.scale_value else {
            continue;
        };
        let weight = sources
            .question_weights(answer.question_id)
            .await?
            .weight_for(&competency.code);
        if weight <= 0 {
            continue;
        }

        let points = f64::from(weight) * f64::from(scale_value);
        match answer.domain {
            QuestionDomain::Skill => skill += points,
            QuestionDomain::Aptitude => aptitude += points,
        }
    }

    Ok((skill, aptitude))
}

async fn curricular_score<S>(
    sources: &S,
    semester_id: Uuid,
    student_id: Uuid,
    competency_id: Uuid,
) -> Result<f64>
where
    S: ScoreSources + WeightResolver + ?Sized,
{
    let mut total = 0.0;

    for enrollment in sources.enrollments(semester_id, student_id).await? {
        if enrollment.status != EnrollmentStatus::Enrolled {
            continue;
        }
        let Some(raw_score) = enrollment.raw_score else {
            continue;
        };
        if let Some(weight) = sources
            .course_weight(enrollment.offering_id, competency_id)
            .await?
        {
            total += raw_score * f64::from(weight);
        }
    }

    Ok(total)
}

async fn extracurricular_score<S>(
    sources: &S,
    semester_id: Uuid,
    student_id: Uuid,
    competency_id: Uuid,
) -> Result<f64>
where
    S: ScoreSources + WeightResolver + ?Sized,
{
    let mut total = 0.0;

    for application in sources
        .extracurricular_applications(semester_id, student_id)
        .await?
    {
        if application.status != ApplicationStatus::Applied || application.earned_points.is_empty()
        {
            continue;
        }
        if let Some(weight) = sources
            .extracurricular_weight(application.offering_id, competency_id)
            .await?
        {
            let points: f64 = application.earned_points.iter().sum();
            total += points * f64::from(weight);
        }
    }

    Ok(total)
}
