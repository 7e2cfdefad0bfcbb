use std::collections::HashMap;
use std::fmt::Write;

use uuid::Uuid;

use crate::models::{CohortStat, Competency, CompetencySummary};

/// Highest scoring students of one competency, best first.
pub fn top_students(
    summaries: &[CompetencySummary],
    competency_id: Uuid,
    limit: usize,
) -> Vec<&CompetencySummary> {
    let mut ranked: Vec<&CompetencySummary> = summaries
        .iter()
        .filter(|summary| summary.competency_id == competency_id)
        .collect();
    ranked.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    ranked.truncate(limit);
    ranked
}

/// Writes summary rows as CSV with a header line. Returns the number of rows.
pub fn write_summaries_csv<W: std::io::Write>(
    writer: W,
    summaries: &[CompetencySummary],
) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for summary in summaries {
        csv_writer.serialize(summary)?;
    }
    csv_writer.flush()?;
    Ok(summaries.len())
}

pub fn build_report(
    semester_id: Uuid,
    competencies: &[Competency],
    stats: &[CohortStat],
    summaries: &[CompetencySummary],
) -> String {
    let stats_by_competency: HashMap<Uuid, &CohortStat> =
        stats.iter().map(|stat| (stat.competency_id, stat)).collect();

    let mut output = String::new();

    let _ = writeln!(output, "# Competency Cohort Report");
    let _ = writeln!(output, "Semester {semester_id}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cohort Statistics");

    if stats.is_empty() {
        let _ = writeln!(
            output,
            "No cohort statistics calculated for this semester yet."
        );
    } else {
        let _ = writeln!(
            output,
            "| Competency | Scored | Cohort | Mean | Median | Std Dev | Max |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for competency in competencies {
            let Some(stat) = stats_by_competency.get(&competency.id) else {
                continue;
            };
            let _ = writeln!(
                output,
                "| {} {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} |",
                competency.code,
                competency.name,
                stat.calculated_count,
                stat.target_count,
                stat.mean,
                stat.median,
                stat.stddev,
                stat.max_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Students by Competency");

    if summaries.is_empty() {
        let _ = writeln!(output, "No competency summaries recorded for this semester.");
    } else {
        for competency in competencies {
            let leaders = top_students(summaries, competency.id, 3);
            if leaders.is_empty() {
                continue;
            }
            let _ = writeln!(output, "### {} {}", competency.code, competency.name);
            for summary in leaders {
                let _ = writeln!(
                    output,
                    "- {} total {:.2} (diagnosis {:.2}, curricular {:.2}, extracurricular {:.2})",
                    summary.student_id,
                    summary.total_score,
                    summary.diagnosis_score,
                    summary.curricular_score,
                    summary.extra_score + summary.self_extra_score
                );
            }
        }
    }

    output
}
