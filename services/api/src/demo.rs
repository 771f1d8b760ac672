use crate::infra::parse_period;
use chrono::Local;
use clap::Args;
use staff_review::error::AppError;
use staff_review::workflows::evaluation::{
    EmployeeId, EmployeeRef, EvaluationConfig, EvaluationDetail, EvaluationId,
    EvaluationRepository, EvaluationService, EvaluationSheet, InMemoryEvaluationRepository,
    OpenEvaluation, Period, Responsibility, ResponsibilityId, ScoreReport, ScoreRole,
    WeightPolicy,
};
use staff_review::workflows::sheet::SheetImporter;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_EMPLOYEE: &str = "emp-1042";
const DEMO_SUPERVISOR_1: &str = "emp-0310";
const DEMO_SUPERVISOR_2: &str = "emp-0007";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation period (YYYY-MM). Defaults to the current month.
    #[arg(long, value_parser = parse_period)]
    pub(crate) period: Option<Period>,
    /// Reject responsibility sets whose weights do not total 100.
    #[arg(long)]
    pub(crate) strict_weights: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluationReportArgs {
    /// CSV evaluation sheet to score
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Include every detail row in the output
    #[arg(long)]
    pub(crate) list_details: bool,
}

pub(crate) fn run_evaluation_report(args: EvaluationReportArgs) -> Result<(), AppError> {
    let EvaluationReportArgs { csv, list_details } = args;

    let details = SheetImporter::from_path(&csv, &EvaluationId("report".to_string()))?;
    let report = ScoreReport::build(&details);

    println!("Evaluation sheet report");
    println!("Source: {}", csv.display());
    render_report(&report);
    if list_details {
        render_details(&details);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        period,
        strict_weights,
    } = args;

    let period = period.unwrap_or_else(|| Period::from_date(Local::now().date_naive()));
    let weight_policy = if strict_weights {
        WeightPolicy::Strict
    } else {
        WeightPolicy::Lenient
    };

    let service = EvaluationService::new(
        Arc::new(InMemoryEvaluationRepository::default()),
        EvaluationConfig { weight_policy },
    );

    println!("Staff evaluation demo ({period}, {weight_policy:?} weights)");

    let previous = period.previous();
    let earlier = service.open(demo_request(previous))?;
    score_all(&service, &earlier, [[85, 70, 90], [80, 65, 85], [75, 60, 80]])?;
    service.finalize(&earlier.evaluation.evaluation_id)?;
    println!(
        "- Finalized {} for {}",
        earlier.evaluation.evaluation_id, previous
    );

    let sheet = service.open(demo_request(period))?;
    let evaluation_id = sheet.evaluation.evaluation_id.clone();
    println!(
        "- Opened {} for {} ({}) with {} responsibilities",
        evaluation_id,
        sheet.evaluation.employee.name,
        sheet.evaluation.employee.code,
        sheet.details.len()
    );

    let rounds = [
        (ScoreRole::SelfReview, [90, 80, 70]),
        (ScoreRole::Supervisor1, [85, 75, 60]),
        (ScoreRole::Supervisor2, [80, 70, 65]),
    ];
    for (role, scores) in rounds {
        score_role(&service, &sheet, role, scores)?;
        println!(
            "  {} scored -> status {}",
            role.label(),
            service.status(&evaluation_id)?.label()
        );
    }

    let details = service.details(&evaluation_id)?;
    render_report(&ScoreReport::build(&details));

    let aggregated = service.aggregate(&evaluation_id)?;
    println!(
        "\nStored aggregates: self {:.2}% | supervisor 1 {:.2}% | supervisor 2 {:.2}%",
        aggregated.aggregates.self_score_percentage,
        aggregated.aggregates.supervisor_score_1_percentage,
        aggregated.aggregates.supervisor_score_2_percentage
    );

    let finalized = service.finalize(&evaluation_id)?;
    if let Some(record) = &finalized.finalized {
        println!("Finalized at {}", record.finalized_at.to_rfc3339());
    }

    let history = service.history(&evaluation_id)?;
    if history.is_empty() {
        println!("\nHistory: none");
    } else {
        println!("\nHistory");
        for entry in &history {
            println!(
                "- {} {}: self {:.2}% | supervisor 1 {:.2}% | supervisor 2 {:.2}%",
                entry.period,
                entry.position_name,
                entry.self_score_percentage,
                entry.supervisor_score_1_percentage,
                entry.supervisor_score_2_percentage
            );
        }
    }

    let supervisor = EmployeeId(DEMO_SUPERVISOR_1.to_string());
    println!("\nSubordinates of {} for {}", supervisor, period);
    for entry in service.subordinates(&supervisor, period)? {
        println!(
            "- {} {} -> {} (supervisor 1: {}, supervisor 2: {}, finalized: {})",
            entry.employee_code,
            entry.employee_name,
            entry.status.label(),
            entry.is_supervisor_1,
            entry.is_supervisor_2,
            entry.finalized
        );
    }

    Ok(())
}

fn demo_request(period: Period) -> OpenEvaluation {
    OpenEvaluation {
        employee: EmployeeRef {
            id: EmployeeId(DEMO_EMPLOYEE.to_string()),
            code: "NV-1042".to_string(),
            name: "Tran Thi Mai".to_string(),
        },
        position_name: "HR Generalist".to_string(),
        period,
        supervisor_1: Some(EmployeeId(DEMO_SUPERVISOR_1.to_string())),
        supervisor_2: Some(EmployeeId(DEMO_SUPERVISOR_2.to_string())),
        responsibilities: vec![
            demo_responsibility("resp-payroll", "Payroll close", "Close payroll by the 25th", 50),
            demo_responsibility(
                "resp-onboarding",
                "Onboarding",
                "Prepare contracts and first-day kits",
                30,
            ),
            demo_responsibility(
                "resp-records",
                "Personnel records",
                "Keep insurance and tax records current",
                20,
            ),
        ],
    }
}

fn demo_responsibility(id: &str, title: &str, description: &str, weight: u8) -> Responsibility {
    Responsibility {
        id: ResponsibilityId(id.to_string()),
        title: title.to_string(),
        description: description.to_string(),
        weight,
    }
}

fn score_all<R>(
    service: &EvaluationService<R>,
    sheet: &EvaluationSheet,
    scores: [[i64; 3]; 3],
) -> Result<(), AppError>
where
    R: EvaluationRepository + 'static,
{
    for (role, values) in ScoreRole::ALL.into_iter().zip(scores) {
        score_role(service, sheet, role, values)?;
    }
    Ok(())
}

fn score_role<R>(
    service: &EvaluationService<R>,
    sheet: &EvaluationSheet,
    role: ScoreRole,
    scores: [i64; 3],
) -> Result<(), AppError>
where
    R: EvaluationRepository + 'static,
{
    let Some(writer) = sheet.evaluation.designated_writer(role) else {
        println!("  No one is designated to write {}", role.label());
        return Ok(());
    };
    for (detail, score) in sheet.details.iter().zip(scores) {
        service.set_score(writer, &detail.detail_id, role, score)?;
    }
    Ok(())
}

fn render_report(report: &ScoreReport) {
    println!(
        "\nStatus: {} | {} responsibilities | weight total {}",
        report.status_label, report.detail_count, report.total_weight
    );
    if report.total_weight != 100 {
        println!("Note: weights do not total 100; percentages are normalized by scored weight");
    }
    for role in &report.roles {
        let coverage = if role.is_partial() {
            format!(
                " (partial: {}/{} rows, weight {}/{})",
                role.scored_details, role.total_details, role.scored_weight, role.total_weight
            )
        } else {
            String::new()
        };
        println!("- {}: {:.2}%{}", role.role_label, role.percentage, coverage);
    }
}

fn render_details(details: &[EvaluationDetail]) {
    println!("\nResponsibilities");
    for detail in details {
        println!(
            "- {} [{}] weight {} | self {} | supervisor 1 {} | supervisor 2 {}",
            detail.title,
            detail.responsibility_id,
            detail.weight,
            display_score(detail, ScoreRole::SelfReview),
            display_score(detail, ScoreRole::Supervisor1),
            display_score(detail, ScoreRole::Supervisor2)
        );
    }
}

fn display_score(detail: &EvaluationDetail, role: ScoreRole) -> String {
    detail
        .score(role)
        .map(|score| score.value().to_string())
        .unwrap_or_else(|| "-".to_string())
}
