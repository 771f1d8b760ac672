use std::io::Cursor;

use staff_review::workflows::evaluation::{EvaluationId, EvaluationStatus, ScoreReport, ScoreRole};
use staff_review::workflows::sheet::{SheetImportError, SheetImporter};

const SHEET: &str = "\
Responsibility ID,Title,Description,Weight,Self Score,Supervisor Score 1,Supervisor Score 2
R-01,Recruiting pipeline,Keep open roles staffed,60,80,75,
R-02,Attendance review,Weekly check-in/out audit,40,50,60,
";

#[test]
fn imported_sheet_reports_scores_and_status() {
    let details = SheetImporter::from_reader(
        Cursor::new(SHEET),
        &EvaluationId("preview".to_string()),
    )
    .expect("sheet imports");

    let report = ScoreReport::build(&details);

    assert_eq!(report.status, EvaluationStatus::Supervisor2Pending);
    assert_eq!(report.detail_count, 2);
    assert_eq!(report.total_weight, 100);

    let own = report.role(ScoreRole::SelfReview).expect("self aggregate");
    assert_eq!(own.percentage, 68.0);
    assert!(!own.is_partial());

    let second = report
        .role(ScoreRole::Supervisor2)
        .expect("supervisor 2 aggregate");
    assert!(!second.has_scores());
    assert_eq!(second.percentage, 0.0);
}

#[test]
fn missing_file_is_an_io_error() {
    let result = SheetImporter::from_path(
        "does/not/exist.csv",
        &EvaluationId("preview".to_string()),
    );
    assert!(matches!(result, Err(SheetImportError::Io(_))));
}
