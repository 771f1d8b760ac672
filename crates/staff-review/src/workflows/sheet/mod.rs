//! CSV import of evaluation sheets exported from the HR back office.

mod parser;

use crate::workflows::evaluation::{
    DetailId, EvaluationDetail, EvaluationId, Responsibility, ResponsibilityId, Score,
};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use parser::SheetRecord;

#[derive(Debug)]
pub enum SheetImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, message: String },
    Empty,
}

impl std::fmt::Display for SheetImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetImportError::Io(err) => write!(f, "failed to read evaluation sheet: {}", err),
            SheetImportError::Csv(err) => write!(f, "invalid evaluation sheet CSV: {}", err),
            SheetImportError::InvalidRow { line, message } => {
                write!(f, "evaluation sheet line {}: {}", line, message)
            }
            SheetImportError::Empty => write!(f, "evaluation sheet has no responsibilities"),
        }
    }
}

impl std::error::Error for SheetImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetImportError::Io(err) => Some(err),
            SheetImportError::Csv(err) => Some(err),
            SheetImportError::InvalidRow { .. } | SheetImportError::Empty => None,
        }
    }
}

impl From<std::io::Error> for SheetImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SheetImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Builds detail rows from a CSV sheet with the columns
/// `Responsibility ID, Title, Description, Weight, Self Score, Supervisor Score 1, Supervisor Score 2`.
pub struct SheetImporter;

impl SheetImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        evaluation_id: &EvaluationId,
    ) -> Result<Vec<EvaluationDetail>, SheetImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, evaluation_id)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        evaluation_id: &EvaluationId,
    ) -> Result<Vec<EvaluationDetail>, SheetImportError> {
        let mut seen = HashSet::new();
        let mut details = Vec::new();

        for (index, record) in parser::parse_records(reader)?.into_iter().enumerate() {
            if !seen.insert(record.responsibility_id.clone()) {
                return Err(SheetImportError::InvalidRow {
                    line: record.line,
                    message: format!(
                        "responsibility {} appears more than once",
                        record.responsibility_id
                    ),
                });
            }
            let detail_id = DetailId(format!("{}-d{:02}", evaluation_id.0, index + 1));
            details.push(build_detail(record, detail_id, evaluation_id)?);
        }

        if details.is_empty() {
            return Err(SheetImportError::Empty);
        }
        Ok(details)
    }
}

fn build_detail(
    record: SheetRecord,
    detail_id: DetailId,
    evaluation_id: &EvaluationId,
) -> Result<EvaluationDetail, SheetImportError> {
    if record.weight > 100 {
        return Err(SheetImportError::InvalidRow {
            line: record.line,
            message: format!("weight {} is outside the 0-100 range", record.weight),
        });
    }

    let line = record.line;
    let responsibility = Responsibility {
        id: ResponsibilityId(record.responsibility_id),
        title: record.title,
        description: record.description,
        weight: record.weight,
    };

    let mut detail =
        EvaluationDetail::from_responsibility(detail_id, evaluation_id.clone(), &responsibility);
    detail.self_score = parse_score(line, record.self_score.as_deref())?;
    detail.supervisor_score_1 = parse_score(line, record.supervisor_score_1.as_deref())?;
    detail.supervisor_score_2 = parse_score(line, record.supervisor_score_2.as_deref())?;
    Ok(detail)
}

fn parse_score(line: u64, raw: Option<&str>) -> Result<Option<Score>, SheetImportError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| SheetImportError::InvalidRow {
            line,
            message: format!("score '{raw}' is not a whole number"),
        })?;
    Score::new(value)
        .map(Some)
        .map_err(|err| SheetImportError::InvalidRow {
            line,
            message: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::evaluation::{aggregate, derive_status, EvaluationStatus, ScoreRole};
    use std::io::Cursor;

    const HEADER: &str = "Responsibility ID,Title,Description,Weight,Self Score,Supervisor Score 1,Supervisor Score 2\n";

    fn import(body: &str) -> Result<Vec<EvaluationDetail>, SheetImportError> {
        let csv = format!("{HEADER}{body}");
        SheetImporter::from_reader(Cursor::new(csv), &EvaluationId("sheet".to_string()))
    }

    #[test]
    fn blank_cells_import_as_unscored() {
        let details = import(
            "R-1,Close payroll,Monthly payroll close,60,80,,\nR-2,Audit expenses,,40,50,70,\n",
        )
        .expect("sheet imports");

        assert_eq!(details.len(), 2);
        assert_eq!(details[0].detail_id.0, "sheet-d01");
        assert_eq!(details[0].supervisor_score_1, None);
        assert_eq!(details[1].description, "");
        assert_eq!(aggregate(&details, ScoreRole::SelfReview), 68.0);
        assert_eq!(aggregate(&details, ScoreRole::Supervisor1), 70.0);
        assert_eq!(derive_status(&details), EvaluationStatus::Supervisor1Pending);
    }

    #[test]
    fn out_of_range_score_reports_line() {
        match import("R-1,Close payroll,,60,80,,\nR-2,Audit expenses,,40,120,,\n") {
            Err(SheetImportError::InvalidRow { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("120"));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_responsibilities_are_rejected() {
        let result = import("R-1,Close payroll,,50,,,\nR-1,Close payroll,,50,,,\n");
        assert!(matches!(
            result,
            Err(SheetImportError::InvalidRow { line: 3, .. })
        ));
    }

    #[test]
    fn header_only_sheet_is_empty() {
        assert!(matches!(import(""), Err(SheetImportError::Empty)));
    }

    #[test]
    fn non_numeric_weight_is_a_csv_error() {
        assert!(matches!(
            import("R-1,Close payroll,,heavy,,,\n"),
            Err(SheetImportError::Csv(_))
        ));
    }
}
