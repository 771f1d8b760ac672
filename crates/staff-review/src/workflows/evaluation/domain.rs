use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_type!(
    /// Identifier wrapper for a per-employee, per-period evaluation.
    EvaluationId
);
id_type!(
    /// Identifier wrapper for a single scoring row within an evaluation.
    DetailId
);
id_type!(
    /// Identifier of an employee, used for ownership and supervisor designation.
    EmployeeId
);
id_type!(ResponsibilityId);

/// Employee reference carried on an evaluation header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub id: EmployeeId,
    pub code: String,
    pub name: String,
}

/// Weighted duty item defined for a job position; the unit being scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsibility {
    pub id: ResponsibilityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub weight: u8,
}

/// Calendar year-month covered by an evaluation, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| Self { year, month })
            .ok_or(PeriodError::OutOfRange { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }

    /// The calendar month immediately before this one.
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (year, month) = trimmed
            .split_once('-')
            .ok_or_else(|| PeriodError::Malformed(trimmed.to_string()))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| PeriodError::Malformed(trimmed.to_string()))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| PeriodError::Malformed(trimmed.to_string()))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("period '{0}' must be formatted as YYYY-MM")]
    Malformed(String),
    #[error("{year}-{month} is not a valid calendar month")]
    OutOfRange { year: i32, month: u32 },
}

/// Score on the 0-100 scale entered by one actor for one responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 100;

    pub fn new(value: i64) -> Result<Self, ScoreError> {
        u8::try_from(value)
            .ok()
            .filter(|score| *score <= Self::MAX)
            .map(Self)
            .ok_or(ScoreError(value))
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = ScoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(value: Score) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("score {0} is outside the 0-100 range")]
pub struct ScoreError(pub i64);

/// The three score slots of a detail row, one per evaluating actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRole {
    #[serde(rename = "self")]
    SelfReview,
    #[serde(rename = "supervisor_1")]
    Supervisor1,
    #[serde(rename = "supervisor_2")]
    Supervisor2,
}

impl ScoreRole {
    pub const ALL: [ScoreRole; 3] = [
        ScoreRole::SelfReview,
        ScoreRole::Supervisor1,
        ScoreRole::Supervisor2,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ScoreRole::SelfReview => "self",
            ScoreRole::Supervisor1 => "supervisor_1",
            ScoreRole::Supervisor2 => "supervisor_2",
        }
    }
}

impl fmt::Display for ScoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-responsibility scoring row. Weight and wording are snapshotted when the
/// evaluation opens so later catalog edits do not move historical scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationDetail {
    pub detail_id: DetailId,
    pub evaluation_id: EvaluationId,
    pub responsibility_id: ResponsibilityId,
    pub title: String,
    pub description: String,
    pub weight: u8,
    pub self_score: Option<Score>,
    pub supervisor_score_1: Option<Score>,
    pub supervisor_score_2: Option<Score>,
}

impl EvaluationDetail {
    pub fn from_responsibility(
        detail_id: DetailId,
        evaluation_id: EvaluationId,
        responsibility: &Responsibility,
    ) -> Self {
        Self {
            detail_id,
            evaluation_id,
            responsibility_id: responsibility.id.clone(),
            title: responsibility.title.clone(),
            description: responsibility.description.clone(),
            weight: responsibility.weight,
            self_score: None,
            supervisor_score_1: None,
            supervisor_score_2: None,
        }
    }

    pub fn score(&self, role: ScoreRole) -> Option<Score> {
        match role {
            ScoreRole::SelfReview => self.self_score,
            ScoreRole::Supervisor1 => self.supervisor_score_1,
            ScoreRole::Supervisor2 => self.supervisor_score_2,
        }
    }

    /// Overwrite exactly one slot; the other two are left untouched.
    pub fn set_score(&mut self, role: ScoreRole, value: Option<Score>) {
        let slot = match role {
            ScoreRole::SelfReview => &mut self.self_score,
            ScoreRole::Supervisor1 => &mut self.supervisor_score_1,
            ScoreRole::Supervisor2 => &mut self.supervisor_score_2,
        };
        *slot = value;
    }

    pub fn has_any_score(&self) -> bool {
        ScoreRole::ALL.iter().any(|role| self.score(*role).is_some())
    }
}

/// Aggregate percentages for the three roles, each on the 0-100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub self_score_percentage: f64,
    pub supervisor_score_1_percentage: f64,
    pub supervisor_score_2_percentage: f64,
}

impl ScoreSummary {
    pub fn get(&self, role: ScoreRole) -> f64 {
        match role {
            ScoreRole::SelfReview => self.self_score_percentage,
            ScoreRole::Supervisor1 => self.supervisor_score_1_percentage,
            ScoreRole::Supervisor2 => self.supervisor_score_2_percentage,
        }
    }
}

/// Percentages fixed at finalization for historical reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalizedScores {
    pub scores: ScoreSummary,
    pub finalized_at: DateTime<Utc>,
}

/// Per-employee, per-period container owning the detail rows.
///
/// `aggregates` is only refreshed by the explicit aggregation step, so it can
/// lag behind the detail rows between a score write and the next aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluation_id: EvaluationId,
    pub employee: EmployeeRef,
    pub position_name: String,
    pub period: Period,
    pub supervisor_1: Option<EmployeeId>,
    pub supervisor_2: Option<EmployeeId>,
    pub aggregates: ScoreSummary,
    pub finalized: Option<FinalizedScores>,
}

impl Evaluation {
    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    /// Employee entitled to write the given slot, if one is designated.
    pub fn designated_writer(&self, role: ScoreRole) -> Option<&EmployeeId> {
        match role {
            ScoreRole::SelfReview => Some(&self.employee.id),
            ScoreRole::Supervisor1 => self.supervisor_1.as_ref(),
            ScoreRole::Supervisor2 => self.supervisor_2.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_and_renders_year_month() {
        let period: Period = "2025-06".parse().expect("valid period");
        assert_eq!(period.year(), 2025);
        assert_eq!(period.month(), 6);
        assert_eq!(period.to_string(), "2025-06");
    }

    #[test]
    fn period_rejects_invalid_months() {
        assert_eq!(
            "2025-13".parse::<Period>(),
            Err(PeriodError::OutOfRange {
                year: 2025,
                month: 13
            })
        );
        assert!(matches!(
            "June 2025".parse::<Period>(),
            Err(PeriodError::Malformed(_))
        ));
    }

    #[test]
    fn periods_order_chronologically() {
        let earlier = Period::new(2024, 12).expect("valid");
        let later = Period::new(2025, 1).expect("valid");
        assert!(earlier < later);
        assert_eq!(later.previous(), earlier);
        assert_eq!(later.previous().previous(), Period::new(2024, 11).expect("valid"));
    }

    #[test]
    fn score_accepts_bounds_and_rejects_outside() {
        assert_eq!(Score::new(0).map(Score::value), Ok(0));
        assert_eq!(Score::new(100).map(Score::value), Ok(100));
        assert_eq!(Score::new(120), Err(ScoreError(120)));
        assert_eq!(Score::new(-1), Err(ScoreError(-1)));
    }

    #[test]
    fn score_deserialization_enforces_range() {
        let score: Score = serde_json::from_str("85").expect("in range");
        assert_eq!(score.value(), 85);
        assert!(serde_json::from_str::<Score>("101").is_err());
    }

    #[test]
    fn set_score_touches_only_the_requested_slot() {
        let mut detail = EvaluationDetail::from_responsibility(
            DetailId("d-1".to_string()),
            EvaluationId("e-1".to_string()),
            &Responsibility {
                id: ResponsibilityId("r-1".to_string()),
                title: "Payroll close".to_string(),
                description: String::new(),
                weight: 40,
            },
        );
        detail.supervisor_score_1 = Score::new(70).ok();

        detail.set_score(ScoreRole::SelfReview, Score::new(90).ok());

        assert_eq!(detail.self_score, Score::new(90).ok());
        assert_eq!(detail.supervisor_score_1, Score::new(70).ok());
        assert_eq!(detail.supervisor_score_2, None);
    }
}
