use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dashboard statistics as served by `GET /api/desempenho`.
///
/// The engine only needs to read this shape; aggregation happens server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    #[serde(rename = "acertos")]
    pub correct: u64,
    #[serde(rename = "erros")]
    pub incorrect: u64,
    #[serde(rename = "tempo_medio_segundos", default)]
    pub average_time_secs: u64,
    #[serde(rename = "desempenho_tempo", default)]
    pub timeline: Vec<DailyPerformance>,
    #[serde(rename = "erros_por_categoria", default)]
    pub errors_by_category: Vec<CategoryErrors>,
}

impl PerformanceReport {
    /// Rounded share of correct answers, `0` when nothing was answered.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        percentage(self.correct, self.correct.saturating_add(self.incorrect))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPerformance {
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "acertos")]
    pub correct: u64,
    #[serde(rename = "erros")]
    pub incorrect: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryErrors {
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "quantidade")]
    pub count: u64,
}

/// Inclusive date window for a dashboard query (`inicio` / `fim`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportRange {
    /// Build a range, swapping the bounds if they arrive reversed.
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    /// Query pairs in the form the dashboard endpoint expects.
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("inicio", self.from.format("%Y-%m-%d").to_string()),
            ("fim", self.to.format("%Y-%m-%d").to_string()),
        ]
    }
}

/// `round(value / total * 100)`, or `0` when `total` is zero.
#[must_use]
pub fn percentage(value: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let value = u128::from(value);
    let total = u128::from(total);
    let rounded = (value * 100 + total / 2) / total;
    u32::try_from(rounded).unwrap_or(u32::MAX)
}
