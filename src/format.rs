//! Display helpers shared by the stores and the status reporter

use serde::Serialize;

/// Success-rate band used when reporting job health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessBand {
    Perfect,
    Good,
    Fair,
    Poor,
}

impl SuccessBand {
    pub fn for_rate(rate: f64) -> Self {
        if rate >= 100.0 {
            SuccessBand::Perfect
        } else if rate >= 95.0 {
            SuccessBand::Good
        } else if rate >= 90.0 {
            SuccessBand::Fair
        } else {
            SuccessBand::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuccessBand::Perfect => "perfect",
            SuccessBand::Good => "good",
            SuccessBand::Fair => "fair",
            SuccessBand::Poor => "poor",
        }
    }
}

impl std::fmt::Display for SuccessBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean of per-job success rates, one decimal; 0 for no jobs
pub fn overall_success_rate<I>(rates: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = rates
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), rate| (sum + rate, count + 1));

    if count == 0 {
        0.0
    } else {
        round1(sum / count as f64)
    }
}

/// Format a millisecond duration
pub fn format_duration(ms: f64) -> String {
    format!("{}ms", ms.round() as i64)
}
