//! # Trend Prediction
//!
//! Compares the last seven days of emissions against the seven before and
//! projects the recent daily average forward.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HORIZON_DAYS: u32 = 30;

const WINDOW_DAYS: usize = 7;
const INCREASE_RATIO: f64 = 1.1;
const DECREASE_RATIO: f64 = 0.9;

/// Total emissions for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEmission {
    pub date: NaiveDate,
    pub emissions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted: f64,
    pub trend: Trend,
    pub days: u32,
}

fn average(days: &[DailyEmission]) -> f64 {
    let sum: f64 = days.iter().map(|d| d.emissions).sum();
    sum / days.len().max(1) as f64
}

/// Predict emissions over the next `days` days.
///
/// History is ordered by date first. Fewer than two points predict zero with
/// a stable trend. When no previous window exists its average is zero.
#[must_use]
pub fn predict_emissions(history: &[DailyEmission], days: u32) -> Prediction {
    if history.len() < 2 {
        return Prediction {
            predicted: 0.0,
            trend: Trend::Stable,
            days,
        };
    }

    let mut sorted = history.to_vec();
    sorted.sort_by_key(|d| d.date);

    let split = sorted.len().saturating_sub(WINDOW_DAYS);
    let (earlier, recent) = sorted.split_at(split);
    let older = &earlier[earlier.len().saturating_sub(WINDOW_DAYS)..];

    let recent_avg = average(recent);
    let older_avg = average(older);

    let trend = if recent_avg > older_avg * INCREASE_RATIO {
        Trend::Increasing
    } else if recent_avg < older_avg * DECREASE_RATIO {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    Prediction {
        predicted: recent_avg * f64::from(days),
        trend,
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<DailyEmission> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        values
            .iter()
            .zip(start.iter_days())
            .map(|(emissions, date)| DailyEmission {
                date,
                emissions: *emissions,
            })
            .collect()
    }

    #[test]
    fn too_little_history() {
        let p = predict_emissions(&series(&[5.0]), 30);
        assert_eq!(p.trend, Trend::Stable);
        assert!(p.predicted.abs() < f64::EPSILON);
    }

    #[test]
    fn rising_emissions() {
        let mut values = vec![1.0; 7];
        values.extend([2.0; 7]);
        let p = predict_emissions(&series(&values), 30);
        assert_eq!(p.trend, Trend::Increasing);
        assert!((p.predicted - 60.0).abs() < 1e-9);
    }

    #[test]
    fn falling_emissions() {
        let mut values = vec![4.0; 7];
        values.extend([2.0; 7]);
        assert_eq!(predict_emissions(&series(&values), 7).trend, Trend::Decreasing);
    }

    #[test]
    fn flat_emissions_within_ten_percent() {
        let mut values = vec![2.0; 7];
        values.extend([2.1; 7]);
        assert_eq!(predict_emissions(&series(&values), 30).trend, Trend::Stable);
    }

    #[test]
    fn only_the_last_fourteen_days_count() {
        let mut values = vec![100.0; 10];
        values.extend([1.0; 14]);
        assert_eq!(predict_emissions(&series(&values), 30).trend, Trend::Stable);
    }

    #[test]
    fn unordered_history_is_sorted() {
        let mut history = series(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0]);
        history.reverse();
        assert_eq!(predict_emissions(&history, 1).trend, Trend::Increasing);
    }

    #[test]
    fn short_history_has_no_previous_window() {
        let p = predict_emissions(&series(&[2.0, 4.0]), 10);
        assert_eq!(p.trend, Trend::Increasing);
        assert!((p.predicted - 30.0).abs() < 1e-9);
    }
}
