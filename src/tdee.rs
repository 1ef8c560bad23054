//! Rolling TDEE estimation from weight changes and recorded intake.
//!
//! For every calendar day `d` the trailing window `[d - (window - 1), d]` is
//! inspected. With at least two weight observations spanning one day or
//! more and at least one intake observation, the estimate is
//!
//! ```text
//! tdee = mean(intake) - (w_last - w_first) * 7700 / span_days
//! ```
//!
//! The point estimates are then smoothed with a centered moving average over
//! the estimate sequence.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::corpus::CorpusSeries;
use crate::error::PipelineError;
use crate::models::{DayRecord, RollingEstimate, TdeeReport};

/// Energy density of body mass change (kcal per kg).
pub const KCAL_PER_KG: f64 = 7700.0;

pub const DEFAULT_WINDOW_DAYS: usize = 14;
pub const DEFAULT_SMOOTHING_DAYS: usize = 7;

/// Rolling estimates for a corpus, in date order. Window ends that do not
/// have enough data are skipped, so the result may be sparse or empty.
pub fn compute_rolling_estimate(
    records: &[DayRecord],
    window_days: usize,
    smoothing_days: usize,
) -> Vec<RollingEstimate> {
    let Some(series) = CorpusSeries::from_records(records) else {
        return Vec::new();
    };
    let mut estimates = point_estimates(&series, window_days);
    let smooth = centered_mean(
        &estimates.iter().map(|e| e.tdee).collect::<Vec<_>>(),
        smoothing_days,
    );
    for (estimate, s) in estimates.iter_mut().zip(smooth) {
        estimate.tdee_smooth = s;
    }
    estimates
}

/// Unsmoothed estimates; `tdee_smooth` mirrors `tdee`.
pub fn point_estimates(series: &CorpusSeries, window_days: usize) -> Vec<RollingEstimate> {
    let window = window_days.max(1);
    let mut estimates = Vec::new();

    for end in 0..series.len() {
        let start = end.saturating_sub(window - 1);

        let weights: Vec<(usize, f64)> = (start..=end)
            .filter_map(|i| series.weight[i].map(|w| (i, w)))
            .collect();
        let intakes: Vec<f64> = (start..=end).filter_map(|i| series.intake[i]).collect();

        let (Some(&(first_i, first_w)), Some(&(last_i, last_w))) = (weights.first(), weights.last())
        else {
            continue;
        };
        if weights.len() < 2 || intakes.is_empty() {
            continue;
        }
        let span_days = (last_i - first_i) as i64;
        if span_days <= 0 {
            continue;
        }

        let delta_weight = last_w - first_w;
        let mean_intake = mean(&intakes);
        let daily_energy_change = delta_weight * KCAL_PER_KG / span_days as f64;
        let tdee = mean_intake - daily_energy_change;

        estimates.push(RollingEstimate {
            date: series.date_at(end),
            tdee,
            tdee_smooth: tdee,
            window_start: series.date_at(first_i),
            window_end: series.date_at(last_i),
            mean_intake,
            delta_weight,
            span_days,
            daily_energy_change,
        });
    }
    estimates
}

/// Centered moving average of width `width`, averaging whatever part of the
/// window exists at the edges. For even widths the window reaches one
/// element further back than forward.
pub fn centered_mean(values: &[f64], width: usize) -> Vec<f64> {
    let width = width.max(1);
    let ahead = (width - 1) / 2;
    (0..values.len())
        .map(|i| {
            let hi = (i + ahead).min(values.len() - 1);
            let lo = (i + ahead + 1).saturating_sub(width);
            mean(&values[lo..=hi])
        })
        .collect()
}

/// Estimates plus summary statistics. Zero estimates is fatal: a report
/// must not pretend to know a TDEE it could not compute.
pub fn build_report(
    records: &[DayRecord],
    window_days: usize,
    smoothing_days: usize,
    generated: DateTime<Utc>,
) -> Result<TdeeReport, PipelineError> {
    let estimates = compute_rolling_estimate(records, window_days, smoothing_days);

    let Some(first) = estimates.first() else {
        let dated: Vec<&DayRecord> = records.iter().filter(|r| r.day().is_some()).collect();
        return Err(PipelineError::InsufficientData {
            records: dated.len(),
            weights: dated.iter().filter(|r| r.weight_kg().is_some()).count(),
            intakes: dated.iter().filter(|r| r.intake_kcal().is_some()).count(),
        });
    };

    let tdees: Vec<f64> = estimates.iter().map(|e| e.tdee).collect();
    let period_start = estimates
        .iter()
        .map(|e| e.window_start)
        .min()
        .unwrap_or(first.window_start);
    let period_end = estimates
        .iter()
        .map(|e| e.window_end)
        .max()
        .unwrap_or(first.window_end);

    let report = TdeeReport {
        generated,
        n_estimates: estimates.len(),
        tdee_mean: mean(&tdees),
        tdee_median: median(&tdees),
        period_start,
        period_end,
        estimates,
    };
    info!(
        "{} TDEE estimates from {} to {}, mean {:.0} kcal, median {:.0} kcal",
        report.n_estimates,
        report.period_start,
        report.period_end,
        report.tdee_mean,
        report.tdee_median
    );
    Ok(report)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::day::process_entry;
    use crate::reference::FoodIndex;

    fn day(date: &str, weight: Option<f64>, intake: Option<f64>) -> DayRecord {
        let mut text = format!("date: {}\n", date);
        if let Some(w) = weight {
            text.push_str(&format!("weight: {}\n", w));
        }
        if let Some(kcal) = intake {
            text.push_str(&format!("actual_calories: {}\n", kcal));
        }
        text.push('\n');
        process_entry(&text, &format!("{}.md", date), &FoodIndex::default()).0
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn two_weights_one_day_apart_give_one_estimate() {
        let records = vec![
            day("2024-01-01", Some(80.0), None),
            day("2024-01-02", Some(79.9), Some(2000.0)),
        ];
        let estimates = compute_rolling_estimate(&records, 14, 7);
        assert_eq!(estimates.len(), 1);

        let e = &estimates[0];
        assert_eq!(e.date, date("2024-01-02"));
        assert_eq!(e.span_days, 1);
        assert_eq!(e.window_start, date("2024-01-01"));
        assert_eq!(e.window_end, date("2024-01-02"));
        assert!((e.delta_weight + 0.1).abs() < 1e-9);
        assert!((e.daily_energy_change + 770.0).abs() < 1e-6);
        assert!((e.tdee - 2770.0).abs() < 1e-6);
        assert_eq!(e.tdee_smooth, e.tdee);
    }

    #[test]
    fn single_weight_gives_no_estimate() {
        let records = vec![
            day("2024-01-01", Some(80.0), Some(2000.0)),
            day("2024-01-05", None, Some(2100.0)),
        ];
        assert!(compute_rolling_estimate(&records, 14, 7).is_empty());
    }

    #[test]
    fn weights_without_intake_give_no_estimate() {
        let records = vec![
            day("2024-01-01", Some(80.0), None),
            day("2024-01-03", Some(79.0), None),
        ];
        assert!(compute_rolling_estimate(&records, 14, 7).is_empty());
    }

    #[test]
    fn window_excludes_old_observations() {
        let records = vec![
            day("2024-01-01", Some(82.0), Some(2500.0)),
            day("2024-01-10", Some(80.0), Some(2000.0)),
            day("2024-01-12", Some(80.2), Some(2200.0)),
        ];
        let estimates = compute_rolling_estimate(&records, 5, 1);
        assert_eq!(estimates.len(), 1);
        let e = &estimates[0];
        assert_eq!(e.date, date("2024-01-12"));
        assert_eq!(e.window_start, date("2024-01-10"));
        assert_eq!(e.span_days, 2);
        assert!((e.mean_intake - 2100.0).abs() < 1e-9);
        assert!((e.tdee - (2100.0 - 0.2 * 7700.0 / 2.0)).abs() < 1e-6);
    }

    #[test]
    fn estimates_are_date_ordered_regardless_of_input_order() {
        let records = vec![
            day("2024-01-03", Some(79.8), Some(2000.0)),
            day("2024-01-01", Some(80.0), Some(2000.0)),
            day("2024-01-02", Some(79.9), Some(2000.0)),
        ];
        let dates: Vec<_> = compute_rolling_estimate(&records, 14, 7)
            .iter()
            .map(|e| e.date)
            .collect();
        assert_eq!(dates, [date("2024-01-02"), date("2024-01-03")]);
    }

    #[test]
    fn centered_mean_uses_partial_windows_at_edges() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(centered_mean(&values, 3), vec![1.5, 2.0, 3.0, 4.0, 4.5]);
        assert_eq!(centered_mean(&values, 1), values.to_vec());
        assert_eq!(centered_mean(&values, 4), vec![1.5, 2.0, 2.5, 3.5, 4.0]);
        assert!(centered_mean(&[], 7).is_empty());
    }

    #[test]
    fn report_summarizes_estimates() {
        let records = vec![
            day("2024-01-01", Some(80.0), Some(2000.0)),
            day("2024-01-02", Some(80.0), Some(2000.0)),
            day("2024-01-03", Some(80.0), Some(2600.0)),
        ];
        let report = build_report(&records, 14, 7, Utc::now()).unwrap();
        assert_eq!(report.n_estimates, 2);
        assert!((report.tdee_mean - 2100.0).abs() < 1e-9);
        assert!((report.tdee_median - 2100.0).abs() < 1e-9);
        assert_eq!(report.period_start, date("2024-01-01"));
        assert_eq!(report.period_end, date("2024-01-03"));
    }

    #[test]
    fn report_without_estimates_is_an_error() {
        let records = vec![day("2024-01-01", Some(80.0), Some(2000.0))];
        let err = build_report(&records, 14, 7, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData {
                records: 1,
                weights: 1,
                intakes: 1
            }
        ));
    }

    #[test]
    fn logged_foods_do_not_stand_in_for_intake() {
        let index = FoodIndex::from_yaml_str(
            "oats:\n  name: Haferflocken\n  kcal_per_100g: 389\n  aliases: [oats]\n",
        )
        .unwrap();
        let records = vec![
            process_entry(
                "date: 2024-01-01\nweight: 80\n\n25 g oats\n500 g Tofu\n",
                "a.md",
                &index,
            )
            .0,
            process_entry("date: 2024-01-02\nweight: 80\n\n", "b.md", &index).0,
        ];
        assert_eq!(records[0].consumed.kcal, 97.25);
        assert!(compute_rolling_estimate(&records, 14, 7).is_empty());
        assert!(matches!(
            build_report(&records, 14, 7, Utc::now()),
            Err(PipelineError::InsufficientData {
                records: 2,
                weights: 2,
                intakes: 0
            })
        ));
    }

    #[test]
    fn median_of_even_count_averages_middle() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }
}
