use crate::dataset::{Dataset, Direction};
use onepass_stats::{SampleStats, StatsBuilder};
use std::collections::BTreeMap;

/// Whole-dataset statistics over the log columns.  A column with no defined
/// values yields NaN in all three of its fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub mean_up: f64,
    pub mean_down: f64,
    pub std_dev_up: f64,
    pub std_dev_down: f64,
    pub var_up: f64,
    pub var_down: f64,
}

impl SummaryStats {
    pub fn of(dataset: &Dataset) -> SummaryStats {
        let up: SampleStats = dataset.logs(Direction::Upload).collect();
        let down: SampleStats = dataset.logs(Direction::Download).collect();
        SummaryStats {
            mean_up: up.mean,
            mean_down: down.mean,
            std_dev_up: up.std_dev(),
            std_dev_down: down.std_dev(),
            var_up: up.var,
            var_down: down.var,
        }
    }
}

/// Per-hour statistics over the log columns.  Keyed by hour-of-day; only
/// hours with at least one record are present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyEntry {
    pub mean_up: f64,
    pub mean_down: f64,
    pub std_dev_up: f64,
    pub std_dev_down: f64,
}

pub type HourlyStats = BTreeMap<u8, HourlyEntry>;

pub fn hourly_stats(dataset: &Dataset) -> HourlyStats {
    let mut groups: BTreeMap<u8, (StatsBuilder, StatsBuilder)> = BTreeMap::new();
    for record in &dataset.records {
        let (up, down) = groups.entry(record.hour).or_default();
        if let Some(x) = record.up_log {
            up.update(x);
        }
        if let Some(x) = record.down_log {
            down.update(x);
        }
    }
    groups
        .into_iter()
        .map(|(hour, (up, down))| {
            let entry = HourlyEntry {
                mean_up: up.mean(),
                mean_down: down.mean(),
                std_dev_up: up.sample_std_dev(),
                std_dev_down: down.sample_std_dev(),
            };
            (hour, entry)
        })
        .collect()
}

/// The hour-of-day with the greatest mean log traffic, per direction.  `None`
/// when no hour has a defined mean for that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakHours {
    pub upload: Option<u8>,
    pub download: Option<u8>,
}

impl PeakHours {
    pub fn get(&self, direction: Direction) -> Option<u8> {
        match direction {
            Direction::Upload => self.upload,
            Direction::Download => self.download,
        }
    }
}

pub fn peak_hours(hourly: &HourlyStats) -> PeakHours {
    PeakHours {
        upload: argmax_hour(hourly, |e| e.mean_up),
        download: argmax_hour(hourly, |e| e.mean_down),
    }
}

/// Stable argmax over ascending hours: NaN means are skipped, and only a
/// strictly greater mean displaces the incumbent, so ties resolve to the
/// smallest hour.
fn argmax_hour(hourly: &HourlyStats, mean: impl Fn(&HourlyEntry) -> f64) -> Option<u8> {
    let mut best: Option<(u8, f64)> = None;
    for (&hour, entry) in hourly {
        let m = mean(entry);
        if m.is_nan() {
            continue;
        }
        match best {
            Some((_, incumbent)) if m <= incumbent => (),
            _ => best = Some((hour, m)),
        }
    }
    best.map(|(hour, _)| hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Device, TrafficRecord};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn record(hour: u8, bytes_up: f64, bytes_down: f64) -> TrafficRecord {
        let timestamp = NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(u32::from(hour), 0, 0)
            .unwrap();
        TrafficRecord {
            bytes_up,
            bytes_down,
            timestamp,
            hour,
            up_log: (bytes_up > 0.0).then(|| bytes_up.log10()),
            down_log: (bytes_down > 0.0).then(|| bytes_down.log10()),
        }
    }

    fn dataset(records: Vec<TrafficRecord>) -> Dataset {
        Dataset {
            device: Device::SmartTv,
            records,
        }
    }

    #[test]
    fn summary_ignores_undefined_values() {
        let ds = dataset(vec![
            record(0, 10.0, 100.0),
            record(1, 1000.0, 0.0),
            record(2, 0.0, 100.0),
        ]);
        let stats = SummaryStats::of(&ds);
        // upload: log10 {1, 3}; download: log10 {2, 2}
        assert_relative_eq!(stats.mean_up, 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.var_up, 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.mean_down, 2.0, epsilon = 1e-12);
        assert_relative_eq!(stats.var_down, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn variance_agrees_with_squared_std_dev() {
        let ds = dataset((0..24).map(|h| record(h, f64::from(h) + 1.0, 50.0)).collect());
        let stats = SummaryStats::of(&ds);
        assert_relative_eq!(stats.var_up, stats.std_dev_up * stats.std_dev_up, epsilon = 1e-12);
        assert_relative_eq!(
            stats.var_down,
            stats.std_dev_down * stats.std_dev_down,
            epsilon = 1e-12
        );
    }

    #[test]
    fn all_undefined_column_yields_nan_not_zero() {
        let ds = dataset(vec![record(0, 0.0, 10.0), record(1, 0.0, 10.0)]);
        let stats = SummaryStats::of(&ds);
        assert!(stats.mean_up.is_nan());
        assert!(stats.std_dev_up.is_nan());
        assert!(stats.var_up.is_nan());
        assert_relative_eq!(stats.mean_down, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn hourly_stats_only_contains_observed_hours() {
        let ds = dataset(vec![
            record(3, 10.0, 10.0),
            record(3, 100.0, 100.0),
            record(17, 1000.0, 0.0),
        ]);
        let hourly = hourly_stats(&ds);
        assert_eq!(hourly.keys().copied().collect::<Vec<u8>>(), vec![3, 17]);

        let three = &hourly[&3];
        assert_relative_eq!(three.mean_up, 1.5, epsilon = 1e-12);
        assert_relative_eq!(three.std_dev_up, 0.5_f64.sqrt(), epsilon = 1e-12);

        // hour 17 has one upload value and no download values
        let seventeen = &hourly[&17];
        assert_relative_eq!(seventeen.mean_up, 3.0, epsilon = 1e-12);
        assert!(seventeen.std_dev_up.is_nan());
        assert!(seventeen.mean_down.is_nan());
    }

    #[test]
    fn peak_hour_is_argmax_of_hourly_means() {
        let ds = dataset(vec![
            record(1, 10.0, 1000.0),
            record(8, 1000.0, 10.0),
            record(20, 100.0, 100.0),
        ]);
        let peaks = peak_hours(&hourly_stats(&ds));
        assert_eq!(peaks.upload, Some(8));
        assert_eq!(peaks.download, Some(1));
    }

    #[test]
    fn peak_hour_tie_resolves_to_smallest_hour() {
        let ds = dataset(vec![
            record(5, 100.0, 100.0),
            record(9, 100.0, 100.0),
            record(13, 10.0, 10.0),
        ]);
        let peaks = peak_hours(&hourly_stats(&ds));
        assert_eq!(peaks.upload, Some(5));
        assert_eq!(peaks.download, Some(5));
    }

    #[test]
    fn peak_hour_is_undefined_for_all_zero_traffic() {
        let ds = dataset(vec![record(2, 0.0, 10.0), record(7, 0.0, 20.0)]);
        let peaks = peak_hours(&hourly_stats(&ds));
        assert_eq!(peaks.upload, None);
        assert_eq!(peaks.download, Some(7));

        let empty = peak_hours(&HourlyStats::new());
        assert_eq!(empty.upload, None);
        assert_eq!(empty.download, None);
    }
}
