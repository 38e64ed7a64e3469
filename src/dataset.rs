use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::*;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    SmartTv,
    Chromecast,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Device::SmartTv => f.write_str("Smart-TV"),
            Device::Chromecast => f.write_str("Chromecast"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Upload, Direction::Download];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Upload => f.write_str("upload"),
            Direction::Download => f.write_str("download"),
        }
    }
}

/// One row of a traffic log, with the columns derived at load time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficRecord {
    pub bytes_up: f64,
    pub bytes_down: f64,
    pub timestamp: NaiveDateTime,
    /// Hour-of-day component of `timestamp`, 0..=23.
    pub hour: u8,
    /// `log10(bytes_up)`, or `None` when the counter is zero ("no signal").
    pub up_log: Option<f64>,
    pub down_log: Option<f64>,
}

impl TrafficRecord {
    pub fn log(&self, direction: Direction) -> Option<f64> {
        match direction {
            Direction::Upload => self.up_log,
            Direction::Download => self.down_log,
        }
    }
}

#[derive(Debug)]
pub struct Dataset {
    pub device: Device,
    pub records: Vec<TrafficRecord>,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: missing required column {name:?}")]
    MissingColumn { path: String, name: &'static str },
    #[error("{path}: unparseable date_hour value {value:?}")]
    BadTimestamp { path: String, value: String },
}

const REQUIRED_COLUMNS: [&str; 3] = ["bytes_up", "bytes_down", "date_hour"];

/// Timestamp shapes accepted in the `date_hour` column.  A bare hour with no
/// minutes ("2021-03-01 07") is handled separately in `parse_date_hour`.
const DATE_HOUR_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// The raw shape of one CSV row.  Columns are matched by header name, so any
/// extra columns in the file are ignored.
#[derive(Deserialize)]
struct RawRecord {
    bytes_up: f64,
    bytes_down: f64,
    date_hour: String,
}

impl Dataset {
    pub fn from_csv_path(device: Device, path: &Path) -> Result<Dataset, LoadError> {
        let at = |source| LoadError::Csv {
            path: path.display().to_string(),
            source,
        };
        let mut rdr = csv::Reader::from_path(path).map_err(at)?;

        let headers = rdr.headers().map_err(at)?.clone();
        for name in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == name) {
                return Err(LoadError::MissingColumn {
                    path: path.display().to_string(),
                    name,
                });
            }
        }

        let mut records = Vec::new();
        for row in rdr.deserialize() {
            let raw: RawRecord = row.map_err(at)?;
            let timestamp = parse_date_hour(&raw.date_hour).ok_or_else(|| {
                LoadError::BadTimestamp {
                    path: path.display().to_string(),
                    value: raw.date_hour.clone(),
                }
            })?;
            records.push(TrafficRecord {
                bytes_up: raw.bytes_up,
                bytes_down: raw.bytes_down,
                timestamp,
                hour: timestamp.hour() as u8,
                up_log: log10_or_undefined(raw.bytes_up),
                down_log: log10_or_undefined(raw.bytes_down),
            });
        }

        let undefined_up = records.iter().filter(|r| r.bytes_up == 0.0).count();
        let undefined_down = records.iter().filter(|r| r.bytes_down == 0.0).count();
        info!(
            "{}: loaded {} records from {} ({} zero upload, {} zero download)",
            device,
            records.len(),
            path.display(),
            undefined_up,
            undefined_down,
        );

        Ok(Dataset { device, records })
    }

    /// The defined log values for one direction, in record order.
    pub fn logs(&self, direction: Direction) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().filter_map(move |r| r.log(direction))
    }

    /// The defined log values for one direction, restricted to one hour.
    pub fn hour_logs(&self, hour: u8, direction: Direction) -> impl Iterator<Item = f64> + '_ {
        self.records
            .iter()
            .filter(move |r| r.hour == hour)
            .filter_map(move |r| r.log(direction))
    }

    /// Rows where both coordinates are defined, as (up, down) pairs.
    pub fn log_pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.records
            .iter()
            .filter_map(|r| Some((r.up_log?, r.down_log?)))
    }
}

/// A byte counter of zero means "no signal", not `log10(0) = -inf`.
fn log10_or_undefined(bytes: f64) -> Option<f64> {
    (bytes > 0.0).then(|| bytes.log10())
}

fn parse_date_hour(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Some(ts) = DATE_HOUR_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(ts);
    }
    // A date followed by a bare hour component
    let (date, hour) = value.rsplit_once(&[' ', '_'][..])?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let hour: u32 = hour.parse().ok()?;
    date.and_hms_opt(hour, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(rows: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", rows).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn zero_bytes_are_undefined_not_neg_infinity() {
        let file = write_csv(
            "bytes_up,bytes_down,date_hour\n\
             100,0,2021-03-01 14:00:00\n\
             0,50,2021-03-01 15:00:00\n",
        );
        let ds = Dataset::from_csv_path(Device::SmartTv, file.path()).unwrap();
        assert_eq!(ds.records.len(), 2);

        assert_eq!(ds.records[0].up_log, Some(2.0));
        assert_eq!(ds.records[0].down_log, None);
        assert_eq!(ds.records[1].up_log, None);
        assert_eq!(ds.records[1].down_log, Some(50f64.log10()));
        for r in &ds.records {
            for d in Direction::BOTH {
                assert!(r.log(d).map_or(true, f64::is_finite));
            }
        }
    }

    #[test]
    fn hour_is_extracted_from_date_hour() {
        let file = write_csv(
            "bytes_up,bytes_down,date_hour\n\
             1,1,2021-03-01 00:00:00\n\
             1,1,2021-03-01 09:30:00\n\
             1,1,2021-03-01 23:59:59\n",
        );
        let ds = Dataset::from_csv_path(Device::Chromecast, file.path()).unwrap();
        let hours: Vec<u8> = ds.records.iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![0, 9, 23]);
        for r in &ds.records {
            assert!(r.hour <= 23);
            assert_eq!(u32::from(r.hour), r.timestamp.hour());
        }
    }

    #[test]
    fn accepts_hour_only_timestamps_and_extra_columns() {
        let file = write_csv(
            "device,bytes_up,bytes_down,date_hour\n\
             tv,10,20,2021-03-01 07\n",
        );
        let ds = Dataset::from_csv_path(Device::SmartTv, file.path()).unwrap();
        assert_eq!(ds.records[0].hour, 7);
    }

    #[test]
    fn missing_column_is_fatal() {
        let file = write_csv("bytes_up,date_hour\n1,2021-03-01 00:00:00\n");
        let err = Dataset::from_csv_path(Device::SmartTv, file.path()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn {
                name: "bytes_down",
                ..
            }
        ));
    }

    #[test]
    fn bad_timestamp_is_fatal() {
        let file = write_csv("bytes_up,bytes_down,date_hour\n1,1,yesterday-ish\n");
        let err = Dataset::from_csv_path(Device::SmartTv, file.path()).unwrap_err();
        assert!(matches!(err, LoadError::BadTimestamp { .. }));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = Dataset::from_csv_path(Device::SmartTv, Path::new("no-such-file.csv"));
        assert!(matches!(err, Err(LoadError::Csv { .. })));
    }

    #[test]
    fn log_pairs_drop_rows_with_either_side_undefined() {
        let file = write_csv(
            "bytes_up,bytes_down,date_hour\n\
             10,100,2021-03-01 01:00:00\n\
             0,100,2021-03-01 02:00:00\n\
             10,0,2021-03-01 03:00:00\n",
        );
        let ds = Dataset::from_csv_path(Device::SmartTv, file.path()).unwrap();
        let pairs: Vec<(f64, f64)> = ds.log_pairs().collect();
        assert_eq!(pairs, vec![(1.0, 2.0)]);
    }
}
