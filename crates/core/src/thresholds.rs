//! Threshold evaluation for a single [`StatsSample`].
//!
//! Pure logic -- the caller fetches the sample and decides where the
//! resulting warnings go. Thresholds are compile-time constants.

use std::fmt;

use crate::stats::StatsSample;

/// Load average above this value is reported.
pub const LOAD_AVERAGE_THRESHOLD: f64 = 30.0;

/// Memory usage percentage above this value is reported.
pub const MEMORY_USAGE_PERCENT_THRESHOLD: f64 = 80.0;

/// Free disk space below this fraction of total capacity is reported.
pub const MIN_FREE_DISK_RATIO: f64 = 0.1;

/// Network usage percentage above this value is reported.
pub const NETWORK_USAGE_PERCENT_THRESHOLD: f64 = 90.0;

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

const BITS_PER_BYTE: f64 = 8.0;

/// The metric a check (and its warning) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    LoadAverage,
    MemoryUsage,
    DiskSpace,
    NetworkBandwidth,
}

impl Metric {
    /// Checks in evaluation order.
    pub const ALL: [Metric; 4] = [
        Metric::LoadAverage,
        Metric::MemoryUsage,
        Metric::DiskSpace,
        Metric::NetworkBandwidth,
    ];

    /// Stable snake_case name, used as a log field.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::LoadAverage => "load_average",
            Metric::MemoryUsage => "memory_usage",
            Metric::DiskSpace => "disk_space",
            Metric::NetworkBandwidth => "network_bandwidth",
        }
    }

    /// Run this metric's check against `sample`.
    pub fn check(self, sample: &StatsSample) -> Option<Warning> {
        match self {
            Metric::LoadAverage => (sample.load_average > LOAD_AVERAGE_THRESHOLD).then_some(
                Warning::LoadAverage {
                    value: sample.load_average,
                },
            ),
            Metric::MemoryUsage => {
                let percent = memory_usage_percent(sample);
                (percent > MEMORY_USAGE_PERCENT_THRESHOLD)
                    .then_some(Warning::MemoryUsage { percent })
            }
            Metric::DiskSpace => {
                let free_mb = free_disk_mb(sample);
                let floor_mb = sample.total_disk as f64 * MIN_FREE_DISK_RATIO / BYTES_PER_MB;
                (free_mb < floor_mb).then_some(Warning::DiskSpace { free_mb })
            }
            Metric::NetworkBandwidth => {
                (network_usage_percent(sample) > NETWORK_USAGE_PERCENT_THRESHOLD).then(|| {
                    Warning::NetworkBandwidth {
                        free_mbit: free_bandwidth_mbit(sample),
                    }
                })
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold breach, carrying the value that is reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Warning {
    LoadAverage { value: f64 },
    MemoryUsage { percent: f64 },
    DiskSpace { free_mb: f64 },
    NetworkBandwidth { free_mbit: f64 },
}

impl Warning {
    pub fn metric(&self) -> Metric {
        match self {
            Warning::LoadAverage { .. } => Metric::LoadAverage,
            Warning::MemoryUsage { .. } => Metric::MemoryUsage,
            Warning::DiskSpace { .. } => Metric::DiskSpace,
            Warning::NetworkBandwidth { .. } => Metric::NetworkBandwidth,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::LoadAverage { value } => write!(f, "Load Average is too high: {value:.2}"),
            Warning::MemoryUsage { percent } => {
                write!(f, "Memory usage too high: {percent:.2}%")
            }
            Warning::DiskSpace { free_mb } => {
                write!(f, "Free disk space is too low: {free_mb:.2} Mb left")
            }
            Warning::NetworkBandwidth { free_mbit } => {
                write!(f, "Network bandwidth usage high: {free_mbit:.2} Mbit/s available")
            }
        }
    }
}

/// Evaluate every check against `sample`, in [`Metric::ALL`] order.
///
/// The returned iterator is lazy and can be cloned to walk the warnings
/// again. No check short-circuits another.
pub fn evaluate(sample: &StatsSample) -> impl Iterator<Item = Warning> + Clone + '_ {
    Metric::ALL
        .into_iter()
        .filter_map(move |metric| metric.check(sample))
}

/// `used_memory / total_memory * 100`. Non-finite when `total_memory` is 0.
pub fn memory_usage_percent(sample: &StatsSample) -> f64 {
    sample.used_memory as f64 / sample.total_memory as f64 * 100.0
}

/// Free disk space in megabytes.
pub fn free_disk_mb(sample: &StatsSample) -> f64 {
    difference(sample.total_disk, sample.used_disk) / BYTES_PER_MB
}

/// Network usage percentage.
///
/// Derived from `used_memory`, not from a network counter; the record has
/// no network usage field.
pub fn network_usage_percent(sample: &StatsSample) -> f64 {
    sample.used_memory as f64 / sample.network_bandwidth as f64 * 100.0
}

/// Bandwidth left over in megabits, `(bandwidth - used_memory)` based.
pub fn free_bandwidth_mbit(sample: &StatsSample) -> f64 {
    difference(sample.network_bandwidth, sample.used_memory) / BYTES_PER_MB * BITS_PER_BYTE
}

fn difference(total: i64, used: i64) -> f64 {
    (i128::from(total) - i128::from(used)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(fields: [&str; 6]) -> StatsSample {
        StatsSample::from_fields(&fields, crate::FieldParsing::Strict).expect("valid sample")
    }

    fn healthy() -> StatsSample {
        sample(["5.0", "1000", "500", "2000", "100", "1000"])
    }

    #[test]
    fn healthy_sample_has_no_warnings() {
        assert_eq!(evaluate(&healthy()).count(), 0);
    }

    #[test]
    fn overloaded_sample_warns_on_everything_in_order() {
        let s = sample(["35.0", "1000", "999", "1000", "999", "1"]);
        let metrics: Vec<Metric> = evaluate(&s).map(|w| w.metric()).collect();
        assert_eq!(metrics, Metric::ALL.to_vec());
    }

    #[test]
    fn overloaded_sample_messages() {
        let s = sample(["35.0", "1000", "999", "1000", "999", "1"]);
        let lines: Vec<String> = evaluate(&s).map(|w| w.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "Load Average is too high: 35.00",
                "Memory usage too high: 99.90%",
                "Free disk space is too low: 0.00 Mb left",
                "Network bandwidth usage high: -0.01 Mbit/s available",
            ]
        );
    }

    #[test]
    fn load_average_boundary_is_exclusive() {
        let mut s = healthy();
        s.load_average = 30.0;
        assert_eq!(Metric::LoadAverage.check(&s), None);

        s.load_average = 30.01;
        assert_eq!(
            Metric::LoadAverage.check(&s),
            Some(Warning::LoadAverage { value: 30.01 })
        );
    }

    #[test]
    fn memory_boundary_is_exclusive() {
        let mut s = healthy();
        s.total_memory = 1000;
        s.used_memory = 800;
        assert_eq!(memory_usage_percent(&s), 80.0);
        assert_eq!(Metric::MemoryUsage.check(&s), None);

        s.total_memory = 10_000;
        s.used_memory = 8001;
        assert!(Metric::MemoryUsage.check(&s).is_some());
    }

    #[test]
    fn disk_warns_below_ten_percent_free() {
        let gb = 1024 * 1024 * 1024;
        let mut s = healthy();
        s.total_disk = 100 * gb;
        s.used_disk = 89 * gb;
        assert_eq!(Metric::DiskSpace.check(&s), None);

        s.used_disk = 91 * gb;
        assert_eq!(
            Metric::DiskSpace.check(&s),
            Some(Warning::DiskSpace {
                free_mb: 9.0 * 1024.0
            })
        );
    }

    #[test]
    fn disk_exactly_ten_percent_free_does_not_warn() {
        let mut s = healthy();
        s.total_disk = 1000;
        s.used_disk = 900;
        assert_eq!(Metric::DiskSpace.check(&s), None);
    }

    // The network check divides `used_memory`, not a network usage figure,
    // by the bandwidth. These tests pin that behaviour until the record
    // format grows a real network counter.
    #[test]
    fn network_check_uses_memory_field() {
        let mut s = healthy();
        s.network_bandwidth = 1000;
        s.used_memory = 950;
        assert_eq!(
            Metric::NetworkBandwidth.check(&s),
            Some(Warning::NetworkBandwidth {
                free_mbit: 50.0 / BYTES_PER_MB * 8.0
            })
        );

        s.used_memory = 900;
        assert_eq!(Metric::NetworkBandwidth.check(&s), None);
    }

    #[test]
    fn zero_total_memory_reports_infinite_usage() {
        let mut s = healthy();
        s.total_memory = 0;
        let warning = Metric::MemoryUsage.check(&s).expect("inf breaches threshold");
        assert_eq!(warning.to_string(), "Memory usage too high: inf%");
    }

    #[test]
    fn zero_over_zero_never_warns() {
        let mut s = healthy();
        s.total_memory = 0;
        s.used_memory = 0;
        s.network_bandwidth = 0;
        assert!(memory_usage_percent(&s).is_nan());
        assert_eq!(Metric::MemoryUsage.check(&s), None);
        assert_eq!(Metric::NetworkBandwidth.check(&s), None);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let s = sample(["35.0", "1000", "999", "1000", "999", "1"]);
        let warnings = evaluate(&s);
        let first: Vec<Warning> = warnings.clone().collect();
        let second: Vec<Warning> = warnings.collect();
        assert_eq!(first, second);
        assert_eq!(first, evaluate(&s).collect::<Vec<_>>());
    }

    #[test]
    fn extreme_values_do_not_panic() {
        let mut s = healthy();
        s.total_disk = i64::MAX;
        s.used_disk = i64::MIN;
        s.network_bandwidth = i64::MIN;
        s.used_memory = i64::MAX;
        let _ = evaluate(&s).count();
    }

    #[test]
    fn metric_names_are_snake_case() {
        let names: Vec<&str> = Metric::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(
            names,
            vec!["load_average", "memory_usage", "disk_space", "network_bandwidth"]
        );
    }
}
