use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

use crate::selection::DateRange;

const HOURS_PER_DAY: u32 = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSample {
    pub hour: String,
    pub speed: f64,
    pub volume: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTraffic {
    pub date: NaiveDate,
    pub samples: Vec<TrafficSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSummary {
    pub average_speed: f64,
    pub total_volume: u64,
    pub slowest_hour: Option<String>,
}

pub fn is_rush_hour(hour: u32) -> bool {
    (7..=9).contains(&hour) || (17..=19).contains(&hour)
}

/// Demo speed/volume readings for one segment over a day. Rush hours run
/// at roughly half speed with close to double the volume.
pub fn generate_traffic_data<R: Rng + ?Sized>(segment_id: u32, rng: &mut R) -> Vec<TrafficSample> {
    let base_speed = 40.0 - 3.0 * f64::from(segment_id);
    let base_volume = 1200.0 + 150.0 * f64::from(segment_id);

    (0..HOURS_PER_DAY)
        .map(|hour| {
            let (speed_factor, volume_factor): (f64, f64) = if is_rush_hour(hour) {
                (rng.gen_range(0.4..0.6), rng.gen_range(1.6..2.0))
            } else {
                (rng.gen_range(0.9..1.0), rng.gen_range(0.7..0.9))
            };
            let speed = (base_speed * speed_factor).max(0.0);

            TrafficSample {
                hour: format!("{hour:02}:00"),
                speed: (speed * 10.0).round() / 10.0,
                volume: (base_volume * volume_factor).round() as u32,
            }
        })
        .collect()
}

/// Generates one day of samples per date in `range`, on demand. Incomplete
/// ranges yield nothing.
pub fn daily_samples<'a, R: Rng + ?Sized>(
    segment_id: u32,
    range: &'a DateRange,
    rng: &'a mut R,
) -> impl Iterator<Item = DailyTraffic> + 'a {
    range.iter_days().map(move |date| DailyTraffic {
        date,
        samples: generate_traffic_data(segment_id, &mut *rng),
    })
}

pub fn summarize(samples: &[TrafficSample]) -> TrafficSummary {
    let total_volume = samples.iter().map(|sample| u64::from(sample.volume)).sum();
    let average_speed = if samples.is_empty() {
        0.0
    } else {
        let mean = samples.iter().map(|sample| sample.speed).sum::<f64>() / samples.len() as f64;
        (mean * 10.0).round() / 10.0
    };
    let slowest_hour = samples
        .iter()
        .min_by(|left, right| left.speed.total_cmp(&right.speed))
        .map(|sample| sample.hour.clone());

    TrafficSummary {
        average_speed,
        total_volume,
        slowest_hour,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentComparison {
    pub segment_id: u32,
    pub average_speed: f64,
    pub max_volume: u32,
}

/// Side-by-side readings for several segments plus the extremes among them.
/// Ties go to the segment listed first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub segments: Vec<SegmentComparison>,
    pub fastest: Option<u32>,
    pub slowest: Option<u32>,
    pub busiest: Option<u32>,
    pub quietest: Option<u32>,
}

pub fn compare_segments<R: Rng + ?Sized>(segment_ids: &[u32], rng: &mut R) -> ComparisonReport {
    let segments = segment_ids
        .iter()
        .map(|&segment_id| {
            let samples = generate_traffic_data(segment_id, &mut *rng);
            SegmentComparison {
                segment_id,
                average_speed: summarize(&samples).average_speed,
                max_volume: samples.iter().map(|sample| sample.volume).max().unwrap_or(0),
            }
        })
        .collect::<Vec<_>>();

    let fastest = segments
        .iter()
        .min_by(|left, right| right.average_speed.total_cmp(&left.average_speed))
        .map(|segment| segment.segment_id);
    let slowest = segments
        .iter()
        .min_by(|left, right| left.average_speed.total_cmp(&right.average_speed))
        .map(|segment| segment.segment_id);
    let busiest = segments
        .iter()
        .min_by_key(|segment| std::cmp::Reverse(segment.max_volume))
        .map(|segment| segment.segment_id);
    let quietest = segments
        .iter()
        .min_by_key(|segment| segment.max_volume)
        .map(|segment| segment.segment_id);

    ComparisonReport {
        segments,
        fastest,
        slowest,
        busiest,
        quietest,
    }
}
