use std::{collections::BTreeMap, fmt, str::FromStr};

use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, Days, Utc};
use geo::{Geometry, Point};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    config::HeatmapConfig,
    layers::{heat_color, Rgb},
    types::Feature,
};

/// Time-bucketing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    Daily,
    Weekly,
    Monthly,
}

impl Frame {
    pub fn to_str(&self) -> &'static str {
        match self {
            Frame::Daily => "daily",
            Frame::Weekly => "weekly",
            Frame::Monthly => "monthly",
        }
    }

    pub fn order() -> [Frame; 3] { [Frame::Daily, Frame::Weekly, Frame::Monthly] }

    /// Start (00:00 UTC) of the period containing `at`: the day, the ISO week (Monday), or the month.
    pub fn period_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let date = at.date_naive();
        let start = match self {
            Frame::Daily => Some(date),
            Frame::Weekly => date.checked_sub_days(Days::new(date.weekday().num_days_from_monday() as u64)),
            Frame::Monthly => date.with_day(1),
        };
        start.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|t| t.and_utc()).unwrap_or(at)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for Frame {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "harian" => Ok(Frame::Daily),
            "weekly" | "week" | "mingguan" => Ok(Frame::Weekly),
            "monthly" | "month" | "bulanan" => Ok(Frame::Monthly),
            _ => bail!("Unknown frame: {s} (expected daily, weekly or monthly)"),
        }
    }
}

/// A raw point observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub location: Point<f64>, // lon/lat
    pub timestamp: DateTime<Utc>,
    pub volume: f64,
}

impl Observation {
    /// Observation from a point feature carrying a timestamp. Missing volume counts as 1.
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        let Geometry::Point(location) = feature.geometry else { return None };
        Some(Self {
            location,
            timestamp: feature.attributes.timestamp?,
            volume: feature.attributes.volume.unwrap_or(1.0),
        })
    }
}

/// Derived radius and color for drawing one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visual {
    pub radius_px: f64,
    pub color: Rgb,
}

/// One merged (location, period) bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityPoint {
    pub location: Point<f64>,
    pub period_start: DateTime<Utc>,
    pub intensity: f64, // volume / max volume in the same result, in [0, 1]
    pub volume: f64,
    pub frequency: usize,
}

impl IntensityPoint {
    pub fn visual(&self, config: &HeatmapConfig) -> Visual {
        let t = self.intensity.clamp(0.0, 1.0);
        Visual {
            radius_px: config.min_radius_px + (config.max_radius_px - config.min_radius_px) * t,
            color: heat_color(t),
        }
    }

    pub fn to_json(&self, config: &HeatmapConfig) -> Value {
        let visual = self.visual(config);
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [self.location.x(), self.location.y()] },
            "properties": {
                "period_start": self.period_start.to_rfc3339(),
                "intensity": self.intensity,
                "volume": self.volume,
                "frequency": self.frequency,
                "radius_px": visual.radius_px,
                "color": visual.color.to_hex(),
            },
        })
    }
}

#[derive(Debug)]
struct Bucket {
    location: Point<f64>, // first observation seen at this location
    volume: f64,
    frequency: usize,
}

/// Buckets observations into time frames and normalizes intensity per call.
#[derive(Debug, Clone, Default)]
pub struct HeatmapAggregator {
    config: HeatmapConfig,
}

impl HeatmapAggregator {
    /// Fails if the pixel radius range is inverted or the merge precision is out of range.
    pub fn new(config: HeatmapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline] pub fn config(&self) -> &HeatmapConfig { &self.config }

    /// Location key: lon/lat rounded to `merge_precision` decimals.
    fn location_key(&self, p: Point<f64>) -> (i64, i64) {
        let scale = 10f64.powi(self.config.merge_precision as i32);
        ((p.x() * scale).round() as i64, (p.y() * scale).round() as i64)
    }

    /// Merge observations by (location, frame period). Output is ordered by period, then location.
    pub fn bucket(&self, observations: &[Observation], frame: Frame) -> Vec<IntensityPoint> {
        let mut buckets: BTreeMap<(DateTime<Utc>, (i64, i64)), Bucket> = BTreeMap::new();

        for obs in observations {
            if !(obs.location.x().is_finite() && obs.location.y().is_finite()) { continue }
            let volume = if obs.volume.is_finite() { obs.volume.max(0.0) } else { 0.0 };

            let key = (frame.period_start(obs.timestamp), self.location_key(obs.location));
            let bucket = buckets.entry(key)
                .or_insert(Bucket { location: obs.location, volume: 0.0, frequency: 0 });
            bucket.volume += volume;
            bucket.frequency += 1;
        }

        let max = buckets.values().map(|b| b.volume).fold(0.0, f64::max);
        debug!(frame = %frame, observations = observations.len(), buckets = buckets.len(), max, "heatmap bucketed");

        buckets.into_iter()
            .map(|((period_start, _), b)| IntensityPoint {
                location: b.location,
                period_start,
                intensity: if max > 0.0 { b.volume / max } else { 1.0 },
                volume: b.volume,
                frequency: b.frequency,
            })
            .collect()
    }

    /// Like `bucket`, restricted to the frame period containing `at`.
    pub fn bucket_at(&self, observations: &[Observation], frame: Frame, at: DateTime<Utc>) -> Vec<IntensityPoint> {
        let period = frame.period_start(at);
        let active: Vec<Observation> = observations.iter()
            .filter(|o| frame.period_start(o.timestamp) == period)
            .copied()
            .collect();
        self.bucket(&active, frame)
    }
}
