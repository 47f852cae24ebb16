use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

const METERS_PER_MILE: f64 = 1609.344;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
    Meters,
}

impl std::str::FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(Self::Miles),
            "km" | "kilometer" | "kilometers" => Ok(Self::Kilometers),
            "m" | "meter" | "meters" => Ok(Self::Meters),
            other => Err(format!("Unknown distance unit: {other}")),
        }
    }
}

pub fn format_distance(meters: f64, unit: DistanceUnit) -> String {
    match unit {
        DistanceUnit::Miles => format!("{:.2} mi", meters / METERS_PER_MILE),
        DistanceUnit::Kilometers => format!("{:.2} km", meters / 1000.),
        DistanceUnit::Meters => format!("{:.0} m", meters),
    }
}

/// Medium date style, e.g. "May 27, 2019".
pub fn format_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%b %-d, %Y").to_string()
}

/// What gets written to the store for one sikap.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SikapRecord {
    pub date: String,
    pub distance: String,
}

/// Snapshot of a finished session. Built once when the session ends and never changed after.
#[derive(Debug, Clone, PartialEq)]
pub struct SikapSummary {
    user: String,
    date: String,
    distance: String,
    distance_meters: f64,
}

impl SikapSummary {
    pub fn new<Tz: TimeZone>(user: impl Into<String>, at: &DateTime<Tz>, distance_meters: f64, unit: DistanceUnit) -> Self
    where
        Tz::Offset: Display,
    {
        Self {
            user: user.into(),
            date: format_date(at),
            distance: format_distance(distance_meters, unit),
            distance_meters,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn distance(&self) -> &str {
        &self.distance
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn details_line(&self) -> String {
        format!("{} - Distance: {}", self.date, self.distance)
    }

    pub fn record(&self) -> SikapRecord {
        SikapRecord {
            date: self.date.clone(),
            distance: self.distance.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn may_27() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 5, 27, 14, 30, 0).unwrap()
    }

    #[test]
    fn formats_distance_per_unit() {
        assert_eq!(format_distance(1609.344, DistanceUnit::Miles), "1.00 mi");
        assert_eq!(format_distance(0., DistanceUnit::Miles), "0.00 mi");
        assert_eq!(format_distance(2500., DistanceUnit::Kilometers), "2.50 km");
        assert_eq!(format_distance(11.4, DistanceUnit::Meters), "11 m");
    }

    #[test]
    fn formats_medium_date() {
        assert_eq!(format_date(&may_27()), "May 27, 2019");
        let early = Utc.with_ymd_and_hms(2020, 1, 3, 0, 0, 0).unwrap();
        assert_eq!(format_date(&early), "Jan 3, 2020");
    }

    #[test]
    fn summary_details_and_record() {
        let summary = SikapSummary::new("michael", &may_27(), 3218.688, DistanceUnit::Miles);
        assert_eq!(summary.user(), "michael");
        assert_eq!(summary.details_line(), "May 27, 2019 - Distance: 2.00 mi");
        assert_eq!(
            summary.record(),
            SikapRecord {
                date: "May 27, 2019".into(),
                distance: "2.00 mi".into()
            }
        );
    }

    #[test]
    fn record_serializes_as_date_and_distance() {
        let summary = SikapSummary::new("michael", &may_27(), 0., DistanceUnit::Kilometers);
        let json = serde_json::to_value(summary.record()).unwrap();
        assert_eq!(json, serde_json::json!({"date": "May 27, 2019", "distance": "0.00 km"}));
    }

    #[test]
    fn parses_units() {
        assert_eq!("km".parse::<DistanceUnit>(), Ok(DistanceUnit::Kilometers));
        assert_eq!(" Miles ".parse::<DistanceUnit>(), Ok(DistanceUnit::Miles));
        assert!("furlongs".parse::<DistanceUnit>().is_err());
    }
}
