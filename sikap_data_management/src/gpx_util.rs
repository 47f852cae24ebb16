use std::{io::Read, path::Path};

use chrono::{DateTime, Utc};
use sikap_lib::location_fix::{Coordinate, LocationFix};

use crate::DataManagerError;

/// Rough user equivalent range error, used to turn HDOP into meters.
const UERE_METERS: f64 = 5.0;

/// Reads every track point of a GPX document as a location fix.
///
/// GPX has no horizontal accuracy, so it is estimated from `hdop` when present
/// and falls back to `default_accuracy` otherwise.
pub fn read_gpx<R: Read>(reader: R, default_accuracy: f64) -> Result<Vec<LocationFix>, DataManagerError> {
    let gpx = gpx::read(reader).map_err(|e| DataManagerError::Gpx(format!("Failed to parse gpx: {e}")))?;

    let mut fixes = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let Some(time) = point.time else {
                    return Err(DataManagerError::Gpx(format!("Track point {} has no time", fixes.len())));
                };
                let time = time.format().map_err(|e| DataManagerError::Gpx(format!("Bad track point time: {e}")))?;
                let timestamp = DateTime::parse_from_rfc3339(&time)
                    .map_err(|e| DataManagerError::Gpx(format!("Bad track point time {time}: {e}")))?
                    .with_timezone(&Utc);

                let accuracy = point.hdop.map(|hdop| hdop * UERE_METERS).unwrap_or(default_accuracy);
                fixes.push(LocationFix::new(Coordinate::from(point.point()), timestamp, accuracy));
            }
        }
    }

    tracing::debug!("Read {} fixes from gpx", fixes.len());
    Ok(fixes)
}

pub fn read_gpx_file(path: &Path, default_accuracy: f64) -> Result<Vec<LocationFix>, DataManagerError> {
    let file = std::fs::File::open(path)
        .map_err(|e| DataManagerError::NotFound(format!("Failed to open {path:?}: {e}")))?;
    read_gpx(std::io::BufReader::new(file), default_accuracy)
}
