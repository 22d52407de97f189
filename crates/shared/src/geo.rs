use chrono::{DateTime, Utc};

use crate::models::{DeliveryStatus, GeoPoint};

/// Mean Earth radius used for all great-circle math.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Assumed cruise speed for ETA estimates when nothing else is configured.
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 45.0;

/// Great-circle distance in kilometers (Haversine).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat() - a.lat()).to_radians();
    let d_lng = (b.lng() - a.lng()).to_radians();
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Initial compass bearing from `a` to `b` in degrees [0, 360).
pub fn initial_bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let d_lng = (b.lng() - a.lng()).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
    let deg = y.atan2(x).to_degrees();
    (deg + 360.0) % 360.0
}

/// A distance kept in kilometers. Displays as whole meters below 1 km,
/// otherwise as kilometers with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance {
    km: f64,
}

impl Distance {
    pub fn from_km(km: f64) -> Self {
        Distance { km }
    }

    pub fn km(&self) -> f64 {
        self.km
    }

    pub fn meters(&self) -> f64 {
        self.km * 1000.0
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.km < 1.0 {
            write!(f, "{:.0} m", self.meters())
        } else {
            write!(f, "{:.2} km", self.km)
        }
    }
}

/// Distance between two optional points. `None` means unavailable.
pub fn distance(a: Option<GeoPoint>, b: Option<GeoPoint>) -> Option<Distance> {
    Some(Distance::from_km(haversine_km(a?, b?)))
}

/// A duration in minutes, displayed as `N min` under an hour and `Hh Mm` above.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpan {
    minutes: f64,
}

impl TimeSpan {
    pub fn from_minutes(minutes: f64) -> Self {
        TimeSpan { minutes }
    }

    pub fn from_hours(hours: f64) -> Self {
        TimeSpan {
            minutes: hours * 60.0,
        }
    }

    pub fn minutes(&self) -> f64 {
        self.minutes
    }
}

impl std::fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.minutes.round().max(0.0) as u64;
        if total < 60 {
            write!(f, "{} min", total)
        } else {
            write!(f, "{}h {}m", total / 60, total % 60)
        }
    }
}

/// Time left at `average_speed_kmh` from `current` to `destination`.
///
/// `None` when the package is delivered, when either point is missing, or
/// when the speed is not a positive finite number.
pub fn estimated_time_remaining(
    current: Option<GeoPoint>,
    destination: Option<GeoPoint>,
    status: DeliveryStatus,
    average_speed_kmh: f64,
) -> Option<TimeSpan> {
    if status == DeliveryStatus::Delivered {
        return None;
    }
    if !(average_speed_kmh.is_finite() && average_speed_kmh > 0.0) {
        return None;
    }
    let km = haversine_km(current?, destination?);
    Some(TimeSpan::from_hours(km / average_speed_kmh))
}

/// Percentage with one decimal of display precision.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(pub f64);

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

/// Share of the source→destination distance already covered, in [0, 100].
pub fn progress_percent(
    source: Option<GeoPoint>,
    current: Option<GeoPoint>,
    destination: Option<GeoPoint>,
) -> Percent {
    let (Some(source), Some(current), Some(destination)) = (source, current, destination) else {
        return Percent(0.0);
    };
    let total = haversine_km(source, destination);
    if total <= 0.0 {
        return Percent(0.0);
    }
    let remaining = haversine_km(current, destination);
    let pct = ((total - remaining) / total * 100.0).clamp(0.0, 100.0);
    Percent((pct * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Speed {
    kmh: f64,
}

impl Speed {
    pub fn kmh(&self) -> f64 {
        self.kmh
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} km/h", self.kmh)
    }
}

/// Hours between two timestamps; negative if `end` precedes `start`.
pub fn elapsed_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}

/// Distance flown from `source` to `current` over the dispatch→update window.
pub fn average_speed(
    dispatch_time: Option<DateTime<Utc>>,
    last_update_time: Option<DateTime<Utc>>,
    source: Option<GeoPoint>,
    current: Option<GeoPoint>,
) -> Option<Speed> {
    let hours = elapsed_hours(dispatch_time?, last_update_time?);
    if hours <= 0.0 {
        return None;
    }
    let km = haversine_km(source?, current?);
    Some(Speed { kmh: km / hours })
}

/// Wall-clock time between dispatch and the last update.
pub fn flight_duration(
    dispatch_time: Option<DateTime<Utc>>,
    last_update_time: Option<DateTime<Utc>>,
) -> Option<TimeSpan> {
    let hours = elapsed_hours(dispatch_time?, last_update_time?);
    (hours >= 0.0).then(|| TimeSpan::from_hours(hours))
}
