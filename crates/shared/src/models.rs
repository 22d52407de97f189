use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Physical rack slots in a drop terminal.
pub const MAX_RACKS: usize = 6;

// ---------------------------------------------------------------------------
// Lenient field decoding
//
// Legacy services send coordinates as numbers or numeric strings, package ids
// as integers or strings, and sometimes `null` for either.
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Decode a number that may arrive as a JSON number or a numeric string.
/// Anything that does not parse to a finite value becomes `None`, never zero.
pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|v| match v {
            NumberOrText::Number(n) => Some(n),
            NumberOrText::Text(s) => s.trim().parse::<f64>().ok(),
        })
        .filter(|v| v.is_finite()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdLike {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Decode an identifier that may be a JSON string or integer. Blank strings are `None`.
pub fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw = Option::<IdLike>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| match v {
        IdLike::Int(i) => Some(i.to_string()),
        IdLike::Float(f) => Some(f.to_string()),
        IdLike::Text(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
    }))
}

/// Parse the timestamp formats seen from the delivery services:
/// RFC 3339, RFC 2822 (Flask's default) and naive `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// GeoPoint
// ---------------------------------------------------------------------------

/// A validated latitude/longitude pair. Construction rejects NaN, infinities
/// and out-of-range values, so a `GeoPoint` is always safe to feed into GeoMath.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    #[serde(rename = "latitude")]
    lat: f64,
    #[serde(rename = "longitude")]
    lng: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    #[serde(default, deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = String;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::from_parts(raw.latitude, raw.longitude).ok_or_else(|| {
            format!(
                "invalid coordinates: latitude={:?} longitude={:?}",
                raw.latitude, raw.longitude
            )
        })
    }
}

/// Center of the zoomed-out world view.
pub const WORLD_VIEW_CENTER: GeoPoint = GeoPoint { lat: 20.0, lng: 0.0 };

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(GeoPoint { lat, lng })
    }

    /// Build from possibly-absent parts, as decoded by [`lenient_f64`].
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        GeoPoint::new(lat?, lng?)
    }

    /// Parse from text fields (form inputs, query strings).
    pub fn parse(lat: &str, lng: &str) -> Option<Self> {
        GeoPoint::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?)
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

// ---------------------------------------------------------------------------
// Terminals (DDTs)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalStatus {
    Active,
    Inactive,
}

impl TerminalStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            TerminalStatus::Active
        } else {
            TerminalStatus::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == TerminalStatus::Active
    }
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalStatus::Active => write!(f, "Active"),
            TerminalStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

/// The six `rack_NN` columns as they travel over the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RackColumns {
    #[serde(default, deserialize_with = "lenient_string")]
    pub rack_01: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rack_02: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rack_03: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rack_04: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rack_05: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rack_06: Option<String>,
}

impl From<RackColumns> for [Option<String>; MAX_RACKS] {
    fn from(c: RackColumns) -> Self {
        [c.rack_01, c.rack_02, c.rack_03, c.rack_04, c.rack_05, c.rack_06]
    }
}

impl From<[Option<String>; MAX_RACKS]> for RackColumns {
    fn from(racks: [Option<String>; MAX_RACKS]) -> Self {
        let [rack_01, rack_02, rack_03, rack_04, rack_05, rack_06] = racks;
        RackColumns {
            rack_01,
            rack_02,
            rack_03,
            rack_04,
            rack_05,
            rack_06,
        }
    }
}

fn default_total_racks() -> u8 {
    1
}

/// Terminal as serialized by the terminal service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalRecord {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_total_racks")]
    pub total_racks: u8,
    #[serde(default, deserialize_with = "lenient_string")]
    pub control_key: Option<String>,
    #[serde(flatten)]
    pub racks: RackColumns,
}

/// A drop terminal. `location` is `None` when the service sent coordinates
/// that do not parse; such terminals stay in the collection but are never drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TerminalRecord", into = "TerminalRecord")]
pub struct Terminal {
    pub id: i64,
    pub name: String,
    pub location: Option<GeoPoint>,
    pub active: bool,
    pub total_racks: u8,
    pub control_key: String,
    pub rack_assignments: [Option<String>; MAX_RACKS],
}

impl From<TerminalRecord> for Terminal {
    fn from(r: TerminalRecord) -> Self {
        Terminal {
            id: r.id,
            name: r.name,
            location: GeoPoint::from_parts(r.latitude, r.longitude),
            // A record without status predates the column and counts as active.
            active: r
                .status
                .as_deref()
                .map_or(true, |s| s.trim().eq_ignore_ascii_case("active")),
            total_racks: r.total_racks.clamp(1, MAX_RACKS as u8),
            control_key: r.control_key.unwrap_or_default(),
            rack_assignments: r.racks.into(),
        }
    }
}

impl From<Terminal> for TerminalRecord {
    fn from(t: Terminal) -> Self {
        TerminalRecord {
            id: t.id,
            name: t.name,
            latitude: t.location.map(|p| p.lat()),
            longitude: t.location.map(|p| p.lng()),
            status: Some(TerminalStatus::from_active(t.active).to_string()),
            total_racks: t.total_racks,
            control_key: Some(t.control_key),
            racks: t.rack_assignments.into(),
        }
    }
}

impl Terminal {
    pub fn status(&self) -> TerminalStatus {
        TerminalStatus::from_active(self.active)
    }

    /// Racks within `total_racks` that currently hold a package.
    pub fn occupied_racks(&self) -> usize {
        self.rack_assignments
            .iter()
            .take(self.total_racks as usize)
            .filter(|r| r.is_some())
            .count()
    }

    /// Rack label as printed on the terminal, e.g. `R003`.
    pub fn rack_label(index: usize) -> String {
        format!("R{:03}", index + 1)
    }
}

/// Body of a terminal create call. The server assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTerminal {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: TerminalStatus,
    pub total_racks: u8,
    pub control_key: String,
    #[serde(flatten)]
    pub racks: RackColumns,
}

impl NewTerminal {
    pub fn new(name: &str, location: GeoPoint, total_racks: u8, control_key: &str) -> Self {
        NewTerminal {
            name: name.trim().to_string(),
            latitude: location.lat(),
            longitude: location.lng(),
            status: TerminalStatus::Active,
            total_racks,
            control_key: control_key.trim().to_string(),
            racks: RackColumns::default(),
        }
    }

    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Check the same constraints the dashboard form enforces.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Terminal name cannot be empty.".to_string());
        }
        if self.control_key.trim().is_empty() {
            return Err("Control key cannot be empty.".to_string());
        }
        if !(1..=MAX_RACKS as u8).contains(&self.total_racks) {
            return Err(format!(
                "Total racks must be between 1 and {}, got {}.",
                MAX_RACKS, self.total_racks
            ));
        }
        if self.location().is_none() {
            return Err(format!(
                "Invalid coordinates: {}, {}",
                self.latitude, self.longitude
            ));
        }
        Ok(())
    }
}

impl TryFrom<&Terminal> for NewTerminal {
    type Error = String;

    /// Rebuild a create body from an existing terminal, racks included.
    fn try_from(t: &Terminal) -> Result<Self, Self::Error> {
        let location = t
            .location
            .ok_or_else(|| format!("Terminal '{}' has no valid location", t.name))?;
        Ok(NewTerminal {
            name: t.name.clone(),
            latitude: location.lat(),
            longitude: location.lng(),
            status: t.status(),
            total_racks: t.total_racks,
            control_key: t.control_key.clone(),
            racks: t.rack_assignments.clone().into(),
        })
    }
}

/// Fields editable from the terminal editor. Coordinates are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TerminalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_key: Option<String>,
}

impl TerminalPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none() && self.control_key.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err("Terminal name cannot be empty.".to_string());
        }
        if matches!(&self.control_key, Some(k) if k.trim().is_empty()) {
            return Err("Control key cannot be empty.".to_string());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Warehouses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseRecord {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WarehouseRecord", into = "WarehouseRecord")]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub location: Option<GeoPoint>,
}

impl From<WarehouseRecord> for Warehouse {
    fn from(r: WarehouseRecord) -> Self {
        Warehouse {
            id: r.id,
            name: r.name,
            location: GeoPoint::from_parts(r.latitude, r.longitude),
        }
    }
}

impl From<Warehouse> for WarehouseRecord {
    fn from(w: Warehouse) -> Self {
        WarehouseRecord {
            id: w.id,
            name: w.name,
            latitude: w.location.map(|p| p.lat()),
            longitude: w.location.map(|p| p.lng()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewWarehouse {
    pub fn new(name: &str, location: GeoPoint) -> Self {
        NewWarehouse {
            name: name.trim().to_string(),
            latitude: location.lat(),
            longitude: location.lng(),
        }
    }

    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Warehouse name cannot be empty.".to_string());
        }
        if self.location().is_none() {
            return Err(format!(
                "Invalid coordinates: {}, {}",
                self.latitude, self.longitude
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehousePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WarehousePatch {
    pub fn validate(&self) -> Result<(), String> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err("Warehouse name cannot be empty.".to_string());
        }
        Ok(())
    }
}

/// One drone assigned to a warehouse, as listed in the warehouse editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneAssignment {
    #[serde(default, deserialize_with = "lenient_string")]
    pub drone_id: Option<String>,
    #[serde(default)]
    pub drone_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub warehouse_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Fleet overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total_terminals: usize,
    pub active_terminals: usize,
    pub total_warehouses: usize,
    /// Share of active terminals, rounded to a whole percent.
    pub coverage_percent: u32,
}

impl FleetStats {
    pub fn collect(terminals: &[Terminal], warehouses: &[Warehouse]) -> Self {
        let total = terminals.len();
        let active = terminals.iter().filter(|t| t.active).count();
        let coverage = (active as f64 / total.max(1) as f64 * 100.0).round() as u32;
        FleetStats {
            total_terminals: total,
            active_terminals: active,
            total_warehouses: warehouses.len(),
            coverage_percent: coverage,
        }
    }
}

// ---------------------------------------------------------------------------
// Package telemetry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Dispatched,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    /// Case-insensitive parse accepting `in_transit`, `In Transit` and `in-transit`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "pending" => Some(DeliveryStatus::Pending),
            "dispatched" => Some(DeliveryStatus::Dispatched),
            "in_transit" => Some(DeliveryStatus::InTransit),
            "out_for_delivery" => Some(DeliveryStatus::OutForDelivery),
            "delivered" => Some(DeliveryStatus::Delivered),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Dispatched => "dispatched",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// Human-facing phase shown on the monitor.
    pub fn status_text(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Awaiting Dispatch",
            DeliveryStatus::Dispatched => "In Flight",
            DeliveryStatus::InTransit => "En Route",
            DeliveryStatus::OutForDelivery => "Final Approach",
            DeliveryStatus::Delivered => "Completed",
            DeliveryStatus::Failed => "Delivery Failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Package monitor payload as sent by the telemetry service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub package_id: Option<String>,
    #[serde(default)]
    pub tracking_code: Option<String>,
    #[serde(default)]
    pub warehouse_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub source_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub source_lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub destination_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub destination_lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_known_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_known_lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dispatch_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub destination_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub assigned_drone_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight_kg: Option<f64>,
}

/// Read-only snapshot of one package's delivery. Any field the service
/// omitted or garbled is `None`; the monitor shows those as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TelemetryRecord", into = "TelemetryRecord")]
pub struct PackageTelemetry {
    pub package_id: String,
    pub tracking_code: Option<String>,
    pub warehouse_name: Option<String>,
    pub source_location: Option<GeoPoint>,
    pub destination_location: Option<GeoPoint>,
    pub last_known_location: Option<GeoPoint>,
    pub dispatch_time: Option<DateTime<Utc>>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub current_status: DeliveryStatus,
    pub destination_address: Option<String>,
    pub assigned_drone_id: Option<String>,
    pub weight_kg: Option<f64>,
}

impl TryFrom<TelemetryRecord> for PackageTelemetry {
    type Error = String;

    fn try_from(r: TelemetryRecord) -> Result<Self, Self::Error> {
        let package_id = r
            .package_id
            .ok_or_else(|| "telemetry record has no package_id".to_string())?;
        Ok(PackageTelemetry {
            package_id,
            tracking_code: r.tracking_code,
            warehouse_name: r.warehouse_name,
            source_location: GeoPoint::from_parts(r.source_lat, r.source_lng),
            destination_location: GeoPoint::from_parts(r.destination_lat, r.destination_lng),
            last_known_location: GeoPoint::from_parts(r.last_known_lat, r.last_known_lng),
            dispatch_time: r.dispatch_time.as_deref().and_then(parse_timestamp),
            last_update_time: r.last_update_time.as_deref().and_then(parse_timestamp),
            current_status: r
                .current_status
                .as_deref()
                .and_then(DeliveryStatus::parse)
                .unwrap_or(DeliveryStatus::Pending),
            destination_address: r.destination_address,
            assigned_drone_id: r.assigned_drone_id,
            weight_kg: r.weight_kg,
        })
    }
}

impl From<PackageTelemetry> for TelemetryRecord {
    fn from(t: PackageTelemetry) -> Self {
        TelemetryRecord {
            package_id: Some(t.package_id),
            tracking_code: t.tracking_code,
            warehouse_name: t.warehouse_name,
            source_lat: t.source_location.map(|p| p.lat()),
            source_lng: t.source_location.map(|p| p.lng()),
            destination_lat: t.destination_location.map(|p| p.lat()),
            destination_lng: t.destination_location.map(|p| p.lng()),
            last_known_lat: t.last_known_location.map(|p| p.lat()),
            last_known_lng: t.last_known_location.map(|p| p.lng()),
            dispatch_time: t.dispatch_time.map(|d| d.to_rfc3339()),
            last_update_time: t.last_update_time.map(|d| d.to_rfc3339()),
            current_status: Some(t.current_status.as_str().to_string()),
            destination_address: t.destination_address,
            assigned_drone_id: t.assigned_drone_id,
            weight_kg: t.weight_kg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(91.0, 0.0).is_none());
        assert!(GeoPoint::new(0.0, -180.5).is_none());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::new(-90.0, 180.0).is_some());
    }

    #[test]
    fn test_geo_point_parse_text() {
        let p = GeoPoint::parse(" 10.5 ", "-20.25").unwrap();
        assert!((p.lat() - 10.5).abs() < 1e-12);
        assert!((p.lng() + 20.25).abs() < 1e-12);
        assert!(GeoPoint::parse("abc", "1").is_none());
    }

    #[test]
    fn test_terminal_decodes_string_coordinates() {
        let json = r#"{"id":7,"name":"North Gate","latitude":"12.9716","longitude":"77.5946","status":"Active","total_racks":4,"control_key":"K-1","rack_01":"PKG-9","rack_02":null,"rack_03":42}"#;
        let t: Terminal = serde_json::from_str(json).unwrap();
        assert_eq!(t.id, 7);
        let loc = t.location.unwrap();
        assert!((loc.lat() - 12.9716).abs() < 1e-9);
        assert!(t.active);
        assert_eq!(t.total_racks, 4);
        assert_eq!(t.rack_assignments[0].as_deref(), Some("PKG-9"));
        assert_eq!(t.rack_assignments[1], None);
        assert_eq!(t.rack_assignments[2].as_deref(), Some("42"));
        assert_eq!(t.occupied_racks(), 2);
    }

    #[test]
    fn test_terminal_unparseable_coordinates_are_absent_not_zero() {
        let json = r#"{"id":1,"name":"Broken","latitude":"n/a","longitude":"77.1"}"#;
        let t: Terminal = serde_json::from_str(json).unwrap();
        assert!(t.location.is_none());
    }

    #[test]
    fn test_terminal_without_status_counts_as_active() {
        let json = r#"{"id":1,"name":"Old","latitude":1.0,"longitude":2.0}"#;
        let t: Terminal = serde_json::from_str(json).unwrap();
        assert!(t.active);
        assert_eq!(t.total_racks, 1);
        assert_eq!(t.control_key, "");
    }

    #[test]
    fn test_terminal_inactive_status() {
        let json = r#"{"id":1,"name":"Off","latitude":1.0,"longitude":2.0,"status":"Inactive"}"#;
        let t: Terminal = serde_json::from_str(json).unwrap();
        assert!(!t.active);
    }

    #[test]
    fn test_terminal_serializes_legacy_columns() {
        let t = Terminal {
            id: 3,
            name: "Dock".to_string(),
            location: GeoPoint::new(1.5, 2.5),
            active: false,
            total_racks: 2,
            control_key: "abc".to_string(),
            rack_assignments: [Some("P1".to_string()), None, None, None, None, None],
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["latitude"], 1.5);
        assert_eq!(v["status"], "Inactive");
        assert_eq!(v["rack_01"], "P1");
        assert!(v["rack_02"].is_null());
        let back: Terminal = serde_json::from_value(v).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_terminal_total_racks_clamped() {
        let json = r#"{"id":1,"name":"Big","latitude":1.0,"longitude":2.0,"total_racks":9}"#;
        let t: Terminal = serde_json::from_str(json).unwrap();
        assert_eq!(t.total_racks, MAX_RACKS as u8);
    }

    #[test]
    fn test_new_terminal_validation() {
        let loc = GeoPoint::new(1.0, 2.0).unwrap();
        assert!(NewTerminal::new("A", loc, 3, "key").validate().is_ok());
        assert!(NewTerminal::new("  ", loc, 3, "key").validate().is_err());
        assert!(NewTerminal::new("A", loc, 3, "").validate().is_err());
        assert!(NewTerminal::new("A", loc, 0, "key").validate().is_err());
        assert!(NewTerminal::new("A", loc, 7, "key").validate().is_err());
    }

    #[test]
    fn test_new_terminal_from_existing_keeps_racks() {
        let t = Terminal {
            id: 9,
            name: "Keep".to_string(),
            location: GeoPoint::new(5.0, 6.0),
            active: true,
            total_racks: 3,
            control_key: "ck".to_string(),
            rack_assignments: [None, Some("P2".to_string()), None, None, None, None],
        };
        let body = NewTerminal::try_from(&t).unwrap();
        assert_eq!(body.racks.rack_02.as_deref(), Some("P2"));
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["status"], "Active");
    }

    #[test]
    fn test_terminal_patch_omits_unset_fields() {
        let patch = TerminalPatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["name"], "Renamed");
        assert!(json.get("status").is_none());
        assert!(json.get("latitude").is_none());
    }

    #[test]
    fn test_warehouse_decodes() {
        let json = r#"{"id":2,"name":"Central","latitude":"48.85","longitude":2.35}"#;
        let w: Warehouse = serde_json::from_str(json).unwrap();
        assert_eq!(w.name, "Central");
        assert!(w.location.is_some());
    }

    #[test]
    fn test_fleet_stats_coverage() {
        let mk = |id, active| Terminal {
            id,
            name: format!("T{}", id),
            location: GeoPoint::new(0.0, 0.0),
            active,
            total_racks: 1,
            control_key: String::new(),
            rack_assignments: Default::default(),
        };
        let stats = FleetStats::collect(&[mk(1, true), mk(2, false), mk(3, true)], &[]);
        assert_eq!(stats.total_terminals, 3);
        assert_eq!(stats.active_terminals, 2);
        assert_eq!(stats.coverage_percent, 67);
        assert_eq!(FleetStats::collect(&[], &[]).coverage_percent, 0);
    }

    #[test]
    fn test_delivery_status_parse() {
        assert_eq!(DeliveryStatus::parse("In Transit"), Some(DeliveryStatus::InTransit));
        assert_eq!(DeliveryStatus::parse("DELIVERED"), Some(DeliveryStatus::Delivered));
        assert_eq!(
            DeliveryStatus::parse("out-for-delivery"),
            Some(DeliveryStatus::OutForDelivery)
        );
        assert_eq!(DeliveryStatus::parse("lost"), None);
        assert_eq!(DeliveryStatus::Dispatched.status_text(), "In Flight");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let b = parse_timestamp("Wed, 01 May 2024 10:00:00 GMT").unwrap();
        let c = parse_timestamp("2024-05-01 10:00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_telemetry_decodes() {
        let json = r#"{"package_id":1001,"tracking_code":"TRK-1","warehouse_name":"Central","source_lat":"0","source_lng":"0","destination_lat":0.0,"destination_lng":1.0,"last_known_lat":null,"last_known_lng":null,"dispatch_time":"2024-05-01 10:00:00","last_update_time":null,"current_status":"IN_TRANSIT"}"#;
        let t: PackageTelemetry = serde_json::from_str(json).unwrap();
        assert_eq!(t.package_id, "1001");
        assert!(t.source_location.is_some());
        assert!(t.last_known_location.is_none());
        assert!(t.dispatch_time.is_some());
        assert!(t.last_update_time.is_none());
        assert_eq!(t.current_status, DeliveryStatus::InTransit);
    }

    #[test]
    fn test_telemetry_with_numeric_timestamp_keeps_the_record() {
        let json = r#"{"package_id":"P-9","dispatch_time":1714557600,"last_update_time":"2024-05-01T10:30:00Z","current_status":"dispatched"}"#;
        let t: PackageTelemetry = serde_json::from_str(json).unwrap();
        assert_eq!(t.package_id, "P-9");
        assert!(t.dispatch_time.is_none());
        assert!(t.last_update_time.is_some());
        assert_eq!(t.current_status, DeliveryStatus::Dispatched);
    }

    #[test]
    fn test_telemetry_without_package_id_is_rejected() {
        let json = r#"{"package_id":null,"tracking_code":"TRK-1"}"#;
        assert!(serde_json::from_str::<PackageTelemetry>(json).is_err());
    }

    #[test]
    fn test_telemetry_unknown_status_falls_back_to_pending() {
        let json = r#"{"package_id":"P","current_status":"teleported"}"#;
        let t: PackageTelemetry = serde_json::from_str(json).unwrap();
        assert_eq!(t.current_status, DeliveryStatus::Pending);
    }
}
