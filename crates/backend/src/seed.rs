//! Sample fleet used for demos and local development.

use chrono::{Duration, Utc};
use dronedash_shared::models::{
    DeliveryStatus, DroneAssignment, GeoPoint, NewTerminal, NewWarehouse, PackageTelemetry,
    TerminalStatus,
};
use tracing::info;

use crate::storage::Storage;

struct SampleSite {
    name: &'static str,
    lat: f64,
    lng: f64,
}

const WAREHOUSES: &[SampleSite] = &[
    SampleSite { name: "Central Depot", lat: 12.9716, lng: 77.5946 },
    SampleSite { name: "North Hub", lat: 13.0827, lng: 77.5877 },
];

const TERMINALS: &[(SampleSite, u8, bool)] = &[
    (SampleSite { name: "MG Road DDT", lat: 12.9756, lng: 77.6067 }, 4, true),
    (SampleSite { name: "Indiranagar DDT", lat: 12.9784, lng: 77.6408 }, 6, true),
    (SampleSite { name: "Hebbal DDT", lat: 13.0358, lng: 77.5970 }, 2, false),
];

/// Load the sample fleet unless the store already holds terminals.
pub fn seed_sample_data(storage: &Storage) -> Result<bool, String> {
    if storage.count_terminals()? > 0 {
        info!("store not empty, skipping sample data");
        return Ok(false);
    }

    for site in WAREHOUSES {
        let location = GeoPoint::new(site.lat, site.lng)
            .ok_or_else(|| format!("bad sample coordinates for {}", site.name))?;
        storage.create_warehouse(&NewWarehouse::new(site.name, location))?;
    }

    for (i, (site, racks, active)) in TERMINALS.iter().enumerate() {
        let location = GeoPoint::new(site.lat, site.lng)
            .ok_or_else(|| format!("bad sample coordinates for {}", site.name))?;
        let mut body = NewTerminal::new(site.name, location, *racks, &format!("CK-{:04}", 1001 + i));
        body.status = TerminalStatus::from_active(*active);
        if i == 0 {
            body.racks.rack_01 = Some("PKG-1001".to_string());
        }
        storage.create_terminal(&body)?;
    }

    let depot = &WAREHOUSES[0];
    storage.put_assignments(
        depot.name,
        &[
            DroneAssignment {
                drone_id: Some("D-01".to_string()),
                drone_name: Some("Kestrel".to_string()),
                status: Some("in_flight".to_string()),
                warehouse_name: Some(depot.name.to_string()),
            },
            DroneAssignment {
                drone_id: Some("D-02".to_string()),
                drone_name: Some("Osprey".to_string()),
                status: Some("idle".to_string()),
                warehouse_name: Some(depot.name.to_string()),
            },
        ],
    )?;

    let dispatched = Utc::now() - Duration::minutes(12);
    let destination = &TERMINALS[0].0;
    storage.put_telemetry(&PackageTelemetry {
        package_id: "PKG-1001".to_string(),
        tracking_code: Some("TRK-7XQ2".to_string()),
        warehouse_name: Some(depot.name.to_string()),
        source_location: GeoPoint::new(depot.lat, depot.lng),
        destination_location: GeoPoint::new(destination.lat, destination.lng),
        last_known_location: GeoPoint::new(12.9738, 77.6005),
        dispatch_time: Some(dispatched),
        last_update_time: Some(dispatched + Duration::minutes(9)),
        current_status: DeliveryStatus::InTransit,
        destination_address: Some("Brigade Road, Bengaluru".to_string()),
        assigned_drone_id: Some("D-01".to_string()),
        weight_kg: Some(1.4),
    })?;

    info!(
        warehouses = WAREHOUSES.len(),
        terminals = TERMINALS.len(),
        "sample data loaded"
    );
    Ok(true)
}
