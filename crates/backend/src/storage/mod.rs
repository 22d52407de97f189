use dronedash_shared::models::{
    DroneAssignment, NewTerminal, NewWarehouse, PackageTelemetry, Terminal, TerminalPatch,
    Warehouse, WarehousePatch,
};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

const TERMINALS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("terminals");
const WAREHOUSES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("warehouses");
const TELEMETRY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("package_telemetry");
/// Drone assignments keyed by warehouse name.
const ASSIGNMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("drone_assignments");
/// Last id handed out per entity kind. Ids are never reused.
const COUNTERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("id_counters");

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    serde_json::from_slice(bytes).map_err(|e| e.to_string())
}

pub struct Storage {
    db: Database,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, String> {
        let db = Database::create(path)
            .map_err(|e| format!("Failed to open database at {}: {}", path.display(), e))?;

        // Ensure tables exist
        let write_txn = db.begin_write().map_err(|e| e.to_string())?;
        {
            write_txn.open_table(TERMINALS_TABLE).map_err(|e| e.to_string())?;
            write_txn.open_table(WAREHOUSES_TABLE).map_err(|e| e.to_string())?;
            write_txn.open_table(TELEMETRY_TABLE).map_err(|e| e.to_string())?;
            write_txn.open_table(ASSIGNMENTS_TABLE).map_err(|e| e.to_string())?;
            write_txn.open_table(COUNTERS_TABLE).map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;

        Ok(Arc::new(Storage { db }))
    }

    // Terminals

    pub fn list_terminals(&self) -> Result<Vec<Terminal>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(TERMINALS_TABLE).map_err(|e| e.to_string())?;
        let mut terminals = Vec::new();
        for entry in table.iter().map_err(|e| e.to_string())? {
            let (_, value) = entry.map_err(|e| e.to_string())?;
            terminals.push(decode(value.value())?);
        }
        Ok(terminals)
    }

    pub fn count_terminals(&self) -> Result<u64, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(TERMINALS_TABLE).map_err(|e| e.to_string())?;
        table.len().map_err(|e| e.to_string())
    }

    pub fn create_terminal(&self, body: &NewTerminal) -> Result<Terminal, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let terminal = {
            let mut counters = write_txn.open_table(COUNTERS_TABLE).map_err(|e| e.to_string())?;
            let id = counters
                .get("terminal")
                .map_err(|e| e.to_string())?
                .map(|v| v.value())
                .unwrap_or(0)
                + 1;
            counters.insert("terminal", id).map_err(|e| e.to_string())?;

            let terminal = Terminal {
                id,
                name: body.name.trim().to_string(),
                location: body.location(),
                active: body.status.is_active(),
                total_racks: body.total_racks,
                control_key: body.control_key.trim().to_string(),
                rack_assignments: body.racks.clone().into(),
            };
            let json = serde_json::to_vec(&terminal).map_err(|e| e.to_string())?;
            let mut table = write_txn.open_table(TERMINALS_TABLE).map_err(|e| e.to_string())?;
            table.insert(id, json.as_slice()).map_err(|e| e.to_string())?;
            terminal
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(terminal)
    }

    /// Apply `patch` to terminal `id`. `Ok(None)` when there is no such terminal.
    pub fn update_terminal(&self, id: i64, patch: &TerminalPatch) -> Result<Option<Terminal>, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let updated = {
            let mut table = write_txn.open_table(TERMINALS_TABLE).map_err(|e| e.to_string())?;
            let existing: Option<Terminal> = match table.get(id).map_err(|e| e.to_string())? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };
            match existing {
                Some(mut terminal) => {
                    if let Some(name) = &patch.name {
                        terminal.name = name.trim().to_string();
                    }
                    if let Some(status) = patch.status {
                        terminal.active = status.is_active();
                    }
                    if let Some(key) = &patch.control_key {
                        terminal.control_key = key.trim().to_string();
                    }
                    let json = serde_json::to_vec(&terminal).map_err(|e| e.to_string())?;
                    table.insert(id, json.as_slice()).map_err(|e| e.to_string())?;
                    Some(terminal)
                }
                None => None,
            }
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(updated)
    }

    pub fn delete_terminal(&self, id: i64) -> Result<bool, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let removed = {
            let mut table = write_txn.open_table(TERMINALS_TABLE).map_err(|e| e.to_string())?;
            let result = table.remove(id).map_err(|e| e.to_string())?;
            result.is_some()
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(removed)
    }

    // Warehouses

    pub fn list_warehouses(&self) -> Result<Vec<Warehouse>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(WAREHOUSES_TABLE).map_err(|e| e.to_string())?;
        let mut warehouses = Vec::new();
        for entry in table.iter().map_err(|e| e.to_string())? {
            let (_, value) = entry.map_err(|e| e.to_string())?;
            warehouses.push(decode(value.value())?);
        }
        Ok(warehouses)
    }

    pub fn create_warehouse(&self, body: &NewWarehouse) -> Result<Warehouse, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let warehouse = {
            let mut counters = write_txn.open_table(COUNTERS_TABLE).map_err(|e| e.to_string())?;
            let id = counters
                .get("warehouse")
                .map_err(|e| e.to_string())?
                .map(|v| v.value())
                .unwrap_or(0)
                + 1;
            counters.insert("warehouse", id).map_err(|e| e.to_string())?;

            let warehouse = Warehouse {
                id,
                name: body.name.trim().to_string(),
                location: body.location(),
            };
            let json = serde_json::to_vec(&warehouse).map_err(|e| e.to_string())?;
            let mut table = write_txn.open_table(WAREHOUSES_TABLE).map_err(|e| e.to_string())?;
            table.insert(id, json.as_slice()).map_err(|e| e.to_string())?;
            warehouse
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(warehouse)
    }

    /// Rename a warehouse. Its drone assignments follow the new name.
    pub fn update_warehouse(&self, id: i64, patch: &WarehousePatch) -> Result<Option<Warehouse>, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let updated = {
            let mut table = write_txn.open_table(WAREHOUSES_TABLE).map_err(|e| e.to_string())?;
            let existing: Option<Warehouse> = match table.get(id).map_err(|e| e.to_string())? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };
            match existing {
                Some(mut warehouse) => {
                    if let Some(name) = &patch.name {
                        let name = name.trim().to_string();
                        if name != warehouse.name {
                            let mut assignments =
                                write_txn.open_table(ASSIGNMENTS_TABLE).map_err(|e| e.to_string())?;
                            let moved: Option<Vec<DroneAssignment>> = match assignments
                                .remove(warehouse.name.as_str())
                                .map_err(|e| e.to_string())?
                            {
                                Some(value) => Some(decode(value.value())?),
                                None => None,
                            };
                            if let Some(mut rows) = moved {
                                for row in rows.iter_mut() {
                                    row.warehouse_name = Some(name.clone());
                                }
                                let json = serde_json::to_vec(&rows).map_err(|e| e.to_string())?;
                                assignments
                                    .insert(name.as_str(), json.as_slice())
                                    .map_err(|e| e.to_string())?;
                            }
                        }
                        warehouse.name = name;
                    }
                    let json = serde_json::to_vec(&warehouse).map_err(|e| e.to_string())?;
                    table.insert(id, json.as_slice()).map_err(|e| e.to_string())?;
                    Some(warehouse)
                }
                None => None,
            }
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(updated)
    }

    /// Delete a warehouse together with its drone assignments.
    pub fn delete_warehouse(&self, id: i64) -> Result<bool, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let removed = {
            let mut table = write_txn.open_table(WAREHOUSES_TABLE).map_err(|e| e.to_string())?;
            let removed: Option<Warehouse> = match table.remove(id).map_err(|e| e.to_string())? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };
            if let Some(warehouse) = &removed {
                let mut assignments =
                    write_txn.open_table(ASSIGNMENTS_TABLE).map_err(|e| e.to_string())?;
                assignments
                    .remove(warehouse.name.as_str())
                    .map_err(|e| e.to_string())?;
            }
            removed.is_some()
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(removed)
    }

    // Drone assignments

    pub fn put_assignments(&self, warehouse_name: &str, rows: &[DroneAssignment]) -> Result<(), String> {
        let json = serde_json::to_vec(rows).map_err(|e| e.to_string())?;
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        {
            let mut table = write_txn.open_table(ASSIGNMENTS_TABLE).map_err(|e| e.to_string())?;
            table
                .insert(warehouse_name, json.as_slice())
                .map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Assignments for `warehouse_name`; empty when none were recorded.
    pub fn assignments(&self, warehouse_name: &str) -> Result<Vec<DroneAssignment>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(ASSIGNMENTS_TABLE).map_err(|e| e.to_string())?;
        match table.get(warehouse_name).map_err(|e| e.to_string())? {
            Some(value) => decode(value.value()),
            None => Ok(Vec::new()),
        }
    }

    // Package telemetry

    pub fn put_telemetry(&self, telemetry: &PackageTelemetry) -> Result<(), String> {
        let json = serde_json::to_vec(telemetry).map_err(|e| e.to_string())?;
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        {
            let mut table = write_txn.open_table(TELEMETRY_TABLE).map_err(|e| e.to_string())?;
            table
                .insert(telemetry.package_id.as_str(), json.as_slice())
                .map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn get_telemetry(&self, package_id: &str) -> Result<Option<PackageTelemetry>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(TELEMETRY_TABLE).map_err(|e| e.to_string())?;
        match table.get(package_id).map_err(|e| e.to_string())? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }
}
