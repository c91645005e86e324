//! JSON documents shared by the transfer coordinator and billing
//!
//! Lock order when more than one is held: transfer lock → tables → charges
//! → sales history → stock.

use crate::core::DataPaths;
use crate::storage::JsonFile;
use shared::models::{OccupancyEntry, RoomCharge, SalesRecord, TableOrder};
use std::collections::BTreeMap;
use std::time::Duration;

/// `table_orders.json`, keyed by table id
pub type TableMap = BTreeMap<String, TableOrder>;
/// `room_occupancy.json`, keyed by room number
pub type OccupancyMap = BTreeMap<String, OccupancyEntry>;

#[derive(Debug, Clone)]
pub struct HotelStores {
    pub tables: JsonFile<TableMap>,
    pub occupancy: JsonFile<OccupancyMap>,
    pub charges: JsonFile<Vec<RoomCharge>>,
    pub sales: JsonFile<Vec<SalesRecord>>,
}

impl HotelStores {
    pub fn from_paths(paths: &DataPaths, lock_timeout: Duration) -> Self {
        Self {
            tables: JsonFile::new(&paths.table_orders, lock_timeout),
            occupancy: JsonFile::new(&paths.room_occupancy, lock_timeout),
            charges: JsonFile::new(&paths.room_charges, lock_timeout),
            sales: JsonFile::new(&paths.sales_history, lock_timeout),
        }
    }
}
