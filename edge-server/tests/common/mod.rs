//! 集成测试公共夹具
//!
//! 使用 `ServerState::with_collaborators` 构造完整状态，审计和打印落在内存中。

#![allow(dead_code)]

use edge_server::audit::MemoryAuditSink;
use edge_server::printing::MemoryPrintDispatcher;
use edge_server::stock::{JsonStockLedger, StockLedger};
use edge_server::storage::StorageError;
use edge_server::{Config, ServerState};
use shared::models::{CashierType, OccupancyEntry, OrderItem, Session, SessionOpen, TableOrder};
use std::sync::Arc;
use tempfile::TempDir;

pub struct Harness {
    pub dir: TempDir,
    pub state: ServerState,
    pub audit: Arc<MemoryAuditSink>,
    pub printer: Arc<MemoryPrintDispatcher>,
}

pub fn create_test_harness() -> Harness {
    create_test_harness_with(None)
}

pub fn create_test_harness_with(stock: Option<Arc<dyn StockLedger>>) -> Harness {
    let dir = TempDir::new().unwrap();
    let config = Config::with_overrides(dir.path());
    let paths = config.data_paths();
    let audit = Arc::new(MemoryAuditSink::new());
    let printer = Arc::new(MemoryPrintDispatcher::new());
    let stock = stock.unwrap_or_else(|| {
        Arc::new(JsonStockLedger::new(
            &paths.stock_entries,
            &paths.stock_logs,
            config.lock_timeout(),
        ))
    });
    let state = ServerState::with_collaborators(config, audit.clone(), stock, printer.clone());

    state
        .transfer
        .stores()
        .occupancy
        .update(|rooms| {
            rooms.insert(
                "101".to_string(),
                OccupancyEntry {
                    guest_name: Some("Maria".to_string()),
                    status: Some("occupied".to_string()),
                    ..OccupancyEntry::default()
                },
            );
            Ok::<_, StorageError>(())
        })
        .unwrap();

    Harness {
        dir,
        state,
        audit,
        printer,
    }
}

impl Harness {
    pub fn open(&self, cashier_type: CashierType, opening_balance: f64) -> Session {
        self.state
            .cashier
            .open_session(SessionOpen {
                cashier_type,
                user: "ana".to_string(),
                opening_balance,
                entity: None,
            })
            .unwrap()
    }

    pub fn active(&self, cashier_type: CashierType) -> Session {
        self.state
            .cashier
            .get_active_session(&cashier_type)
            .unwrap()
            .unwrap()
    }

    pub fn seed_table(&self, table_id: &str, order: TableOrder) {
        self.state
            .transfer
            .stores()
            .tables
            .update(|tables| {
                tables.insert(table_id.to_string(), order);
                Ok::<_, StorageError>(())
            })
            .unwrap();
    }
}

/// Pizza 40 (A) + Água 5 (B), fee removed, discount 10
pub fn create_test_order() -> TableOrder {
    TableOrder {
        items: vec![
            OrderItem::new("Pizza", 40.0, 1.0).with_waiter("A"),
            OrderItem::new("Água", 5.0, 1.0).with_waiter("B"),
        ],
        total: 45.0,
        service_fee_removed: true,
        discount_amount: 10.0,
        ..TableOrder::default()
    }
}
