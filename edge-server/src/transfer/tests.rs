use super::*;
use crate::audit::{AuditAction, MemoryAuditSink};
use crate::cashier::{CashierEngine, CashierError, SnapshotStore};
use crate::printing::{MemoryPrintDispatcher, PrintKind};
use crate::stock::{JsonStockLedger, StockError, StockLedger};
use crate::storage::{DEFAULT_LOCK_TIMEOUT, JsonFile};
use shared::models::{
    CashierType, ChargeFlagKind, ChargeStatus, ChargeType, CustomerType, OccupancyEntry,
    OrderItem, OrderStatus, PartialPayment, SessionOpen, StockEntry, StockLogEntry, TableOrder,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    coordinator: TransferCoordinator,
    cashier: Arc<CashierEngine>,
    stock: Arc<JsonStockLedger>,
    audit: Arc<MemoryAuditSink>,
    printer: Arc<MemoryPrintDispatcher>,
}

/// Rejects every stock write
struct RejectingLedger;

impl StockLedger for RejectingLedger {
    fn append_entry(&self, _entry: StockEntry) -> Result<(), StockError> {
        Err(StockError::Rejected("stock file is read-only".to_string()))
    }

    fn remove_entries(&self, _ids: &[String]) -> Result<usize, StockError> {
        Ok(0)
    }

    fn log_action(&self, _entry: StockLogEntry) -> Result<(), StockError> {
        Ok(())
    }
}

fn create_test_stores(dir: &TempDir) -> HotelStores {
    HotelStores {
        tables: JsonFile::new(dir.path().join("table_orders.json"), DEFAULT_LOCK_TIMEOUT),
        occupancy: JsonFile::new(dir.path().join("room_occupancy.json"), DEFAULT_LOCK_TIMEOUT),
        charges: JsonFile::new(dir.path().join("room_charges.json"), DEFAULT_LOCK_TIMEOUT),
        sales: JsonFile::new(dir.path().join("sales_history.json"), DEFAULT_LOCK_TIMEOUT),
    }
}

fn create_test_fixture_with(stock_override: Option<Arc<dyn StockLedger>>) -> Fixture {
    let dir = TempDir::new().unwrap();
    let audit = Arc::new(MemoryAuditSink::new());
    let printer = Arc::new(MemoryPrintDispatcher::new());
    let store = SnapshotStore::new(
        dir.path().join("cashier_sessions.json"),
        dir.path().join("backups/cashier"),
        DEFAULT_LOCK_TIMEOUT,
    );
    let cashier = Arc::new(CashierEngine::new(store, audit.clone(), dir.path().join("audit")));
    let stock = Arc::new(JsonStockLedger::new(
        dir.path().join("stock_entries.json"),
        dir.path().join("stock_logs.json"),
        DEFAULT_LOCK_TIMEOUT,
    ));
    let stores = create_test_stores(&dir);

    let mut occupancy = OccupancyMap::new();
    occupancy.insert(
        "101".to_string(),
        OccupancyEntry {
            guest_name: Some("Maria".to_string()),
            status: Some("occupied".to_string()),
            ..OccupancyEntry::default()
        },
    );
    occupancy.insert(
        "05".to_string(),
        OccupancyEntry {
            guest_name: None,
            status: Some("cleaning".to_string()),
            ..OccupancyEntry::default()
        },
    );
    stores.occupancy.save(&occupancy).unwrap();

    let ledger: Arc<dyn StockLedger> = stock_override.unwrap_or_else(|| stock.clone());
    let coordinator = TransferCoordinator::new(
        cashier.clone(),
        stores,
        ledger,
        audit.clone(),
        printer.clone(),
        dir.path().join("transfer.lock"),
        DEFAULT_LOCK_TIMEOUT,
    );
    Fixture {
        _dir: dir,
        coordinator,
        cashier,
        stock,
        audit,
        printer,
    }
}

fn create_test_fixture() -> Fixture {
    create_test_fixture_with(None)
}

fn open_both(fx: &Fixture) {
    for cashier_type in [CashierType::Restaurant, CashierType::GuestConsumption] {
        fx.cashier
            .open_session(SessionOpen {
                cashier_type,
                user: "ana".to_string(),
                opening_balance: 0.0,
                entity: None,
            })
            .unwrap();
    }
}

fn seed_table(fx: &Fixture, table_id: &str, order: TableOrder) {
    fx.coordinator
        .stores()
        .tables
        .update(|tables| {
            tables.insert(table_id.to_string(), order);
            Ok::<_, crate::storage::StorageError>(())
        })
        .unwrap();
}

/// Pizza 40 (A) + Água 5 (B), fee removed, discount 10
fn scenario_order() -> TableOrder {
    TableOrder {
        items: vec![
            OrderItem::new("Pizza", 40.0, 1.0).with_waiter("A"),
            OrderItem::new("Água", 5.0, 1.0).with_waiter("B"),
        ],
        total: 45.0,
        service_fee_removed: true,
        discount_amount: 10.0,
        opened_at: Some("19/10/2026 19:30:00".to_string()),
        ..TableOrder::default()
    }
}

fn load_tables(fx: &Fixture) -> TableMap {
    fx.coordinator.stores().tables.load_or_default().unwrap()
}

// ============================================================================
// Table → room
// ============================================================================

#[test]
fn test_transfer_with_fee_removed_and_discount() {
    let fx = create_test_fixture();
    open_both(&fx);
    seed_table(&fx, "12", scenario_order());

    let result = fx
        .coordinator
        .transfer_table_to_room("12", "0101", "ana", TransferMode::Split)
        .unwrap();

    assert_eq!(result.room_number, "101");
    assert_eq!(result.charges.len(), 1);
    let charge = &result.charges[0];
    assert_eq!(charge.charge_type, ChargeType::Restaurant);
    assert_eq!(charge.service_fee, 0.0);
    assert_eq!(charge.discount, 10.0);
    assert_eq!(charge.total, 35.0);
    assert!(charge.has_flag(ChargeFlagKind::ServiceRemoved));
    assert!(charge.has_flag(ChargeFlagKind::DiscountApplied));
    assert_eq!(charge.waiter_breakdown["A"], 31.11);
    assert_eq!(charge.waiter_breakdown["B"], 3.89);
    assert!(charge.id.starts_with("CHG_"));

    // mirrored table stays open with no items
    assert!(result.table_emptied);
    let table = &load_tables(&fx)["12"];
    assert!(table.items.is_empty());
    assert_eq!(table.total, 0.0);
    assert_eq!(table.status, OrderStatus::Open);

    let sales = fx.coordinator.stores().sales.load_or_default().unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].payment_method, ROOM_CHARGE_METHOD);
    assert_eq!(sales[0].final_total, 35.0);

    let entries = fx.stock.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.qty < 0.0));
    assert!(entries.iter().all(|e| e.reason == "Transferência Quarto 101"));

    assert_eq!(fx.printer.jobs().len(), 1);
    assert_eq!(fx.printer.jobs()[0].kind, PrintKind::RoomCharge);
    assert!(
        fx.audit
            .entries()
            .iter()
            .any(|e| e.acao == AuditAction::TableTransferredToRoom)
    );
}

#[test]
fn test_transfer_splits_minibar_and_removes_plain_table() {
    let fx = create_test_fixture();
    open_both(&fx);
    seed_table(
        &fx,
        "50",
        TableOrder {
            items: vec![
                OrderItem::new("Risoto", 50.0, 1.0),
                OrderItem::new("Cerveja", 12.0, 2.0).with_source("minibar"),
            ],
            total: 74.0,
            waiter: Some("Carlos".to_string()),
            ..TableOrder::default()
        },
    );

    let result = fx
        .coordinator
        .transfer_table_to_room("50", "101", "ana", TransferMode::Split)
        .unwrap();

    assert_eq!(result.charges.len(), 2);
    let restaurant = &result.charges[0];
    let minibar = &result.charges[1];
    assert_eq!(restaurant.charge_type, ChargeType::Restaurant);
    assert_eq!(restaurant.total, 55.0);
    assert_eq!(minibar.charge_type, ChargeType::Minibar);
    assert_eq!(minibar.service_fee, 0.0);
    assert_eq!(minibar.total, 24.0);

    assert!(!result.table_emptied);
    assert!(!load_tables(&fx).contains_key("50"));
    let sales = fx.coordinator.stores().sales.load_or_default().unwrap();
    assert_eq!(sales[0].final_total, 79.0);
}

#[test]
fn test_transfer_requires_both_cashiers() {
    let fx = create_test_fixture();
    fx.cashier
        .open_session(SessionOpen {
            cashier_type: CashierType::Restaurant,
            user: "ana".to_string(),
            opening_balance: 0.0,
            entity: None,
        })
        .unwrap();
    seed_table(&fx, "12", scenario_order());

    let err = fx
        .coordinator
        .transfer_table_to_room("12", "101", "ana", TransferMode::Split)
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::Cashier(CashierError::TransferIneligible(_))
    ));
    assert_eq!(load_tables(&fx)["12"].items.len(), 2);
}

#[test]
fn test_transfer_rejects_bad_rooms_and_empty_tables() {
    let fx = create_test_fixture();
    open_both(&fx);
    seed_table(&fx, "12", scenario_order());
    seed_table(&fx, "13", TableOrder::default());

    assert!(matches!(
        fx.coordinator
            .transfer_table_to_room("12", "999", "ana", TransferMode::Split),
        Err(TransferError::RoomNotFound(_))
    ));
    assert!(matches!(
        fx.coordinator
            .transfer_table_to_room("12", "5", "ana", TransferMode::Split),
        Err(TransferError::RoomNotOccupied(room)) if room == "05"
    ));
    assert!(matches!(
        fx.coordinator
            .transfer_table_to_room("13", "101", "ana", TransferMode::Split),
        Err(TransferError::EmptyTable(_))
    ));
    assert!(matches!(
        fx.coordinator
            .transfer_table_to_room("77", "101", "ana", TransferMode::Split),
        Err(TransferError::TableNotFound(_))
    ));

    assert!(fx.coordinator.stores().charges.load_or_default().unwrap().is_empty());
    assert!(fx.coordinator.stores().sales.load_or_default().unwrap().is_empty());
}

#[test]
fn test_stock_failure_unwinds_charges_and_sales() {
    let fx = create_test_fixture_with(Some(Arc::new(RejectingLedger)));
    open_both(&fx);
    seed_table(&fx, "12", scenario_order());

    let err = fx
        .coordinator
        .transfer_table_to_room("12", "101", "ana", TransferMode::Split)
        .unwrap_err();
    assert!(matches!(err, TransferError::Stock(StockError::Rejected(_))));

    assert!(fx.coordinator.stores().charges.load_or_default().unwrap().is_empty());
    assert!(fx.coordinator.stores().sales.load_or_default().unwrap().is_empty());
    assert_eq!(load_tables(&fx)["12"].items.len(), 2);
    assert!(fx.printer.jobs().is_empty());
}

#[test]
fn test_transfer_rejects_table_with_partial_payments() {
    let fx = create_test_fixture();
    open_both(&fx);
    seed_table(
        &fx,
        "12",
        TableOrder {
            partial_payments: vec![PartialPayment {
                id: "PP_1".to_string(),
                method: "Pix".to_string(),
                amount: 20.0,
                timestamp: "19/10/2026 20:10:00".to_string(),
                user: "ana".to_string(),
                transaction_id: None,
            }],
            total_paid: 20.0,
            ..scenario_order()
        },
    );

    let err = fx
        .coordinator
        .transfer_table_to_room("12", "101", "ana", TransferMode::Combined)
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::PartialPaymentsTaken { ref table_id, total_paid } if table_id == "12" && total_paid == 20.0
    ));

    assert!(fx.coordinator.stores().charges.load_or_default().unwrap().is_empty());
    assert!(fx.coordinator.stores().sales.load_or_default().unwrap().is_empty());
    assert!(fx.stock.entries().unwrap().is_empty());
    let table = &load_tables(&fx)["12"];
    assert_eq!(table.items.len(), 2);
    assert_eq!(table.total_paid, 20.0);
}

#[test]
fn test_emptied_table_does_not_inherit_previous_bill_settings() {
    let fx = create_test_fixture();
    open_both(&fx);
    seed_table(
        &fx,
        "12",
        TableOrder {
            waiter: Some("Carlos".to_string()),
            customer_name: Some("Maria".to_string()),
            ..scenario_order()
        },
    );
    fx.coordinator
        .transfer_table_to_room("12", "101", "ana", TransferMode::Combined)
        .unwrap();

    let mut table = load_tables(&fx)["12"].clone();
    assert_eq!(table.status, OrderStatus::Open);
    assert_eq!(table.discount_amount, 0.0);
    assert!(!table.service_fee_removed);
    assert!(table.partial_payments.is_empty());
    assert_eq!(table.total_paid, 0.0);
    assert_eq!(table.waiter, None);
    assert_eq!(table.opened_at, None);
    assert_eq!(table.customer_name, None);

    // next party: 50 of food plus the 10% fee, no leftover discount
    table.items.push(OrderItem::new("Moqueca", 50.0, 1.0));
    let totals = bill_totals(&table);
    assert_eq!(totals.discount, Decimal::ZERO);
    assert_eq!(totals.total, Decimal::from(55));
}

// ============================================================================
// Room → table
// ============================================================================

#[test]
fn test_return_onto_occupied_table_then_free_table() {
    let fx = create_test_fixture();
    open_both(&fx);
    seed_table(&fx, "12", scenario_order());
    let charge_id = fx
        .coordinator
        .transfer_table_to_room("12", "101", "ana", TransferMode::Split)
        .unwrap()
        .charges[0]
        .id
        .clone();

    seed_table(
        &fx,
        "20",
        TableOrder {
            items: vec![OrderItem::new("Moqueca", 30.0, 1.0)],
            total: 30.0,
            ..TableOrder::default()
        },
    );
    match fx
        .coordinator
        .return_charge_to_restaurant(&charge_id, "ana", Some("20"))
    {
        Err(TransferError::TableOccupied {
            table_id,
            free_tables,
        }) => {
            assert_eq!(table_id, "20");
            assert!(!free_tables.is_empty());
            assert!(!free_tables.contains(&20));
        }
        other => panic!("expected TableOccupied, got {other:?}"),
    }
    assert_eq!(fx.coordinator.pending_charges("101").unwrap().len(), 1);

    // emptied mirrored table counts as free
    let returned = fx
        .coordinator
        .return_charge_to_restaurant(&charge_id, "ana", Some("12"))
        .unwrap();
    assert_eq!(returned.table_id, "12");
    assert_eq!(returned.table.items.len(), 2);
    assert_eq!(returned.table.total, 45.0);
    assert_eq!(returned.table.status, OrderStatus::Open);
    assert_eq!(returned.table.opened_at.as_deref(), Some("19/10/2026 19:30:00"));
    assert!(fx.coordinator.pending_charges("101").unwrap().is_empty());
    assert!(
        fx.audit
            .entries()
            .iter()
            .any(|e| e.acao == AuditAction::ChargeReturnedToRestaurant)
    );
}

#[test]
fn test_return_to_own_source_table_skips_occupied_check() {
    let fx = create_test_fixture();
    open_both(&fx);
    seed_table(&fx, "12", scenario_order());
    let charge_id = fx
        .coordinator
        .transfer_table_to_room("12", "101", "ana", TransferMode::Split)
        .unwrap()
        .charges[0]
        .id
        .clone();

    // a new party sat at the source table meanwhile
    seed_table(
        &fx,
        "12",
        TableOrder {
            items: vec![OrderItem::new("Suco", 8.0, 1.0)],
            total: 8.0,
            ..TableOrder::default()
        },
    );

    let returned = fx
        .coordinator
        .return_charge_to_restaurant(&charge_id, "ana", Some("12"))
        .unwrap();
    assert_eq!(returned.table_id, "12");
    assert_eq!(returned.table.items.len(), 3);
    assert_eq!(returned.table.total, 53.0);
    assert!(fx.coordinator.pending_charges("101").unwrap().is_empty());
}

#[test]
fn test_return_recreates_removed_table() {
    let fx = create_test_fixture();
    open_both(&fx);
    seed_table(
        &fx,
        "50",
        TableOrder {
            items: vec![OrderItem::new("Risoto", 50.0, 1.0)],
            total: 50.0,
            waiter: Some("Carlos".to_string()),
            ..TableOrder::default()
        },
    );
    let charge_id = fx
        .coordinator
        .transfer_table_to_room("50", "101", "ana", TransferMode::Split)
        .unwrap()
        .charges[0]
        .id
        .clone();

    let returned = fx
        .coordinator
        .return_charge_to_restaurant(&charge_id, "ana", None)
        .unwrap();
    assert_eq!(returned.table_id, "50");
    assert_eq!(returned.table.customer_type, CustomerType::Hospede);
    assert_eq!(returned.table.room_number.as_deref(), Some("101"));
    assert_eq!(returned.table.waiter.as_deref(), Some("Carlos"));
    assert_eq!(returned.table.total, 50.0);
}

#[test]
fn test_return_rejects_non_pending_and_minibar_without_table() {
    let fx = create_test_fixture();
    open_both(&fx);
    let minibar = fx
        .coordinator
        .launch_minibar("101", vec![OrderItem::new("Água", 6.0, 2.0)], "ana")
        .unwrap();
    assert!(matches!(
        fx.coordinator
            .return_charge_to_restaurant(&minibar.id, "ana", None),
        Err(TransferError::MissingDestination)
    ));

    fx.coordinator
        .cancel_charge(&minibar.id, "ana", "lançado no quarto errado")
        .unwrap();
    assert!(matches!(
        fx.coordinator
            .return_charge_to_restaurant(&minibar.id, "ana", Some("40")),
        Err(TransferError::ChargeNotPending { status: ChargeStatus::Cancelled, .. })
    ));
}

// ============================================================================
// Charge edits
// ============================================================================

#[test]
fn test_cancel_charge_needs_justification() {
    let fx = create_test_fixture();
    let charge = fx
        .coordinator
        .launch_minibar("101", vec![OrderItem::new("Água", 6.0, 1.0)], "ana")
        .unwrap();

    assert!(matches!(
        fx.coordinator.cancel_charge(&charge.id, "ana", "  "),
        Err(TransferError::Validation(_))
    ));

    let cancelled = fx
        .coordinator
        .cancel_charge(&charge.id, "ana", "hóspede não consumiu")
        .unwrap();
    assert_eq!(cancelled.status, ChargeStatus::Cancelled);
    assert_eq!(cancelled.audit_log.len(), 1);
    assert_eq!(cancelled.audit_log[0].justification, "hóspede não consumiu");

    assert!(matches!(
        fx.coordinator.cancel_charge(&charge.id, "ana", "de novo"),
        Err(TransferError::ChargeNotPending { .. })
    ));
}

#[test]
fn test_minibar_launch_deducts_stock() {
    let fx = create_test_fixture();
    let charge = fx
        .coordinator
        .launch_minibar("101", vec![OrderItem::new("Água", 6.0, 2.0)], "ana")
        .unwrap();

    assert_eq!(charge.charge_type, ChargeType::Minibar);
    assert_eq!(charge.total, 12.0);
    assert!(charge.table_id.is_none());
    let entries = fx.stock.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].qty, -2.0);
    assert_eq!(entries[0].reason, "Frigobar Quarto 101");
}

#[test]
fn test_minibar_stock_failure_removes_charge() {
    let fx = create_test_fixture_with(Some(Arc::new(RejectingLedger)));
    assert!(
        fx.coordinator
            .launch_minibar("101", vec![OrderItem::new("Água", 6.0, 1.0)], "ana")
            .is_err()
    );
    assert!(fx.coordinator.stores().charges.load_or_default().unwrap().is_empty());
}

#[test]
fn test_free_tables_and_room_table_range() {
    let mut tables = TableMap::new();
    tables.insert(
        "1".to_string(),
        TableOrder {
            items: vec![OrderItem::new("Café", 5.0, 1.0)],
            total: 5.0,
            ..TableOrder::default()
        },
    );
    tables.insert("2".to_string(), TableOrder::default());

    let free = free_tables(&tables);
    assert!(!free.contains(&1));
    assert!(free.contains(&2));
    assert_eq!(free.len(), 59);

    assert!(is_room_table("35"));
    assert!(!is_room_table("36"));
    assert!(!is_room_table("varanda"));
}
