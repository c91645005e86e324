//! Transfer Coordinator
//!
//! Moves an open restaurant table onto an occupied room's pending charges
//! and back. Multi-file operations run under the transfer lock; files are
//! written in a fixed order so a failing later step can unwind the earlier
//! ones:
//!
//! ```text
//! occupancy (read) → room charges → sales history → stock → table orders
//! ```

use super::charges::{PlannedCharge, TransferMode, plan_charges, plan_minibar};
use super::error::{TransferError, TransferResult};
use super::rooms::normalize_room;
use super::stores::{HotelStores, TableMap};
use crate::audit::{AuditAction, AuditEntry, AuditSink, emit};
use crate::cashier::CashierEngine;
use crate::money::{self, items_total, to_f64};
use crate::printing::{PrintDispatcher, PrintJob, dispatch_best_effort};
use crate::stock::{StockLedger, deduct_items};
use crate::storage::{FileLock, StorageError};
use serde::Serialize;
use serde_json::{Map, Value, json};
use shared::models::{
    CashierType, ChargeAuditEntry, ChargeStatus, CustomerType, OrderItem, OrderStatus, RoomCharge,
    SalesRecord, TableOrder,
};
use shared::util;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Tables mirroring a room: emptied instead of removed after a transfer
pub const ROOM_TABLE_MAX: u32 = 35;
/// Candidates offered when a return destination is occupied
pub const FREE_TABLE_RANGE: RangeInclusive<u32> = 1..=60;
/// Payment method of a table archived by a room transfer
pub const ROOM_CHARGE_METHOD: &str = "Room Charge";

const TABLE_OPENED_AT: &str = "table_opened_at";

/// Numeric table id within the room-mirrored range
pub fn is_room_table(table_id: &str) -> bool {
    table_id
        .trim()
        .parse::<u32>()
        .is_ok_and(|n| (1..=ROOM_TABLE_MAX).contains(&n))
}

/// Free tables in [`FREE_TABLE_RANGE`]
pub fn free_tables(tables: &TableMap) -> Vec<u32> {
    FREE_TABLE_RANGE
        .filter(|n| tables.get(&n.to_string()).is_none_or(TableOrder::is_free))
        .collect()
}

/// Outcome of a table-to-room transfer
#[derive(Debug, Clone, Serialize)]
pub struct RoomTransfer {
    pub room_number: String,
    pub charges: Vec<RoomCharge>,
    pub sales_record_id: String,
    pub stock_entries: Vec<String>,
    /// Room-mirrored table kept open with no items
    pub table_emptied: bool,
}

/// Outcome of a charge returned to the restaurant
#[derive(Debug, Clone, Serialize)]
pub struct ChargeReturn {
    pub charge: RoomCharge,
    pub table_id: String,
    pub table: TableOrder,
}

fn new_charge_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("CHG_{}_{}", util::compact_now(), &suffix[..8])
}

fn to_room_charge(
    planned: PlannedCharge,
    room: &str,
    table_id: Option<&str>,
    table_opened_at: Option<&str>,
    now: &str,
) -> RoomCharge {
    let mut extra = Map::new();
    if let Some(opened_at) = table_opened_at {
        extra.insert(TABLE_OPENED_AT.to_string(), Value::String(opened_at.to_string()));
    }
    RoomCharge {
        id: new_charge_id(),
        room_number: room.to_string(),
        table_id: table_id.map(str::to_string),
        charge_type: planned.charge_type,
        items: planned.items,
        subtotal: to_f64(planned.subtotal),
        service_fee: to_f64(planned.service_fee),
        discount: to_f64(planned.discount),
        flags: planned.flags,
        waiter: planned.waiter,
        waiter_breakdown: planned.waiter_breakdown,
        total: to_f64(planned.total),
        date: now.to_string(),
        status: ChargeStatus::Pending,
        audit_log: Vec::new(),
        paid_at: None,
        paid_by: None,
        extra,
    }
}

pub struct TransferCoordinator {
    cashier: Arc<CashierEngine>,
    stores: HotelStores,
    stock: Arc<dyn StockLedger>,
    audit: Arc<dyn AuditSink>,
    printer: Arc<dyn PrintDispatcher>,
    transfer_lock: PathBuf,
    lock_timeout: Duration,
}

impl TransferCoordinator {
    pub fn new(
        cashier: Arc<CashierEngine>,
        stores: HotelStores,
        stock: Arc<dyn StockLedger>,
        audit: Arc<dyn AuditSink>,
        printer: Arc<dyn PrintDispatcher>,
        transfer_lock: impl Into<PathBuf>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            cashier,
            stores,
            stock,
            audit,
            printer,
            transfer_lock: transfer_lock.into(),
            lock_timeout,
        }
    }

    pub fn stores(&self) -> &HotelStores {
        &self.stores
    }

    /// Both the restaurant and the guest-consumption cashier must be open
    fn require_cashiers(&self, user: &str) -> TransferResult<()> {
        self.cashier.validate_transfer_eligibility(
            &CashierType::Restaurant,
            &CashierType::GuestConsumption,
            user,
        )?;
        Ok(())
    }

    fn unwind_charges(&self, ids: &[String]) {
        let removed = self.stores.charges.update(|charges| {
            charges.retain(|c| !ids.contains(&c.id));
            Ok::<_, StorageError>(())
        });
        match removed {
            Ok(()) => tracing::warn!(charges = ?ids, "Room charges unwound"),
            Err(e) => tracing::error!(error = %e, charges = ?ids, "Failed to unwind room charges"),
        }
    }

    fn unwind_sale(&self, sale_id: &str) {
        let removed = self.stores.sales.update(|sales| {
            sales.retain(|s| s.id != sale_id);
            Ok::<_, StorageError>(())
        });
        if let Err(e) = removed {
            tracing::error!(error = %e, sale_id = %sale_id, "Failed to unwind sales record");
        }
    }

    fn unwind_stock(&self, ids: &[String]) {
        if let Err(e) = self.stock.remove_entries(ids) {
            tracing::error!(error = %e, entries = ?ids, "Failed to unwind stock entries");
        }
    }

    // ========================================================================
    // Table → room
    // ========================================================================

    /// Move every item of an open table onto pending charges of an occupied room
    ///
    /// All or nothing: any failure after the charges were written removes
    /// what was written before returning the error.
    pub fn transfer_table_to_room(
        &self,
        table_id: &str,
        room_input: &str,
        user: &str,
        mode: TransferMode,
    ) -> TransferResult<RoomTransfer> {
        self.require_cashiers(user)?;

        let _transfer = FileLock::acquire(&self.transfer_lock, self.lock_timeout)?;
        let _tables_guard = self.stores.tables.lock()?;
        let mut tables = self.stores.tables.load_or_default()?;

        let order = tables
            .get(table_id)
            .cloned()
            .ok_or_else(|| TransferError::TableNotFound(table_id.to_string()))?;
        if order.items.is_empty() {
            return Err(TransferError::EmptyTable(table_id.to_string()));
        }
        // money already taken at the restaurant would be billed to the room again
        if !order.partial_payments.is_empty() || order.total_paid > 0.0 {
            return Err(TransferError::PartialPaymentsTaken {
                table_id: table_id.to_string(),
                total_paid: order.total_paid,
            });
        }

        let occupancy = self.stores.occupancy.load_or_default()?;
        let room = normalize_room(room_input, &occupancy)?;

        let now = util::human_now();
        let charges: Vec<RoomCharge> = plan_charges(&order, mode)
            .into_iter()
            .map(|p| to_room_charge(p, &room, Some(table_id), order.opened_at.as_deref(), &now))
            .collect();
        let charge_ids: Vec<String> = charges.iter().map(|c| c.id.clone()).collect();
        let final_total = to_f64(money::sum(charges.iter().map(|c| c.total)));

        // 1. charges: failure leaves nothing behind
        self.stores.charges.update(|all| {
            all.extend(charges.iter().cloned());
            Ok::<_, StorageError>(())
        })?;

        // 2. sales history
        let sale = SalesRecord {
            id: format!("SALE_{}_{}", util::compact_now(), table_id),
            table_id: table_id.to_string(),
            order: order.clone(),
            payment_method: ROOM_CHARGE_METHOD.to_string(),
            final_total,
            closed_at: now.clone(),
            closed_by: user.to_string(),
            room_number: Some(room.clone()),
            details: json!({"charge_ids": charge_ids, "mode": mode})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        };
        let sale_id = sale.id.clone();
        if let Err(e) = self.stores.sales.update(|sales| {
            sales.push(sale);
            Ok::<_, StorageError>(())
        }) {
            self.unwind_charges(&charge_ids);
            return Err(e.into());
        }

        // 3. stock
        let reason = format!("Transferência Quarto {}", room);
        let stock_entries = match deduct_items(self.stock.as_ref(), &order.items, &reason, user) {
            Ok(ids) => ids,
            Err(e) => {
                self.unwind_sale(&sale_id);
                self.unwind_charges(&charge_ids);
                return Err(e.into());
            }
        };

        // 4. table: a mirrored table starts over as a fresh open order
        let table_emptied = is_room_table(table_id);
        if table_emptied {
            tables.insert(
                table_id.to_string(),
                TableOrder {
                    status: OrderStatus::Open,
                    ..TableOrder::default()
                },
            );
        } else {
            tables.remove(table_id);
        }
        if let Err(e) = self.stores.tables.save(&tables) {
            self.unwind_stock(&stock_entries);
            self.unwind_sale(&sale_id);
            self.unwind_charges(&charge_ids);
            return Err(e.into());
        }

        tracing::info!(
            table_id = %table_id,
            room = %room,
            charges = charges.len(),
            total = final_total,
            user = %user,
            "Table transferred to room"
        );
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::TableTransferredToRoom,
                "room_charge",
                json!({
                    "table_id": table_id,
                    "room_number": room,
                    "charge_ids": charge_ids,
                    "total": final_total,
                }),
            )
            .by(user),
        );
        for charge in &charges {
            dispatch_best_effort(self.printer.as_ref(), PrintJob::room_charge(charge, user));
        }

        Ok(RoomTransfer {
            room_number: room,
            charges,
            sales_record_id: sale_id,
            stock_entries,
            table_emptied,
        })
    }

    // ========================================================================
    // Room → table
    // ========================================================================

    /// Give a pending charge back to a restaurant table
    ///
    /// The default destination is the charge's source table; an alternate
    /// `target_table_id` must be free.
    pub fn return_charge_to_restaurant(
        &self,
        charge_id: &str,
        user: &str,
        target_table_id: Option<&str>,
    ) -> TransferResult<ChargeReturn> {
        self.require_cashiers(user)?;

        let _transfer = FileLock::acquire(&self.transfer_lock, self.lock_timeout)?;
        let _tables_guard = self.stores.tables.lock()?;
        let _charges_guard = self.stores.charges.lock()?;
        let mut tables = self.stores.tables.load_or_default()?;
        let mut charges = self.stores.charges.load_or_default()?;

        let charge = charges
            .iter()
            .find(|c| c.id == charge_id)
            .cloned()
            .ok_or_else(|| TransferError::ChargeNotFound(charge_id.to_string()))?;
        if !charge.is_pending() {
            return Err(TransferError::ChargeNotPending {
                charge_id: charge_id.to_string(),
                status: charge.status,
            });
        }

        let destination = target_table_id
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| charge.table_id.clone())
            .ok_or(TransferError::MissingDestination)?;

        let alternate =
            target_table_id.is_some() && charge.table_id.as_deref() != Some(destination.as_str());
        if alternate
            && let Some(existing) = tables.get(&destination)
            && !existing.is_free()
        {
            return Err(TransferError::TableOccupied {
                table_id: destination,
                free_tables: free_tables(&tables),
            });
        }

        let previous_tables = tables.clone();
        let now = util::human_now();
        let original_opened_at = charge
            .extra
            .get(TABLE_OPENED_AT)
            .and_then(Value::as_str)
            .map(str::to_string);

        match tables.get_mut(&destination) {
            Some(order) => {
                order.items.extend(charge.items.iter().cloned());
                order.total = to_f64(items_total(&order.items));
                order.status = OrderStatus::Open;
                if order.opened_at.is_none() {
                    order.opened_at = original_opened_at.or(Some(now));
                }
            }
            None => {
                let items = charge.items.clone();
                let total = to_f64(items_total(&items));
                tables.insert(
                    destination.clone(),
                    TableOrder {
                        status: OrderStatus::Open,
                        customer_type: CustomerType::Hospede,
                        items,
                        total,
                        waiter: charge.waiter.clone(),
                        opened_at: original_opened_at.or(Some(now)),
                        room_number: Some(charge.room_number.clone()),
                        ..TableOrder::default()
                    },
                );
            }
        }
        charges.retain(|c| c.id != charge_id);

        self.stores.tables.save(&tables)?;
        if let Err(e) = self.stores.charges.save(&charges) {
            if let Err(restore) = self.stores.tables.save(&previous_tables) {
                tracing::error!(error = %restore, "Failed to restore tables after charge write failure");
            }
            return Err(e.into());
        }

        let table = tables.get(&destination).cloned().unwrap_or_default();
        tracing::info!(
            charge_id = %charge_id,
            table_id = %destination,
            room = %charge.room_number,
            user = %user,
            "Room charge returned to restaurant"
        );
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::ChargeReturnedToRestaurant,
                "room_charge",
                json!({
                    "charge_id": charge_id,
                    "room_number": charge.room_number,
                    "table_id": destination,
                    "total": charge.total,
                }),
            )
            .by(user),
        );

        Ok(ChargeReturn {
            charge,
            table_id: destination,
            table,
        })
    }

    // ========================================================================
    // Charge edits
    // ========================================================================

    pub fn cancel_charge(&self, charge_id: &str, user: &str, justification: &str) -> TransferResult<RoomCharge> {
        if justification.trim().is_empty() {
            return Err(TransferError::Validation(
                "a justification is required to cancel a charge".to_string(),
            ));
        }

        let cancelled = self.stores.charges.update(|charges| {
            let charge = charges
                .iter_mut()
                .find(|c| c.id == charge_id)
                .ok_or_else(|| TransferError::ChargeNotFound(charge_id.to_string()))?;
            if !charge.is_pending() {
                return Err(TransferError::ChargeNotPending {
                    charge_id: charge_id.to_string(),
                    status: charge.status,
                });
            }
            charge.status = ChargeStatus::Cancelled;
            let mut changes = Map::new();
            changes.insert("status".to_string(), json!({"from": "pending", "to": "cancelled"}));
            charge.audit_log.push(ChargeAuditEntry {
                timestamp: util::human_now(),
                user: user.to_string(),
                action: "cancelled".to_string(),
                justification: justification.to_string(),
                changes,
            });
            Ok(charge.clone())
        })?;

        tracing::info!(charge_id = %charge_id, user = %user, "Room charge cancelled");
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::ChargeCancelled,
                "room_charge",
                json!({"charge_id": charge_id, "justification": justification, "total": cancelled.total}),
            )
            .by(user),
        );
        Ok(cancelled)
    }

    /// Launch minibar consumption straight onto a room
    pub fn launch_minibar(&self, room_input: &str, items: Vec<OrderItem>, user: &str) -> TransferResult<RoomCharge> {
        if items.is_empty() {
            return Err(TransferError::Validation("no minibar items".to_string()));
        }
        for item in &items {
            money::validate_item(item).map_err(TransferError::Validation)?;
        }

        let occupancy = self.stores.occupancy.load_or_default()?;
        let room = normalize_room(room_input, &occupancy)?;

        let now = util::human_now();
        let charge = to_room_charge(plan_minibar(items), &room, None, None, &now);
        self.stores.charges.update(|all| {
            all.push(charge.clone());
            Ok::<_, StorageError>(())
        })?;

        let reason = format!("Frigobar Quarto {}", room);
        if let Err(e) = deduct_items(self.stock.as_ref(), &charge.items, &reason, user) {
            self.unwind_charges(std::slice::from_ref(&charge.id));
            return Err(e.into());
        }

        tracing::info!(room = %room, charge_id = %charge.id, total = charge.total, "Minibar launched");
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::MinibarLaunched,
                "room_charge",
                json!({"room_number": room, "charge_id": charge.id, "total": charge.total}),
            )
            .by(user),
        );
        Ok(charge)
    }

    /// Pending charges of a room, oldest first
    pub fn pending_charges(&self, room_input: &str) -> TransferResult<Vec<RoomCharge>> {
        let occupancy = self.stores.occupancy.load_or_default()?;
        let room = normalize_room(room_input, &occupancy)?;
        let charges = self.stores.charges.load_or_default()?;
        Ok(charges
            .into_iter()
            .filter(|c| c.room_number == room && c.is_pending())
            .collect())
    }
}
