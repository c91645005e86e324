//! Table and room checkout
//!
//! Payment first, then the operational document (table / room charges), then
//! the archives. Archive failures are logged and left to the restitution pass;
//! a failure before that propagates, and replaying the same idempotency key
//! resumes the close without charging twice.
//!
//! Lock order: tables → charges → cashier sessions.

use super::batch::BatchGuard;
use super::error::{BillingError, BillingResult};
use crate::accounts::{AccountsError, ClosedAccountStore, FiscalPool};
use crate::audit::{AuditAction, AuditEntry, AuditSink, emit};
use crate::cashier::{CashierEngine, CashierError, PaymentGroupReceipt};
use crate::cashier::display::MULTIPLE_METHODS;
use crate::money::{self, MONEY_TOLERANCE, approx_eq, items_total, round2, to_decimal, to_f64};
use crate::printing::{PrintDispatcher, PrintJob, dispatch_best_effort};
use crate::storage::StorageError;
use crate::transfer::{HotelStores, TableMap, bill_totals, is_room_table, normalize_room};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use shared::models::{
    AccountDetails, AccountOrigin, AccountPayment, CashierType, ChargeAuditEntry, ChargeStatus,
    ClosedAccount, FiscalPayment, FiscalPoolEntry, NewClosedAccount, NewFiscalEntry, OrderItem,
    OrderStatus, PartialPayment, PaymentLeg, RoomCharge, SalesRecord, TableOrder, Transaction,
    TransactionInput, TransactionKind, detail_keys,
};
use shared::util;
use std::fmt::Display;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ItemsAdded {
    pub table_id: String,
    pub table: TableOrder,
    /// The batch id was seen within the TTL; nothing was added
    pub duplicate: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseTable {
    pub table_id: String,
    #[serde(default)]
    pub payments: Vec<PaymentLeg>,
    pub user: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableClosed {
    pub table_id: String,
    pub total: f64,
    /// None when partial payments already covered the bill
    pub receipt: Option<PaymentGroupReceipt>,
    pub closed_account: Option<ClosedAccount>,
    pub fiscal_entry: Option<FiscalPoolEntry>,
    pub table_emptied: bool,
    /// Already closed under the same idempotency key
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSettled {
    pub room_number: String,
    pub charges: Vec<RoomCharge>,
    pub total: f64,
    pub receipt: PaymentGroupReceipt,
    pub closed_account: Option<ClosedAccount>,
    pub fiscal_entry: Option<FiscalPoolEntry>,
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReopenedAccount {
    pub account: ClosedAccount,
    /// Recreated order for restaurant tables
    pub table: Option<TableOrder>,
}

fn table_sale_description(table_id: &str) -> String {
    format!("Venda Mesa {}", table_id)
}

fn room_sale_description(room: &str) -> String {
    format!("Venda Quarto {}", room)
}

fn group_details(key: &str, value: &str, idempotency_key: Option<&str>) -> Map<String, Value> {
    let mut details = Map::new();
    details.insert(key.to_string(), Value::String(value.to_string()));
    if let Some(k) = idempotency_key {
        details.insert(detail_keys::IDEMPOTENCY_KEY.to_string(), Value::String(k.to_string()));
    }
    details
}

/// Single tender label, or "Múltiplo"
fn payment_label(payments: &[AccountPayment]) -> String {
    match payments {
        [single] => single.method.clone(),
        [] => String::new(),
        _ => MULTIPLE_METHODS.to_string(),
    }
}

fn fiscal_payments(payments: &[AccountPayment]) -> Vec<FiscalPayment> {
    payments
        .iter()
        .map(|p| FiscalPayment::from_method(&p.method, p.amount))
        .collect()
}

fn leg_payments(legs: &[PaymentLeg]) -> Vec<AccountPayment> {
    legs.iter()
        .map(|l| AccountPayment {
            method: l.method.clone(),
            amount: round2(l.amount),
        })
        .collect()
}

fn check_legs(legs: &[PaymentLeg]) -> BillingResult<()> {
    for leg in legs {
        money::require_finite(leg.amount, "payment amount").map_err(BillingError::Validation)?;
    }
    Ok(())
}

/// Archive step: log and carry on
fn archived<T, E: Display>(what: &str, reference: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, reference = %reference, "Failed to archive {}", what);
            None
        }
    }
}

fn clean_key(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

fn recompute_paid(order: &mut TableOrder) {
    order.total_paid = to_f64(money::sum(order.partial_payments.iter().map(|p| p.amount)));
}

pub struct BillingService {
    cashier: Arc<CashierEngine>,
    stores: HotelStores,
    accounts: ClosedAccountStore,
    fiscal: FiscalPool,
    audit: Arc<dyn AuditSink>,
    printer: Arc<dyn PrintDispatcher>,
    batches: BatchGuard,
}

impl BillingService {
    pub fn new(
        cashier: Arc<CashierEngine>,
        stores: HotelStores,
        accounts: ClosedAccountStore,
        fiscal: FiscalPool,
        audit: Arc<dyn AuditSink>,
        printer: Arc<dyn PrintDispatcher>,
    ) -> Self {
        Self {
            cashier,
            stores,
            accounts,
            fiscal,
            audit,
            printer,
            batches: BatchGuard::default(),
        }
    }

    pub fn table(&self, table_id: &str) -> BillingResult<Option<TableOrder>> {
        Ok(self.stores.tables.load_or_default()?.remove(table_id))
    }

    pub fn purge_expired_batches(&self) -> usize {
        self.batches.purge_expired()
    }

    /// Whether `key` is already recorded on the open session of `cashier_type`
    fn already_recorded(&self, cashier_type: &CashierType, key: Option<&str>) -> BillingResult<bool> {
        let Some(key) = key else {
            return Ok(false);
        };
        Ok(self
            .cashier
            .get_active_session(cashier_type)?
            .is_some_and(|s| s.find_by_idempotency_key(key).is_some()))
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Append items to a table, opening it when absent
    pub fn add_items(
        &self,
        table_id: &str,
        items: Vec<OrderItem>,
        user: &str,
        batch_id: Option<&str>,
    ) -> BillingResult<ItemsAdded> {
        if items.is_empty() {
            return Err(BillingError::Validation("no items to add".to_string()));
        }
        for item in &items {
            money::validate_item(item).map_err(BillingError::Validation)?;
        }

        let batch_id = clean_key(batch_id);
        if let Some(batch) = batch_id
            && !self.batches.check_and_mark(batch)
        {
            tracing::info!(table_id = %table_id, batch_id = %batch, "Duplicate item batch dropped");
            return Ok(ItemsAdded {
                table_id: table_id.to_string(),
                table: self.table(table_id)?.unwrap_or_default(),
                duplicate: true,
            });
        }

        let count = items.len();
        let updated = self.stores.tables.update(|tables| {
            let order = tables.entry(table_id.to_string()).or_default();
            if order.opened_at.is_none() || order.items.is_empty() {
                order.opened_at = Some(util::human_now());
            }
            order.status = OrderStatus::Open;
            order.items.extend(items);
            order.total = to_f64(items_total(&order.items));
            Ok::<_, StorageError>(order.clone())
        });
        let table = match updated {
            Ok(table) => table,
            Err(e) => {
                if let Some(batch) = batch_id {
                    self.batches.forget(batch);
                }
                return Err(e.into());
            }
        };

        tracing::info!(table_id = %table_id, items = count, total = table.total, user = %user, "Items added");
        Ok(ItemsAdded {
            table_id: table_id.to_string(),
            table,
            duplicate: false,
        })
    }

    // ========================================================================
    // Partial payments
    // ========================================================================

    /// Take part of the bill before the table closes
    pub fn add_partial_payment(
        &self,
        table_id: &str,
        method: &str,
        amount: f64,
        user: &str,
    ) -> BillingResult<PartialPayment> {
        money::require_finite(amount, "amount").map_err(BillingError::Validation)?;
        if amount <= 0.0 {
            return Err(BillingError::Validation(format!("amount must be positive, got {amount}")));
        }

        let _tables_guard = self.stores.tables.lock()?;
        let mut tables = self.stores.tables.load_or_default()?;
        let order = tables
            .get_mut(table_id)
            .ok_or_else(|| BillingError::TableNotFound(table_id.to_string()))?;
        if order.items.is_empty() {
            return Err(BillingError::EmptyTable(table_id.to_string()));
        }
        let due = bill_totals(order).total - to_decimal(order.total_paid);
        if to_decimal(amount) > due + MONEY_TOLERANCE {
            return Err(BillingError::PaymentMismatch {
                expected: to_f64(due),
                paid: amount,
            });
        }

        let partial_id = uuid::Uuid::new_v4().simple().to_string();
        let tx = self.cashier.add_transaction(
            TransactionInput::new(
                CashierType::Restaurant,
                amount,
                format!("Pagamento Parcial Mesa {}", table_id),
                method,
                user,
            )
            .with_kind(TransactionKind::Sale)
            .with_detail(detail_keys::TABLE_ID, table_id)
            .with_detail(detail_keys::PARTIAL_PAYMENT_ID, partial_id.as_str()),
        )?;

        let partial = PartialPayment {
            id: partial_id,
            method: method.to_string(),
            amount: tx.amount,
            timestamp: tx.timestamp.clone(),
            user: user.to_string(),
            transaction_id: Some(tx.id.clone()),
        };
        order.partial_payments.push(partial.clone());
        recompute_paid(order);

        if let Err(e) = self.stores.tables.save(&tables) {
            if let Err(undo) = self.cashier.void_transaction(
                &CashierType::Restaurant,
                &tx.id,
                user,
                "partial payment not saved",
            ) {
                tracing::error!(error = %undo, transaction_id = %tx.id, "Failed to void unsaved partial payment");
            }
            return Err(e.into());
        }

        tracing::info!(table_id = %table_id, partial_id = %partial.id, amount = partial.amount, "Partial payment taken");
        Ok(partial)
    }

    /// Refund a partial payment and drop it from the order
    ///
    /// Returns the compensating cashier transaction, if a new one was written.
    pub fn void_partial_payment(
        &self,
        table_id: &str,
        payment_id: &str,
        user: &str,
        reason: &str,
    ) -> BillingResult<Option<Transaction>> {
        let _tables_guard = self.stores.tables.lock()?;
        let mut tables = self.stores.tables.load_or_default()?;
        let order = tables
            .get_mut(table_id)
            .ok_or_else(|| BillingError::TableNotFound(table_id.to_string()))?;
        let idx = order
            .partial_payments
            .iter()
            .position(|p| p.id == payment_id)
            .ok_or_else(|| BillingError::PartialPaymentNotFound(payment_id.to_string()))?;

        let reversal = match order.partial_payments[idx].transaction_id.as_deref() {
            Some(tx_id) => {
                match self
                    .cashier
                    .void_transaction(&CashierType::Restaurant, tx_id, user, reason)
                {
                    Ok(tx) => Some(tx),
                    // voided by an earlier attempt whose table write failed
                    Err(CashierError::AlreadyReversed(_)) => None,
                    Err(e) => return Err(e.into()),
                }
            }
            None => None,
        };

        let removed = order.partial_payments.remove(idx);
        recompute_paid(order);
        self.stores.tables.save(&tables)?;

        tracing::info!(
            table_id = %table_id,
            partial_id = %removed.id,
            amount = removed.amount,
            user = %user,
            "Partial payment voided"
        );
        Ok(reversal)
    }

    // ========================================================================
    // Table close
    // ========================================================================

    pub fn close_table(&self, req: CloseTable) -> BillingResult<TableClosed> {
        let CloseTable {
            table_id,
            payments,
            user,
            idempotency_key,
        } = req;
        let key = clean_key(idempotency_key.as_deref());
        check_legs(&payments)?;

        let _tables_guard = self.stores.tables.lock()?;
        let mut tables = self.stores.tables.load_or_default()?;
        let replayed = self.already_recorded(&CashierType::Restaurant, key)?;
        let details = || group_details(detail_keys::TABLE_ID, &table_id, key);

        let order = match tables.get(&table_id) {
            Some(order) if !order.items.is_empty() => order.clone(),
            _ if replayed => {
                let receipt = self.cashier.record_payment_group(
                    &CashierType::Restaurant,
                    &payments,
                    &table_sale_description(&table_id),
                    &user,
                    details(),
                )?;
                return Ok(TableClosed {
                    table_id,
                    total: receipt.total,
                    receipt: Some(receipt),
                    closed_account: None,
                    fiscal_entry: None,
                    table_emptied: false,
                    replayed: true,
                });
            }
            Some(_) => return Err(BillingError::EmptyTable(table_id)),
            None => return Err(BillingError::TableNotFound(table_id)),
        };

        let totals = bill_totals(&order);
        if !replayed {
            let due = totals.total - to_decimal(order.total_paid);
            let paid = money::sum(payments.iter().map(|l| l.amount));
            if !approx_eq(due, paid) {
                return Err(BillingError::PaymentMismatch {
                    expected: to_f64(due),
                    paid: to_f64(paid),
                });
            }
        }

        let receipt = if payments.is_empty() {
            None
        } else {
            let mut group = details();
            group.insert(
                detail_keys::SERVICE_FEE_REMOVED.to_string(),
                Value::Bool(order.service_fee_removed),
            );
            Some(self.cashier.record_payment_group(
                &CashierType::Restaurant,
                &payments,
                &table_sale_description(&table_id),
                &user,
                group,
            )?)
        };

        let table_emptied = is_room_table(&table_id);
        if table_emptied {
            tables.insert(table_id.clone(), TableOrder::default());
        } else {
            tables.remove(&table_id);
        }
        self.stores.tables.save(&tables)?;

        let total = to_f64(totals.total);
        let all_payments: Vec<AccountPayment> = order
            .partial_payments
            .iter()
            .map(|p| AccountPayment {
                method: p.method.clone(),
                amount: p.amount,
            })
            .chain(leg_payments(&payments))
            .collect();
        let (closed_account, fiscal_entry) =
            self.archive_table(&table_id, &order, &all_payments, total, &user, totals);

        tracing::info!(table_id = %table_id, total, user = %user, replayed, "Table closed");
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::TableClosed,
                "table",
                json!({
                    "table_id": table_id,
                    "total": total,
                    "payments": all_payments,
                    "closed_account_id": closed_account.as_ref().map(|a| a.id.clone()),
                }),
            )
            .by(user.as_str()),
        );
        dispatch_best_effort(
            self.printer.as_ref(),
            PrintJob::table_receipt(&table_id, &order.items, &all_payments, total, &user),
        );

        Ok(TableClosed {
            table_id,
            total,
            receipt,
            closed_account,
            fiscal_entry,
            table_emptied,
            replayed,
        })
    }

    fn archive_table(
        &self,
        table_id: &str,
        order: &TableOrder,
        payments: &[AccountPayment],
        total: f64,
        user: &str,
        totals: crate::transfer::BillTotals,
    ) -> (Option<ClosedAccount>, Option<FiscalPoolEntry>) {
        let now = util::human_now();
        let sale = SalesRecord {
            id: format!("SALE_{}_{}", util::compact_now(), table_id),
            table_id: table_id.to_string(),
            order: order.clone(),
            payment_method: payment_label(payments),
            final_total: total,
            closed_at: now,
            closed_by: user.to_string(),
            room_number: order.room_number.clone(),
            details: Map::new(),
        };
        archived(
            "sales record",
            table_id,
            self.stores.sales.update(|sales| {
                sales.push(sale);
                Ok::<_, StorageError>(())
            }),
        );

        let mut extra = Map::new();
        extra.insert("subtotal".to_string(), json!(to_f64(totals.subtotal)));
        extra.insert("service_fee".to_string(), json!(to_f64(totals.service_fee)));
        extra.insert("discount".to_string(), json!(to_f64(totals.discount)));
        if let Some(opened_at) = &order.opened_at {
            extra.insert("opened_at".to_string(), Value::String(opened_at.clone()));
        }
        let closed_account = archived(
            "closed account",
            table_id,
            self.accounts.save(NewClosedAccount {
                origin: AccountOrigin::RestaurantTable,
                original_id: table_id.to_string(),
                items: order.items.clone(),
                total,
                payments: payments.to_vec(),
                closed_by: user.to_string(),
                details: AccountDetails {
                    customer: order.customer_name.clone(),
                    waiter: order.waiter.clone(),
                    room: order.room_number.clone(),
                    extra,
                },
            }),
        );

        let mut customer_info = Map::new();
        if let Some(name) = &order.customer_name {
            customer_info.insert("name".to_string(), Value::String(name.clone()));
        }
        let fiscal_entry = archived(
            "fiscal pool entry",
            table_id,
            self.fiscal.add_to_pool(NewFiscalEntry {
                origin: AccountOrigin::RestaurantTable,
                original_id: table_id.to_string(),
                total_amount: total,
                items: order.items.clone(),
                payment_methods: fiscal_payments(payments),
                user: user.to_string(),
                customer_info,
                notes: None,
            }),
        );
        (closed_account, fiscal_entry)
    }

    // ========================================================================
    // Room settlement
    // ========================================================================

    /// Pay every pending charge of a room in one payment group
    pub fn settle_room(
        &self,
        room_input: &str,
        payments: Vec<PaymentLeg>,
        user: &str,
        idempotency_key: Option<&str>,
    ) -> BillingResult<RoomSettled> {
        check_legs(&payments)?;
        let key = clean_key(idempotency_key);
        let occupancy = self.stores.occupancy.load_or_default()?;
        let room = normalize_room(room_input, &occupancy)?;
        let details = || group_details(detail_keys::ROOM_NUMBER, &room, key);

        let _charges_guard = self.stores.charges.lock()?;
        let mut charges = self.stores.charges.load_or_default()?;
        let replayed = self.already_recorded(&CashierType::GuestConsumption, key)?;

        let pending: Vec<usize> = charges
            .iter()
            .enumerate()
            .filter(|(_, c)| c.room_number == room && c.is_pending())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            if !replayed {
                return Err(BillingError::NothingToSettle(room));
            }
            let receipt = self.cashier.record_payment_group(
                &CashierType::GuestConsumption,
                &payments,
                &room_sale_description(&room),
                user,
                details(),
            )?;
            return Ok(RoomSettled {
                room_number: room,
                charges: Vec::new(),
                total: receipt.total,
                receipt,
                closed_account: None,
                fiscal_entry: None,
                replayed: true,
            });
        }

        let due = money::sum(pending.iter().map(|&i| charges[i].total));
        let paid = money::sum(payments.iter().map(|l| l.amount));
        if !replayed && !approx_eq(due, paid) {
            return Err(BillingError::PaymentMismatch {
                expected: to_f64(due),
                paid: to_f64(paid),
            });
        }

        let receipt = self.cashier.record_payment_group(
            &CashierType::GuestConsumption,
            &payments,
            &room_sale_description(&room),
            user,
            details(),
        )?;

        let now = util::human_now();
        for &i in &pending {
            let charge = &mut charges[i];
            charge.status = ChargeStatus::Paid;
            charge.paid_at = Some(now.clone());
            charge.paid_by = Some(user.to_string());
            let mut changes = Map::new();
            changes.insert("status".to_string(), json!({"from": "pending", "to": "paid"}));
            changes.insert("payment_group_id".to_string(), Value::String(receipt.group_id.clone()));
            charge.audit_log.push(ChargeAuditEntry {
                timestamp: now.clone(),
                user: user.to_string(),
                action: "paid".to_string(),
                justification: String::new(),
                changes,
            });
        }
        self.stores.charges.save(&charges)?;

        let settled: Vec<RoomCharge> = pending.iter().map(|&i| charges[i].clone()).collect();
        let total = to_f64(due);
        let payments = leg_payments(&payments);
        let items: Vec<OrderItem> = settled.iter().flat_map(|c| c.items.iter().cloned()).collect();
        let guest = occupancy.get(&room).and_then(|o| o.guest_name.clone());

        let mut extra = Map::new();
        extra.insert(
            "charge_ids".to_string(),
            json!(settled.iter().map(|c| c.id.as_str()).collect::<Vec<_>>()),
        );
        let closed_account = archived(
            "closed account",
            &room,
            self.accounts.save(NewClosedAccount {
                origin: AccountOrigin::ReceptionRoom,
                original_id: room.clone(),
                items: items.clone(),
                total,
                payments: payments.clone(),
                closed_by: user.to_string(),
                details: AccountDetails {
                    customer: guest.clone(),
                    waiter: None,
                    room: Some(room.clone()),
                    extra,
                },
            }),
        );
        let mut customer_info = Map::new();
        if let Some(name) = guest {
            customer_info.insert("name".to_string(), Value::String(name));
        }
        customer_info.insert("room".to_string(), Value::String(room.clone()));
        let fiscal_entry = archived(
            "fiscal pool entry",
            &room,
            self.fiscal.add_to_pool(NewFiscalEntry {
                origin: AccountOrigin::ReceptionRoom,
                original_id: room.clone(),
                total_amount: total,
                items,
                payment_methods: fiscal_payments(&payments),
                user: user.to_string(),
                customer_info,
                notes: None,
            }),
        );

        tracing::info!(room = %room, charges = settled.len(), total, user = %user, "Room settled");
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::RoomSettled,
                "room_charge",
                json!({
                    "room_number": room,
                    "charge_ids": settled.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
                    "total": total,
                }),
            )
            .by(user),
        );

        Ok(RoomSettled {
            room_number: room,
            charges: settled,
            total,
            receipt,
            closed_account,
            fiscal_entry,
            replayed,
        })
    }

    // ========================================================================
    // Reopen
    // ========================================================================

    /// Mark a closed account reopened; restaurant tables get their order back
    ///
    /// The original payments come back as already-paid partials, so no cash
    /// moves.
    pub fn reopen_account(&self, closed_id: &str, user: &str, reason: &str) -> BillingResult<ReopenedAccount> {
        if reason.trim().is_empty() {
            return Err(BillingError::Validation("a reason is required to reopen an account".to_string()));
        }
        let account = self
            .accounts
            .get(closed_id)?
            .ok_or_else(|| AccountsError::NotFound(closed_id.to_string()))?;

        if account.origin != AccountOrigin::RestaurantTable {
            let account = self.accounts.mark_reopened(closed_id, user, reason)?;
            self.record_reopen(&account, user, reason);
            return Ok(ReopenedAccount { account, table: None });
        }

        let _tables_guard = self.stores.tables.lock()?;
        let mut tables: TableMap = self.stores.tables.load_or_default()?;
        let table_id = account.original_id.clone();
        if tables.get(&table_id).is_some_and(|t| !t.is_free()) {
            return Err(BillingError::TableOccupied(table_id));
        }

        let partials: Vec<PartialPayment> = account
            .payments
            .iter()
            .map(|p| PartialPayment {
                id: uuid::Uuid::new_v4().simple().to_string(),
                method: p.method.clone(),
                amount: p.amount,
                timestamp: account.closed_at.clone(),
                user: account.closed_by.clone(),
                transaction_id: None,
            })
            .collect();
        let mut order = TableOrder {
            status: OrderStatus::Open,
            items: account.items.clone(),
            total: to_f64(items_total(&account.items)),
            waiter: account.details.waiter.clone(),
            opened_at: Some(util::human_now()),
            partial_payments: partials,
            room_number: account.details.room.clone(),
            customer_name: account.details.customer.clone(),
            ..TableOrder::default()
        };
        recompute_paid(&mut order);

        let previous = tables.clone();
        tables.insert(table_id.clone(), order.clone());
        self.stores.tables.save(&tables)?;
        let account = match self.accounts.mark_reopened(closed_id, user, reason) {
            Ok(account) => account,
            Err(e) => {
                if let Err(restore) = self.stores.tables.save(&previous) {
                    tracing::error!(error = %restore, table_id = %table_id, "Failed to restore tables after reopen failure");
                }
                return Err(e.into());
            }
        };

        self.record_reopen(&account, user, reason);
        Ok(ReopenedAccount {
            account,
            table: Some(order),
        })
    }

    fn record_reopen(&self, account: &ClosedAccount, user: &str, reason: &str) {
        tracing::info!(closed_id = %account.id, origin = %account.origin, user = %user, "Account reopened");
        emit(
            self.audit.as_ref(),
            AuditEntry::warning(
                AuditAction::AccountReopened,
                "closed_account",
                json!({
                    "closed_id": account.id,
                    "origin": account.origin,
                    "original_id": account.original_id,
                    "total": account.total,
                    "reason": reason,
                }),
            )
            .by(user),
        );
    }
}
