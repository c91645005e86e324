//! 税票补录
//!
//! 两个来源：
//!
//! ```text
//! closed_accounts.json ──(签名计数 N − M)──▶ fiscal_pool.json
//! cashier sessions     ──(孤儿销售)────────▶ fiscal_pool.json (origin = cashier_orphan)
//! ```
//!
//! 按签名 `(origin, original_id, 金额)` 计数而不是布尔匹配，重复执行结果不变。

use super::closed_accounts::ClosedAccountStore;
use super::error::AccountsResult;
use super::fiscal_pool::FiscalPool;
use crate::audit::{AuditAction, AuditEntry, AuditSink, emit};
use crate::cashier::{CashierEngine, SessionFilter};
use crate::money::{approx_eq, to_decimal, to_f64};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde_json::{Map, Value, json};
use shared::models::{
    AccountOrigin, ClosedAccount, FiscalPayment, FiscalPoolEntry, NewFiscalEntry, Session,
    TransactionKind, detail_keys,
};
use shared::util;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

/// Correlation window between a cashier sale and a closed account
pub const ORPHAN_WINDOW_SECS: i64 = 180;

pub const ORPHAN_NOTE: &str = "Recovered from Cashier Session (Missing in Closed Accounts)";
pub const BACKFILL_NOTE: &str = "Restituted from Closed Accounts";

static TABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mesa (\d+)").expect("table pattern is valid"));
static ROOM_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Quarto (\d+)").expect("room pattern is valid"));

/// Receipt identity used for counting
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub origin: AccountOrigin,
    pub original_id: String,
    pub amount_cents: i64,
}

fn cents(amount: f64) -> i64 {
    (to_decimal(amount) * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .unwrap_or_default()
}

impl Signature {
    pub fn new(origin: AccountOrigin, original_id: &str, amount: f64) -> Self {
        Self {
            origin,
            // ids compare as stored: "012" and "12" are different tables
            original_id: original_id.trim().to_string(),
            amount_cents: cents(amount),
        }
    }

    pub fn of_account(account: &ClosedAccount) -> Self {
        Self::new(account.origin, &account.original_id, account.total)
    }

    pub fn of_entry(entry: &FiscalPoolEntry) -> Self {
        Self::new(entry.origin, &entry.original_id, entry.total_amount)
    }
}

fn count<I: IntoIterator<Item = Signature>>(signatures: I) -> HashMap<Signature, usize> {
    let mut counts = HashMap::new();
    for sig in signatures {
        *counts.entry(sig).or_insert(0) += 1;
    }
    counts
}

/// Closed accounts still owed a pool entry: `max(N(sig) − M(sig), 0)` per signature
pub fn plan_backfill<'a>(accounts: &'a [ClosedAccount], pool: &[FiscalPoolEntry]) -> Vec<&'a ClosedAccount> {
    let mut covered = count(pool.iter().map(Signature::of_entry));
    accounts
        .iter()
        .filter(|account| match covered.get_mut(&Signature::of_account(account)) {
            Some(left) if *left > 0 => {
                *left -= 1;
                false
            }
            _ => true,
        })
        .collect()
}

fn backfill_entry(account: &ClosedAccount) -> NewFiscalEntry {
    let mut customer_info = Map::new();
    customer_info.insert("closed_account_id".to_string(), Value::String(account.id.clone()));
    if let Some(customer) = &account.details.customer {
        customer_info.insert("name".to_string(), Value::String(customer.clone()));
    }
    NewFiscalEntry {
        origin: account.origin,
        original_id: account.original_id.clone(),
        total_amount: account.total,
        items: account.items.clone(),
        payment_methods: account
            .payments
            .iter()
            .map(|p| FiscalPayment::from_method(&p.method, p.amount))
            .collect(),
        user: account.closed_by.clone(),
        customer_info,
        notes: Some(BACKFILL_NOTE.to_string()),
    }
}

/// A sale (or payment group) found in a cashier session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashierSale {
    /// Payment group id, or the transaction id of a single tender
    pub key: String,
    pub session_id: String,
    pub origin: AccountOrigin,
    pub original_id: String,
    pub amount: f64,
    pub timestamp: String,
    pub description: String,
    pub methods: Vec<FiscalPayment>,
}

fn infer_reference(description: &str) -> Option<(AccountOrigin, String)> {
    if let Some(caps) = TABLE_REF.captures(description) {
        return Some((AccountOrigin::RestaurantTable, caps[1].to_string()));
    }
    ROOM_REF
        .captures(description)
        .map(|caps| (AccountOrigin::ReceptionRoom, caps[1].to_string()))
}

/// Table and room sales of every session, one per payment group
///
/// Voided sales, reversals and partial payments are skipped.
pub fn cashier_sales(sessions: &[Session]) -> Vec<CashierSale> {
    let reversed: HashSet<&str> = sessions
        .iter()
        .flat_map(|s| &s.transactions)
        .filter_map(|t| t.detail_str(detail_keys::REVERSES))
        .collect();

    let mut sales: Vec<CashierSale> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for session in sessions {
        for tx in &session.transactions {
            if tx.kind != TransactionKind::Sale
                || reversed.contains(tx.id.as_str())
                || tx.details.contains_key(detail_keys::REVERSES)
                || tx.details.contains_key(detail_keys::PARTIAL_PAYMENT_ID)
            {
                continue;
            }
            let Some((origin, original_id)) = infer_reference(&tx.description) else {
                continue;
            };
            let key = tx.payment_group_id().unwrap_or(tx.id.as_str()).to_string();
            let method = FiscalPayment::from_method(&tx.payment_method, tx.amount);
            match index.get(&key) {
                Some(&i) => {
                    let sale = &mut sales[i];
                    sale.amount = to_f64(to_decimal(sale.amount) + to_decimal(tx.amount));
                    sale.methods.push(method);
                }
                None => {
                    index.insert(key.clone(), sales.len());
                    sales.push(CashierSale {
                        key,
                        session_id: session.id.clone(),
                        origin,
                        original_id,
                        amount: tx.amount,
                        timestamp: tx.timestamp.clone(),
                        description: tx.description.clone(),
                        methods: vec![method],
                    });
                }
            }
        }
    }
    sales
}

fn within_window(a: &str, b: &str) -> bool {
    match (util::parse_human(a), util::parse_human(b)) {
        (Some(a), Some(b)) => (a - b).num_seconds().abs() <= ORPHAN_WINDOW_SECS,
        _ => false,
    }
}

/// Sales with no archival counterpart
///
/// A sale is matched by signature first, then by amount within
/// [`ORPHAN_WINDOW_SECS`] of any still-unmatched closed account. Each closed
/// account absorbs at most one sale.
pub fn find_orphans(sales: Vec<CashierSale>, accounts: &[ClosedAccount]) -> Vec<CashierSale> {
    let mut used = vec![false; accounts.len()];
    let mut orphans = Vec::new();
    for sale in sales {
        let sig = Signature::new(sale.origin, &sale.original_id, sale.amount);
        let by_signature = accounts
            .iter()
            .enumerate()
            .position(|(i, a)| !used[i] && Signature::of_account(a) == sig);
        let matched = by_signature.or_else(|| {
            accounts.iter().enumerate().position(|(i, a)| {
                !used[i]
                    && approx_eq(to_decimal(a.total), to_decimal(sale.amount))
                    && within_window(&a.closed_at, &sale.timestamp)
            })
        });
        match matched {
            Some(i) => used[i] = true,
            None => orphans.push(sale),
        }
    }
    orphans
}

fn orphan_entry(sale: &CashierSale, user: &str) -> NewFiscalEntry {
    let info = json!({
        "session_id": sale.session_id,
        "description": sale.description,
        "sold_at": sale.timestamp,
        "inferred_origin": sale.origin,
        "inferred_id": sale.original_id,
    });
    NewFiscalEntry {
        origin: AccountOrigin::CashierOrphan,
        original_id: sale.key.clone(),
        total_amount: sale.amount,
        items: Vec::new(),
        payment_methods: sale.methods.clone(),
        user: user.to_string(),
        customer_info: info.as_object().cloned().unwrap_or_default(),
        notes: Some(ORPHAN_NOTE.to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestitutionReport {
    pub backfilled: usize,
    pub orphans_recovered: usize,
}

pub struct RestitutionService {
    accounts: ClosedAccountStore,
    pool: FiscalPool,
    cashier: Arc<CashierEngine>,
    audit: Arc<dyn AuditSink>,
}

impl RestitutionService {
    pub fn new(
        accounts: ClosedAccountStore,
        pool: FiscalPool,
        cashier: Arc<CashierEngine>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            accounts,
            pool,
            cashier,
            audit,
        }
    }

    /// Queue the receipts closed accounts are still owed
    pub fn backfill_from_closed_accounts(&self, user: &str) -> AccountsResult<usize> {
        let accounts = self.accounts.all()?;
        let added = self
            .pool
            .add_missing(|pool| {
                plan_backfill(&accounts, pool)
                    .into_iter()
                    .map(backfill_entry)
                    .collect()
            })?
            .len();
        if added > 0 {
            tracing::warn!(added, "Fiscal pool backfilled from closed accounts");
            self.record(user, "closed_accounts", added);
        }
        Ok(added)
    }

    /// Queue cashier sales that never reached the closed accounts
    pub fn recover_orphans(&self, user: &str) -> AccountsResult<usize> {
        let sessions = self.cashier.list_sessions(&SessionFilter::default())?;
        let accounts = self.accounts.all()?;
        let orphans = find_orphans(cashier_sales(&sessions), &accounts);

        let added = self
            .pool
            .add_missing(|pool| {
                let already: HashSet<&str> = pool
                    .iter()
                    .filter(|e| e.origin == AccountOrigin::CashierOrphan)
                    .map(|e| e.original_id.as_str())
                    .collect();
                orphans
                    .iter()
                    .filter(|sale| !already.contains(sale.key.as_str()))
                    .map(|sale| orphan_entry(sale, user))
                    .collect()
            })?
            .len();
        if added > 0 {
            tracing::warn!(added, "Orphan cashier sales recovered into fiscal pool");
            self.record(user, "cashier_sessions", added);
        }
        Ok(added)
    }

    pub fn run(&self, user: &str) -> AccountsResult<RestitutionReport> {
        Ok(RestitutionReport {
            backfilled: self.backfill_from_closed_accounts(user)?,
            orphans_recovered: self.recover_orphans(user)?,
        })
    }

    fn record(&self, user: &str, source: &str, added: usize) {
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::FiscalRestitution,
                "fiscal_pool",
                json!({"source": source, "added": added}),
            )
            .by(user),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{AccountDetails, AccountPayment, AccountStatus, Transaction};

    fn create_test_account(origin: AccountOrigin, original_id: &str, total: f64, closed_at: &str) -> ClosedAccount {
        ClosedAccount {
            id: format!("CLOSED_20261019120000_{original_id}"),
            origin,
            original_id: original_id.to_string(),
            items: Vec::new(),
            total,
            payments: vec![AccountPayment {
                method: "Cartão".to_string(),
                amount: total,
            }],
            closed_at: closed_at.to_string(),
            closed_by: "ana".to_string(),
            details: AccountDetails::default(),
            status: AccountStatus::Closed,
            reopened_by: None,
            reopened_at: None,
            reopen_reason: None,
        }
    }

    fn create_test_entry(origin: AccountOrigin, original_id: &str, total: f64) -> FiscalPoolEntry {
        FiscalPoolEntry {
            id: format!("FP_{original_id}"),
            origin,
            original_id: original_id.to_string(),
            total_amount: total,
            items: Vec::new(),
            payment_methods: Vec::new(),
            customer_info: Map::new(),
            notes: None,
            user: "ana".to_string(),
            created_at: "19/10/2026 12:00:00".to_string(),
            status: Default::default(),
        }
    }

    fn create_test_sale(id: &str, description: &str, amount: f64, timestamp: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            kind: TransactionKind::Sale,
            category: None,
            amount,
            payment_method: "Dinheiro".to_string(),
            description: description.to_string(),
            timestamp: timestamp.to_string(),
            user: "ana".to_string(),
            details: Map::new(),
            document_id: None,
        }
    }

    fn create_test_session(transactions: Vec<Transaction>) -> Session {
        let json = json!({
            "id": "S1",
            "type": "restaurant",
            "user": "ana",
            "opened_at": "19/10/2026 08:00:00",
            "opening_balance": 0.0,
            "status": "open",
            "transactions": transactions,
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_backfill_counts_multiplicity() {
        let accounts = vec![
            create_test_account(AccountOrigin::RestaurantTable, "12", 50.0, "19/10/2026 12:00:00"),
            create_test_account(AccountOrigin::RestaurantTable, "12", 50.0, "19/10/2026 13:00:00"),
            create_test_account(AccountOrigin::RestaurantTable, "12", 50.0, "19/10/2026 14:00:00"),
            create_test_account(AccountOrigin::ReceptionRoom, "101", 80.0, "19/10/2026 14:00:00"),
        ];
        // N(12, 50) = 3, M = 1 → 2 more; room 101 is fully missing
        let pool = vec![create_test_entry(AccountOrigin::RestaurantTable, "12", 50.0)];

        let missing = plan_backfill(&accounts, &pool);
        assert_eq!(missing.len(), 3);
        assert_eq!(
            missing
                .iter()
                .filter(|a| a.origin == AccountOrigin::RestaurantTable)
                .count(),
            2
        );

        // pool over-full never yields negative counts
        let full: Vec<FiscalPoolEntry> = (0..5)
            .map(|_| create_test_entry(AccountOrigin::RestaurantTable, "12", 50.0))
            .chain([create_test_entry(AccountOrigin::ReceptionRoom, "101", 80.0)])
            .collect();
        assert!(plan_backfill(&accounts, &full).is_empty());
    }

    #[test]
    fn test_signature_keeps_ids_as_stored() {
        let accounts = vec![create_test_account(AccountOrigin::RestaurantTable, "12", 50.0, "19/10/2026 12:00:00")];
        let pool = vec![create_test_entry(AccountOrigin::RestaurantTable, "012", 50.0)];
        assert_eq!(plan_backfill(&accounts, &pool).len(), 1);
        assert_eq!(
            Signature::new(AccountOrigin::RestaurantTable, " 12 ", 50.0),
            Signature::new(AccountOrigin::RestaurantTable, "12", 50.004)
        );
    }

    #[test]
    fn test_cashier_sales_group_legs_and_skip_voids() {
        let mut card = create_test_sale("T1", "Venda Mesa 7 - Cartão", 60.0, "19/10/2026 12:00:00");
        card.details.insert(detail_keys::PAYMENT_GROUP_ID.to_string(), json!("G1"));
        let mut cash = create_test_sale("T2", "Venda Mesa 7 - Dinheiro", 40.0, "19/10/2026 12:00:00");
        cash.details.insert(detail_keys::PAYMENT_GROUP_ID.to_string(), json!("G1"));
        let voided = create_test_sale("T3", "Venda Quarto 101", 90.0, "19/10/2026 12:10:00");
        let mut refund = create_test_sale("T4", "Estorno: Venda Quarto 101", 90.0, "19/10/2026 12:11:00");
        refund.kind = TransactionKind::Refund;
        refund.details.insert(detail_keys::REVERSES.to_string(), json!("T3"));
        let mut partial = create_test_sale("T5", "Pagamento Parcial Mesa 9", 10.0, "19/10/2026 12:12:00");
        partial.details.insert(detail_keys::PARTIAL_PAYMENT_ID.to_string(), json!("P1"));
        let unrelated = create_test_sale("T6", "Venda Balcão", 5.0, "19/10/2026 12:13:00");

        let sales = cashier_sales(&[create_test_session(vec![card, cash, voided, refund, partial, unrelated])]);
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].key, "G1");
        assert_eq!(sales[0].amount, 100.0);
        assert_eq!(sales[0].original_id, "7");
        assert_eq!(sales[0].methods.len(), 2);
    }

    #[test]
    fn test_find_orphans_by_signature_and_window() {
        let session = create_test_session(vec![
            create_test_sale("T1", "Venda Mesa 3", 30.0, "19/10/2026 12:00:00"),
            // archived under a different id but within the window
            create_test_sale("T2", "Venda Mesa 4", 45.0, "19/10/2026 13:00:00"),
            create_test_sale("T3", "Venda Quarto 202", 120.0, "19/10/2026 15:00:00"),
        ]);
        let accounts = vec![
            create_test_account(AccountOrigin::RestaurantTable, "3", 30.0, "19/10/2026 12:00:30"),
            create_test_account(AccountOrigin::RestaurantTable, "40", 45.0, "19/10/2026 13:02:59"),
            create_test_account(AccountOrigin::ReceptionRoom, "202", 99.0, "19/10/2026 15:00:00"),
        ];

        let orphans = find_orphans(cashier_sales(&[session]), &accounts);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].key, "T3");
        assert_eq!(orphans[0].origin, AccountOrigin::ReceptionRoom);
    }

    #[test]
    fn test_window_is_three_minutes() {
        assert!(within_window("19/10/2026 13:00:00", "19/10/2026 13:03:00"));
        assert!(!within_window("19/10/2026 13:00:00", "19/10/2026 13:03:01"));
        assert!(!within_window("garbage", "19/10/2026 13:00:00"));
    }
}
