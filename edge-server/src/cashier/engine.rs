//! Cashier Engine
//!
//! Constructor-injected owner of the sessions file. Every state-changing
//! operation runs `lock → read → modify → atomic write → backup`; reads
//! outside the lock are best-effort.

use super::display::{DisplayRow, Page, paginate, prepare_for_display};
use super::error::{CashierError, CashierResult};
use super::ledger::{self, SessionSummary, cash_balance_decimal, is_non_cash_method};
use super::store::SnapshotStore;
use crate::audit::{AuditAction, AuditEntry, AuditSink, emit};
use crate::money::{self, round_dp, to_decimal, to_f64};
use crate::printing::{PrintDispatcher, PrintJob, dispatch_best_effort};
use crate::storage::{StorageError, to_pretty_json, write_atomic};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use shared::models::{
    CashierType, PaymentLeg, Session, SessionClose, SessionOpen, SessionStatus, Transaction,
    TransactionInput, TransactionKind, detail_keys,
};
use shared::util;
use std::path::PathBuf;
use std::sync::Arc;

/// Operator of sessions opened automatically on a payment
pub const SYSTEM_AUTO_USER: &str = "Sistema (Auto)";
/// Payment method of both legs of a fund transfer
pub const TRANSFER_METHOD: &str = "Transferência";
pub const TRANSFER_SENT: &str = "Transferência Enviada";
pub const TRANSFER_RECEIVED: &str = "Transferência Recebida";
/// Category of compensating transactions
pub const REVERSAL_CATEGORY: &str = "Estorno";
/// Closed-sessions export file name
pub const CLOSED_EXPORT_FILE: &str = "caixas_fechados.json";

/// Session listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilter {
    /// Matches every alias of the logical cashier
    #[serde(default, rename = "type")]
    pub cashier_type: Option<CashierType>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

/// Result of a multi-tender payment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentGroupReceipt {
    pub group_id: String,
    pub session_id: String,
    pub total: f64,
    pub transactions: Vec<Transaction>,
    /// The idempotency key had already been recorded
    pub replayed: bool,
}

/// Paired legs of a fund transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundTransfer {
    pub document_id: String,
    pub amount: f64,
    pub source_session_id: String,
    pub target_session_id: String,
    pub out_leg: Transaction,
    pub in_leg: Transaction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreOutcome {
    pub backup: PathBuf,
    pub sessions: usize,
}

#[derive(Serialize)]
struct ClosedSessionsExport<'a> {
    exported_at: String,
    closed_sessions: Vec<&'a Session>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Open session of the logical type, newest first
fn find_open_index(sessions: &[Session], cashier_type: &CashierType) -> Option<usize> {
    sessions
        .iter()
        .rposition(|s| s.is_open() && s.cashier_type.same_logical(cashier_type))
}

fn new_session(cashier_type: &CashierType, user: &str, opening_balance: f64) -> Session {
    Session {
        id: util::session_id(cashier_type.as_str(), user),
        cashier_type: cashier_type.clone(),
        user: user.to_string(),
        entity: None,
        opened_at: util::human_now(),
        opening_balance,
        status: SessionStatus::Open,
        closed_at: None,
        closed_by: None,
        closing_balance: None,
        difference: None,
        transactions: Vec::new(),
    }
}

/// Open session index, auto-opening a system session when none exists
fn open_or_auto(sessions: &mut Vec<Session>, cashier_type: &CashierType) -> usize {
    if let Some(idx) = find_open_index(sessions, cashier_type) {
        return idx;
    }
    tracing::warn!(cashier = %cashier_type, "No open session, auto-opening system session");
    let mut session = new_session(cashier_type, SYSTEM_AUTO_USER, 0.0);
    session.entity = Some(SYSTEM_AUTO_USER.to_string());
    sessions.push(session);
    sessions.len() - 1
}

fn require_amount(value: f64, field: &str) -> CashierResult<()> {
    money::require_finite(value, field).map_err(CashierError::InvalidAmount)
}

fn require_positive(value: f64, field: &str) -> CashierResult<()> {
    require_amount(value, field)?;
    if value <= 0.0 {
        return Err(CashierError::InvalidAmount(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    Ok(())
}

/// Explicit kind wins; else `out` on withdrawal; else by amount sign
fn resolve_kind(input: &TransactionInput) -> TransactionKind {
    if let Some(kind) = &input.kind {
        return kind.clone();
    }
    if input.is_withdrawal {
        TransactionKind::Out
    } else if input.amount >= 0.0 {
        TransactionKind::Sale
    } else {
        TransactionKind::Refund
    }
}

fn transfer_leg(
    kind: TransactionKind,
    category: &str,
    amount: f64,
    description: &str,
    user: &str,
    document_id: &str,
    counterpart: &Session,
) -> Transaction {
    let mut details = Map::new();
    details.insert("counterpart_session_id".into(), Value::String(counterpart.id.clone()));
    details.insert(
        "counterpart_type".into(),
        Value::String(counterpart.cashier_type.to_string()),
    );
    Transaction {
        id: util::transaction_id(),
        kind,
        category: Some(category.to_string()),
        amount,
        payment_method: TRANSFER_METHOD.to_string(),
        description: description.to_string(),
        timestamp: util::human_now(),
        user: user.to_string(),
        details,
        document_id: Some(document_id.to_string()),
    }
}

fn is_reversed(sessions: &[Session], original_id: &str) -> bool {
    sessions
        .iter()
        .flat_map(|s| &s.transactions)
        .any(|t| t.detail_str(detail_keys::REVERSES) == Some(original_id))
}

// ============================================================================
// Engine
// ============================================================================

pub struct CashierEngine {
    store: SnapshotStore,
    audit: Arc<dyn AuditSink>,
    export_dir: PathBuf,
    printer: Option<Arc<dyn PrintDispatcher>>,
}

impl CashierEngine {
    pub fn new(store: SnapshotStore, audit: Arc<dyn AuditSink>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            audit,
            export_dir: export_dir.into(),
            printer: None,
        }
    }

    /// Print the closing report on every close
    pub fn with_printer(mut self, printer: Arc<dyn PrintDispatcher>) -> Self {
        self.printer = Some(printer);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Read-modify-write under the sessions lock; nothing is written on error
    fn commit<R>(&self, body: impl FnOnce(&mut Vec<Session>) -> CashierResult<R>) -> CashierResult<R> {
        self.store.with_lock(|| {
            let mut sessions = self.store.read_locked()?;
            let out = body(&mut sessions)?;
            self.store.write(&sessions)?;
            self.store.backup_quietly(&sessions);
            Ok(out)
        })
    }

    /// Cash guard: fails and audits when the drawer cannot cover `requested`
    fn ensure_cash(
        &self,
        session: &Session,
        requested: Decimal,
        user: &str,
        action: AuditAction,
    ) -> CashierResult<()> {
        let available = round_dp(cash_balance_decimal(session));
        let requested = round_dp(requested);
        if available >= requested {
            return Ok(());
        }

        let (available, requested) = (to_f64(available), to_f64(requested));
        tracing::warn!(
            session_id = %session.id,
            user = %user,
            available,
            requested,
            "Cash outflow blocked: insufficient cash balance"
        );
        emit(
            self.audit.as_ref(),
            AuditEntry::warning(
                action,
                "cashier",
                json!({
                    "message": "Insufficient cash balance",
                    "available": available,
                    "requested": requested,
                    "session_id": session.id,
                    "cashier_type": session.cashier_type,
                    "user": user,
                }),
            )
            .by(user)
            .in_department(session.cashier_type.logical().as_str()),
        );
        Err(CashierError::InsufficientCashBalance {
            available,
            requested,
        })
    }

    fn ineligible(
        &self,
        source: &CashierType,
        target: &CashierType,
        source_closed: bool,
        target_closed: bool,
        user: &str,
    ) -> CashierError {
        let message = match (source_closed, target_closed) {
            (true, true) => format!(
                "Transfer blocked: both cashiers are closed ({} and {})",
                source.display_name(),
                target.display_name()
            ),
            (true, false) => format!(
                "Transfer blocked: source cashier {} is closed",
                source.display_name()
            ),
            _ => format!(
                "Transfer blocked: target cashier {} is closed",
                target.display_name()
            ),
        };
        tracing::warn!(source = %source, target = %target, user = %user, "{}", message);
        emit(
            self.audit.as_ref(),
            AuditEntry::warning(
                AuditAction::TransferBlocked,
                "cashier",
                json!({
                    "message": message,
                    "source": source,
                    "target": target,
                    "source_closed": source_closed,
                    "target_closed": target_closed,
                }),
            )
            .by(user),
        );
        CashierError::TransferIneligible(message)
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    pub fn open_session(&self, req: SessionOpen) -> CashierResult<Session> {
        require_amount(req.opening_balance, "opening_balance")?;
        if req.opening_balance < 0.0 {
            return Err(CashierError::InvalidAmount(format!(
                "opening_balance must not be negative, got {}",
                req.opening_balance
            )));
        }

        let session = self.commit(|sessions| {
            if let Some(open) = sessions
                .iter()
                .find(|s| s.is_open() && s.cashier_type.same_logical(&req.cashier_type))
            {
                return Err(CashierError::InvalidState(format!(
                    "{} is already open (session {})",
                    req.cashier_type.display_name(),
                    open.id
                )));
            }
            let mut session = new_session(&req.cashier_type, &req.user, money::round2(req.opening_balance));
            session.entity = req.entity.clone();
            sessions.push(session.clone());
            Ok(session)
        })?;

        tracing::info!(
            session_id = %session.id,
            cashier = %session.cashier_type,
            user = %session.user,
            opening_balance = session.opening_balance,
            "Cashier session opened"
        );
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::CashierOpened,
                "cashier",
                json!({"session_id": session.id, "opening_balance": session.opening_balance}),
            )
            .by(&session.user)
            .in_department(session.cashier_type.logical().as_str()),
        );
        Ok(session)
    }

    /// Close by id when given, otherwise the open session of the type
    ///
    /// `difference = declared - expected cash`; the declared balance defaults
    /// to the expected one.
    pub fn close_session(&self, req: SessionClose) -> CashierResult<Session> {
        if let Some(balance) = req.closing_balance {
            require_amount(balance, "closing_balance")?;
        }

        let session = self.commit(|sessions| {
            let idx = match (&req.session_id, &req.cashier_type) {
                (Some(id), _) => sessions
                    .iter()
                    .position(|s| &s.id == id)
                    .ok_or_else(|| CashierError::SessionNotFound(id.clone()))?,
                (None, Some(ty)) => find_open_index(sessions, ty).ok_or_else(|| {
                    CashierError::InvalidState(format!("{} has no open session", ty.display_name()))
                })?,
                (None, None) => {
                    return Err(CashierError::InvalidState(
                        "session id or cashier type is required".to_string(),
                    ));
                }
            };

            let session = &mut sessions[idx];
            if !session.is_open() {
                return Err(CashierError::InvalidState(format!(
                    "Session {} is already closed",
                    session.id
                )));
            }

            let expected = round_dp(cash_balance_decimal(session));
            let declared = req.closing_balance.map(|b| round_dp(to_decimal(b))).unwrap_or(expected);
            session.status = SessionStatus::Closed;
            session.closed_at = Some(util::human_now());
            session.closed_by = Some(req.user.clone());
            session.closing_balance = Some(to_f64(declared));
            session.difference = Some(to_f64(declared - expected));
            Ok(session.clone())
        })?;

        tracing::info!(
            session_id = %session.id,
            closed_by = %req.user,
            closing_balance = ?session.closing_balance,
            difference = ?session.difference,
            "Cashier session closed"
        );
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::CashierClosed,
                "cashier",
                json!({
                    "session_id": session.id,
                    "closing_balance": session.closing_balance,
                    "difference": session.difference,
                }),
            )
            .by(&req.user)
            .in_department(session.cashier_type.logical().as_str()),
        );
        if let Err(e) = self.export_closed_sessions() {
            tracing::warn!(error = %e, "Closed sessions export failed");
        }
        if let Some(printer) = &self.printer {
            let summary = ledger::summarize(&session);
            dispatch_best_effort(printer.as_ref(), PrintJob::closing_report(&summary, &req.user));
        }
        Ok(session)
    }

    /// Open session of the logical type; aliases are folded both ways
    pub fn get_active_session(&self, cashier_type: &CashierType) -> CashierResult<Option<Session>> {
        let sessions = self.store.read()?;
        Ok(find_open_index(&sessions, cashier_type).map(|idx| sessions[idx].clone()))
    }

    pub fn get_session_by_id(&self, session_id: &str) -> CashierResult<Option<Session>> {
        let sessions = self.store.read()?;
        Ok(sessions.into_iter().find(|s| s.id == session_id))
    }

    /// Sessions matching the filter, newest first
    pub fn list_sessions(&self, filter: &SessionFilter) -> CashierResult<Vec<Session>> {
        let sessions = self.store.read()?;
        Ok(sessions
            .into_iter()
            .rev()
            .filter(|s| {
                filter
                    .cashier_type
                    .as_ref()
                    .is_none_or(|ty| s.cashier_type.same_logical(ty))
            })
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .collect())
    }

    pub fn summarize(&self, session_id: &str) -> CashierResult<SessionSummary> {
        let session = self
            .get_session_by_id(session_id)?
            .ok_or_else(|| CashierError::SessionNotFound(session_id.to_string()))?;
        Ok(ledger::summarize(&session))
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Append one transaction to the open session of the type
    ///
    /// Auto-opens a "Sistema (Auto)" session when none is open, so payments
    /// are never dropped. A replayed `idempotency_key` returns the stored
    /// transaction unchanged.
    pub fn add_transaction(&self, input: TransactionInput) -> CashierResult<Transaction> {
        require_amount(input.amount, "amount")?;
        let kind = resolve_kind(&input);
        let amount = money::round2(input.amount.abs());

        self.commit(|sessions| {
            let idx = open_or_auto(sessions, &input.cashier_type);
            let session = &sessions[idx];

            let idempotency_key = input
                .details
                .get(detail_keys::IDEMPOTENCY_KEY)
                .and_then(Value::as_str)
                .filter(|k| !k.is_empty());
            if let Some(key) = idempotency_key
                && let Some(existing) = session.find_by_idempotency_key(key)
            {
                tracing::info!(session_id = %session.id, idempotency_key = %key, "Replayed transaction ignored");
                return Ok(existing.clone());
            }

            if kind.is_outflow() && !is_non_cash_method(&input.payment_method) {
                self.ensure_cash(session, to_decimal(amount), &input.user, AuditAction::WithdrawalBlocked)?;
            }

            let mut details = input.details.clone();
            if let Some(group_id) = input.payment_group_id.as_deref().filter(|g| !g.is_empty()) {
                details.insert(
                    detail_keys::PAYMENT_GROUP_ID.to_string(),
                    Value::String(group_id.to_string()),
                );
            }

            let tx = Transaction {
                id: util::transaction_id(),
                kind: kind.clone(),
                category: input.category.clone(),
                amount,
                payment_method: input.payment_method.clone(),
                description: input.description.clone(),
                timestamp: util::human_now(),
                user: input.user.clone(),
                details,
                document_id: None,
            };
            tracing::debug!(
                session_id = %session.id,
                transaction_id = %tx.id,
                kind = %tx.kind,
                amount = tx.amount,
                "Transaction added"
            );
            sessions[idx].transactions.push(tx.clone());
            Ok(tx)
        })
    }

    /// Append the N legs of one multi-tender payment under a single lock
    ///
    /// Every leg carries the shared `payment_group_id` and the group total.
    pub fn record_payment_group(
        &self,
        cashier_type: &CashierType,
        legs: &[PaymentLeg],
        description: &str,
        user: &str,
        details: Map<String, Value>,
    ) -> CashierResult<PaymentGroupReceipt> {
        if legs.is_empty() {
            return Err(CashierError::InvalidAmount(
                "a payment needs at least one tender".to_string(),
            ));
        }
        for leg in legs {
            require_positive(leg.amount, "payment amount")?;
        }

        let group_id = details
            .get(detail_keys::PAYMENT_GROUP_ID)
            .and_then(Value::as_str)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let total = money::sum(legs.iter().map(|l| money::round2(l.amount)));
        let idempotency_key = details
            .get(detail_keys::IDEMPOTENCY_KEY)
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        self.commit(|sessions| {
            let idx = open_or_auto(sessions, cashier_type);
            let session = &sessions[idx];

            if let Some(key) = &idempotency_key
                && let Some(existing) = session.find_by_idempotency_key(key)
            {
                let existing_group = existing.payment_group_id().map(str::to_string);
                let members: Vec<Transaction> = match &existing_group {
                    Some(gid) => session
                        .transactions
                        .iter()
                        .filter(|t| t.payment_group_id() == Some(gid.as_str()))
                        .cloned()
                        .collect(),
                    None => vec![existing.clone()],
                };
                tracing::info!(session_id = %session.id, idempotency_key = %key, "Replayed payment group ignored");
                return Ok(PaymentGroupReceipt {
                    group_id: existing_group.unwrap_or_else(|| existing.id.clone()),
                    session_id: session.id.clone(),
                    total: to_f64(money::sum(members.iter().map(|t| t.amount))),
                    transactions: members,
                    replayed: true,
                });
            }

            let timestamp = util::human_now();
            let total_f64 = to_f64(total);
            let transactions: Vec<Transaction> = legs
                .iter()
                .map(|leg| {
                    let mut leg_details = details.clone();
                    leg_details.insert(
                        detail_keys::PAYMENT_GROUP_ID.to_string(),
                        Value::String(group_id.clone()),
                    );
                    leg_details.insert(
                        detail_keys::TOTAL_PAYMENT_GROUP_AMOUNT.to_string(),
                        json!(total_f64),
                    );
                    if let Some(code) = &leg.method_code {
                        leg_details.insert(
                            detail_keys::PAYMENT_METHOD_CODE.to_string(),
                            Value::String(code.clone()),
                        );
                    }
                    Transaction {
                        id: util::transaction_id(),
                        kind: TransactionKind::Sale,
                        category: None,
                        amount: money::round2(leg.amount),
                        payment_method: leg.method.clone(),
                        description: format!("{} - {}", description, leg.method),
                        timestamp: timestamp.clone(),
                        user: user.to_string(),
                        details: leg_details,
                        document_id: None,
                    }
                })
                .collect();

            let session_id = sessions[idx].id.clone();
            sessions[idx].transactions.extend(transactions.iter().cloned());
            tracing::info!(
                session_id = %session_id,
                payment_group_id = %group_id,
                legs = transactions.len(),
                total = total_f64,
                "Payment group recorded"
            );
            Ok(PaymentGroupReceipt {
                group_id: group_id.clone(),
                session_id,
                total: total_f64,
                transactions,
                replayed: false,
            })
        })
    }

    /// Compensating action: append the reverse of a transaction
    ///
    /// The original is never edited and can be voided once.
    pub fn void_transaction(
        &self,
        cashier_type: &CashierType,
        transaction_id: &str,
        user: &str,
        reason: &str,
    ) -> CashierResult<Transaction> {
        let reversal = self.commit(|sessions| {
            let original = sessions
                .iter()
                .filter(|s| s.cashier_type.same_logical(cashier_type))
                .flat_map(|s| &s.transactions)
                .find(|t| t.id == transaction_id)
                .cloned()
                .ok_or_else(|| CashierError::TransactionNotFound(transaction_id.to_string()))?;

            if original.detail_str(detail_keys::REVERSES).is_some() {
                return Err(CashierError::InvalidState(format!(
                    "Transaction {} is itself a reversal",
                    transaction_id
                )));
            }
            if is_reversed(sessions, transaction_id) {
                return Err(CashierError::AlreadyReversed(transaction_id.to_string()));
            }

            let idx = find_open_index(sessions, cashier_type).ok_or_else(|| {
                CashierError::InvalidState(format!(
                    "{} has no open session",
                    cashier_type.display_name()
                ))
            })?;

            let kind = original.kind.reverse();
            if kind.is_outflow() && !is_non_cash_method(&original.payment_method) {
                self.ensure_cash(&sessions[idx], to_decimal(original.amount.abs()), user, AuditAction::WithdrawalBlocked)?;
            }

            let mut details = Map::new();
            details.insert(
                detail_keys::REVERSES.to_string(),
                Value::String(original.id.clone()),
            );
            details.insert("reason".to_string(), Value::String(reason.to_string()));
            for key in [detail_keys::TABLE_ID, detail_keys::ROOM_NUMBER] {
                if let Some(value) = original.details.get(key) {
                    details.insert(key.to_string(), value.clone());
                }
            }

            let tx = Transaction {
                id: util::transaction_id(),
                kind,
                category: Some(REVERSAL_CATEGORY.to_string()),
                amount: original.amount.abs(),
                payment_method: original.payment_method.clone(),
                description: format!("Estorno: {}", original.description),
                timestamp: util::human_now(),
                user: user.to_string(),
                details,
                document_id: None,
            };
            sessions[idx].transactions.push(tx.clone());
            Ok(tx)
        })?;

        tracing::info!(transaction_id = %transaction_id, reversal_id = %reversal.id, user = %user, "Transaction voided");
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::TransactionVoided,
                "cashier",
                json!({"transaction_id": transaction_id, "reversal_id": reversal.id, "reason": reason}),
            )
            .by(user),
        );
        Ok(reversal)
    }

    // ========================================================================
    // Fund transfers
    // ========================================================================

    /// Both endpoints must be open; fails with one message naming which are closed
    pub fn validate_transfer_eligibility(
        &self,
        source: &CashierType,
        target: &CashierType,
        user: &str,
    ) -> CashierResult<()> {
        let sessions = self.store.read()?;
        let source_closed = find_open_index(&sessions, source).is_none();
        let target_closed = find_open_index(&sessions, target).is_none();
        if source_closed || target_closed {
            return Err(self.ineligible(source, target, source_closed, target_closed, user));
        }
        Ok(())
    }

    /// Move physical cash between two open drawers
    ///
    /// Appends an `out` leg on the source and an `in` leg on the target,
    /// sharing one `document_id`, atomically under the sessions lock.
    pub fn transfer_funds(
        &self,
        source: &CashierType,
        target: &CashierType,
        amount: f64,
        description: &str,
        user: &str,
    ) -> CashierResult<FundTransfer> {
        require_positive(amount, "amount")?;
        if source.same_logical(target) {
            return Err(CashierError::InvalidState(
                "source and target are the same cashier".to_string(),
            ));
        }
        self.validate_transfer_eligibility(source, target, user)?;

        let amount = money::round2(amount);
        let transfer = self.commit(|sessions| {
            // Re-resolved inside the critical section
            let (src, dst) = match (find_open_index(sessions, source), find_open_index(sessions, target)) {
                (Some(src), Some(dst)) => (src, dst),
                (src, dst) => {
                    return Err(self.ineligible(source, target, src.is_none(), dst.is_none(), user));
                }
            };
            self.ensure_cash(&sessions[src], to_decimal(amount), user, AuditAction::TransferBlocked)?;

            let document_id = util::document_id();
            let out_leg = transfer_leg(
                TransactionKind::Out,
                TRANSFER_SENT,
                amount,
                description,
                user,
                &document_id,
                &sessions[dst],
            );
            let in_leg = transfer_leg(
                TransactionKind::In,
                TRANSFER_RECEIVED,
                amount,
                description,
                user,
                &document_id,
                &sessions[src],
            );
            sessions[src].transactions.push(out_leg.clone());
            sessions[dst].transactions.push(in_leg.clone());

            Ok(FundTransfer {
                document_id,
                amount,
                source_session_id: sessions[src].id.clone(),
                target_session_id: sessions[dst].id.clone(),
                out_leg,
                in_leg,
            })
        })?;

        tracing::info!(
            document_id = %transfer.document_id,
            source = %transfer.source_session_id,
            target = %transfer.target_session_id,
            amount,
            "Funds transferred between cashiers"
        );
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::FundsTransferred,
                "cashier",
                json!({
                    "document_id": transfer.document_id,
                    "amount": amount,
                    "source_session_id": transfer.source_session_id,
                    "target_session_id": transfer.target_session_id,
                }),
            )
            .by(user),
        );
        Ok(transfer)
    }

    /// Compensating pair for a previous transfer (target back to source)
    pub fn reverse_transfer(&self, document_id: &str, user: &str, reason: &str) -> CashierResult<FundTransfer> {
        let transfer = self.commit(|sessions| {
            let mut out_leg: Option<(usize, Transaction)> = None;
            let mut in_leg: Option<(usize, Transaction)> = None;
            for (idx, session) in sessions.iter().enumerate() {
                for tx in &session.transactions {
                    if tx.document_id.as_deref() != Some(document_id) {
                        continue;
                    }
                    if tx.kind.is_outflow() {
                        out_leg = Some((idx, tx.clone()));
                    } else {
                        in_leg = Some((idx, tx.clone()));
                    }
                }
            }
            let ((orig_src, orig_out), (orig_dst, _)) = match (out_leg, in_leg) {
                (Some(out), Some(inn)) => (out, inn),
                _ => {
                    return Err(CashierError::TransactionNotFound(format!(
                        "transfer document {}",
                        document_id
                    )));
                }
            };
            if is_reversed(sessions, document_id) {
                return Err(CashierError::AlreadyReversed(document_id.to_string()));
            }

            // The original target pays back the original source
            let new_src_open = sessions[orig_dst].is_open();
            let new_dst_open = sessions[orig_src].is_open();
            if !new_src_open || !new_dst_open {
                return Err(self.ineligible(
                    &sessions[orig_dst].cashier_type,
                    &sessions[orig_src].cashier_type,
                    !new_src_open,
                    !new_dst_open,
                    user,
                ));
            }

            let amount = orig_out.amount.abs();
            self.ensure_cash(&sessions[orig_dst], to_decimal(amount), user, AuditAction::TransferBlocked)?;

            let new_document = util::document_id();
            let description = format!("Estorno de transferência: {}", orig_out.description);
            let mut out = transfer_leg(
                TransactionKind::Out,
                TRANSFER_SENT,
                amount,
                &description,
                user,
                &new_document,
                &sessions[orig_src],
            );
            let mut inn = transfer_leg(
                TransactionKind::In,
                TRANSFER_RECEIVED,
                amount,
                &description,
                user,
                &new_document,
                &sessions[orig_dst],
            );
            for leg in [&mut out, &mut inn] {
                leg.details.insert(
                    detail_keys::REVERSES.to_string(),
                    Value::String(document_id.to_string()),
                );
                leg.details.insert("reason".to_string(), Value::String(reason.to_string()));
            }
            sessions[orig_dst].transactions.push(out.clone());
            sessions[orig_src].transactions.push(inn.clone());

            Ok(FundTransfer {
                document_id: new_document,
                amount,
                source_session_id: sessions[orig_dst].id.clone(),
                target_session_id: sessions[orig_src].id.clone(),
                out_leg: out,
                in_leg: inn,
            })
        })?;

        tracing::info!(reverses = %document_id, document_id = %transfer.document_id, "Fund transfer reversed");
        emit(
            self.audit.as_ref(),
            AuditEntry::info(
                AuditAction::TransferReversed,
                "cashier",
                json!({
                    "reverses": document_id,
                    "document_id": transfer.document_id,
                    "amount": transfer.amount,
                    "reason": reason,
                }),
            )
            .by(user),
        );
        Ok(transfer)
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// Newest first, grouped before slicing
    pub fn get_paginated_transactions(
        &self,
        session_id: &str,
        page: usize,
        per_page: usize,
    ) -> CashierResult<Page<DisplayRow>> {
        let session = self
            .get_session_by_id(session_id)?
            .ok_or_else(|| CashierError::SessionNotFound(session_id.to_string()))?;
        let mut rows = prepare_for_display(&session.transactions);
        rows.reverse();
        Ok(paginate(rows, page, per_page))
    }

    // ========================================================================
    // Backup & export
    // ========================================================================

    /// Manual recovery: newest valid backup replaces the primary file
    pub fn restore_latest_backup(&self) -> CashierResult<RestoreOutcome> {
        self.store.with_lock(|| match self.store.backups().restore_latest()? {
            Some((backup, sessions)) => {
                self.store.write(&sessions)?;
                tracing::warn!(backup = %backup.display(), sessions = sessions.len(), "Sessions restored from backup");
                Ok(RestoreOutcome {
                    backup,
                    sessions: sessions.len(),
                })
            }
            None => Err(CashierError::Storage(StorageError::Unrecoverable(
                "no valid cashier backup found".to_string(),
            ))),
        })
    }

    /// Snapshot backup; skipped when nothing changed since the last one
    pub fn backup_now(&self) -> CashierResult<Option<PathBuf>> {
        let sessions = self.store.read()?;
        Ok(self.store.backups().backup(&sessions)?)
    }

    /// Write every closed session to `caixas_fechados.json`
    pub fn export_closed_sessions(&self) -> CashierResult<PathBuf> {
        let sessions = self.store.read()?;
        let export = ClosedSessionsExport {
            exported_at: util::human_now(),
            closed_sessions: sessions.iter().filter(|s| !s.is_open()).collect(),
        };
        let path = self.export_dir.join(CLOSED_EXPORT_FILE);
        write_atomic(&path, &to_pretty_json(&export).map_err(StorageError::from)?)?;
        tracing::debug!(path = %path.display(), count = export.closed_sessions.len(), "Closed sessions exported");
        Ok(path)
    }
}
