use super::*;
use crate::audit::{AuditAction, MemoryAuditSink, Severity};
use crate::storage::DEFAULT_LOCK_TIMEOUT;
use shared::models::{
    CashierType, PaymentLeg, Session, SessionClose, SessionOpen, SessionStatus, TransactionInput,
    TransactionKind, detail_keys,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_engine() -> (TempDir, CashierEngine, Arc<MemoryAuditSink>) {
    create_test_engine_with_timeout(DEFAULT_LOCK_TIMEOUT)
}

fn create_test_engine_with_timeout(lock_timeout: Duration) -> (TempDir, CashierEngine, Arc<MemoryAuditSink>) {
    let dir = TempDir::new().unwrap();
    let audit = Arc::new(MemoryAuditSink::new());
    let store = SnapshotStore::new(
        dir.path().join("cashier_sessions.json"),
        dir.path().join("backups/cashier"),
        lock_timeout,
    );
    let engine = CashierEngine::new(store, audit.clone(), dir.path().join("export"));
    (dir, engine, audit)
}

fn open(engine: &CashierEngine, cashier_type: CashierType, opening_balance: f64) -> Session {
    engine
        .open_session(SessionOpen {
            cashier_type,
            user: "ana".to_string(),
            opening_balance,
            entity: None,
        })
        .unwrap()
}

fn cash_sale(cashier_type: CashierType, amount: f64) -> TransactionInput {
    TransactionInput::new(cashier_type, amount, "Venda Balcão", "Dinheiro", "ana")
}

fn active(engine: &CashierEngine, cashier_type: &CashierType) -> Session {
    engine.get_active_session(cashier_type).unwrap().unwrap()
}

mod test_transactions;
