//! 现金分类与余额计算
//!
//! 是否影响抽屉现金由规则决定，与金额正负无关。规则按顺序执行，后者覆盖前者：
//!
//! 1. 支付方式包含 dinheiro / espécie → 现金
//! 2. 语义标签为 supply / suprimento / bleeding / sangria → 现金
//! 3. 支付方式提到 transferência → 现金（收银间转账搬运的是实物现金）
//! 4. 支付方式包含 cartão / crédito / débito / pix / cheque → 非现金

use crate::money::{to_decimal, to_f64};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{CashierType, Direction, Session, Transaction, TransactionKind};
use std::collections::BTreeMap;

const CASH_METHODS: &[&str] = &["dinheiro", "espécie", "especie"];
const TRANSFER_METHODS: &[&str] = &["transferência", "transferencia"];
const NON_CASH_METHODS: &[&str] = &[
    "cartão", "cartao", "crédito", "credito", "débito", "debito", "pix", "cheque",
];

fn mentions(method: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| method.contains(k))
}

/// Method explicitly outside the drawer (rule 4)
pub fn is_non_cash_method(method: &str) -> bool {
    mentions(&method.to_lowercase(), NON_CASH_METHODS)
}

/// Ordered classification rule list
pub fn classify(kind: &TransactionKind, method: &str) -> bool {
    let method = method.to_lowercase();
    let mut cash = false;
    if mentions(&method, CASH_METHODS) {
        cash = true;
    }
    if kind.is_cash_movement() {
        cash = true;
    }
    if mentions(&method, TRANSFER_METHODS) {
        cash = true;
    }
    if mentions(&method, NON_CASH_METHODS) {
        cash = false;
    }
    cash
}

pub fn is_cash_affecting(tx: &Transaction) -> bool {
    classify(&tx.kind, &tx.payment_method)
}

/// Physical cash in the drawer: opening balance plus cash-affecting movements
pub fn cash_balance_decimal(session: &Session) -> Decimal {
    session
        .transactions
        .iter()
        .filter(|t| is_cash_affecting(t))
        .map(|t| to_decimal(t.signed_amount()))
        .fold(to_decimal(session.opening_balance), |acc, v| acc + v)
}

pub fn cash_balance(session: &Session) -> f64 {
    to_f64(cash_balance_decimal(session))
}

/// Opening balance plus every signed amount, whatever the method
pub fn total_balance(session: &Session) -> f64 {
    let total = session
        .transactions
        .iter()
        .map(|t| to_decimal(t.signed_amount()))
        .fold(to_decimal(session.opening_balance), |acc, v| acc + v);
    to_f64(total)
}

/// Shift figures used by the close report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub cashier_type: CashierType,
    pub opening_balance: f64,
    pub total_in: f64,
    pub total_out: f64,
    pub cash_balance: f64,
    pub total_balance: f64,
    /// Net amount per payment method
    pub by_method: BTreeMap<String, f64>,
    pub transaction_count: usize,
}

pub fn summarize(session: &Session) -> SessionSummary {
    let mut total_in = Decimal::ZERO;
    let mut total_out = Decimal::ZERO;
    let mut by_method: BTreeMap<String, Decimal> = BTreeMap::new();

    for tx in &session.transactions {
        let amount = to_decimal(tx.amount.abs());
        match tx.kind.direction() {
            Direction::In => total_in += amount,
            Direction::Out => total_out += amount,
        }
        let method = if tx.payment_method.trim().is_empty() {
            "Outro".to_string()
        } else {
            tx.payment_method.clone()
        };
        *by_method.entry(method).or_default() += to_decimal(tx.signed_amount());
    }

    SessionSummary {
        session_id: session.id.clone(),
        cashier_type: session.cashier_type.clone(),
        opening_balance: session.opening_balance,
        total_in: to_f64(total_in),
        total_out: to_f64(total_out),
        cash_balance: cash_balance(session),
        total_balance: total_balance(session),
        by_method: by_method.into_iter().map(|(k, v)| (k, to_f64(v))).collect(),
        transaction_count: session.transactions.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use shared::models::SessionStatus;

    fn create_test_tx(kind: &str, amount: f64, method: &str) -> Transaction {
        Transaction {
            id: format!("{kind}-{method}-{amount}"),
            kind: TransactionKind::from(kind),
            category: None,
            amount,
            payment_method: method.to_string(),
            description: String::new(),
            timestamp: "01/01/2026 10:00:00".to_string(),
            user: "ana".to_string(),
            details: Map::new(),
            document_id: None,
        }
    }

    fn create_test_session(opening: f64, txs: Vec<Transaction>) -> Session {
        Session {
            id: "restaurant_1_ana".to_string(),
            cashier_type: CashierType::Restaurant,
            user: "ana".to_string(),
            entity: None,
            opened_at: "01/01/2026 08:00:00".to_string(),
            opening_balance: opening,
            status: SessionStatus::Open,
            closed_at: None,
            closed_by: None,
            closing_balance: None,
            difference: None,
            transactions: txs,
        }
    }

    // ========================================================================
    // Classification matrix
    // ========================================================================

    #[test]
    fn test_rule_cash_methods() {
        assert!(classify(&TransactionKind::Sale, "Dinheiro"));
        assert!(classify(&TransactionKind::Sale, "Espécie"));
        assert!(classify(&TransactionKind::Sale, "especie"));
        assert!(!classify(&TransactionKind::Sale, "Voucher"));
    }

    #[test]
    fn test_rule_cash_movement_labels() {
        for label in ["supply", "suprimento", "bleeding", "sangria"] {
            assert!(classify(&TransactionKind::from(label), ""), "{label}");
        }
        assert!(!classify(&TransactionKind::Deposit, ""));
        assert!(!classify(&TransactionKind::Out, ""));
    }

    #[test]
    fn test_rule_transfer_method() {
        assert!(classify(&TransactionKind::Out, "Transferência"));
        assert!(classify(&TransactionKind::In, "transferencia"));
    }

    #[test]
    fn test_rule_non_cash_overrides_everything() {
        assert!(!classify(&TransactionKind::Sale, "Cartão de Crédito"));
        assert!(!classify(&TransactionKind::Sale, "Débito"));
        assert!(!classify(&TransactionKind::Sale, "PIX"));
        assert!(!classify(&TransactionKind::Sale, "Cheque"));
        // rule 4 beats rule 1
        assert!(!classify(&TransactionKind::Sale, "Dinheiro + Cartão"));
        // rule 4 beats rule 2
        assert!(!classify(&TransactionKind::Sangria, "Pix"));
        // rule 4 beats rule 3
        assert!(!classify(&TransactionKind::Out, "Transferência PIX"));
    }

    #[test]
    fn test_sign_never_decides_cashness() {
        let refund = create_test_tx("refund", 20.0, "Cartão");
        assert!(!is_cash_affecting(&refund));
        let negative = create_test_tx("sale", -20.0, "Dinheiro");
        assert!(is_cash_affecting(&negative));
    }

    // ========================================================================
    // Balances
    // ========================================================================

    #[test]
    fn test_cash_and_total_balance() {
        let session = create_test_session(
            100.0,
            vec![
                create_test_tx("sale", 50.0, "Dinheiro"),
                create_test_tx("sale", 80.0, "Cartão"),
                create_test_tx("sangria", 30.0, ""),
                create_test_tx("refund", 10.0, "Dinheiro"),
                create_test_tx("supply", 5.0, ""),
            ],
        );
        // 100 + 50 - 30 - 10 + 5
        assert_eq!(cash_balance(&session), 115.0);
        // 100 + 50 + 80 - 30 - 10 + 5
        assert_eq!(total_balance(&session), 195.0);
    }

    #[test]
    fn test_summarize_by_method() {
        let session = create_test_session(
            0.0,
            vec![
                create_test_tx("sale", 60.0, "Cartão"),
                create_test_tx("sale", 40.0, "Dinheiro"),
                create_test_tx("out", 15.0, "Dinheiro"),
            ],
        );
        let summary = summarize(&session);
        assert_eq!(summary.total_in, 100.0);
        assert_eq!(summary.total_out, 15.0);
        assert_eq!(summary.by_method["Dinheiro"], 25.0);
        assert_eq!(summary.by_method["Cartão"], 60.0);
        assert_eq!(summary.cash_balance, 25.0);
        assert_eq!(summary.transaction_count, 3);
    }
}
