use super::*;

// ========================================================================
// add_transaction
// ========================================================================

#[test]
fn test_auto_opens_system_session_on_payment() {
    let (_dir, engine, _audit) = create_test_engine();
    let tx = engine
        .add_transaction(TransactionInput::new(
            CashierType::GuestConsumption,
            35.0,
            "Consumo Quarto 12",
            "Pix",
            "bia",
        ))
        .unwrap();
    assert_eq!(tx.kind, TransactionKind::Sale);

    let session = active(&engine, &CashierType::GuestConsumption);
    assert_eq!(session.user, SYSTEM_AUTO_USER);
    assert_eq!(session.opening_balance, 0.0);
    assert_eq!(session.transactions.len(), 1);
}

#[test]
fn test_kind_resolution_and_positive_storage() {
    let (_dir, engine, _audit) = create_test_engine();
    open(&engine, CashierType::Restaurant, 100.0);

    let refund = engine.add_transaction(cash_sale(CashierType::Restaurant, -12.5)).unwrap();
    assert_eq!(refund.kind, TransactionKind::Refund);
    assert_eq!(refund.amount, 12.5);

    let out = engine
        .add_transaction(cash_sale(CashierType::Restaurant, 10.0).withdrawal())
        .unwrap();
    assert_eq!(out.kind, TransactionKind::Out);

    let supply = engine
        .add_transaction(cash_sale(CashierType::Restaurant, 5.0).with_kind(TransactionKind::Supply))
        .unwrap();
    assert_eq!(supply.kind, TransactionKind::Supply);

    // 100 - 12.5 - 10 + 5
    assert_eq!(cash_balance(&active(&engine, &CashierType::Restaurant)), 82.5);
}

#[test]
fn test_withdrawal_blocked_when_cash_is_short() {
    let (_dir, engine, audit) = create_test_engine();
    open(&engine, CashierType::Restaurant, 20.0);
    engine
        .add_transaction(TransactionInput::new(
            CashierType::Restaurant,
            500.0,
            "Venda",
            "Cartão de Crédito",
            "ana",
        ))
        .unwrap();

    let err = engine
        .add_transaction(cash_sale(CashierType::Restaurant, 50.0).withdrawal())
        .unwrap_err();
    match err {
        CashierError::InsufficientCashBalance {
            available,
            requested,
        } => {
            assert_eq!(available, 20.0);
            assert_eq!(requested, 50.0);
        }
        other => panic!("unexpected error: {other}"),
    }
    // nothing was appended
    assert_eq!(active(&engine, &CashierType::Restaurant).transactions.len(), 1);

    let warnings = audit.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].acao, AuditAction::WithdrawalBlocked);
    assert_eq!(warnings[0].detalhes["available"], 20.0);
    assert_eq!(warnings[0].detalhes["requested"], 50.0);
}

#[test]
fn test_non_cash_outflow_skips_guard() {
    let (_dir, engine, _audit) = create_test_engine();
    open(&engine, CashierType::Restaurant, 0.0);
    let refund = engine
        .add_transaction(TransactionInput::new(
            CashierType::Restaurant,
            -40.0,
            "Estorno cartão",
            "Cartão",
            "ana",
        ))
        .unwrap();
    assert_eq!(refund.kind, TransactionKind::Refund);
}

#[test]
fn test_idempotency_key_replay_returns_stored_transaction() {
    let (_dir, engine, _audit) = create_test_engine();
    open(&engine, CashierType::Restaurant, 0.0);
    let input = cash_sale(CashierType::Restaurant, 30.0)
        .with_detail(detail_keys::IDEMPOTENCY_KEY, "abc-1");

    let first = engine.add_transaction(input.clone()).unwrap();
    let second = engine.add_transaction(input).unwrap();
    assert_eq!(first, second);
    assert_eq!(active(&engine, &CashierType::Restaurant).transactions.len(), 1);
}

#[test]
fn test_non_finite_amount_rejected() {
    let (_dir, engine, _audit) = create_test_engine();
    let err = engine
        .add_transaction(cash_sale(CashierType::Restaurant, f64::NAN))
        .unwrap_err();
    assert!(matches!(err, CashierError::InvalidAmount(_)));
    assert!(engine.get_active_session(&CashierType::Restaurant).unwrap().is_none());
}

// ========================================================================
// Payment groups & display
// ========================================================================

#[test]
fn test_payment_group_shares_id_and_total() {
    let (_dir, engine, _audit) = create_test_engine();
    open(&engine, CashierType::Restaurant, 0.0);
    let receipt = engine
        .record_payment_group(
            &CashierType::Restaurant,
            &[PaymentLeg::new("Cartão", 60.0), PaymentLeg::new("Dinheiro", 40.0)],
            "Venda Mesa 7",
            "ana",
            serde_json::Map::new(),
        )
        .unwrap();

    assert_eq!(receipt.total, 100.0);
    assert_eq!(receipt.transactions.len(), 2);
    for tx in &receipt.transactions {
        assert_eq!(tx.payment_group_id(), Some(receipt.group_id.as_str()));
        assert_eq!(tx.detail_f64(detail_keys::TOTAL_PAYMENT_GROUP_AMOUNT), Some(100.0));
    }
    assert_eq!(receipt.transactions[0].description, "Venda Mesa 7 - Cartão");
}

#[test]
fn test_payment_group_replay_returns_members() {
    let (_dir, engine, _audit) = create_test_engine();
    open(&engine, CashierType::Restaurant, 0.0);
    let mut details = serde_json::Map::new();
    details.insert(detail_keys::IDEMPOTENCY_KEY.into(), "close-7".into());
    let legs = [PaymentLeg::new("Pix", 10.0), PaymentLeg::new("Dinheiro", 5.0)];

    let first = engine
        .record_payment_group(&CashierType::Restaurant, &legs, "Venda Mesa 7", "ana", details.clone())
        .unwrap();
    let replay = engine
        .record_payment_group(&CashierType::Restaurant, &legs, "Venda Mesa 7", "ana", details)
        .unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.group_id, first.group_id);
    assert_eq!(replay.total, 15.0);
    assert_eq!(active(&engine, &CashierType::Restaurant).transactions.len(), 2);
}

#[test]
fn test_paginated_listing_groups_before_slicing() {
    let (_dir, engine, _audit) = create_test_engine();
    let session = open(&engine, CashierType::Restaurant, 0.0);
    engine.add_transaction(cash_sale(CashierType::Restaurant, 1.0)).unwrap();
    engine
        .record_payment_group(
            &CashierType::Restaurant,
            &[
                PaymentLeg::new("Cartão", 60.0),
                PaymentLeg::new("Dinheiro", 30.0),
                PaymentLeg::new("Pix", 10.0),
            ],
            "Venda Mesa 3",
            "ana",
            serde_json::Map::new(),
        )
        .unwrap();
    engine.add_transaction(cash_sale(CashierType::Restaurant, 2.0)).unwrap();

    let page = engine.get_paginated_transactions(&session.id, 1, 2).unwrap();
    assert_eq!(page.total_rows, 3);
    assert!(page.has_more);
    // newest first: the 2.0 sale, then the whole group
    assert_eq!(page.rows[0].amount(), 2.0);
    let group = page.rows[1].as_group().unwrap();
    assert_eq!(group.amount, 100.0);
    assert_eq!(group.sub_transactions.len(), 3);

    let last = engine.get_paginated_transactions(&session.id, 2, 2).unwrap();
    assert_eq!(last.rows.len(), 1);
    assert!(!last.has_more);
}

// ========================================================================
// Void
// ========================================================================

#[test]
fn test_void_appends_reversal_once() {
    let (_dir, engine, audit) = create_test_engine();
    open(&engine, CashierType::Restaurant, 0.0);
    let sale = engine.add_transaction(cash_sale(CashierType::Restaurant, 25.0)).unwrap();

    let reversal = engine
        .void_transaction(&CashierType::Restaurant, &sale.id, "ana", "cliente desistiu")
        .unwrap();
    assert_eq!(reversal.kind, TransactionKind::Refund);
    assert_eq!(reversal.amount, 25.0);
    assert_eq!(reversal.detail_str(detail_keys::REVERSES), Some(sale.id.as_str()));

    let session = active(&engine, &CashierType::Restaurant);
    // original untouched
    assert_eq!(session.transactions[0], sale);
    assert_eq!(cash_balance(&session), 0.0);

    let again = engine.void_transaction(&CashierType::Restaurant, &sale.id, "ana", "de novo");
    assert!(matches!(again, Err(CashierError::AlreadyReversed(_))));
    let of_reversal = engine.void_transaction(&CashierType::Restaurant, &reversal.id, "ana", "x");
    assert!(matches!(of_reversal, Err(CashierError::InvalidState(_))));

    assert!(audit.entries().iter().any(|e| e.acao == AuditAction::TransactionVoided));
}

#[test]
fn test_void_unknown_transaction() {
    let (_dir, engine, _audit) = create_test_engine();
    open(&engine, CashierType::Restaurant, 0.0);
    let err = engine
        .void_transaction(&CashierType::Restaurant, "nope", "ana", "x")
        .unwrap_err();
    assert!(matches!(err, CashierError::TransactionNotFound(_)));
}

#[test]
fn test_summary_reports_by_method() {
    let (_dir, engine, _audit) = create_test_engine();
    let session = open(&engine, CashierType::Restaurant, 10.0);
    engine.add_transaction(cash_sale(CashierType::Restaurant, 20.0)).unwrap();
    let summary = engine.summarize(&session.id).unwrap();
    assert_eq!(summary.cash_balance, 30.0);
    assert_eq!(summary.by_method["Dinheiro"], 20.0);
    assert_eq!(summary.transaction_count, 1);
}
