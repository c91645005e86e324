//! Presentation grouping of multi-tender payments
//!
//! Storage is never altered: grouping happens on a borrowed slice and the
//! result is sliced into pages only afterwards, so one payment never spans
//! two pages.

use crate::money::{to_decimal, to_f64};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use shared::models::{Transaction, TransactionKind};
use std::sync::LazyLock;

/// Payment method shown on a composite row
pub const MULTIPLE_METHODS: &str = "Múltiplo";

/// Legacy multi-tender marker written before payment groups existed
static LEGACY_TABLE_SALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Venda Mesa (\d+)").expect("legacy sale pattern is valid"));

/// One tender inside a composite row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubTransaction {
    pub id: String,
    pub method: String,
    pub amount: f64,
    pub timestamp: String,
    pub percent: f64,
}

/// Composite row standing for a whole payment group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedRow {
    pub is_group: bool,
    pub group_key: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub payment_method: String,
    pub description: String,
    pub timestamp: String,
    pub user: String,
    pub sub_transactions: Vec<SubTransaction>,
}

/// Row of the transaction listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DisplayRow {
    Single(Transaction),
    Group(GroupedRow),
}

impl DisplayRow {
    pub fn is_group(&self) -> bool {
        matches!(self, DisplayRow::Group(_))
    }

    pub fn amount(&self) -> f64 {
        match self {
            DisplayRow::Single(t) => t.amount,
            DisplayRow::Group(g) => g.amount,
        }
    }

    pub fn as_group(&self) -> Option<&GroupedRow> {
        match self {
            DisplayRow::Group(g) => Some(g),
            DisplayRow::Single(_) => None,
        }
    }
}

/// Grouping key: explicit payment group first, legacy description second
fn group_key(tx: &Transaction) -> Option<String> {
    if let Some(group_id) = tx.payment_group_id() {
        return Some(format!("group:{}", group_id));
    }
    if tx.kind != TransactionKind::Sale {
        return None;
    }
    LEGACY_TABLE_SALE
        .captures(&tx.description)
        .and_then(|c| c.get(1))
        .map(|table| format!("{}_{}", table.as_str(), tx.timestamp))
}

/// Text before the first " - " separator
fn description_prefix(description: &str) -> &str {
    description
        .split_once(" - ")
        .map(|(prefix, _)| prefix)
        .unwrap_or(description)
        .trim()
}

fn percent(part: Decimal, total: Decimal) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    (part / total * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

fn build_group(key: String, members: Vec<&Transaction>) -> GroupedRow {
    let total: Decimal = members.iter().map(|t| to_decimal(t.amount.abs())).sum();
    let first = members[0];
    let sub_transactions = members
        .iter()
        .map(|t| SubTransaction {
            id: t.id.clone(),
            method: t.payment_method.clone(),
            amount: t.amount,
            timestamp: t.timestamp.clone(),
            percent: percent(to_decimal(t.amount.abs()), total),
        })
        .collect();

    GroupedRow {
        is_group: true,
        group_key: key,
        kind: first.kind.clone(),
        amount: to_f64(total),
        payment_method: MULTIPLE_METHODS.to_string(),
        description: description_prefix(&first.description).to_string(),
        timestamp: first.timestamp.clone(),
        user: first.user.clone(),
        sub_transactions,
    }
}

/// Collapse runs of consecutive payment-group members into composite rows
///
/// Members separated by an unrelated row stay apart. A run of one stays a
/// plain row.
pub fn prepare_for_display(transactions: &[Transaction]) -> Vec<DisplayRow> {
    let keyed: Vec<(Option<String>, &Transaction)> =
        transactions.iter().map(|tx| (group_key(tx), tx)).collect();

    let mut rows = Vec::with_capacity(transactions.len());
    for run in keyed.chunk_by(|(a, _), (b, _)| a.is_some() && a == b) {
        match run {
            [(Some(key), _), _, ..] => {
                let members = run.iter().map(|(_, tx)| *tx).collect();
                rows.push(DisplayRow::Group(build_group(key.clone(), members)));
            }
            _ => rows.extend(run.iter().map(|(_, tx)| DisplayRow::Single((*tx).clone()))),
        }
    }
    rows
}

/// One page of rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_rows: usize,
    pub has_more: bool,
}

/// Default page size of every listing
pub const DEFAULT_PER_PAGE: usize = 50;

/// Slice `rows` into a 1-based page
pub fn paginate<T>(rows: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let page = page.max(1);
    let per_page = if per_page == 0 { DEFAULT_PER_PAGE } else { per_page };
    let total_rows = rows.len();
    let start = (page - 1).saturating_mul(per_page);
    let rows: Vec<T> = rows.into_iter().skip(start).take(per_page).collect();
    let has_more = start + rows.len() < total_rows;
    Page {
        rows,
        page,
        per_page,
        total_rows,
        has_more,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use shared::models::detail_keys;

    fn create_test_tx(id: &str, amount: f64, method: &str, description: &str, ts: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            kind: TransactionKind::Sale,
            category: None,
            amount,
            payment_method: method.to_string(),
            description: description.to_string(),
            timestamp: ts.to_string(),
            user: "ana".to_string(),
            details: Map::new(),
            document_id: None,
        }
    }

    fn grouped(mut tx: Transaction, group: &str) -> Transaction {
        tx.details.insert(
            detail_keys::PAYMENT_GROUP_ID.to_string(),
            Value::String(group.to_string()),
        );
        tx
    }

    #[test]
    fn test_explicit_group_becomes_composite_row() {
        let txs = vec![
            grouped(create_test_tx("1", 60.0, "Cartão", "Venda Mesa 7 - Cartão", "t1"), "g1"),
            grouped(create_test_tx("2", 40.0, "Dinheiro", "Venda Mesa 7 - Dinheiro", "t1"), "g1"),
            create_test_tx("3", 12.0, "Pix", "Venda Balcão", "t2"),
        ];
        let rows = prepare_for_display(&txs);
        assert_eq!(rows.len(), 2);

        let group = rows[0].as_group().unwrap();
        assert_eq!(group.amount, 100.0);
        assert_eq!(group.payment_method, MULTIPLE_METHODS);
        assert_eq!(group.description, "Venda Mesa 7");
        let percents: Vec<f64> = group.sub_transactions.iter().map(|s| s.percent).collect();
        assert_eq!(percents, vec![60.0, 40.0]);
        assert!(!rows[1].is_group());
    }

    #[test]
    fn test_legacy_regex_groups_same_timestamp_only() {
        let txs = vec![
            create_test_tx("1", 30.0, "Cartão", "Venda Mesa 12 - Cartão", "10/01/2026 12:00:00"),
            create_test_tx("2", 20.0, "Dinheiro", "Venda Mesa 12 - Dinheiro", "10/01/2026 12:00:00"),
            create_test_tx("3", 15.0, "Dinheiro", "Venda Mesa 12", "10/01/2026 13:00:00"),
        ];
        let rows = prepare_for_display(&txs);
        assert_eq!(rows.len(), 2);
        let group = rows[0].as_group().unwrap();
        assert_eq!(group.group_key, "12_10/01/2026 12:00:00");
        assert_eq!(group.amount, 50.0);
        assert!(!rows[1].is_group());
    }

    #[test]
    fn test_explicit_group_wins_over_legacy_key() {
        let txs = vec![
            grouped(create_test_tx("1", 10.0, "Cartão", "Venda Mesa 3 - Cartão", "t"), "a"),
            grouped(create_test_tx("2", 10.0, "Pix", "Venda Mesa 3 - Pix", "t"), "b"),
        ];
        // different groups, same legacy key: stay apart
        let rows = prepare_for_display(&txs);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.is_group()));
    }

    #[test]
    fn test_only_consecutive_members_are_grouped() {
        let txs = vec![
            grouped(create_test_tx("1", 30.0, "Cartão", "Venda Mesa 7 - Cartão", "t1"), "g1"),
            create_test_tx("2", 12.0, "Pix", "Venda Balcão", "t2"),
            grouped(create_test_tx("3", 20.0, "Dinheiro", "Venda Mesa 7 - Dinheiro", "t1"), "g1"),
            create_test_tx("4", 8.0, "Cartão", "Venda Mesa 9 - Cartão", "t3"),
            create_test_tx("5", 5.0, "Pix", "Suprimento", "t4"),
            create_test_tx("6", 4.0, "Dinheiro", "Venda Mesa 9 - Dinheiro", "t3"),
        ];
        let rows = prepare_for_display(&txs);
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| !r.is_group()));
        let amounts: Vec<f64> = rows.iter().map(DisplayRow::amount).collect();
        assert_eq!(amounts, vec![30.0, 12.0, 20.0, 8.0, 5.0, 4.0]);
    }

    #[test]
    fn test_percent_rounding_one_decimal() {
        let txs = vec![
            grouped(create_test_tx("1", 10.0, "A", "x", "t"), "g"),
            grouped(create_test_tx("2", 20.0, "B", "x", "t"), "g"),
        ];
        let rows = prepare_for_display(&txs);
        let group = rows[0].as_group().unwrap();
        assert_eq!(group.sub_transactions[0].percent, 33.3);
        assert_eq!(group.sub_transactions[1].percent, 66.7);
    }

    #[test]
    fn test_paginate_bounds() {
        let rows: Vec<u32> = (0..7).collect();
        let p1 = paginate(rows.clone(), 1, 3);
        assert_eq!(p1.rows, vec![0, 1, 2]);
        assert!(p1.has_more);
        let p3 = paginate(rows.clone(), 3, 3);
        assert_eq!(p3.rows, vec![6]);
        assert!(!p3.has_more);
        let p9 = paginate(rows.clone(), 9, 3);
        assert!(p9.rows.is_empty());
        assert!(!p9.has_more);
        let p0 = paginate(rows, 0, 0);
        assert_eq!(p0.page, 1);
        assert_eq!(p0.rows.len(), 7);
    }
}
