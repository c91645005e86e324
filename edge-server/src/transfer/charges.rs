//! 挂房账单金额计算
//!
//! 计算规则：
//!
//! ```text
//! 行金额      = qty × (price + Σ complement.price)
//! 计费基数    = Σ 非 couvert、非免服务费 的行金额
//! 服务费      = service_fee_removed ? 0 : 10% × 计费基数
//! 折扣        = 先餐厅账单、后 minibar 账单，共用同一预算，且不超过 (小计 + 服务费)
//! 提成        = 总额 × 非 couvert 占比，再按服务员份额分配
//! ```
//!
//! 全部使用 Decimal 计算，写回 f64 时按分取整。

use crate::money::{line_total, round_dp, to_f64};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{ChargeFlag, ChargeFlagKind, ChargeType, OrderItem, TableOrder};
use std::collections::BTreeMap;

/// 服务费率 10%
pub const SERVICE_FEE_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Commission owner when neither the item nor the order names a waiter
pub const DEFAULT_WAITER: &str = "Garçom";

/// How minibar items of a transferred table are billed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// One restaurant charge plus one minibar charge
    #[default]
    Split,
    /// A single restaurant charge; minibar items inside it pay no service fee
    /// and earn no commission
    Combined,
}

/// One room charge before it gets an id and a room
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCharge {
    pub charge_type: ChargeType,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub discount: Decimal,
    pub flags: Vec<ChargeFlag>,
    pub waiter: Option<String>,
    pub waiter_breakdown: BTreeMap<String, f64>,
    pub total: Decimal,
}

/// Whole-bill figures of a table closed at the restaurant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

fn earns_fee(item: &OrderItem, minibar_exempt: bool) -> bool {
    !item.is_cover() && !item.service_fee_exempt && !(minibar_exempt && item.is_minibar())
}

fn earns_commission(item: &OrderItem, minibar_exempt: bool) -> bool {
    !item.is_cover() && !(minibar_exempt && item.is_minibar())
}

/// Service fee of `items`, ignoring `service_fee_removed`
fn nominal_fee(items: &[OrderItem], minibar_exempt: bool) -> Decimal {
    let taxable: Decimal = items
        .iter()
        .filter(|i| earns_fee(i, minibar_exempt))
        .map(line_total)
        .sum();
    round_dp(taxable * SERVICE_FEE_RATE)
}

/// Split `total × commissionable share` across waiters by their item value
///
/// Returns the breakdown and the main waiter (largest share).
pub fn waiter_breakdown(
    items: &[OrderItem],
    order_waiter: Option<&str>,
    total: Decimal,
    minibar_exempt: bool,
) -> (BTreeMap<String, f64>, Option<String>) {
    let subtotal: Decimal = items.iter().map(line_total).sum();
    let mut by_waiter: BTreeMap<String, Decimal> = BTreeMap::new();
    for item in items.iter().filter(|i| earns_commission(i, minibar_exempt)) {
        let waiter = item
            .waiter
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .or(order_waiter.filter(|w| !w.trim().is_empty()))
            .unwrap_or(DEFAULT_WAITER);
        *by_waiter.entry(waiter.to_string()).or_default() += line_total(item);
    }

    let commissionable: Decimal = by_waiter.values().copied().sum();
    if commissionable.is_zero() || subtotal.is_zero() {
        return (BTreeMap::new(), None);
    }

    let distributable = total * (commissionable / subtotal);
    let mut main: Option<(&String, Decimal)> = None;
    for (waiter, value) in &by_waiter {
        if main.is_none_or(|(_, best)| *value > best) {
            main = Some((waiter, *value));
        }
    }
    let main_waiter = main.map(|(w, _)| w.clone());

    let breakdown = by_waiter
        .iter()
        .map(|(waiter, value)| (waiter.clone(), to_f64(distributable * (*value / commissionable))))
        .collect();
    (breakdown, main_waiter)
}

/// Take up to `cap` from the shared discount budget
fn take_discount(budget: &mut Decimal, cap: Decimal) -> Decimal {
    let applied = (*budget).min(cap).max(Decimal::ZERO);
    *budget -= applied;
    applied
}

fn restaurant_charge(
    order: &TableOrder,
    items: Vec<OrderItem>,
    budget: &mut Decimal,
    minibar_exempt: bool,
) -> PlannedCharge {
    let subtotal = round_dp(items.iter().map(line_total).sum());
    let nominal = nominal_fee(&items, minibar_exempt);
    let service_fee = if order.service_fee_removed {
        Decimal::ZERO
    } else {
        nominal
    };
    let discount = take_discount(budget, subtotal + service_fee);
    let total = subtotal + service_fee - discount;

    let mut flags = Vec::new();
    if order.service_fee_removed {
        flags.push(ChargeFlag {
            kind: ChargeFlagKind::ServiceRemoved,
            value: to_f64(nominal),
        });
    }
    if discount > Decimal::ZERO {
        flags.push(ChargeFlag {
            kind: ChargeFlagKind::DiscountApplied,
            value: to_f64(discount),
        });
    }

    let (waiter_breakdown, main_waiter) =
        waiter_breakdown(&items, order.waiter.as_deref(), total, minibar_exempt);
    PlannedCharge {
        charge_type: ChargeType::Restaurant,
        items,
        subtotal,
        service_fee,
        discount,
        flags,
        waiter: main_waiter.or_else(|| order.waiter.clone()),
        waiter_breakdown,
        total,
    }
}

fn minibar_charge(items: Vec<OrderItem>, budget: &mut Decimal) -> PlannedCharge {
    let subtotal = round_dp(items.iter().map(line_total).sum());
    let discount = take_discount(budget, subtotal);
    let mut flags = Vec::new();
    if discount > Decimal::ZERO {
        flags.push(ChargeFlag {
            kind: ChargeFlagKind::DiscountApplied,
            value: to_f64(discount),
        });
    }
    PlannedCharge {
        charge_type: ChargeType::Minibar,
        items,
        subtotal,
        service_fee: Decimal::ZERO,
        discount,
        flags,
        waiter: None,
        waiter_breakdown: BTreeMap::new(),
        total: subtotal - discount,
    }
}

/// At most one restaurant and one minibar charge, restaurant first
pub fn plan_charges(order: &TableOrder, mode: TransferMode) -> Vec<PlannedCharge> {
    let mut budget = crate::money::to_decimal(order.discount_amount).max(Decimal::ZERO);
    let mut charges = Vec::with_capacity(2);

    match mode {
        TransferMode::Split => {
            let (minibar, restaurant): (Vec<OrderItem>, Vec<OrderItem>) =
                order.items.iter().cloned().partition(OrderItem::is_minibar);
            if !restaurant.is_empty() {
                charges.push(restaurant_charge(order, restaurant, &mut budget, false));
            }
            if !minibar.is_empty() {
                charges.push(minibar_charge(minibar, &mut budget));
            }
        }
        TransferMode::Combined => {
            if !order.items.is_empty() {
                charges.push(restaurant_charge(order, order.items.clone(), &mut budget, true));
            }
        }
    }
    charges
}

/// Direct minibar launch: no fee, no discount, no commission
pub fn plan_minibar(items: Vec<OrderItem>) -> PlannedCharge {
    minibar_charge(items, &mut Decimal::ZERO)
}

/// Amount due for a table paid at the restaurant (minibar items pay no fee)
pub fn bill_totals(order: &TableOrder) -> BillTotals {
    let subtotal = round_dp(order.items.iter().map(line_total).sum());
    let service_fee = if order.service_fee_removed {
        Decimal::ZERO
    } else {
        nominal_fee(&order.items, true)
    };
    let mut budget = crate::money::to_decimal(order.discount_amount).max(Decimal::ZERO);
    let discount = take_discount(&mut budget, subtotal + service_fee);
    BillTotals {
        subtotal,
        service_fee,
        discount,
        total: subtotal + service_fee - discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::to_decimal;

    fn create_test_order(items: Vec<OrderItem>) -> TableOrder {
        TableOrder {
            items,
            waiter: Some("Carlos".to_string()),
            ..TableOrder::default()
        }
    }

    #[test]
    fn test_fee_removed_and_discount_on_restaurant() {
        let mut order = create_test_order(vec![
            OrderItem::new("Pizza", 40.0, 1.0).with_waiter("A"),
            OrderItem::new("Água", 5.0, 1.0).with_waiter("B"),
        ]);
        order.service_fee_removed = true;
        order.discount_amount = 10.0;

        let charges = plan_charges(&order, TransferMode::Split);
        assert_eq!(charges.len(), 1);
        let charge = &charges[0];
        assert_eq!(charge.service_fee, Decimal::ZERO);
        assert_eq!(charge.discount, to_decimal(10.0));
        assert_eq!(charge.total, to_decimal(35.0));
        let kinds: Vec<_> = charge.flags.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![ChargeFlagKind::ServiceRemoved, ChargeFlagKind::DiscountApplied]);
        // the fee that would have been charged
        assert_eq!(charge.flags[0].value, 4.5);

        assert_eq!(charge.waiter_breakdown["A"], 31.11);
        assert_eq!(charge.waiter_breakdown["B"], 3.89);
        assert_eq!(charge.waiter.as_deref(), Some("A"));
    }

    #[test]
    fn test_fee_excludes_covers_and_exempt_items() {
        let mut exempt = OrderItem::new("Vinho", 100.0, 1.0);
        exempt.service_fee_exempt = true;
        let order = create_test_order(vec![
            OrderItem::new("Prato", 50.0, 2.0),
            OrderItem::new("Couvert Artistico", 15.0, 2.0),
            exempt,
        ]);
        let charge = &plan_charges(&order, TransferMode::Split)[0];
        assert_eq!(charge.subtotal, to_decimal(230.0));
        assert_eq!(charge.service_fee, to_decimal(10.0));
        assert_eq!(charge.total, to_decimal(240.0));
        // cover is out of the commission base
        assert_eq!(charge.waiter_breakdown.len(), 1);
        let carlos = charge.waiter_breakdown["Carlos"];
        assert_eq!(carlos, 208.7);
    }

    #[test]
    fn test_split_mode_separates_minibar_and_shares_discount() {
        let mut order = create_test_order(vec![
            OrderItem::new("Suco", 10.0, 1.0),
            OrderItem::new("Chocolate", 8.0, 1.0).with_source("minibar"),
        ]);
        order.discount_amount = 15.0;

        let charges = plan_charges(&order, TransferMode::Split);
        assert_eq!(charges.len(), 2);
        let (restaurant, minibar) = (&charges[0], &charges[1]);
        assert_eq!(restaurant.service_fee, to_decimal(1.0));
        // restaurant consumes 11, minibar gets the remaining 4
        assert_eq!(restaurant.discount, to_decimal(11.0));
        assert_eq!(restaurant.total, Decimal::ZERO);
        assert_eq!(minibar.charge_type, ChargeType::Minibar);
        assert_eq!(minibar.service_fee, Decimal::ZERO);
        assert_eq!(minibar.discount, to_decimal(4.0));
        assert_eq!(minibar.total, to_decimal(4.0));
        assert!(minibar.waiter_breakdown.is_empty());
    }

    #[test]
    fn test_combined_mode_minibar_pays_no_fee_or_commission() {
        let order = create_test_order(vec![
            OrderItem::new("Prato", 50.0, 1.0).with_waiter("A"),
            OrderItem::new("Cerveja", 10.0, 1.0).with_category("Frigobar"),
        ]);
        let charges = plan_charges(&order, TransferMode::Combined);
        assert_eq!(charges.len(), 1);
        let charge = &charges[0];
        assert_eq!(charge.charge_type, ChargeType::Restaurant);
        assert_eq!(charge.service_fee, to_decimal(5.0));
        assert_eq!(charge.total, to_decimal(65.0));
        // 65 × 50/60
        assert_eq!(charge.waiter_breakdown["A"], 54.17);
    }

    #[test]
    fn test_default_waiter_when_none_named() {
        let order = TableOrder {
            items: vec![OrderItem::new("Prato", 20.0, 1.0)],
            ..TableOrder::default()
        };
        let charge = &plan_charges(&order, TransferMode::Split)[0];
        assert!(charge.waiter_breakdown.contains_key(DEFAULT_WAITER));
        assert_eq!(charge.waiter.as_deref(), Some(DEFAULT_WAITER));
    }

    #[test]
    fn test_bill_totals() {
        let mut order = create_test_order(vec![OrderItem::new("Prato", 80.0, 1.0)]);
        order.discount_amount = 8.0;
        let totals = bill_totals(&order);
        assert_eq!(totals.service_fee, to_decimal(8.0));
        assert_eq!(totals.total, to_decimal(80.0));
    }
}
