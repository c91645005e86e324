//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored as `f64` in the JSON files; every sum, split and
//! comparison is done in `Decimal` and converted back rounded to cents.

use rust_decimal::prelude::*;
use shared::models::OrderItem;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_dp(value).to_f64().unwrap_or_default()
}

#[inline]
pub fn round_dp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Round an f64 amount to cents
#[inline]
pub fn round2(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Equal within [`MONEY_TOLERANCE`]
#[inline]
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}

/// Sum f64 amounts without accumulating float error
pub fn sum<I: IntoIterator<Item = f64>>(amounts: I) -> Decimal {
    amounts.into_iter().map(to_decimal).sum()
}

/// `qty * (price + Σ complement.price)`
pub fn line_total(item: &OrderItem) -> Decimal {
    let complements: Decimal = item.complements.iter().map(|c| to_decimal(c.price)).sum();
    to_decimal(item.qty) * (to_decimal(item.price) + complements)
}

pub fn items_total(items: &[OrderItem]) -> Decimal {
    items.iter().map(line_total).sum()
}

/// Validate an amount coming from the web layer
pub fn require_finite(value: f64, field_name: &str) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{} must be a finite number, got {}", field_name, value));
    }
    Ok(())
}

/// Validate an item before it enters an order
pub fn validate_item(item: &OrderItem) -> Result<(), String> {
    require_finite(item.price, "price")?;
    require_finite(item.qty, "qty")?;
    if item.price < 0.0 {
        return Err(format!("price must be non-negative, got {}", item.price));
    }
    if item.qty <= 0.0 {
        return Err(format!("qty must be positive, got {}", item.qty));
    }
    for c in &item.complements {
        require_finite(c.price, "complement price")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Complement;

    #[test]
    fn test_line_total_includes_complements() {
        let mut item = OrderItem::new("Pizza", 40.0, 2.0);
        item.complements.push(Complement {
            name: "Borda".to_string(),
            price: 5.5,
            extra: Default::default(),
        });
        assert_eq!(to_f64(line_total(&item)), 91.0);
    }

    #[test]
    fn test_sum_avoids_float_drift() {
        let total = sum([0.1, 0.2, 0.3]);
        assert_eq!(to_f64(total), 0.6);
        assert!(approx_eq(total, to_decimal(0.6)));
        assert!(!approx_eq(total, to_decimal(0.62)));
    }

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(10.0), 10.0);
    }

    #[test]
    fn test_validate_item_rejects_bad_values() {
        assert!(validate_item(&OrderItem::new("A", 1.0, 1.0)).is_ok());
        assert!(validate_item(&OrderItem::new("A", -1.0, 1.0)).is_err());
        assert!(validate_item(&OrderItem::new("A", 1.0, 0.0)).is_err());
        assert!(validate_item(&OrderItem::new("A", f64::NAN, 1.0)).is_err());
    }
}
