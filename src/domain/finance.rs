//! Sale arithmetic

use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round to currency precision (two decimal places, half away from zero).
pub fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Values derived from the price fields of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Financials {
    pub profit: Decimal,
    pub commission_amount: Decimal,
}

/// `profit = sale - cost`, `commission = profit * rate / 100`.
pub fn sale_financials(sale_price: Decimal, cost_price: Decimal, commission_rate: Decimal) -> Financials {
    let profit = money(sale_price - cost_price);
    Financials {
        profit,
        commission_amount: money(profit * commission_rate / HUNDRED),
    }
}

/// `part / whole * 100`, or zero when there is nothing to divide by.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        money(part / whole * HUNDRED)
    } else {
        Decimal::ZERO
    }
}

/// Average of `total` over `count` items, zero for an empty set.
pub fn average(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        money(total / Decimal::from(count))
    }
}

/// `RWF 1,234,567.50`
pub fn format_rwf(amount: Decimal) -> String {
    let amount = money(amount);
    let negative = amount.is_sign_negative() && !amount.is_zero();
    let text = format!("{:.2}", amount.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!(
        "RWF {}{}.{}",
        if negative { "-" } else { "" },
        grouped,
        fraction
    )
}
