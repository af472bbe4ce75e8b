use rust_decimal::Decimal;

/// Calculate Simple Moving Average (SMA) over the last `period` prices
///
/// Returns `None` when fewer than `period` prices exist (or `period` is zero).
/// Pass `&prices[..prices.len() - 1]` to get the previous-bar value.
pub fn calculate_sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: Decimal = prices.iter().rev().take(period).sum();
    Some(sum / Decimal::from(period))
}
