use crate::error::BotError;
use crate::Result;
use rust_decimal::Decimal;

/// Floor `quantity` to a whole multiple of `step`
///
/// The result carries exactly as many fractional digits as the normalized
/// step, so `0.00001000` and `0.00001` both yield five decimals.
pub fn floor_to_step(quantity: Decimal, step: Decimal) -> Result<Decimal> {
    if step <= Decimal::ZERO {
        return Err(BotError::InvalidConfig(format!(
            "step size must be positive, got {}",
            step
        )));
    }
    if quantity <= Decimal::ZERO {
        return Ok(Decimal::new(0, step.normalize().scale()));
    }

    let step = step.normalize();
    let steps = quantity
        .checked_div(step)
        .ok_or_else(|| BotError::Unclassified(format!("{} / {} overflows", quantity, step)))?
        .floor();
    let mut floored = steps
        .checked_mul(step)
        .ok_or_else(|| BotError::Unclassified(format!("{} * {} overflows", steps, step)))?;
    floored.rescale(step.scale());

    Ok(floored)
}

/// Floor `quantity` to `step` and render it as an exact decimal string
///
/// `quantize(0.123456, 0.0001) == "0.1234"`
pub fn quantize(quantity: Decimal, step: Decimal) -> Result<String> {
    Ok(floor_to_step(quantity, step)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_quantize_floors() {
        assert_eq!(quantize(d("0.123456"), d("0.0001")).unwrap(), "0.1234");
        assert_eq!(quantize(d("0.99999"), d("0.001")).unwrap(), "0.999");
    }

    #[test]
    fn test_quantize_keeps_step_precision() {
        assert_eq!(quantize(d("2"), d("0.001")).unwrap(), "2.000");
        assert_eq!(quantize(d("0.5"), d("0.0001")).unwrap(), "0.5000");
    }

    #[test]
    fn test_quantize_exchange_padded_step() {
        // Binance reports steps with trailing zeros
        assert_eq!(quantize(d("0.0123456789"), d("0.00001000")).unwrap(), "0.01234");
    }

    #[test]
    fn test_quantize_integer_step() {
        assert_eq!(quantize(d("17.9"), d("1.00000000")).unwrap(), "17");
        assert_eq!(quantize(d("17.9"), d("5")).unwrap(), "15");
    }

    #[test]
    fn test_quantize_non_decimal_step() {
        assert_eq!(quantize(d("1.37"), d("0.25")).unwrap(), "1.25");
    }

    #[test]
    fn test_quantize_exact_multiple() {
        assert_eq!(quantize(d("0.0003"), d("0.0001")).unwrap(), "0.0003");
    }

    #[test]
    fn test_quantize_below_step() {
        assert_eq!(quantize(d("0.00009999"), d("0.0001")).unwrap(), "0.0000");
        assert_eq!(quantize(Decimal::ZERO, d("0.01")).unwrap(), "0.00");
    }

    #[test]
    fn test_quantize_is_idempotent() {
        let step = d("0.0001");
        for raw in ["0.123456", "1.99999", "42", "0.00015", "12345.678901"] {
            let once = quantize(d(raw), step).unwrap();
            let twice = quantize(d(&once), step).unwrap();
            assert_eq!(once, twice, "quantize not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_quantize_rejects_non_positive_step() {
        assert!(quantize(d("1"), Decimal::ZERO).is_err());
        assert!(quantize(d("1"), d("-0.1")).is_err());
    }
}
