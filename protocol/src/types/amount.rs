//! Native-currency amounts.
//!
//! Payments are counted in wei-like base units, 10^18 per currency unit.
//! `u128` is wide enough for any realistic payment; arithmetic on it is
//! still checked because money.

/// Native-currency amount in base units.
pub type Wei = u128;

/// Decimal places of the native currency.
pub const NATIVE_DECIMALS: u32 = 18;

/// Base units per whole currency unit.
pub const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;

/// Errors from [`parse_ether`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("invalid amount: {0}")]
    Invalid(String),

    #[error("too many decimal places: at most {NATIVE_DECIMALS} allowed")]
    TooPrecise,

    #[error("amount overflows u128")]
    Overflow,
}

/// Parses a decimal currency string like `"0.01"` or `"1"` into base units.
pub fn parse_ether(s: &str) -> Result<Wei, AmountError> {
    let s = s.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(AmountError::Invalid(s.to_string()));
    }
    if frac.len() > NATIVE_DECIMALS as usize {
        return Err(AmountError::TooPrecise);
    }
    let digits_ok = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !digits_ok(whole) || !digits_ok(frac) {
        return Err(AmountError::Invalid(s.to_string()));
    }

    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<Wei>()
            .map_err(|_| AmountError::Overflow)?
            .checked_mul(WEI_PER_ETHER)
            .ok_or(AmountError::Overflow)?
    };

    let frac_wei = if frac.is_empty() {
        0
    } else {
        let scale = 10u128.pow(NATIVE_DECIMALS - frac.len() as u32);
        frac.parse::<Wei>()
            .map_err(|_| AmountError::Invalid(s.to_string()))?
            * scale
    };

    whole_wei.checked_add(frac_wei).ok_or(AmountError::Overflow)
}

/// Formats base units as a decimal currency string without trailing zeros.
pub fn format_ether(wei: Wei) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:018}", frac);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional() {
        assert_eq!(parse_ether("1").unwrap(), WEI_PER_ETHER);
        assert_eq!(parse_ether("0.01").unwrap(), WEI_PER_ETHER / 100);
        assert_eq!(parse_ether(".5").unwrap(), WEI_PER_ETHER / 2);
        assert_eq!(parse_ether("0.000000000000000001").unwrap(), 1);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_ether("").is_err());
        assert!(parse_ether("abc").is_err());
        assert!(parse_ether("1.2.3").is_err());
        assert_eq!(
            parse_ether("0.0000000000000000001"),
            Err(AmountError::TooPrecise)
        );
    }

    #[test]
    fn formats_without_trailing_zeros() {
        assert_eq!(format_ether(WEI_PER_ETHER), "1");
        assert_eq!(format_ether(WEI_PER_ETHER / 100), "0.01");
        assert_eq!(format_ether(0), "0");
        assert_eq!(format_ether(WEI_PER_ETHER + WEI_PER_ETHER / 10), "1.1");
    }
}
