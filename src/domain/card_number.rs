//! Card numbers
//!
//! Luhn checksum validation, the accepted issuer-prefix table, and
//! generation of fresh numbers that satisfy both checks. All pure
//! computation, no I/O.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Card numbers are fixed at 16 digits.
pub const CARD_NUMBER_LEN: usize = 16;

/// Issuing networks accepted by the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Issuer {
    Visa,
    Mastercard,
    Mir,
    Maestro,
}

impl Issuer {
    /// A representative IIN prefix used when generating numbers for this
    /// network. Any prefix accepted by [`issuer_of`] works here.
    fn generation_prefix(&self) -> &'static str {
        match self {
            Issuer::Visa => "4276",
            Issuer::Mastercard => "5469",
            Issuer::Mir => "2202",
            Issuer::Maestro => "5610",
        }
    }
}

/// Errors produced when parsing a card number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardNumberError {
    #[error("Card number must be {CARD_NUMBER_LEN} digits")]
    BadLength,

    #[error("Card number must contain only digits")]
    NonDigit,

    #[error("Card number checksum is invalid")]
    BadChecksum,

    #[error("Card number prefix does not match an accepted issuer")]
    UnknownIssuer,
}

/// Luhn mod-10 sum over a digit string: double every second digit from the
/// right, subtracting 9 when the doubled value exceeds 9.
fn luhn_sum(digits: &str) -> u32 {
    digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let mut value = u32::from(b - b'0');
            if i % 2 == 1 {
                value *= 2;
                if value > 9 {
                    value -= 9;
                }
            }
            value
        })
        .sum()
}

/// Check the Luhn checksum of a digit string.
pub fn luhn_valid(digits: &str) -> bool {
    luhn_sum(digits) % 10 == 0
}

/// Resolve the issuing network from the number's leading digits, or `None`
/// when the prefix is not in the accepted table.
pub fn issuer_of(digits: &str) -> Option<Issuer> {
    if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // First digit decides Visa outright; the rest needs 2- or 4-digit ranges.
    if digits.starts_with('4') {
        return Some(Issuer::Visa);
    }

    let four: u32 = digits[..4].parse().ok()?;
    let two = four / 100;

    match () {
        _ if (2200..=2204).contains(&four) => Some(Issuer::Mir),
        _ if (2221..=2720).contains(&four) => Some(Issuer::Mastercard),
        _ if (51..=55).contains(&two) => Some(Issuer::Mastercard),
        _ if two == 50 || (56..=58).contains(&two) => Some(Issuer::Maestro),
        _ => None,
    }
}

/// Validate a card number: 16 digits, Luhn-valid, accepted issuer prefix.
///
/// Returns `true` only when every check passes.
pub fn check_card_emitter(number: &str) -> bool {
    number.len() == CARD_NUMBER_LEN
        && number.bytes().all(|b| b.is_ascii_digit())
        && luhn_valid(number)
        && issuer_of(number).is_some()
}

/// A card number that has passed [`check_card_emitter`].
///
/// The inner string is immutable, so the invariant established at parse
/// time holds for the value's whole life.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    /// The issuing network for this number.
    pub fn issuer(&self) -> Issuer {
        // Validated at construction, the prefix is always in the table.
        issuer_of(&self.0).unwrap_or(Issuer::Visa)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate a fresh number for `issuer`: representative prefix, random
    /// account digits, Luhn check digit appended. Every generated number
    /// satisfies [`check_card_emitter`].
    pub fn generate<R: Rng + ?Sized>(issuer: Issuer, rng: &mut R) -> Self {
        let mut digits = String::with_capacity(CARD_NUMBER_LEN);
        digits.push_str(issuer.generation_prefix());
        while digits.len() < CARD_NUMBER_LEN - 1 {
            digits.push(char::from(b'0' + rng.gen_range(0..10)));
        }

        // Check digit occupies the undoubled rightmost position: sum the
        // body with a placeholder zero, then top the total up to a multiple
        // of ten.
        digits.push('0');
        let check = (10 - luhn_sum(&digits) % 10) % 10;
        digits.pop();
        digits.push(char::from(b'0' + check as u8));

        debug_assert!(check_card_emitter(&digits));
        Self(digits)
    }
}

impl FromStr for CardNumber {
    type Err = CardNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CARD_NUMBER_LEN {
            return Err(CardNumberError::BadLength);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CardNumberError::NonDigit);
        }
        if !luhn_valid(s) {
            return Err(CardNumberError::BadChecksum);
        }
        if issuer_of(s).is_none() {
            return Err(CardNumberError::UnknownIssuer);
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for CardNumber {
    type Error = CardNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CardNumber> for String {
    fn from(number: CardNumber) -> Self {
        number.0
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_known_valid_number() {
        assert!(check_card_emitter("4532015112830366"));
    }

    #[test]
    fn test_single_digit_alteration_breaks_checksum() {
        assert!(!check_card_emitter("4532015112830367"));
    }

    #[test]
    fn test_unrecognized_prefix_rejected() {
        // Luhn-valid but the 9999 prefix is not in the issuer table
        let number = "9999999999999995";
        assert!(luhn_valid(number));
        assert!(!check_card_emitter(number));
    }

    #[test]
    fn test_length_and_charset() {
        assert!(!check_card_emitter("453201511283036"));
        assert!(!check_card_emitter("45320151128303666"));
        assert!(!check_card_emitter("4532o15112830366"));
        assert!(!check_card_emitter(""));
    }

    #[test]
    fn test_issuer_table() {
        assert_eq!(issuer_of("4532015112830366"), Some(Issuer::Visa));
        assert_eq!(issuer_of("5469000000000000"), Some(Issuer::Mastercard));
        assert_eq!(issuer_of("2221000000000000"), Some(Issuer::Mastercard));
        assert_eq!(issuer_of("2720000000000000"), Some(Issuer::Mastercard));
        assert_eq!(issuer_of("2202000000000000"), Some(Issuer::Mir));
        assert_eq!(issuer_of("5010000000000000"), Some(Issuer::Maestro));
        assert_eq!(issuer_of("5810000000000000"), Some(Issuer::Maestro));
        assert_eq!(issuer_of("6011000000000000"), None);
        assert_eq!(issuer_of("2721000000000000"), None);
    }

    #[test]
    fn test_parse_roundtrip() {
        let number: CardNumber = "4532015112830366".parse().unwrap();
        assert_eq!(number.as_str(), "4532015112830366");
        assert_eq!(number.issuer(), Issuer::Visa);

        let err: Result<CardNumber, _> = "4532015112830367".parse();
        assert_eq!(err, Err(CardNumberError::BadChecksum));
    }

    #[test]
    fn test_generated_numbers_pass_checker() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for issuer in [
            Issuer::Visa,
            Issuer::Mastercard,
            Issuer::Mir,
            Issuer::Maestro,
        ] {
            for _ in 0..200 {
                let number = CardNumber::generate(issuer, &mut rng);
                assert!(
                    check_card_emitter(number.as_str()),
                    "generated number failed checker: {}",
                    number
                );
                assert_eq!(number.issuer(), issuer);
            }
        }
    }
}
