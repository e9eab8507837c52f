//! Spell out rupee amounts the way Indian invoices print them
//! ("Rupees One Lakh Twenty Thousand Only").

use rust_decimal::prelude::*;

use crate::calc::round_money;

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const CRORE: u128 = 10_000_000;
const LAKH: u128 = 100_000;

fn below_hundred(n: u128) -> String {
    let n = n as usize;
    if n < 20 {
        return ONES[n].to_string();
    }
    match n % 10 {
        0 => TENS[n / 10].to_string(),
        unit => format!("{} {}", TENS[n / 10], ONES[unit]),
    }
}

fn spell(n: u128) -> String {
    let mut parts = Vec::new();

    let crores = n / CRORE;
    if crores > 0 {
        // Anything above 99 crore is read as a count of crores.
        parts.push(format!("{} Crore", spell(crores)));
    }

    let rest = n % CRORE;
    let lakhs = rest / LAKH;
    if lakhs > 0 {
        parts.push(format!("{} Lakh", below_hundred(lakhs)));
    }
    let thousands = (rest / 1000) % 100;
    if thousands > 0 {
        parts.push(format!("{} Thousand", below_hundred(thousands)));
    }
    let hundreds = (rest / 100) % 10;
    if hundreds > 0 {
        parts.push(format!("{} Hundred", ONES[hundreds as usize]));
    }
    let tail = rest % 100;
    if tail > 0 {
        parts.push(below_hundred(tail));
    }

    parts.join(" ")
}

/// Spell a whole number using the Indian system (thousand, lakh, crore).
pub fn number_to_words(n: u128) -> String {
    if n == 0 {
        return "Zero".to_string();
    }
    spell(n)
}

/// Integer part of a non-negative amount. Every Decimal mantissa fits in
/// 96 bits, so no value is out of range.
fn integer_part(value: Decimal) -> u128 {
    value.trunc().normalize().mantissa().unsigned_abs()
}

/// Amount in words as printed under an invoice total. Rounds to paise first.
pub fn amount_in_words(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "Minus "
    } else {
        ""
    };
    let rounded = rounded.abs();

    let whole = rounded.trunc();
    let rupees = integer_part(whole);
    let paise = integer_part((rounded - whole) * Decimal::ONE_HUNDRED);

    if paise == 0 {
        format!("{}Rupees {} Only", sign, number_to_words(rupees))
    } else {
        format!(
            "{}Rupees {} and {} Paise Only",
            sign,
            number_to_words(rupees),
            number_to_words(paise)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(number_to_words(0), "Zero");
        assert_eq!(number_to_words(100), "One Hundred");
        assert_eq!(number_to_words(1000), "One Thousand");
        assert_eq!(number_to_words(100000), "One Lakh");
        assert_eq!(number_to_words(10000000), "One Crore");
    }

    #[test]
    fn test_mixed_numbers() {
        assert_eq!(number_to_words(15), "Fifteen");
        assert_eq!(number_to_words(40), "Forty");
        assert_eq!(number_to_words(99), "Ninety Nine");
        assert_eq!(number_to_words(101), "One Hundred One");
        assert_eq!(number_to_words(1062), "One Thousand Sixty Two");
        assert_eq!(
            number_to_words(1234567),
            "Twelve Lakh Thirty Four Thousand Five Hundred Sixty Seven"
        );
        assert_eq!(
            number_to_words(99999999),
            "Nine Crore Ninety Nine Lakh Ninety Nine Thousand Nine Hundred Ninety Nine"
        );
        assert_eq!(number_to_words(1_000_000_000), "One Hundred Crore");
    }

    #[test]
    fn test_amount_in_words() {
        assert_eq!(amount_in_words(dec("0")), "Rupees Zero Only");
        assert_eq!(amount_in_words(dec("1062")), "Rupees One Thousand Sixty Two Only");
        assert_eq!(
            amount_in_words(dec("100000.50")),
            "Rupees One Lakh and Fifty Paise Only"
        );
        assert_eq!(amount_in_words(dec("0.07")), "Rupees Zero and Seven Paise Only");
    }

    #[test]
    fn test_amounts_beyond_u64_are_spelled() {
        assert_eq!(
            amount_in_words(dec("100000000000000000000")),
            "Rupees Ten Lakh Crore Crore Only"
        );
        assert!(amount_in_words(Decimal::MAX).starts_with("Rupees Seven"));
    }

    #[test]
    fn test_amount_in_words_rounds_to_paise() {
        assert_eq!(amount_in_words(dec("10.005")), "Rupees Ten and One Paise Only");
        assert_eq!(amount_in_words(dec("99.999")), "Rupees One Hundred Only");
    }

    #[test]
    fn test_stable_on_rounded_amount() {
        for raw in ["0", "10.005", "1234.5678", "100000", "9999999.994"] {
            let amount = dec(raw);
            assert_eq!(amount_in_words(amount), amount_in_words(round_money(amount)));
        }
    }
}
