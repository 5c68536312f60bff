//! Postal-code and tax-id validation.
//!
//! All functions here are pure and total: malformed input yields `false`
//! (or an empty string), never an error.

/// Number of digits in a postal code (CEP).
pub const POSTAL_CODE_LEN: usize = 8;

/// Number of digits in a national tax identifier (CPF).
pub const TAX_ID_LEN: usize = 11;

/// Strips every non-digit character. Idempotent.
pub fn normalize_digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Returns true if `s` contains exactly eight digits once separators are removed.
pub fn is_valid_postal_code(s: &str) -> bool {
    normalize_digits(s).len() == POSTAL_CODE_LEN
}

/// Validates a tax id with the two-pass mod-11 check-digit algorithm.
///
/// Sequences of a single repeated digit pass the arithmetic but are
/// rejected as known-invalid.
pub fn is_valid_tax_id(s: &str) -> bool {
    let digits: Vec<u32> = normalize_digits(s)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != TAX_ID_LEN {
        return false;
    }
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Weighted mod-11 check digit over `digits`, weights running from
/// `len + 1` down to 2.
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();
    let d = 11 - (sum % 11);
    if d >= 10 { 0 } else { d }
}

/// Formats a postal code for display as `NNNNN-NNN`.
///
/// Extra digits beyond eight are dropped; partial input is formatted
/// progressively so it can be applied while the customer types.
pub fn mask_postal_code(s: &str) -> String {
    let digits: String = normalize_digits(s).chars().take(POSTAL_CODE_LEN).collect();
    if digits.len() <= 5 {
        return digits;
    }
    format!("{}-{}", &digits[..5], &digits[5..])
}

/// Formats a tax id for display as `NNN.NNN.NNN-NN`, progressively.
pub fn mask_tax_id(s: &str) -> String {
    let d: String = normalize_digits(s).chars().take(TAX_ID_LEN).collect();
    match d.len() {
        0..=3 => d,
        4..=6 => format!("{}.{}", &d[..3], &d[3..]),
        7..=9 => format!("{}.{}.{}", &d[..3], &d[3..6], &d[6..]),
        _ => format!("{}.{}.{}-{}", &d[..3], &d[3..6], &d[6..9], &d[9..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_digits_strips_separators() {
        assert_eq!(normalize_digits("01310-100"), "01310100");
        assert_eq!(normalize_digits("529.982.247-25"), "52998224725");
        assert_eq!(normalize_digits("abc"), "");
    }

    #[test]
    fn normalize_digits_is_idempotent() {
        let once = normalize_digits(" 12a-3.4 ");
        assert_eq!(normalize_digits(&once), once);
    }

    #[test]
    fn postal_code_requires_eight_digits() {
        assert!(is_valid_postal_code("01310-100"));
        assert!(is_valid_postal_code("01310100"));
        assert!(!is_valid_postal_code("123"));
        assert!(!is_valid_postal_code("01310-1000"));
        assert!(!is_valid_postal_code(""));
    }

    #[test]
    fn tax_id_accepts_known_valid_ids() {
        for id in ["529.982.247-25", "11144477735", "123.456.789-09", "39053344705"] {
            assert!(is_valid_tax_id(id), "rejected {id}");
        }
    }

    #[test]
    fn tax_id_rejects_wrong_length() {
        assert!(!is_valid_tax_id("5299822472"));
        assert!(!is_valid_tax_id("529982247250"));
        assert!(!is_valid_tax_id(""));
    }

    #[test]
    fn tax_id_rejects_repeated_digits() {
        for d in 0..=9 {
            let id = d.to_string().repeat(11);
            assert!(!is_valid_tax_id(&id), "accepted {id}");
        }
    }

    #[test]
    fn tax_id_rejects_wrong_check_digits() {
        assert!(!is_valid_tax_id("52998224726"));
        assert!(!is_valid_tax_id("52998224715"));
    }

    #[test]
    fn tax_id_rejects_adjacent_transpositions() {
        for valid in ["52998224725", "11144477735"] {
            let chars: Vec<char> = valid.chars().collect();
            for i in 0..chars.len() - 1 {
                if chars[i] == chars[i + 1] {
                    continue;
                }
                let mut swapped = chars.clone();
                swapped.swap(i, i + 1);
                let swapped: String = swapped.into_iter().collect();
                assert!(!is_valid_tax_id(&swapped), "accepted {swapped}");
            }
        }
    }

    #[test]
    fn masks_format_progressively() {
        assert_eq!(mask_postal_code("01310"), "01310");
        assert_eq!(mask_postal_code("01310100"), "01310-100");
        assert_eq!(mask_postal_code("0131010099"), "01310-100");

        assert_eq!(mask_tax_id("529"), "529");
        assert_eq!(mask_tax_id("52998"), "529.98");
        assert_eq!(mask_tax_id("52998224"), "529.982.24");
        assert_eq!(mask_tax_id("52998224725"), "529.982.247-25");
    }
}
