//! Property tests for totals and identity validation.

use domain::{
    CartLine, Money, compute_totals, is_valid_postal_code, is_valid_tax_id, mask_postal_code,
    normalize_digits,
};
use proptest::prelude::*;

fn cart_line_strategy() -> impl Strategy<Value = CartLine> {
    (0u8..5, 0i64..100_000, 1u32..20).prop_map(|(merchant, cents, quantity)| {
        CartLine::new(
            format!("item-{cents}"),
            format!("store-{merchant}"),
            Money::from_cents(cents),
            quantity,
        )
        .unwrap()
    })
}

/// Appends both mod-11 check digits to nine base digits.
fn with_check_digits(base: &[u32]) -> String {
    let mut digits = base.to_vec();
    for len in [9u32, 10] {
        let sum: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len + 1 - i as u32))
            .sum();
        let d = 11 - sum % 11;
        digits.push(if d >= 10 { 0 } else { d });
    }
    digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn grand_total_is_sum_of_parts(
        lines in prop::collection::vec(cart_line_strategy(), 0..12),
        per_store in 0i64..10_000,
        service in 0i64..1_000,
    ) {
        let totals = compute_totals(&lines, Money::from_cents(per_store), Money::from_cents(service));

        prop_assert_eq!(
            totals.grand_total,
            totals.subtotal + totals.delivery_fee + totals.service_fee
        );
        prop_assert!(!totals.grand_total.is_negative());
    }

    #[test]
    fn delivery_fee_scales_with_distinct_merchants(
        lines in prop::collection::vec(cart_line_strategy(), 1..12),
        per_store in 1i64..10_000,
    ) {
        let totals = compute_totals(&lines, Money::from_cents(per_store), Money::zero());

        let mut merchants: Vec<_> = lines.iter().map(|l| l.merchant_id.clone()).collect();
        merchants.sort();
        merchants.dedup();

        prop_assert_eq!(totals.store_count, merchants.len());
        prop_assert_eq!(totals.delivery_fee.cents(), per_store * merchants.len() as i64);
    }

    #[test]
    fn generated_tax_ids_are_accepted(base in prop::collection::vec(0u32..10, 9)) {
        prop_assume!(base.iter().any(|d| *d != base[0]));
        let id = with_check_digits(&base);
        prop_assert!(is_valid_tax_id(&id), "rejected {}", id);
    }

    #[test]
    fn wrong_final_check_digit_is_rejected(
        base in prop::collection::vec(0u32..10, 9),
        bump in 1u32..10,
    ) {
        let id = with_check_digits(&base);
        let last = id.chars().last().unwrap().to_digit(10).unwrap();
        let wrong = format!("{}{}", &id[..10], (last + bump) % 10);
        prop_assert!(!is_valid_tax_id(&wrong), "accepted {}", wrong);
    }

    #[test]
    fn normalize_digits_is_idempotent(s in ".{0,40}") {
        let once = normalize_digits(&s);
        prop_assert_eq!(normalize_digits(&once), once);
    }

    #[test]
    fn masked_postal_codes_stay_valid(digits in "[0-9]{8}") {
        prop_assert!(is_valid_postal_code(&mask_postal_code(&digits)));
    }
}
