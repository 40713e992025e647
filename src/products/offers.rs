use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::ApiError;

/// Computed offer, ready to persist and echo back to the seller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferQuote {
    pub original_offer_price: Decimal,
    pub offer_price_in_uyu: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub start_offer_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_offer_date: OffsetDateTime,
    pub discount_percentage: Decimal,
}

/// Validates an offer against the product's current UYU price.
///
/// The offer must be strictly cheaper than the product, and the window must
/// be well-formed and lie entirely in the future. Discounts are computed in
/// UYU so a USD offer on a USD product still discounts consistently.
pub fn quote_offer(
    price_in_uyu: Decimal,
    offer_price: Decimal,
    offer_price_in_uyu: Decimal,
    start: OffsetDateTime,
    end: OffsetDateTime,
    now: OffsetDateTime,
) -> Result<OfferQuote, ApiError> {
    if offer_price_in_uyu <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "Offer price must be greater than zero".into(),
        ));
    }
    if offer_price_in_uyu >= price_in_uyu {
        return Err(ApiError::Validation(
            "The discount price cannot be higher than the original price".into(),
        ));
    }
    if start >= end {
        return Err(ApiError::Validation(
            "The start offer date cannot be equal to or after the end offer date".into(),
        ));
    }
    if start < now || end < now {
        return Err(ApiError::Validation(
            "The start or end offer date cannot be before this moment".into(),
        ));
    }

    let discount = (price_in_uyu - offer_price_in_uyu) / price_in_uyu * Decimal::from(100);

    Ok(OfferQuote {
        original_offer_price: offer_price.round_dp(2),
        offer_price_in_uyu: offer_price_in_uyu.round_dp(2),
        start_offer_date: start,
        end_offer_date: end,
        discount_percentage: discount.round_dp(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::Duration;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[test]
    fn twenty_percent_discount() {
        let quote = quote_offer(
            dec!(100),
            dec!(80),
            dec!(80),
            now(),
            now() + Duration::days(3),
            now(),
        )
        .unwrap();
        assert_eq!(quote.discount_percentage, dec!(20.00));
        assert_eq!(quote.original_offer_price, dec!(80.00));
    }

    #[test]
    fn usd_offer_discounts_in_uyu() {
        // 10 USD offer at a 40 rate against a 500 UYU product.
        let quote = quote_offer(
            dec!(500),
            dec!(10),
            dec!(400),
            now(),
            now() + Duration::days(1),
            now(),
        )
        .unwrap();
        assert_eq!(quote.original_offer_price, dec!(10.00));
        assert_eq!(quote.offer_price_in_uyu, dec!(400.00));
        assert_eq!(quote.discount_percentage, dec!(20.00));
    }

    #[test]
    fn equal_price_is_rejected() {
        let err = quote_offer(
            dec!(100),
            dec!(100),
            dec!(100),
            now(),
            now() + Duration::days(1),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = quote_offer(
            dec!(100),
            dec!(50),
            dec!(50),
            now() + Duration::days(2),
            now() + Duration::days(1),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn past_window_is_rejected() {
        let err = quote_offer(
            dec!(100),
            dec!(50),
            dec!(50),
            now() - Duration::days(3),
            now() - Duration::days(1),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn past_start_is_rejected() {
        let err = quote_offer(
            dec!(100),
            dec!(50),
            dec!(50),
            now() - Duration::hours(1),
            now() + Duration::days(1),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn repeating_discount_rounds_to_two_places() {
        let quote = quote_offer(
            dec!(3),
            dec!(2),
            dec!(2),
            now(),
            now() + Duration::days(1),
            now(),
        )
        .unwrap();
        assert_eq!(quote.discount_percentage, dec!(33.33));
    }
}
