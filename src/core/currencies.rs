//! ISO 4217 currency codes accepted on invoices.
//!
//! Covers the major trading currencies plus the franc zones and Maghreb
//! currencies common in francophone back offices.

/// Check whether `code` is a known ISO 4217 currency code.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES.binary_search(&code).is_ok()
}

/// Number of minor units for a currency (2 unless listed otherwise).
pub fn minor_units(code: &str) -> u32 {
    match code {
        "JPY" | "KRW" | "VND" | "XAF" | "XOF" | "XPF" => 0,
        "TND" => 3,
        _ => 2,
    }
}

/// Sorted for binary search.
static CURRENCY_CODES: &[&str] = &[
    "AED", // UAE Dirham
    "AUD", // Australian Dollar
    "BRL", // Brazilian Real
    "CAD", // Canadian Dollar
    "CHF", // Swiss Franc
    "CNY", // Chinese Yuan
    "CZK", // Czech Koruna
    "DKK", // Danish Krone
    "DZD", // Algerian Dinar
    "EUR", // Euro
    "GBP", // Pound Sterling
    "HKD", // Hong Kong Dollar
    "HUF", // Hungarian Forint
    "INR", // Indian Rupee
    "JPY", // Japanese Yen
    "KRW", // South Korean Won
    "MAD", // Moroccan Dirham
    "MXN", // Mexican Peso
    "NOK", // Norwegian Krone
    "NZD", // New Zealand Dollar
    "PLN", // Polish Zloty
    "RON", // Romanian Leu
    "SEK", // Swedish Krona
    "SGD", // Singapore Dollar
    "TND", // Tunisian Dinar
    "TRY", // Turkish Lira
    "USD", // US Dollar
    "VND", // Vietnamese Dong
    "XAF", // CFA Franc BEAC
    "XOF", // CFA Franc BCEAO
    "XPF", // CFP Franc
    "ZAR", // South African Rand
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_currencies() {
        for code in ["EUR", "USD", "CHF", "MAD", "XOF", "XPF"] {
            assert!(is_known_currency_code(code), "{code}");
        }
    }

    #[test]
    fn unknown_currencies() {
        assert!(!is_known_currency_code("XYZ"));
        assert!(!is_known_currency_code(""));
        assert!(!is_known_currency_code("EURO"));
        assert!(!is_known_currency_code("eur"));
    }

    #[test]
    fn minor_unit_exceptions() {
        assert_eq!(minor_units("EUR"), 2);
        assert_eq!(minor_units("XOF"), 0);
        assert_eq!(minor_units("TND"), 3);
    }

    #[test]
    fn list_is_sorted() {
        for window in CURRENCY_CODES.windows(2) {
            assert!(
                window[0] < window[1],
                "currency codes not sorted: {} >= {}",
                window[0],
                window[1]
            );
        }
    }
}
