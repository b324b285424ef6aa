use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

fn random_upper(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

/// `ORD_<millis>_<6 chars>`
pub fn order_id(now: DateTime<Utc>) -> String {
    format!("ORD_{}_{}", now.timestamp_millis(), random_upper(6))
}

/// `TXN_<millis>_<8 chars>`
pub fn transaction_id(now: DateTime<Utc>) -> String {
    format!("TXN_{}_{}", now.timestamp_millis(), random_upper(8))
}

/// Gateway receipt, `order_<millis>_<4 hex>`.
pub fn receipt(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("order_{}_{:04x}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_has_prefix_timestamp_and_suffix() {
        let now = Utc::now();
        let id = order_id(now);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn transaction_id_suffix_is_eight_chars() {
        let id = transaction_id(Utc::now());
        assert!(id.starts_with("TXN_"));
        assert_eq!(id.rsplit('_').next().map(str::len), Some(8));
    }

    #[test]
    fn receipt_suffix_is_four_hex_digits() {
        let r = receipt(Utc::now());
        let suffix = r.rsplit('_').next().unwrap_or_default();
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
