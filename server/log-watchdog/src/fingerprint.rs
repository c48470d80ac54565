//! Stable fingerprint computation for deduplicating error log lines.

use crate::types::Fingerprint;

/// Hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 16;

/// Stand-in for every decimal digit before hashing.
pub const DIGIT_MASK: char = '#';

/// Replace ASCII digits so timestamps, ids and counters in free text do not split groups.
pub fn mask_digits(message: &str) -> String {
  message
    .chars()
    .map(|c| if c.is_ascii_digit() { DIGIT_MASK } else { c })
    .collect()
}

/// Compute the fingerprint of an error line emitted by `service_name`.
///
/// Key components: service name + digit-masked message.
/// Uses blake3 so the value is identical across processes and platforms.
pub fn compute(service_name: &str, message: &str) -> Fingerprint {
  let mut hasher = blake3::Hasher::new();
  hasher.update(service_name.as_bytes());
  hasher.update(b":");
  hasher.update(mask_digits(message).as_bytes());

  let hex = hasher.finalize().to_hex();
  Fingerprint(hex[..FINGERPRINT_LEN].to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_input_same_fingerprint() {
    assert_eq!(compute("api", "boom"), compute("api", "boom"));
  }

  #[test]
  fn digits_are_masked() {
    assert_eq!(
      compute("svc", "err at 12:00:01"),
      compute("svc", "err at 99:99:99")
    );
    assert_eq!(mask_digits("user 42 failed"), "user ## failed");
  }

  #[test]
  fn different_service_different_fingerprint() {
    assert_ne!(compute("api", "boom"), compute("worker", "boom"));
  }

  #[test]
  fn different_text_different_fingerprint() {
    assert_ne!(compute("api", "timeout"), compute("api", "refused"));
  }

  #[test]
  fn separator_keeps_fields_apart() {
    assert_ne!(compute("a", "bc"), compute("ab", "c"));
  }

  #[test]
  fn non_ascii_digits_are_kept() {
    assert_eq!(mask_digits("٣ items"), "٣ items");
  }

  #[test]
  fn fingerprint_is_16_hex_chars() {
    let fp = compute("api", "Connection refused on port 5432");
    assert_eq!(fp.0.len(), FINGERPRINT_LEN);
    assert!(fp.0.chars().all(|c| c.is_ascii_hexdigit()));
  }
}
