//! # Barcode Candidates
//!
//! Expands one scanned or typed string into the ordered list of values the
//! strategy chain tries.
//!
//! ## GS1 / GTIN Variants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Input: "(01)06923644237943"                                            │
//! │                                                                         │
//! │  1. trimmed original       (01)06923644237943                          │
//! │  2. digits only            0106923644237943                            │
//! │  3. GTIN-14 after AI "01"    06923644237943                            │
//! │  4. EAN-13 (drop lead 0)      6923644237943                            │
//! │                                                                         │
//! │  Input: "6925303714857" (EAN-13)                                        │
//! │                                                                         │
//! │  1. trimmed original       6925303714857                               │
//! │  2. GTIN-14 (pad with 0)  06925303714857                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Most specific first, each value once, insertion order never changes.

/// GS1 Application Identifier for a GTIN-14.
const GS1_GTIN_PREFIX: &str = "01";

/// Builds the ordered, de-duplicated candidate list for a raw input.
///
/// ## Example
/// ```rust
/// use pricecheck_core::barcode::build_candidates;
///
/// assert_eq!(
///     build_candidates("6925303714857"),
///     vec!["6925303714857", "06925303714857"]
/// );
/// assert!(build_candidates("   ").is_empty());
/// ```
pub fn build_candidates(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    push_unique(&mut candidates, trimmed);

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return candidates;
    }
    push_unique(&mut candidates, &digits);

    if digits.len() >= 16 && digits.starts_with(GS1_GTIN_PREFIX) {
        let gtin14 = &digits[2..16];
        push_unique(&mut candidates, gtin14);
        if let Some(ean13) = gtin14.strip_prefix('0') {
            push_unique(&mut candidates, ean13);
        }
    } else if digits.len() == 14 && digits.starts_with('0') {
        push_unique(&mut candidates, &digits[1..]);
    } else if digits.len() == 13 {
        push_unique(&mut candidates, &format!("0{}", digits));
    }

    candidates
}

/// Counts ASCII digits in a value.
pub fn digit_count(value: &str) -> usize {
    value.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Masks a key for logging: first 3 and last 2 characters survive.
///
/// ## Example
/// ```rust
/// use pricecheck_core::barcode::redact_key;
///
/// assert_eq!(redact_key("6925303714857"), "692***57");
/// assert_eq!(redact_key("abc"), "***");
/// ```
pub fn redact_key(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 5 {
        return "***".to_string();
    }

    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn push_unique(candidates: &mut Vec<String>, value: &str) {
    if !candidates.iter().any(|existing| existing == value) {
        candidates.push(value.to_string());
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
