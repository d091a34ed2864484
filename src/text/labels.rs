//! Loose taxonomy label compatibility.

/// Labels at or below this many characters must match exactly.
const MIN_LOOSE_LABEL_CHARS: usize = 5;

/// Decide whether two labels denote the same taxonomy class.
///
/// Exact case-insensitive match after trimming is always compatible. Longer
/// labels (more than 5 characters each) are also compatible when one contains
/// the other, e.g. "Data Collected" and "Categories of Data Collected".
/// False positives here are filtered by the text similarity tiers.
pub fn labels_compatible(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return true;
    }

    if a.chars().count() > MIN_LOOSE_LABEL_CHARS && b.chars().count() > MIN_LOOSE_LABEL_CHARS {
        return a.contains(&b) || b.contains(&a);
    }

    false
}
