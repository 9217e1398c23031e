use unicode_normalization::UnicodeNormalization;

/// Canonical form for case-insensitive comparisons: NFC, then lowercase.
pub fn fold(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

/// `needle` must already be folded.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    fold(haystack).contains(needle)
}

/// Thousands-grouped amount: 50000 -> "50,000", 1234.5 -> "1,234.5" (at most 3 decimals).
/// Amounts too large for millis in a u64 drop the decimals.
pub fn group_thousands(value: f64) -> String {
    let negative = value < 0.0;
    let (digits, frac) = if value.abs() < (u64::MAX / 1000) as f64 {
        let milli = (value.abs() * 1000.0).round() as u64;
        ((milli / 1000).to_string(), milli % 1000)
    } else {
        (format!("{:.0}", value.abs()), 0)
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if frac > 0 {
        let f = format!("{:03}", frac);
        out.push('.');
        out.push_str(f.trim_end_matches('0'));
    }
    if negative && out != "0" {
        out.insert(0, '-');
    }
    out
}
