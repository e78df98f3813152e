// ABOUTME: Recognizes canonical Slack message timestamps ("<seconds>.<micros>")
// ABOUTME: Also extracts whole seconds from a timestamp for display times

/// True iff `s` is a canonical Slack timestamp: digits, exactly one `.`,
/// and at least one digit on each side of it.
pub fn is_canonical_ts(s: &str) -> bool {
    let mut digit_before = false;
    let mut dot = false;
    let mut digit_after = false;

    for b in s.bytes() {
        match b {
            b'0'..=b'9' if dot => digit_after = true,
            b'0'..=b'9' => digit_before = true,
            b'.' if dot => return false,
            b'.' => dot = true,
            _ => return false,
        }
    }

    digit_before && dot && digit_after
}

/// Parse a Slack timestamp (e.g., "1700000000.000100") into Unix seconds
pub fn ts_seconds(ts: &str) -> i64 {
    ts.split('.')
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0)
}
