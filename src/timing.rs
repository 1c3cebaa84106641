use std::time::Duration;

/// Render an elapsed duration the way it is stored on response records.
///
/// Durations under ten seconds stay in milliseconds (`"50ms"`); anything
/// longer is rounded (half up) to whole seconds and digit-grouped
/// (`"30s"`, `"1,000s"`). Pure function.
pub fn humanize_duration(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 10_000 {
        format!("{}ms", ms)
    } else {
        format!("{}s", group_thousands((ms + 500) / 1000))
    }
}

/// Insert locale-style thousands separators: `1234567` → `"1,234,567"`.
pub fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn sub_ten_seconds_renders_milliseconds() {
        assert_eq!(humanize_duration(ms(0)), "0ms");
        assert_eq!(humanize_duration(ms(50)), "50ms");
        assert_eq!(humanize_duration(ms(9_999)), "9999ms");
    }

    #[test]
    fn ten_seconds_and_up_renders_seconds() {
        assert_eq!(humanize_duration(ms(10_000)), "10s");
        assert_eq!(humanize_duration(ms(30_000)), "30s");
        assert_eq!(humanize_duration(ms(125_000)), "125s");
    }

    #[test]
    fn seconds_round_half_up() {
        assert_eq!(humanize_duration(ms(10_499)), "10s");
        assert_eq!(humanize_duration(ms(10_500)), "11s");
    }

    #[test]
    fn long_durations_are_digit_grouped() {
        assert_eq!(humanize_duration(ms(1_000_000)), "1,000s");
        assert_eq!(humanize_duration(ms(1_234_567_000)), "1,234,567s");
    }

    #[test]
    fn grouping_edges() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(999_999), "999,999");
    }
}
