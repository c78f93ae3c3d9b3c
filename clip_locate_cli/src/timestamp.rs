/// Formats a frame offset as `mm:ss`, zero-padded to two digits each side,
/// matching the reference tool's rounding (truncating) convention exactly.
#[must_use]
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let minutes = total_seconds / 60;
    let secs = total_seconds % 60;
    format!("{minutes:02}:{secs:02}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_seconds_formats_as_00_00() {
        assert_eq!(format_timestamp(0.0), "00:00");
    }

    #[test]
    fn pads_single_digit_minutes_and_seconds() {
        assert_eq!(format_timestamp(65.0), "01:05");
    }

    #[test]
    fn truncates_rather_than_rounds() {
        assert_eq!(format_timestamp(59.9), "00:59");
    }

    #[test]
    fn minutes_past_ten_are_not_padded_further() {
        assert_eq!(format_timestamp(725.0), "12:05");
    }
}
