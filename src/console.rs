use crate::record::LogRecord;

const RED_BRIGHT: &str = "\x1b[91m";
const DIM: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// One-line console rendering used in development mode.
///
/// Error-severity records come out bright red, everything else dim. The
/// color is driven by the record's own `severity` field so the console
/// and the structured copy can never disagree.
pub fn render_line(record: &LogRecord) -> String {
    let color = if record.severity == "ERROR" {
        RED_BRIGHT
    } else {
        DIM
    };
    format!("{}{}{}", color, record.message, RESET)
}

pub fn print_line(record: &LogRecord) {
    println!("{}", render_line(record));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_records_render_bright_red() {
        let record = LogRecord::application("error", "it broke");
        let line = render_line(&record);
        assert!(line.starts_with(RED_BRIGHT));
        assert!(line.contains("it broke"));
        assert!(line.ends_with(RESET));
    }

    #[test]
    fn other_records_render_dim() {
        let record = LogRecord::application("info", "all quiet");
        assert!(render_line(&record).starts_with(DIM));
    }
}
