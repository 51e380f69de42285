//! Line-by-line report rendering
//!
//! A finished scope is turned into a [`ProfileSnapshot`]: one [`ReportRow`] per
//! line that received time, in the order the lines were first seen. The
//! snapshot renders as the fixed text report below and serializes to JSON.
//!
//! ```text
//! --------------------------------------------------------------------------------
//! Line-by-Line Profile
//! --------------------------------------------------------------------------------
//! 02.1% 000.001s | step!(let x = 1);
//! 97.9% 000.050s | step!(std::thread::sleep(pause));
//! --------------------------------------------------------------------------------
//! Total time: 0.0511s
//! --------------------------------------------------------------------------------
//! ```

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::{rgb_fg_ansi, white_to_red_rgb, RESET};
use crate::error::Result;
use crate::location::LineRegistry;
use crate::timing::TimingAccumulator;

/// Width of the dashed banner lines
pub const BANNER_WIDTH: usize = 80;

/// Report title printed between the first two banners
pub const REPORT_TITLE: &str = "Line-by-Line Profile";

/// Printed instead of a table when no line received time
pub const EMPTY_REPORT: &str = "No lines were profiled in the block.";

/// Time and share of total for one profiled line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub file: String,
    pub line: u32,
    /// Share of the scope's total time (0-100)
    pub percentage: f64,
    /// Accumulated wall-clock seconds
    pub seconds: f64,
    /// Literal source text, empty if it could not be read
    pub text: String,
}

/// Finalized result of one traced scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub rows: Vec<ReportRow>,
    pub total_seconds: f64,
}

impl ProfileSnapshot {
    /// Build rows from accumulated timings and resolved source text
    pub fn from_parts(timings: &TimingAccumulator, lines: &LineRegistry) -> Self {
        let total_seconds = timings.total().as_secs_f64();
        let rows = timings
            .iter()
            .map(|(id, elapsed)| {
                let seconds = elapsed.as_secs_f64();
                let percentage = if total_seconds > 0.0 {
                    seconds / total_seconds * 100.0
                } else {
                    0.0
                };
                ReportRow {
                    file: id.file.to_string(),
                    line: id.line,
                    percentage,
                    seconds,
                    text: lines.text(id).to_string(),
                }
            })
            .collect();

        Self {
            rows,
            total_seconds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for the given source line, if it received time
    pub fn row(&self, file: &str, line: u32) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.file == file && r.line == line)
    }

    /// First row whose source text contains `needle`
    pub fn row_containing(&self, needle: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.text.contains(needle))
    }

    /// Sum of all row percentages (~100 unless total time is zero)
    pub fn percentage_sum(&self) -> f64 {
        self.rows.iter().map(|r| r.percentage).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the snapshot as pretty JSON to `path`
    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Normalize a source line for display: halve runs of spaces, drop trailing whitespace
fn display_text(text: &str) -> String {
    text.replace("  ", " ").trim_end().to_string()
}

/// Format one report row, optionally wrapped in a white-to-red color escape
pub fn format_row(row: &ReportRow, use_color: bool) -> String {
    let base = format!(
        "{:04.1}% {:07.3}s | {}",
        row.percentage,
        row.seconds,
        display_text(&row.text)
    );
    if !use_color {
        return base;
    }
    let (r, g, b) = white_to_red_rgb(row.percentage);
    format!("{}{}{}", rgb_fg_ansi(r, g, b), base, RESET)
}

/// Render the full report, including banners and the total-time line
pub fn render(snapshot: &ProfileSnapshot, use_color: bool) -> String {
    if snapshot.is_empty() {
        return format!("{}\n", EMPTY_REPORT);
    }

    let rule = "-".repeat(BANNER_WIDTH);
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{}", REPORT_TITLE);
    let _ = writeln!(out, "{}", rule);
    for row in &snapshot.rows {
        let _ = writeln!(out, "{}", format_row(row, use_color));
    }
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Total time: {:.4}s", snapshot.total_seconds);
    let _ = writeln!(out, "{}", rule);
    out
}

/// Render the report into `out` and flush it
pub fn print_report<W: Write + ?Sized>(
    snapshot: &ProfileSnapshot,
    use_color: bool,
    out: &mut W,
) -> std::io::Result<()> {
    out.write_all(render(snapshot, use_color).as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LineId;
    use crate::source::MemorySourceLookup;
    use std::time::Duration;

    fn row(percentage: f64, seconds: f64, text: &str) -> ReportRow {
        ReportRow {
            file: "demo.rs".to_string(),
            line: 1,
            percentage,
            seconds,
            text: text.to_string(),
        }
    }

    fn snapshot_of(entries: &[(u32, u64)]) -> ProfileSnapshot {
        let source = "let x = 1;\nlet y = 2;\nlet z = x + y;\n";
        let lookup = MemorySourceLookup::new().with_file("demo.rs", source);
        let mut timings = TimingAccumulator::new();
        let mut lines = LineRegistry::new();
        for &(line, millis) in entries {
            let id = LineId::new("demo.rs", line);
            timings.add(&id, Duration::from_millis(millis));
            lines.ensure(&id, &lookup);
        }
        ProfileSnapshot::from_parts(&timings, &lines)
    }

    #[test]
    fn test_empty_report_message() {
        let text = render(&ProfileSnapshot::default(), false);
        assert_eq!(text, "No lines were profiled in the block.\n");
    }

    #[test]
    fn test_percentages_from_totals() {
        let snapshot = snapshot_of(&[(1, 25), (2, 75)]);
        assert_eq!(snapshot.rows.len(), 2);
        assert!((snapshot.rows[0].percentage - 25.0).abs() < 1e-9);
        assert!((snapshot.rows[1].percentage - 75.0).abs() < 1e-9);
        assert!((snapshot.total_seconds - 0.1).abs() < 1e-9);
        assert!((snapshot.percentage_sum() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_gives_zero_percent() {
        let snapshot = snapshot_of(&[(1, 0), (2, 0)]);
        assert!(snapshot.rows.iter().all(|r| r.percentage == 0.0));
        let text = render(&snapshot, false);
        assert!(text.contains("00.0% 000.000s | let x = 1;"));
        assert!(text.contains("Total time: 0.0000s"));
    }

    #[test]
    fn test_rows_keep_first_seen_order() {
        let snapshot = snapshot_of(&[(3, 1), (1, 50), (2, 10)]);
        let order: Vec<u32> = snapshot.rows.iter().map(|r| r.line).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_format_row_plain() {
        assert_eq!(
            format_row(&row(5.0, 0.0123, "let x = 1;"), false),
            "05.0% 000.012s | let x = 1;"
        );
        assert_eq!(
            format_row(&row(100.0, 12.5, "work()"), false),
            "100.0% 012.500s | work()"
        );
    }

    #[test]
    fn test_format_row_normalizes_whitespace() {
        let formatted = format_row(&row(10.0, 0.001, "        let  y = 2;   \t"), false);
        assert_eq!(formatted, "10.0% 000.001s |     let y = 2;");
    }

    #[test]
    fn test_format_row_colored() {
        let formatted = format_row(&row(100.0, 1.0, "x"), true);
        assert!(formatted.starts_with("\x1b[38;2;255;0;0m"));
        assert!(formatted.ends_with("\x1b[0m"));

        let cool = format_row(&row(0.0, 0.0, "x"), true);
        assert!(cool.starts_with("\x1b[38;2;255;255;255m"));
    }

    #[test]
    fn test_render_layout() {
        let snapshot = snapshot_of(&[(1, 10), (2, 30)]);
        let text = render(&snapshot, false);
        let lines: Vec<&str> = text.lines().collect();

        let rule = "-".repeat(80);
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], rule);
        assert_eq!(lines[1], "Line-by-Line Profile");
        assert_eq!(lines[2], rule);
        assert_eq!(lines[3], "25.0% 000.010s | let x = 1;");
        assert_eq!(lines[4], "75.0% 000.030s | let y = 2;");
        assert_eq!(lines[5], rule);
        assert_eq!(lines[6], "Total time: 0.0400s");
        assert_eq!(lines[7], rule);
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_render_colored_rows_only() {
        let snapshot = snapshot_of(&[(1, 10)]);
        let text = render(&snapshot, true);
        for line in text.lines() {
            if line.contains('|') {
                assert!(line.starts_with("\x1b[38;2;"));
                assert!(line.ends_with(RESET));
            } else {
                assert!(!line.contains('\x1b'));
            }
        }
    }

    #[test]
    fn test_print_report_to_writer() {
        let snapshot = snapshot_of(&[(1, 5)]);
        let mut buffer = Vec::new();
        print_report(&snapshot, false, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("let x = 1;"));
    }

    #[test]
    fn test_row_lookup_helpers() {
        let snapshot = snapshot_of(&[(1, 5), (3, 5)]);
        assert_eq!(snapshot.row("demo.rs", 3).unwrap().text, "let z = x + y;");
        assert!(snapshot.row("demo.rs", 2).is_none());
        assert_eq!(snapshot.row_containing("x + y").unwrap().line, 3);
    }

    #[test]
    fn test_json_export() {
        let snapshot = snapshot_of(&[(1, 5), (2, 15)]);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"total_seconds\""));
        assert!(json.contains("let y = 2;"));

        let parsed = ProfileSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].line, 2);
    }
}
