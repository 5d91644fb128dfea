//! Markdown comparison report.
//!
//! The report is meant to be posted as a pull-request comment: a summary of
//! improved and regressed benchmarks in collapsible sections, per-group
//! geometric means, and the environment and command behind every result of
//! the baseline run.

use crate::compare::{Comparison, ComparisonRow};
use std::fmt::{self, Write};

/// Renders a [`Comparison`] as Markdown.
pub struct MarkdownReport<'a> {
    comparison: &'a Comparison,
}

impl<'a> MarkdownReport<'a> {
    /// Report for `comparison`.
    pub fn new(comparison: &'a Comparison) -> Self {
        Self { comparison }
    }

    fn write_header<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(out, "| Benchmark |")?;
        for name in &self.comparison.run_names {
            write!(out, " {} |", name)?;
        }
        writeln!(out, " Relative perf | Change |")?;
        for _ in 0..self.comparison.run_names.len() + 3 {
            write!(out, "|---")?;
        }
        writeln!(out, "|")
    }

    fn write_row<W: Write>(&self, out: &mut W, row: &ComparisonRow) -> fmt::Result {
        write!(out, "| {} |", row.label)?;
        for (i, value) in row.values.iter().enumerate() {
            match value {
                Some(result) if row.best == Some(i) => {
                    write!(out, " <ins>{:.3}</ins> {} |", result.value, result.unit)?
                }
                Some(result) => write!(out, " {:.3} {} |", result.value, result.unit)?,
                None => write!(out, " - |")?,
            }
        }
        match row.primary() {
            Some(delta) => writeln!(
                out,
                " {:.2}% | {:.2}% |",
                delta.percent(),
                delta.change_percent()
            ),
            None => writeln!(out, "   |   |"),
        }
    }

    fn write_table<W: Write>(&self, out: &mut W, rows: &[&ComparisonRow]) -> fmt::Result {
        self.write_header(out)?;
        for row in rows {
            self.write_row(out, row)?;
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, out: &mut W) -> fmt::Result {
        let threshold = self.comparison.epsilon * 100.0;
        let improved = self.comparison.improved();
        let regressed = self.comparison.regressed();

        writeln!(out, "# Summary")?;
        if improved.is_empty() && regressed.is_empty() {
            writeln!(out, "No diffs to calculate performance change")?;
        }
        for (title, rows) in [("Improved", &improved), ("Regressed", &regressed)] {
            if rows.is_empty() {
                continue;
            }
            writeln!(out)?;
            writeln!(out, "<details>")?;
            writeln!(
                out,
                "<summary>{} {} (threshold {:.2}%)</summary>",
                title,
                rows.len(),
                threshold
            )?;
            writeln!(out)?;
            self.write_table(out, rows)?;
            writeln!(out)?;
            writeln!(out, "</details>")?;
        }
        writeln!(out)?;
        writeln!(out, "(<ins>result</ins> is better)")
    }

    fn write_groups<W: Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "## Performance change in benchmark groups")?;
        for group in self.comparison.groups() {
            writeln!(out)?;
            writeln!(out, "<details>")?;
            match group.geomean {
                Some(geomean) => writeln!(
                    out,
                    "<summary>Relative perf in group {} ({}): {:.3}%</summary>",
                    group.key,
                    group.rows.len(),
                    geomean * 100.0
                )?,
                None => writeln!(
                    out,
                    "<summary>Relative perf in group {} ({}): cannot calculate</summary>",
                    group.key,
                    group.rows.len()
                )?,
            }
            writeln!(out)?;
            self.write_table(out, &group.rows)?;
            writeln!(out)?;
            writeln!(out, "</details>")?;
        }
        Ok(())
    }

    fn write_details<W: Write>(&self, out: &mut W) -> fmt::Result {
        let comparison = self.comparison;
        let Some(column) = comparison
            .run_names
            .iter()
            .position(|n| *n == comparison.baseline)
        else {
            return Ok(());
        };

        writeln!(out)?;
        writeln!(out, "# Details")?;
        writeln!(out)?;
        writeln!(out, "<details>")?;
        writeln!(out, "<summary>Benchmark details - environment, command...</summary>")?;
        for result in comparison.rows.iter().filter_map(|r| r.values[column].as_ref()) {
            writeln!(out)?;
            writeln!(out, "<details>")?;
            writeln!(out, "<summary>{}</summary>", result.label)?;
            writeln!(out)?;
            writeln!(out, "#### Environment Variables:")?;
            for (key, value) in &result.env {
                writeln!(out, "{}={}", key, value)?;
            }
            writeln!(out)?;
            writeln!(out, "#### Command:")?;
            writeln!(out, "{}", result.command.join(" "))?;
            writeln!(out)?;
            writeln!(out, "</details>")?;
        }
        writeln!(out)?;
        writeln!(out, "</details>")
    }
}

impl fmt::Display for MarkdownReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_summary(f)?;
        self.write_groups(f)?;
        self.write_details(f)
    }
}

/// Render `comparison` as a Markdown document.
pub fn generate_markdown(comparison: &Comparison) -> String {
    MarkdownReport::new(comparison).to_string()
}
