//! Static HTML report.
//!
//! The page is self-contained: charts are inline SVG, tooltips are SVG
//! `<title>` elements and the filter box is a few lines of inline script.
//! It holds one time-series chart per benchmark label over the saved
//! history and one bar chart per label group comparing the latest value of
//! every run against the baseline run.

use crate::compare::{label_prefix, relative_performance};
use crate::result::{BenchmarkResult, BenchmarkRun};
use std::fmt::{self, Write};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 300.0;
const BAR_HEIGHT: f64 = 340.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 160.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 40.0;

/// Largest number of labels shown in one bar chart.
pub const MAX_GROUP_SIZE: usize = 5;

/// Group collecting labels that are alone in their prefix group.
pub const MISC_GROUP: &str = "Miscellaneous";

const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

const STYLE: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            margin: 0;
            padding: 16px;
            background: #f8f9fa;
        }
        .container { max-width: 1100px; margin: 0 auto; }
        h1, h2 { color: #212529; text-align: center; margin-bottom: 24px; font-weight: 500; }
        .chart {
            background: white;
            border-radius: 8px;
            padding: 24px;
            margin-bottom: 24px;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            overflow-x: auto;
        }
        .chart svg { min-width: 600px; width: 100%; height: auto; }
        .chart .title { font-size: 15px; text-anchor: middle; }
        .chart .subtitle { font-size: 10px; font-style: italic; fill: #666666; text-anchor: middle; }
        .chart .axis { stroke: #999999; stroke-width: 1; }
        .chart .grid { stroke: #dddddd; stroke-dasharray: 4 4; }
        .chart .tick { font-size: 10px; fill: #444444; }
        .chart .series { fill: none; stroke-width: 2; opacity: 0.5; }
        .chart a circle:hover, .chart rect.bar:hover { opacity: 0.7; }
        .filter-container { text-align: center; margin-bottom: 24px; }
        .filter-container input {
            padding: 8px;
            font-size: 16px;
            border: 1px solid #ccc;
            border-radius: 4px;
            width: 400px;
            max-width: 100%;
        }
"#;

const SCRIPT: &str = r#"
        function filterCharts() {
            const regexInput = document.getElementById('bench-filter').value;
            let regex;
            try {
                regex = new RegExp(regexInput, 'i');
            } catch (e) {
                return;
            }
            document.querySelectorAll('.chart').forEach(chart => {
                const label = chart.getAttribute('data-label');
                chart.style.display = regex.test(label) ? '' : 'none';
            });
        }
"#;

/// Escape text for use in HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// History of one label: its results per run name, oldest first.
#[derive(Debug, Clone)]
struct Series {
    label: String,
    unit: String,
    lower_is_better: bool,
    runs: Vec<(String, Vec<BenchmarkResult>)>,
}

impl Series {
    fn latest(&self, run_name: &str) -> Option<&BenchmarkResult> {
        self.runs
            .iter()
            .find(|(name, _)| name == run_name)
            .and_then(|(_, results)| results.last())
    }
}

fn collect_series(runs: &[BenchmarkRun], compare_names: &[String]) -> Vec<Series> {
    let mut series: Vec<Series> = Vec::new();
    for run in runs.iter().filter(|r| compare_names.contains(&r.name)) {
        for result in run.annotated_results() {
            let index = match series.iter().position(|s| s.label == result.label) {
                Some(index) => index,
                None => {
                    series.push(Series {
                        label: result.label.clone(),
                        unit: result.unit.clone(),
                        lower_is_better: result.lower_is_better,
                        runs: Vec::new(),
                    });
                    series.len() - 1
                }
            };
            let entry = &mut series[index];
            match entry.runs.iter_mut().find(|(name, _)| *name == run.name) {
                Some((_, results)) => results.push(result),
                None => entry.runs.push((run.name.clone(), vec![result])),
            }
        }
    }

    for s in &mut series {
        for (_, results) in &mut s.runs {
            results.sort_by_key(|r| r.date);
        }
    }
    series
}

fn push_group(groups: &mut Vec<(String, Vec<String>)>, mut name: String, labels: Vec<String>) {
    while groups.iter().any(|(n, _)| *n == name) {
        name.push_str(" +");
    }
    groups.push((name, labels));
}

/// Regroup `groups` so every group holds between two and five labels.
///
/// Labels alone in their group are collected into [`MISC_GROUP`]. Groups
/// larger than [`MAX_GROUP_SIZE`] are split in halves, the second half
/// getting a `" +"` suffix, until none is too large.
pub fn split_large_groups(groups: Vec<(String, Vec<String>)>) -> Vec<(String, Vec<String>)> {
    let mut miscellaneous: Vec<String> = Vec::new();
    let mut new_groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut split_happened = false;

    for (name, mut labels) in groups {
        if name == MISC_GROUP || labels.len() == 1 {
            miscellaneous.append(&mut labels);
        } else if labels.len() > MAX_GROUP_SIZE {
            split_happened = true;
            let second = labels.split_off(labels.len() / 2);
            push_group(&mut new_groups, name.clone(), labels);
            push_group(&mut new_groups, format!("{} +", name), second);
        } else {
            push_group(&mut new_groups, name, labels);
        }
    }

    if miscellaneous.len() > MAX_GROUP_SIZE {
        split_happened = true;
        let second = miscellaneous.split_off(miscellaneous.len() / 2);
        push_group(&mut new_groups, MISC_GROUP.to_string(), miscellaneous);
        push_group(&mut new_groups, format!("{} +", MISC_GROUP), second);
    } else if !miscellaneous.is_empty() {
        push_group(&mut new_groups, MISC_GROUP.to_string(), miscellaneous);
    }

    if split_happened {
        split_large_groups(new_groups)
    } else {
        new_groups
    }
}

/// Group labels by their prefix and split the groups for charting.
pub fn group_labels<'a, I: IntoIterator<Item = &'a str>>(labels: I) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for label in labels {
        let prefix = label_prefix(label);
        match groups.iter_mut().find(|(name, _)| name == prefix) {
            Some((_, members)) => members.push(label.to_string()),
            None => groups.push((prefix.to_string(), vec![label.to_string()])),
        }
    }
    split_large_groups(groups)
}

fn scale(value: f64, lo: f64, hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    if hi > lo {
        out_lo + (value - lo) / (hi - lo) * (out_hi - out_lo)
    } else {
        (out_lo + out_hi) / 2.0
    }
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo {
        (hi - lo) * 0.05
    } else if lo != 0.0 {
        lo.abs() * 0.05
    } else {
        1.0
    };
    (lo - pad, hi + pad)
}

/// Renders saved runs as an HTML page.
pub struct HtmlReport<'a> {
    series: Vec<Series>,
    run_names: &'a [String],
    baseline: &'a str,
    github_repo: &'a str,
}

impl<'a> HtmlReport<'a> {
    /// Report over every run in `runs` whose name is in `compare_names`.
    ///
    /// Bar charts are normalized to the latest values of `baseline`.
    pub fn new(
        runs: &[BenchmarkRun],
        compare_names: &'a [String],
        baseline: &'a str,
        github_repo: &'a str,
    ) -> Self {
        Self {
            series: collect_series(runs, compare_names),
            run_names: compare_names,
            baseline,
            github_repo,
        }
    }

    fn color(&self, run_name: &str) -> &'static str {
        let index = self
            .run_names
            .iter()
            .position(|n| n == run_name)
            .unwrap_or(0);
        PALETTE[index % PALETTE.len()]
    }

    fn write_legend<W: Write>(&self, out: &mut W, names: &[&str]) -> fmt::Result {
        let x = WIDTH - MARGIN_RIGHT + 15.0;
        for (i, name) in names.iter().enumerate() {
            let y = MARGIN_TOP + 18.0 * i as f64;
            writeln!(
                out,
                r#"<rect x="{:.1}" y="{:.1}" width="12" height="12" fill="{}"/><text class="tick" x="{:.1}" y="{:.1}">{}</text>"#,
                x,
                y,
                self.color(name),
                x + 18.0,
                y + 10.0,
                escape(name)
            )?;
        }
        Ok(())
    }

    fn write_time_series<W: Write>(&self, out: &mut W, series: &Series) -> fmt::Result {
        let (plot_left, plot_right) = (MARGIN_LEFT, WIDTH - MARGIN_RIGHT);
        let (plot_top, plot_bottom) = (MARGIN_TOP, HEIGHT - MARGIN_BOTTOM);

        let points = || series.runs.iter().flat_map(|(_, results)| results.iter());
        let times: Vec<i64> = points()
            .filter_map(|r| r.date.map(|d| d.timestamp_millis()))
            .collect();
        let t_lo = times.iter().copied().min().unwrap_or(0) as f64;
        let t_hi = times.iter().copied().max().unwrap_or(0) as f64;
        let (v_lo, v_hi) = padded_range(points().map(|r| r.value));

        let direction = if series.lower_is_better {
            "lower is better"
        } else {
            "higher is better"
        };
        let y_title = if series.unit.is_empty() {
            "Value".to_string()
        } else {
            format!("Value ({})", series.unit)
        };

        writeln!(out, r#"<div class="chart" data-label="{}">"#, escape(&series.label))?;
        writeln!(
            out,
            r#"<svg viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg" role="img">"#,
            WIDTH, HEIGHT
        )?;
        writeln!(
            out,
            r#"<text class="title" x="{:.1}" y="20">{}</text>"#,
            (plot_left + plot_right) / 2.0,
            escape(&series.label)
        )?;
        writeln!(
            out,
            r#"<text class="subtitle" x="{:.1}" y="36">({})</text>"#,
            (plot_left + plot_right) / 2.0,
            direction
        )?;
        writeln!(
            out,
            r#"<line class="axis" x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}"/><line class="axis" x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}"/>"#,
            l = plot_left,
            r = plot_right,
            t = plot_top,
            b = plot_bottom
        )?;
        for value in [v_lo, (v_lo + v_hi) / 2.0, v_hi] {
            let y = scale(value, v_lo, v_hi, plot_bottom, plot_top);
            writeln!(
                out,
                r#"<line class="grid" x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}"/><text class="tick" x="{:.1}" y="{:.1}" text-anchor="end">{:.2}</text>"#,
                plot_left,
                plot_right,
                plot_left - 6.0,
                y + 3.0,
                value,
                y = y
            )?;
        }
        writeln!(
            out,
            r#"<text class="tick" transform="translate(14 {:.1}) rotate(-90)" text-anchor="middle">{}</text>"#,
            (plot_top + plot_bottom) / 2.0,
            escape(&y_title)
        )?;

        let first = points().filter_map(|r| r.date).min();
        let last = points().filter_map(|r| r.date).max();
        if let (Some(first), Some(last)) = (first, last) {
            writeln!(
                out,
                r#"<text class="tick" x="{:.1}" y="{:.1}">{}</text><text class="tick" x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
                plot_left,
                plot_bottom + 16.0,
                first.format("%Y-%m-%d %H:%M:%S"),
                plot_right,
                plot_bottom + 16.0,
                last.format("%Y-%m-%d %H:%M:%S")
            )?;
        }

        let position = |result: &BenchmarkResult| {
            let t = result.date.map(|d| d.timestamp_millis() as f64).unwrap_or(t_lo);
            (
                scale(t, t_lo, t_hi, plot_left + 10.0, plot_right - 10.0),
                scale(result.value, v_lo, v_hi, plot_bottom, plot_top),
            )
        };

        for (name, results) in &series.runs {
            let color = self.color(name);
            let polyline: Vec<String> = results
                .iter()
                .map(|r| {
                    let (x, y) = position(r);
                    format!("{:.1},{:.1}", x, y)
                })
                .collect();
            writeln!(
                out,
                r#"<polyline class="series" stroke="{}" points="{}"/>"#,
                color,
                polyline.join(" ")
            )?;

            for result in results {
                let (x, y) = position(result);
                let date = result
                    .date
                    .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                writeln!(
                    out,
                    r#"<a href="https://github.com/{}/commit/{}" target="_blank"><circle cx="{:.1}" cy="{:.1}" r="4" fill="{}"><title>Date: {}&#10;Value: {:.2}&#10;Git Hash: {}</title></circle></a>"#,
                    escape(self.github_repo),
                    escape(&result.git_hash),
                    x,
                    y,
                    color,
                    date,
                    result.value,
                    escape(&result.git_hash)
                )?;
            }
        }

        let names: Vec<&str> = series.runs.iter().map(|(n, _)| n.as_str()).collect();
        self.write_legend(out, &names)?;
        writeln!(out, "</svg>")?;
        writeln!(out, "</div>")
    }

    fn write_bar_chart<W: Write>(
        &self,
        out: &mut W,
        group: &str,
        labels: &[String],
        run_names: &[&str],
    ) -> fmt::Result {
        let members: Vec<&Series> = labels
            .iter()
            .filter_map(|l| self.series.iter().find(|s| s.label == *l))
            .collect();

        // (run index, label index, normalized value, raw result)
        let mut bars: Vec<(usize, usize, f64, &BenchmarkResult)> = Vec::new();
        for (li, series) in members.iter().enumerate() {
            let Some(baseline) = series.latest(self.baseline) else {
                continue;
            };
            for (ri, run_name) in run_names.iter().enumerate() {
                let Some(current) = series.latest(run_name) else {
                    continue;
                };
                if let Some(ratio) =
                    relative_performance(current.value, baseline.value, series.lower_is_better)
                {
                    bars.push((ri, li, ratio * 100.0, current));
                }
            }
        }

        let (plot_left, plot_right) = (MARGIN_LEFT, WIDTH - MARGIN_RIGHT);
        let (plot_top, plot_bottom) = (MARGIN_TOP, BAR_HEIGHT - MARGIN_BOTTOM - 30.0);
        let max_value = bars
            .iter()
            .map(|b| b.2)
            .fold(100.0_f64, f64::max)
            * 1.15;
        let slot = (plot_right - plot_left) / members.len().max(1) as f64;
        let bar_width = slot * 0.8 / run_names.len().max(1) as f64;
        let y_of = |v: f64| scale(v, 0.0, max_value, plot_bottom, plot_top);

        let data_label = std::iter::once(group.to_string())
            .chain(labels.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, r#"<div class="chart" data-label="{}">"#, escape(&data_label))?;
        writeln!(
            out,
            r#"<svg viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg" role="img">"#,
            WIDTH, BAR_HEIGHT
        )?;
        writeln!(
            out,
            r#"<text class="title" x="{:.1}" y="20">{}</text>"#,
            (plot_left + plot_right) / 2.0,
            escape(group)
        )?;
        writeln!(
            out,
            r#"<text class="subtitle" x="{:.1}" y="36">(normalized to {}, higher is better)</text>"#,
            (plot_left + plot_right) / 2.0,
            escape(self.baseline)
        )?;
        writeln!(
            out,
            r#"<line class="axis" x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}"/><line class="axis" x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}"/>"#,
            l = plot_left,
            r = plot_right,
            t = plot_top,
            b = plot_bottom
        )?;
        let reference = y_of(100.0);
        writeln!(
            out,
            r#"<line class="grid" x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}"/><text class="tick" x="{:.1}" y="{:.1}" text-anchor="end">100%</text>"#,
            plot_left,
            plot_right,
            plot_left - 6.0,
            reference + 3.0,
            y = reference
        )?;

        for (ri, li, value, result) in &bars {
            let x = plot_left + slot * *li as f64 + slot * 0.1 + bar_width * *ri as f64;
            let y = y_of(*value);
            writeln!(
                out,
                r#"<rect class="bar" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>Run: {}&#10;Value: {:.2} {}&#10;Normalized: {:.1}%</title></rect>"#,
                x,
                y,
                bar_width,
                plot_bottom - y,
                self.color(run_names[*ri]),
                escape(run_names[*ri]),
                result.value,
                escape(&result.unit),
                value
            )?;
            writeln!(
                out,
                r#"<text class="tick" x="{:.1}" y="{:.1}" text-anchor="middle">{:.1}%</text>"#,
                x + bar_width / 2.0,
                y - 4.0,
                value
            )?;
        }

        for (li, series) in members.iter().enumerate() {
            let x = plot_left + slot * (li as f64 + 0.5);
            writeln!(
                out,
                r#"<text class="tick" transform="translate({:.1} {:.1}) rotate(-15)" text-anchor="end">{}</text>"#,
                x,
                plot_bottom + 14.0,
                escape(&series.label)
            )?;
        }

        self.write_legend(out, run_names)?;
        writeln!(out, "</svg>")?;
        writeln!(out, "</div>")
    }

    fn write_bar_charts<W: Write>(&self, out: &mut W) -> fmt::Result {
        let mut run_names: Vec<&str> = self
            .series
            .iter()
            .flat_map(|s| s.runs.iter().map(|(n, _)| n.as_str()))
            .collect();
        run_names.sort_unstable();
        run_names.dedup();
        if !run_names.contains(&self.baseline) {
            return Ok(());
        }

        writeln!(out, "<h2>Relative Performance</h2>")?;
        writeln!(out, r#"<div class="charts">"#)?;
        for (group, labels) in group_labels(self.series.iter().map(|s| s.label.as_str())) {
            self.write_bar_chart(out, &group, &labels, &run_names)?;
        }
        writeln!(out, "</div>")
    }
}

impl fmt::Display for HtmlReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<!DOCTYPE html>")?;
        writeln!(f, "<html>")?;
        writeln!(f, "<head>")?;
        writeln!(f, r#"<meta charset="utf-8">"#)?;
        writeln!(f, r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#)?;
        writeln!(f, "<title>Benchmark Results</title>")?;
        writeln!(f, "<style>{}</style>", STYLE)?;
        writeln!(f, "<script>{}</script>", SCRIPT)?;
        writeln!(f, "</head>")?;
        writeln!(f, "<body>")?;
        writeln!(f, r#"<div class="container">"#)?;
        writeln!(f, "<h1>Benchmark Results</h1>")?;
        writeln!(f, r#"<div class="filter-container">"#)?;
        writeln!(
            f,
            r#"<input type="text" id="bench-filter" placeholder="Regex..." oninput="filterCharts()">"#
        )?;
        writeln!(f, "</div>")?;
        self.write_bar_charts(f)?;
        writeln!(f, "<h2>Historical Results</h2>")?;
        writeln!(f, r#"<div class="charts">"#)?;
        for series in &self.series {
            self.write_time_series(f, series)?;
        }
        writeln!(f, "</div>")?;
        writeln!(f, "</div>")?;
        writeln!(f, "</body>")?;
        writeln!(f, "</html>")
    }
}

/// Render the HTML report for `runs`.
pub fn generate_html(
    runs: &[BenchmarkRun],
    compare_names: &[String],
    baseline: &str,
    github_repo: &str,
) -> String {
    HtmlReport::new(runs, compare_names, baseline, github_repo).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn run(name: &str, hash: &str, day: u32, values: &[(&str, f64)]) -> BenchmarkRun {
        BenchmarkRun {
            name: name.to_string(),
            git_hash: hash.to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
            results: values
                .iter()
                .map(|(label, v)| BenchmarkResult::new(*label, *v).with_unit("ms"))
                .collect(),
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn labels(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}_{}", prefix, i)).collect()
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_singletons_go_to_miscellaneous() {
        let groups = group_labels(["alloc_a", "alloc_b", "free_a", "realloc_a"]);
        assert_eq!(
            groups,
            vec![
                ("alloc".to_string(), names(&["alloc_a", "alloc_b"])),
                (MISC_GROUP.to_string(), names(&["free_a", "realloc_a"])),
            ]
        );
    }

    #[test]
    fn test_large_groups_split_in_halves() {
        let groups = split_large_groups(vec![("alloc".to_string(), labels("alloc", 8))]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "alloc");
        assert_eq!(groups[0].1, labels("alloc", 4));
        assert_eq!(groups[1].0, "alloc +");
        assert_eq!(groups[1].1.len(), 4);
    }

    #[test]
    fn test_split_keeps_every_label() {
        let groups = split_large_groups(vec![("x".to_string(), labels("x", 12))]);
        let total: usize = groups.iter().map(|(_, l)| l.len()).sum();
        assert_eq!(total, 12);
        assert!(groups.iter().all(|(_, l)| (2..=MAX_GROUP_SIZE).contains(&l.len())));
        let mut group_names: Vec<&str> = groups.iter().map(|(n, _)| n.as_str()).collect();
        group_names.dedup();
        assert_eq!(group_names.len(), groups.len());
    }

    #[test]
    fn test_time_series_chart_per_label() {
        let runs = vec![
            run("baseline", "aaa111", 1, &[("alloc_a", 10.0), ("alloc_b", 5.0)]),
            run("baseline", "bbb222", 2, &[("alloc_a", 11.0), ("alloc_b", 6.0)]),
            run("ignored", "ccc333", 3, &[("alloc_a", 1.0)]),
        ];
        let html = generate_html(&runs, &names(&["baseline"]), "baseline", "oneapi-src/unified-runtime");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<div class="chart" data-label="alloc_a">"#));
        assert!(html.contains(r#"<div class="chart" data-label="alloc_b">"#));
        assert!(html.contains("https://github.com/oneapi-src/unified-runtime/commit/aaa111"));
        assert!(html.contains("Git Hash: bbb222"));
        assert!(!html.contains("ccc333"));
        assert!(html.contains("(lower is better)"));
        assert!(html.contains("Value (ms)"));
        assert!(html.contains("Date: 2025-03-01 12:00:00"));
        assert!(html.contains("id=\"bench-filter\""));
        assert!(html.contains("new RegExp(regexInput, 'i')"));
    }

    #[test]
    fn test_bar_chart_normalized_to_baseline() {
        let mut faster = run("This PR", "new", 2, &[("alloc_a", 50.0), ("alloc_b", 10.0)]);
        faster.results[1].lower_is_better = false;
        let mut base = run("baseline", "old", 1, &[("alloc_a", 100.0), ("alloc_b", 20.0)]);
        base.results[1].lower_is_better = false;

        let html = generate_html(
            &[faster, base],
            &names(&["This PR", "baseline"]),
            "baseline",
            "o/r",
        );
        assert!(html.contains("<h2>Relative Performance</h2>"));
        assert!(html.contains(r#"data-label="alloc alloc_a alloc_b""#));
        // Twice as fast on a lower-is-better label.
        assert!(html.contains("Normalized: 200.0%"));
        // Half the throughput on a higher-is-better label.
        assert!(html.contains("Normalized: 50.0%"));
        assert!(html.contains("Normalized: 100.0%"));
    }

    #[test]
    fn test_bar_charts_skipped_without_baseline_data() {
        let runs = vec![run("This PR", "new", 2, &[("alloc_a", 50.0), ("alloc_b", 10.0)])];
        let html = generate_html(&runs, &names(&["This PR", "baseline"]), "baseline", "o/r");
        assert!(!html.contains("Relative Performance"));
        assert!(html.contains("<h2>Historical Results</h2>"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let runs = vec![run("baseline", "h", 1, &[("a<b>", 1.0)])];
        let html = generate_html(&runs, &names(&["baseline"]), "baseline", "o/r");
        assert!(html.contains(r#"data-label="a&lt;b&gt;""#));
        assert!(!html.contains("<b>"));
    }
}
