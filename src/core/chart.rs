// FairMine - core/chart.rs
//
// SVG rendering of the two result charts. Output is a self-contained SVG
// document built as a string; writing it to disk is the caller's job.
//
// Set-overlap chart (UpSet style):
//   top     - one column per exclusive intersection, height = element count
//   bottom  - membership matrix, filled dot where a category takes part
//   left    - total size of each category
//
// Comparison chart: grouped bars, one group per log and one bar per series
// (baseline first), with a dashed line at each group's baseline.

use crate::core::model::{LogReport, OutcomeResult, Percentage};
use crate::util::constants;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write};

/// Matplotlib "tab10" colours, cycled per series.
const PALETTE: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const FONT: &str = "font-family=\"sans-serif\"";

// =============================================================================
// Set overlap
// =============================================================================

/// Elements shared by exactly the categories in `members`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intersection {
    /// Category indices, ascending.
    pub members: Vec<usize>,
    pub elements: Vec<String>,
}

/// Exclusive intersections of `sets`, largest first. Ties are broken by the
/// membership pattern so output is deterministic.
pub fn intersections(sets: &[(String, Vec<String>)]) -> Vec<Intersection> {
    let mut membership: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for (i, (_, elements)) in sets.iter().enumerate() {
        for e in elements {
            let entry = membership.entry(e.as_str()).or_insert_with(|| {
                first_seen.push(e.as_str());
                Vec::new()
            });
            if entry.last() != Some(&i) {
                entry.push(i);
            }
        }
    }

    let mut by_pattern: BTreeMap<Vec<usize>, Vec<String>> = BTreeMap::new();
    for e in first_seen {
        if let Some(members) = membership.get(e) {
            by_pattern
                .entry(members.clone())
                .or_default()
                .push(e.to_string());
        }
    }

    let mut result: Vec<Intersection> = by_pattern
        .into_iter()
        .map(|(members, elements)| Intersection { members, elements })
        .collect();
    result.sort_by(|a, b| {
        b.elements
            .len()
            .cmp(&a.elements.len())
            .then_with(|| a.members.len().cmp(&b.members.len()))
            .then_with(|| a.members.cmp(&b.members))
    });
    result
}

/// Protected outlier ids per successful algorithm of `report`, in suite order.
pub fn overlap_sets(report: &LogReport) -> Vec<(String, Vec<String>)> {
    report
        .algorithms
        .iter()
        .filter_map(|o| {
            o.stats()
                .map(|s| (o.algorithm.clone(), s.protected_outliers.clone()))
        })
        .collect()
}

/// Render an UpSet-style chart of `sets` (category name, elements).
pub fn render_overlap(title: &str, sets: &[(String, Vec<String>)]) -> String {
    let mut svg = String::new();
    // Writing into a String cannot fail.
    let _ = write_overlap(&mut svg, title, sets);
    svg
}

/// Write the UpSet chart of `sets` to `out`.
pub fn write_overlap<W: Write>(
    out: &mut W,
    title: &str,
    sets: &[(String, Vec<String>)],
) -> fmt::Result {
    const LEFT: f64 = 300.0;
    const COLUMN: f64 = 30.0;
    const TOP: f64 = 50.0;
    const BARS: f64 = 180.0;
    const ROW: f64 = 26.0;
    const SIZE_BAR: f64 = 120.0;

    let cuts = intersections(sets);
    let width = LEFT + COLUMN * cuts.len().max(1) as f64 + 40.0;
    let matrix_top = TOP + BARS + 20.0;
    let height = matrix_top + ROW * sets.len().max(1) as f64 + 30.0;

    open_svg(out, width, height)?;
    write!(
        out,
        "<text x=\"{:.1}\" y=\"28\" {FONT} font-size=\"16\" text-anchor=\"middle\">{}</text>",
        width / 2.0,
        xml_escape(title)
    )?;

    if cuts.is_empty() {
        write!(
            out,
            "<text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"12\" text-anchor=\"middle\">no protected outliers</text>",
            width / 2.0,
            TOP + BARS / 2.0
        )?;
    }

    let max_cut = cuts.iter().map(|c| c.elements.len()).max().unwrap_or(0).max(1) as f64;
    for (col, cut) in cuts.iter().enumerate() {
        let x = LEFT + COLUMN * col as f64 + 5.0;
        let h = BARS * cut.elements.len() as f64 / max_cut;
        let y = TOP + BARS - h;
        write!(
            out,
            "<rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{:.1}\" height=\"{h:.1}\" fill=\"#333333\"/>",
            COLUMN - 10.0
        )?;
        write!(
            out,
            "<text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"11\" text-anchor=\"middle\">{}</text>",
            x + (COLUMN - 10.0) / 2.0,
            y - 4.0,
            cut.elements.len()
        )?;
    }

    let max_set = sets.iter().map(|(_, e)| e.len()).max().unwrap_or(0).max(1) as f64;
    for (row, (name, elements)) in sets.iter().enumerate() {
        let cy = matrix_top + ROW * row as f64 + ROW / 2.0;
        if row % 2 == 0 {
            write!(
                out,
                "<rect x=\"0\" y=\"{:.1}\" width=\"{width:.1}\" height=\"{ROW:.1}\" fill=\"#f2f2f2\"/>",
                cy - ROW / 2.0
            )?;
        }
        let bar = SIZE_BAR * elements.len() as f64 / max_set;
        write!(
            out,
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{bar:.1}\" height=\"{:.1}\" fill=\"{}\"/>",
            SIZE_BAR + 10.0 - bar,
            cy - 7.0,
            14.0,
            PALETTE[row % PALETTE.len()]
        )?;
        write!(
            out,
            "<text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"11\">{} ({})</text>",
            SIZE_BAR + 20.0,
            cy + 4.0,
            xml_escape(name),
            elements.len()
        )?;
        for (col, cut) in cuts.iter().enumerate() {
            let cx = LEFT + COLUMN * col as f64 + COLUMN / 2.0;
            let fill = if cut.members.contains(&row) {
                "#333333"
            } else {
                "#cccccc"
            };
            write!(
                out,
                "<circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"6\" fill=\"{fill}\"/>"
            )?;
        }
    }

    for (col, cut) in cuts.iter().enumerate() {
        if let (Some(&first), Some(&last)) = (cut.members.first(), cut.members.last()) {
            if first != last {
                let cx = LEFT + COLUMN * col as f64 + COLUMN / 2.0;
                write!(
                    out,
                    "<line x1=\"{cx:.1}\" y1=\"{:.1}\" x2=\"{cx:.1}\" y2=\"{:.1}\" stroke=\"#333333\" stroke-width=\"2\"/>",
                    matrix_top + ROW * first as f64 + ROW / 2.0,
                    matrix_top + ROW * last as f64 + ROW / 2.0
                )?;
            }
        }
    }

    out.write_str("</svg>")
}

// =============================================================================
// Percentage comparison
// =============================================================================

/// Value of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BarValue {
    Value(f64),
    /// The percentage has an empty base.
    Undefined,
    /// The algorithm failed on this log.
    Failed,
}

/// One log's bars in the comparison chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonGroup {
    pub label: String,
    pub baseline: Percentage,
    /// Bar values keyed by series name.
    pub values: HashMap<String, BarValue>,
}

fn bar_value(p: Percentage) -> BarValue {
    p.value().map_or(BarValue::Undefined, BarValue::Value)
}

/// Series names (baseline first, then algorithms in first-seen order) and one
/// group per report.
pub fn comparison_groups(reports: &[LogReport]) -> (Vec<String>, Vec<ComparisonGroup>) {
    let mut series = vec![constants::BASELINE_SERIES.to_string()];
    let mut groups = Vec::with_capacity(reports.len());
    for report in reports {
        let mut values = HashMap::new();
        values.insert(
            constants::BASELINE_SERIES.to_string(),
            bar_value(report.baseline),
        );
        for outcome in &report.algorithms {
            if !series.contains(&outcome.algorithm) {
                series.push(outcome.algorithm.clone());
            }
            let value = match &outcome.result {
                OutcomeResult::Ok(stats) => bar_value(stats.percentage),
                OutcomeResult::Failed { .. } => BarValue::Failed,
            };
            values.insert(outcome.algorithm.clone(), value);
        }
        groups.push(ComparisonGroup {
            label: report.label.clone(),
            baseline: report.baseline,
            values,
        });
    }
    (series, groups)
}

/// Render the grouped bar chart. Each bar is 0.1 of the spacing between
/// groups; missing values leave an annotated gap.
pub fn render_comparison(series: &[String], groups: &[ComparisonGroup]) -> String {
    let mut svg = String::new();
    let _ = write_comparison(&mut svg, series, groups);
    svg
}

/// Write the grouped bar chart to `out`.
pub fn write_comparison<W: Write>(
    out: &mut W,
    series: &[String],
    groups: &[ComparisonGroup],
) -> fmt::Result {
    const LEFT: f64 = 70.0;
    const TOP: f64 = 50.0;
    const PLOT_HEIGHT: f64 = 320.0;
    const GROUP_SPACING: f64 = 360.0;
    const BAR_WIDTH: f64 = 0.1;
    const LEGEND_WIDTH: f64 = 170.0;

    let plot_width = GROUP_SPACING * groups.len().max(1) as f64;
    let width = LEFT + plot_width + LEGEND_WIDTH;
    let height = TOP + PLOT_HEIGHT + 70.0;
    let bottom = TOP + PLOT_HEIGHT;

    let max_value = groups
        .iter()
        .flat_map(|g| g.values.values())
        .filter_map(|v| match v {
            BarValue::Value(x) => Some(*x),
            _ => None,
        })
        .fold(0.0_f64, f64::max);
    let y_max = ((max_value / 10.0).ceil() * 10.0).clamp(10.0, 100.0).max(max_value);
    let y_of = |v: f64| bottom - PLOT_HEIGHT * (v / y_max);

    open_svg(out, width, height)?;
    write!(
        out,
        "<text x=\"{:.1}\" y=\"28\" {FONT} font-size=\"16\" text-anchor=\"middle\">Percentage of Protected Traces</text>",
        LEFT + plot_width / 2.0
    )?;

    // Axes, ticks and grid.
    for i in 0..=5 {
        let v = y_max * i as f64 / 5.0;
        let y = y_of(v);
        write!(
            out,
            "<line x1=\"{LEFT:.1}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"#e0e0e0\"/>\
             <text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"10\" text-anchor=\"end\">{v:.0}</text>",
            LEFT + plot_width,
            LEFT - 6.0,
            y + 3.0
        )?;
    }
    write!(
        out,
        "<line x1=\"{LEFT:.1}\" y1=\"{TOP:.1}\" x2=\"{LEFT:.1}\" y2=\"{bottom:.1}\" stroke=\"#000000\"/>\
         <line x1=\"{LEFT:.1}\" y1=\"{bottom:.1}\" x2=\"{:.1}\" y2=\"{bottom:.1}\" stroke=\"#000000\"/>",
        LEFT + plot_width
    )?;
    write!(
        out,
        "<text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"12\" text-anchor=\"middle\">Dataset</text>",
        LEFT + plot_width / 2.0,
        height - 12.0
    )?;
    write!(
        out,
        "<text x=\"18\" y=\"{:.1}\" {FONT} font-size=\"12\" text-anchor=\"middle\" transform=\"rotate(-90 18 {:.1})\">Percentage, %</text>",
        TOP + PLOT_HEIGHT / 2.0,
        TOP + PLOT_HEIGHT / 2.0
    )?;

    let bar_px = BAR_WIDTH * GROUP_SPACING;
    let k = series.len() as f64;
    for (g, group) in groups.iter().enumerate() {
        let center = LEFT + GROUP_SPACING * (g as f64 + 0.5);
        let first_left = center - bar_px * k / 2.0;

        for (s, name) in series.iter().enumerate() {
            let x = first_left + bar_px * s as f64;
            let colour = PALETTE[s % PALETTE.len()];
            match group.values.get(name).copied().unwrap_or(BarValue::Undefined) {
                BarValue::Value(v) => {
                    let y = y_of(v);
                    write!(
                        out,
                        "<rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{bar_px:.1}\" height=\"{:.1}\" fill=\"{colour}\"><title>{}: {v:.2}</title></rect>",
                        bottom - y,
                        xml_escape(name)
                    )?;
                }
                missing => {
                    let note = if missing == BarValue::Failed {
                        "failed"
                    } else {
                        "n/a"
                    };
                    write!(
                        out,
                        "<text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"9\" fill=\"{colour}\" text-anchor=\"middle\">{note}</text>",
                        x + bar_px / 2.0,
                        bottom - 4.0
                    )?;
                }
            }
        }

        if let Some(base) = group.baseline.value() {
            let y = y_of(base);
            write!(
                out,
                "<line x1=\"{first_left:.1}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"#000000\" stroke-width=\"1.5\" stroke-dasharray=\"6,4\"/>",
                first_left + bar_px * k
            )?;
        }
        write!(
            out,
            "<text x=\"{center:.1}\" y=\"{:.1}\" {FONT} font-size=\"12\" text-anchor=\"middle\">{}</text>",
            bottom + 18.0,
            xml_escape(&group.label)
        )?;
    }

    // Legend.
    let legend_x = LEFT + plot_width + 20.0;
    for (s, name) in series.iter().enumerate() {
        let y = TOP + 18.0 * s as f64;
        write!(
            out,
            "<rect x=\"{legend_x:.1}\" y=\"{y:.1}\" width=\"12\" height=\"12\" fill=\"{}\"/>\
             <text x=\"{:.1}\" y=\"{:.1}\" {FONT} font-size=\"11\">{}</text>",
            PALETTE[s % PALETTE.len()],
            legend_x + 18.0,
            y + 10.0,
            xml_escape(name)
        )?;
    }

    out.write_str("</svg>")
}

fn open_svg<W: Write>(out: &mut W, width: f64, height: f64) -> fmt::Result {
    write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.0} {height:.0}\">\
         <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>"
    )
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{AlgorithmOutcome, AlgorithmStats, FitnessKey};
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::path::PathBuf;

    fn set(name: &str, ids: &[&str]) -> (String, Vec<String>) {
        (name.to_string(), ids.iter().map(|s| s.to_string()).collect())
    }

    fn assert_well_formed(svg: &str) {
        let mut reader = Reader::from_str(svg);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => panic!("malformed SVG: {e}"),
            }
        }
    }

    #[test]
    fn test_intersections_sorted_by_size() {
        let sets = vec![
            set("A", &["1", "2", "3"]),
            set("B", &["2", "3", "4"]),
            set("C", &["3"]),
        ];
        let cuts = intersections(&sets);
        let shape: Vec<(Vec<usize>, Vec<&str>)> = cuts
            .iter()
            .map(|c| (c.members.clone(), c.elements.iter().map(String::as_str).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (vec![0], vec!["1"]),
                (vec![1], vec!["4"]),
                (vec![0, 1], vec!["2"]),
                (vec![0, 1, 2], vec!["3"]),
            ]
        );
    }

    #[test]
    fn test_overlap_svg() {
        let sets = vec![set("Alpha Miner", &["1", "2"]), set("Declare", &["2"])];
        let svg = render_overlap("log_high protected", &sets);
        assert_well_formed(&svg);
        assert!(svg.contains("log_high protected"));
        assert!(svg.contains("Alpha Miner (2)"));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("<line"), "multi-member column is connected");
    }

    #[test]
    fn test_overlap_svg_empty() {
        let svg = render_overlap("x &amp; y", &[set("A", &[])]);
        assert_well_formed(&svg);
        assert!(svg.contains("no protected outliers"));
    }

    fn report(label: &str, baseline: Percentage, outcomes: Vec<(&str, Option<Percentage>)>) -> LogReport {
        LogReport {
            log_path: PathBuf::from(format!("{label}.xes")),
            label: label.to_string(),
            case_count: 10,
            event_count: 30,
            baseline,
            algorithms: outcomes
                .into_iter()
                .map(|(name, p)| AlgorithmOutcome {
                    algorithm: name.to_string(),
                    duration_ms: 1,
                    result: match p {
                        Some(percentage) => OutcomeResult::Ok(AlgorithmStats {
                            fitness_key: FitnessKey::TraceFitness,
                            outliers: 2,
                            protected_outliers: vec![],
                            percentage,
                            average_fitness: Some(0.9),
                            fitting_percentage: Percentage::Defined(80.0),
                        }),
                        None => OutcomeResult::Failed {
                            error: "boom".into(),
                        },
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_comparison_groups_and_svg() {
        let reports = vec![
            report(
                "High",
                Percentage::Defined(20.0),
                vec![
                    ("Alpha Miner", Some(Percentage::Defined(50.0))),
                    ("Split Miner", None),
                ],
            ),
            report(
                "Low",
                Percentage::Defined(10.0),
                vec![
                    ("Alpha Miner", Some(Percentage::Undefined)),
                    ("Split Miner", Some(Percentage::Defined(0.0))),
                ],
            ),
        ];
        let (series, groups) = comparison_groups(&reports);
        assert_eq!(series, vec!["Dataset", "Alpha Miner", "Split Miner"]);
        assert_eq!(groups[0].values["Split Miner"], BarValue::Failed);
        assert_eq!(groups[1].values["Alpha Miner"], BarValue::Undefined);
        assert_eq!(groups[0].values["Dataset"], BarValue::Value(20.0));

        let svg = render_comparison(&series, &groups);
        assert_well_formed(&svg);
        assert!(svg.contains("Percentage of Protected Traces"));
        assert!(svg.contains("Percentage, %"));
        assert!(svg.contains(">failed<"));
        assert!(svg.contains(">n/a<"));
        assert_eq!(svg.matches("stroke-dasharray").count(), 2);
        assert!(svg.contains(">High<") && svg.contains(">Low<"));
    }

    /// Accepts `limit` bytes, then fails every write.
    struct Bounded {
        buf: String,
        limit: usize,
    }

    impl Write for Bounded {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            if self.buf.len() + s.len() > self.limit {
                return Err(fmt::Error);
            }
            self.buf.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_writer_errors_propagate() {
        let sets = vec![set("Alpha Miner", &["c1", "c2"]), set("Declare", &["c2"])];
        let full = render_overlap("t", &sets);
        let mut out = Bounded {
            buf: String::new(),
            limit: full.len() / 2,
        };
        assert!(write_overlap(&mut out, "t", &sets).is_err());
        assert!(out.buf.len() < full.len());
        assert!(!out.buf.ends_with("</svg>"));

        let mut out = Bounded {
            buf: String::new(),
            limit: full.len(),
        };
        write_overlap(&mut out, "t", &sets).unwrap();
        assert_eq!(out.buf, full);

        let mut out = Bounded {
            buf: String::new(),
            limit: 10,
        };
        assert!(write_comparison(&mut out, &[], &[]).is_err());
    }
}
