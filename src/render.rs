use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::types::{CutPlan, OffcutFate, SheetCut};

const MAX_WIDTH: f64 = 80.0;

/// Draws one sheet as a horizontal strip: pieces labelled by width, a kept
/// offcut filled with `~`, a scrapped one with `x`.
pub fn render_cut(sheet_width: u32, cut: &SheetCut) -> String {
    if sheet_width == 0 {
        return String::new();
    }
    let scale = MAX_WIDTH / sheet_width as f64;
    let cols = (sheet_width as f64 * scale).round() as usize;
    let mut grid = vec![vec![' '; cols + 1]; 3];

    let mut segments: Vec<(u32, u32, char)> = Vec::new();
    let mut x = 0;
    for item in &cut.items {
        for _ in 0..item.count {
            segments.push((x, item.width, ' '));
            x += item.width;
        }
    }
    if cut.offcut_width > 0 {
        let fill = match cut.offcut {
            OffcutFate::Remnant => '~',
            OffcutFate::Scrap | OffcutFate::None => 'x',
        };
        segments.push((x, cut.offcut_width, fill));
    }

    for (start, width, fill) in segments {
        let sx = (start as f64 * scale).round() as usize;
        let ex = ((start + width) as f64 * scale).round() as usize;
        if ex <= sx {
            continue;
        }
        draw_segment(&mut grid, sx, ex, fill, &width.to_string());
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

fn draw_segment(grid: &mut [Vec<char>], sx: usize, ex: usize, fill: char, label: &str) {
    let cols = grid[0].len();
    for i in sx..=ex.min(cols - 1) {
        for row in [0, 2] {
            if grid[row][i] != '+' {
                grid[row][i] = '-';
            }
        }
        if i > sx && i < ex {
            grid[1][i] = fill;
        }
    }
    for edge in [sx, ex] {
        if edge < cols {
            grid[0][edge] = '+';
            grid[2][edge] = '+';
            grid[1][edge] = '|';
        }
    }

    let label: Vec<char> = label.chars().collect();
    let inner = ex - sx - 1;
    if label.len() <= inner {
        let start = sx + 1 + (inner - label.len()) / 2;
        for (i, &ch) in label.iter().enumerate() {
            grid[1][start + i] = ch;
        }
    }
}

/// Remnant closures of one (length, width), with donors counted by "LxB".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureSummary {
    pub length: u32,
    pub width: u32,
    pub count: u32,
    pub fallback: bool,
    pub missing: u32,
    pub donors: BTreeMap<String, u32>,
}

pub fn summarize_closures(plan: &CutPlan) -> Vec<ClosureSummary> {
    let mut by_piece: BTreeMap<(u32, u32), ClosureSummary> = BTreeMap::new();
    for ev in &plan.used_from_leftovers {
        let entry = by_piece
            .entry((ev.length, ev.width))
            .or_insert_with(|| ClosureSummary {
                length: ev.length,
                width: ev.width,
                count: 0,
                fallback: false,
                missing: 0,
                donors: BTreeMap::new(),
            });
        entry.count += ev.count;
        entry.fallback |= ev.uses_length_fallback;
        entry.missing += ev.missing;
        for p in &ev.parts {
            *entry
                .donors
                .entry(format!("{}x{}", p.length, p.width_before))
                .or_insert(0) += 1;
        }
    }
    by_piece.into_values().collect()
}

/// Plain-text report of a plan, grouped by length.
pub fn render_report(plan: &CutPlan, layout: bool) -> String {
    let mut out = String::new();

    for group in &plan.sheet_usage {
        let _ = writeln!(
            out,
            "Length {}: {} sheet{} of {}",
            group.length,
            group.sheet_count,
            if group.sheet_count == 1 { "" } else { "s" },
            group.sheet_width
        );
        for item in &group.items {
            let _ = writeln!(out, "  {} x {} pcs", item.width, item.count);
        }
        if layout {
            for cut in plan.cut_log.iter().filter(|c| c.length == group.length) {
                let _ = writeln!(out, "  {} x", cut.sheets);
                out.push_str(&render_cut(group.sheet_width, cut));
            }
        }
    }

    let closures = summarize_closures(plan);
    if !closures.is_empty() {
        out.push_str("From leftovers:\n");
        for c in &closures {
            let donors: Vec<String> = c
                .donors
                .iter()
                .map(|(k, n)| if *n == 1 { k.clone() } else { format!("{} ({})", k, n) })
                .collect();
            let _ = write!(out, "  {} x {}: {} pcs <- {}", c.length, c.width, c.count, donors.join(", "));
            if c.fallback {
                out.push_str(" [length fallback]");
            }
            if c.missing > 0 {
                let _ = write!(out, " [missing {} mm from scrap]", c.missing);
            }
            out.push('\n');
        }
    }

    if !plan.scrap_needs.is_empty() {
        let _ = writeln!(out, "Source from scrap (tails <= {}):", plan.wanted_scrap_b);
        for s in &plan.scrap_needs {
            let _ = writeln!(out, "  {} x {}: {} pcs (k={})", s.length, s.rest_b, s.count, s.k);
        }
    }

    if !plan.forced_map.is_empty() {
        out.push_str("Not cut (source from scrap):\n");
        for (key, count) in &plan.forced_map {
            let _ = writeln!(out, "  {}: {} pcs", key, count);
        }
    }

    if !plan.scrap_produced.is_empty() {
        out.push_str("Scrap produced:\n");
        for s in &plan.scrap_produced {
            let _ = writeln!(out, "  {} x {} ({})", s.length, s.width, s.count);
        }
    }

    if !plan.leftovers.is_empty() {
        out.push_str("Leftovers:\n");
        for r in &plan.leftovers {
            let _ = writeln!(out, "  #{} {} x {}", r.id, r.length, r.width);
        }
    }

    let sheets = plan.sheet_count();
    let _ = writeln!(
        out,
        "Summary: {} sheet{} cut, {:.1}% scrap",
        sheets,
        if sheets == 1 { "" } else { "s" },
        plan.waste_percent()
    );
    if plan.dropped_rows > 0 {
        let _ = writeln!(out, "Skipped {} invalid order row(s)", plan.dropped_rows);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DonorPick, UsageItem, UsedFromLeftover};

    fn cut(items: &[(u32, u32)], offcut_width: u32, offcut: OffcutFate) -> SheetCut {
        SheetCut {
            length: 3000,
            sheets: 1,
            items: items
                .iter()
                .map(|&(width, count)| UsageItem { width, count })
                .collect(),
            offcut_width,
            offcut,
        }
    }

    #[test]
    fn test_render_pieces_and_remnant() {
        let output = render_cut(1000, &cut(&[(300, 3)], 100, OffcutFate::Remnant));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('+'));
        assert!(lines[1].contains("300"));
        assert!(lines[1].contains('~'));
        assert_eq!(lines[1].matches('|').count(), 5);
    }

    #[test]
    fn test_render_scrap_offcut() {
        let output = render_cut(1000, &cut(&[(450, 2)], 100, OffcutFate::Scrap));
        assert!(output.contains('x'));
        assert!(!output.contains('~'));
    }

    #[test]
    fn test_render_full_sheet() {
        let output = render_cut(1000, &cut(&[(1000, 1)], 0, OffcutFate::None));
        assert!(output.contains("1000"));
        assert_eq!(output.lines().nth(1).unwrap().matches('|').count(), 2);
    }

    #[test]
    fn test_summarize_closures() {
        let mut plan = CutPlan::empty(0);
        for (id, used) in [(1, 300), (2, 300)] {
            plan.used_from_leftovers.push(UsedFromLeftover {
                length: 3000,
                width: 300,
                parts: vec![DonorPick {
                    id,
                    length: 3001,
                    width_before: 400,
                    width_used: used,
                }],
                uses_length_fallback: false,
                missing: 0,
                count: 1,
            });
        }
        let summary = summarize_closures(&plan);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].donors.get("3001x400"), Some(&2));

        let report = render_report(&plan, false);
        assert!(report.contains("3000 x 300: 2 pcs <- 3001x400 (2)"));
    }
}
