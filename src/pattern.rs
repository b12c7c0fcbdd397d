use std::collections::BTreeMap;

use crate::types::UsageItem;

/// A single-sheet layout: how many pieces of each width, and what is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Widest first.
    pub take: Vec<UsageItem>,
    pub waste: u32,
}

impl Pattern {
    /// How many times the pattern fits into `demand`.
    pub fn repeats(&self, demand: &BTreeMap<u32, u32>) -> u32 {
        self.take
            .iter()
            .map(|i| demand.get(&i.width).copied().unwrap_or(0) / i.count)
            .min()
            .unwrap_or(0)
    }
}

/// Finds the least-waste way to fill one sheet from `demand` (width -> pieces).
///
/// Bounded knapsack over the sheet width; each width is used at most as many
/// times as it is demanded. A non-zero waste narrower than `min_leftover`
/// would become scrap, so such layouts are rejected.
pub fn best_pattern(demand: &BTreeMap<u32, u32>, sheet_width: u32, min_leftover: u32) -> Option<Pattern> {
    let w = sheet_width as usize;
    // reach[s] = (previous fill, width added) for the first way to fill s.
    let mut reach: Vec<Option<(usize, u32)>> = vec![None; w + 1];
    reach[0] = Some((0, 0));

    for (&width, &qty) in demand.iter().rev() {
        if width == 0 || width > sheet_width || qty == 0 {
            continue;
        }
        let copies = qty.min(sheet_width / width);
        let b = width as usize;
        for _ in 0..copies {
            for s in (b..=w).rev() {
                if reach[s].is_none() && reach[s - b].is_some() {
                    reach[s] = Some((s - b, width));
                }
            }
        }
    }

    let fill = (1..=w).rev().find(|&s| {
        let waste = (w - s) as u32;
        reach[s].is_some() && (waste == 0 || waste >= min_leftover)
    })?;

    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
    let mut s = fill;
    while s > 0 {
        let (prev, width) = reach[s]?;
        *counts.entry(width).or_insert(0) += 1;
        s = prev;
    }
    Some(Pattern {
        take: counts
            .into_iter()
            .rev()
            .map(|(width, count)| UsageItem { width, count })
            .collect(),
        waste: (w - fill) as u32,
    })
}
