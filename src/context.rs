use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::CutOptions;
use crate::donor::{Candidate, Combination, SearchRequest, find_partial};
use crate::pool::{Eligibility, RemnantPool};
use crate::tail::TailQueue;
use crate::types::{
    CutPlan, DonorPick, OffcutFate, ScrapNeed, ScrapProduced, SheetCut, SheetUsageGroup,
    UsageItem, UsedFromLeftover,
};

/// All mutable state of one calculation.
pub(crate) struct Allocation<'a> {
    pub opts: &'a CutOptions,
    pub pool: RemnantPool,
    pub tails: TailQueue,
    pub scrap_needs: Vec<ScrapNeed>,
    pub dropped_rows: u32,
    sheet_usage: Vec<SheetUsageGroup>,
    used_from_leftovers: Vec<UsedFromLeftover>,
    scrap_produced: Vec<ScrapProduced>,
    forced: BTreeMap<String, u32>,
    cut_log: Vec<SheetCut>,
}

impl<'a> Allocation<'a> {
    pub fn new(opts: &'a CutOptions) -> Self {
        Self {
            opts,
            pool: RemnantPool::new(opts.min_leftover),
            tails: TailQueue::default(),
            scrap_needs: Vec::new(),
            dropped_rows: 0,
            sheet_usage: Vec::new(),
            used_from_leftovers: Vec::new(),
            scrap_produced: Vec::new(),
            forced: BTreeMap::new(),
            cut_log: Vec::new(),
        }
    }

    pub fn eligibility(&self, order_length: u32) -> Eligibility {
        Eligibility {
            order_length,
            tolerance: self.opts.tolerance_l,
            allow_fallback: self.opts.allow_fallback,
        }
    }

    pub fn candidates(&self, order_length: u32) -> Vec<Candidate> {
        self.pool.candidates(self.eligibility(order_length))
    }

    pub fn force(&mut self, length: u32, width: u32, count: u32) {
        *self.forced.entry(format!("{}x{}", length, width)).or_insert(0) += count;
    }

    pub fn push_scrap(&mut self, length: u32, width: u32, count: u32) {
        if length > 0 && width > 0 && count > 0 {
            self.scrap_produced.push(ScrapProduced {
                length,
                width,
                count,
            });
        }
    }

    /// Cuts `sheets` identical sheets carrying `items` each. The offcut of
    /// every sheet goes to the pool or, if too narrow to keep, to scrap.
    pub fn record_sheets(&mut self, length: u32, sheets: u32, items: Vec<UsageItem>) {
        let width = self.opts.sheet_width;
        let used: u32 = items.iter().map(|i| i.width * i.count).sum();
        debug_assert!(used <= width, "sheet overfilled: {} > {}", used, width);
        let offcut_width = width.saturating_sub(used);

        let group = match self.sheet_usage.iter().position(|g| g.length == length) {
            Some(idx) => &mut self.sheet_usage[idx],
            None => {
                self.sheet_usage.push(SheetUsageGroup {
                    length,
                    sheet_width: width,
                    sheet_count: 0,
                    items: Vec::new(),
                });
                let last = self.sheet_usage.len() - 1;
                &mut self.sheet_usage[last]
            }
        };
        group.sheet_count = group.sheet_count.saturating_add(sheets);
        group.items.extend(items.iter().map(|i| UsageItem {
            width: i.width,
            count: i.count.saturating_mul(sheets),
        }));

        let offcut = if self.pool.keeps(offcut_width) {
            for _ in 0..sheets {
                self.pool.push(length, offcut_width);
            }
            OffcutFate::Remnant
        } else if offcut_width > 0 {
            self.push_scrap(length, offcut_width, sheets);
            OffcutFate::Scrap
        } else {
            OffcutFate::None
        };

        debug!(length, sheets, used, offcut_width, ?offcut, "cut sheets");
        self.cut_log.push(SheetCut {
            length,
            sheets,
            items,
            offcut_width,
            offcut,
        });
    }

    /// Applies `combo` to the pool and records one closed piece.
    ///
    /// Donors longer than the order's tolerance lose their overhang to scrap.
    /// A pick whose donor is gone counts towards `missing`.
    pub fn close_from_donors(
        &mut self,
        order_length: u32,
        width: u32,
        combo: &Combination,
        mut missing: u32,
    ) {
        let tolerance = self.opts.tolerance_l;
        let mut parts = Vec::with_capacity(combo.picks.len());
        for pick in &combo.picks {
            let Some(before) = self.pool.consume(pick.donor.id, pick.used) else {
                warn!(id = pick.donor.id, used = pick.used, "donor no longer in pool");
                missing += pick.used;
                continue;
            };
            let overhang = pick.donor.length.saturating_sub(order_length);
            if overhang > tolerance {
                self.push_scrap(overhang, pick.used, 1);
            }
            parts.push(DonorPick {
                id: pick.donor.id,
                length: pick.donor.length,
                width_before: before,
                width_used: pick.used,
            });
        }
        self.pool.prune(&mut self.scrap_produced);

        let uses_length_fallback = combo.uses_fallback(order_length, tolerance);
        debug!(
            length = order_length,
            width,
            donors = parts.len(),
            missing,
            uses_length_fallback,
            "closed piece from remnants"
        );
        self.used_from_leftovers.push(UsedFromLeftover {
            length: order_length,
            width,
            parts,
            uses_length_fallback,
            missing,
            count: 1,
        });
    }

    /// Tries to close `qty` pieces of width `need` from remnants, leaving at
    /// most the configured missing width per piece to be sourced from scrap.
    ///
    /// Every piece is planned against a copy of the pool first; the pool is
    /// only touched when all of them succeed. With `allow_pure_missing` off a
    /// piece must take at least one real donor.
    pub fn try_close_with_scrap(
        &mut self,
        order_length: u32,
        need: u32,
        qty: u32,
        allow_pure_missing: bool,
    ) -> bool {
        let Some(limit) = self.opts.anti.last_missing_limit() else {
            return false;
        };
        if qty == 0 || need == 0 {
            return false;
        }

        let filter = self.eligibility(order_length);
        let min = self.opts.min_leftover;
        let req = SearchRequest::new(need, order_length, self.opts.tolerance_l);
        let pure_missing_ok = allow_pure_missing && need <= limit;

        let mut sim: Vec<Candidate> = self
            .pool
            .remnants()
            .iter()
            .map(|r| Candidate {
                id: r.id,
                length: r.length,
                width: r.width,
            })
            .collect();
        let mut planned = Vec::with_capacity(qty as usize);

        for _ in 0..qty {
            let eligible: Vec<Candidate> = sim
                .iter()
                .filter(|c| c.width > 0 && c.width >= min && filter.admits(c.length))
                .copied()
                .collect();
            let (same, other): (Vec<Candidate>, Vec<Candidate>) = eligible
                .into_iter()
                .partition(|c| c.length == order_length);

            let mut combo = find_partial(req, &same);
            if need - combo.total_used() > limit {
                let must_same = !same.is_empty();
                let mut mixed = same;
                mixed.extend(other);
                combo = find_partial(req.requiring_same_length(must_same), &mixed);
            }
            if need - combo.total_used() > limit {
                if !pure_missing_ok {
                    return false;
                }
                combo = Combination::default();
            }
            let combo = match self.opts.anti.cap_donors(need, order_length, Some(combo)) {
                Some(c) => c,
                None if pure_missing_ok => Combination::default(),
                None => return false,
            };
            if combo.picks.is_empty() && !allow_pure_missing {
                return false;
            }

            for pick in &combo.picks {
                if let Some(c) = sim.iter_mut().find(|c| c.id == pick.donor.id) {
                    c.width = c.width.saturating_sub(pick.used);
                    if c.width < min {
                        c.width = 0;
                    }
                }
            }
            planned.push(combo);
        }

        debug!(length = order_length, need, qty, "no-cut closure committed");
        for combo in &planned {
            let missing = need - combo.total_used();
            self.close_from_donors(order_length, need, combo, missing);
        }
        true
    }

    pub fn into_plan(self) -> CutPlan {
        CutPlan {
            sheet_usage: self.sheet_usage,
            leftovers: self.pool.into_remnants(),
            used_from_leftovers: self.used_from_leftovers,
            scrap_needs: self.scrap_needs,
            scrap_produced: self.scrap_produced,
            wanted_scrap_b: self.opts.tail_wanted_b,
            forced_map: self.forced,
            cut_log: self.cut_log,
            dropped_rows: self.dropped_rows,
        }
    }
}
