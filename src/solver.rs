use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::CutOptions;
use crate::context::Allocation;
use crate::donor::{Candidate, Combination, SearchRequest, find_exact};
use crate::normalize::{normalize, validate};
use crate::pattern::best_pattern;
use crate::types::{
    CutError, CutPlan, KindPlan, NormalizedOrder, Order, Origin, PlanResponse, UsageItem,
};

/// Ids for hypothetical offcuts in the co-packing probe; never issued by the pool.
const PROBE_IDS: [u32; 2] = [u32::MAX, u32::MAX - 1];

pub struct Solver<'a> {
    options: &'a CutOptions,
    orders: &'a [Order],
}

impl<'a> Solver<'a> {
    pub fn new(options: &'a CutOptions, orders: &'a [Order]) -> Self {
        Self { options, orders }
    }

    pub fn solve(&self) -> Result<CutPlan, CutError> {
        let opts = self.options;
        let mut ctx = Allocation::new(opts);

        let (valid, dropped) = validate(self.orders);
        ctx.dropped_rows = dropped;

        let mut to_cut = Vec::with_capacity(valid.len());
        for o in valid {
            if opts.anti.forbids_cutting(o.length) {
                debug!(length = o.length, width = o.width, count = o.count, "forced: not cut");
                ctx.force(o.length, o.width, o.count);
                continue;
            }
            to_cut.push(o);
        }
        if let Some(first) = to_cut.first()
            && opts.sheet_width == 0
        {
            return Err(CutError::TooWide {
                length: first.length,
                width: first.width,
                sheet_width: 0,
            });
        }

        let (rows, overflowed) = normalize(&to_cut, opts.sheet_width);
        ctx.dropped_rows += overflowed;
        for (length, mut group) in self.group_by_length(rows) {
            if opts.use_patterns {
                ctx.apply_patterns(length, &mut group);
            }
            for row in &group {
                match row.origin {
                    Origin::SplitRest => ctx.resolve_tail_row(row),
                    Origin::Native | Origin::SplitFull => ctx.allocate(row)?,
                }
            }
            ctx.flush_tails(length);
        }
        ctx.flush_all_tails();

        let plan = ctx.into_plan();
        info!(
            sheets = plan.sheet_count(),
            leftovers = plan.leftovers.len(),
            closed_from_leftovers = plan.used_from_leftovers.len(),
            scrap_needs = plan.scrap_needs.len(),
            dropped_rows = plan.dropped_rows,
            "cut plan computed"
        );
        Ok(plan)
    }

    /// Rows merged per (origin, width, strips), grouped by length, longest
    /// length first. Within a length: widest first, or smallest `W mod B`
    /// first when ordering by remainder. A merge that would overflow the
    /// count keeps the row separate.
    fn group_by_length(&self, rows: Vec<NormalizedOrder>) -> Vec<(u32, Vec<NormalizedOrder>)> {
        let sheet_width = self.options.sheet_width;
        let mut by_length: BTreeMap<u32, Vec<NormalizedOrder>> = BTreeMap::new();
        for row in rows {
            let group = by_length.entry(row.length).or_default();
            match group.iter_mut().find(|g| {
                g.origin == row.origin
                    && g.width == row.width
                    && g.strips == row.strips
                    && g.count.checked_add(row.count).is_some()
            }) {
                Some(g) => g.count += row.count,
                None => group.push(row),
            }
        }

        by_length
            .into_iter()
            .rev()
            .map(|(length, mut group)| {
                if self.options.order_by_remainder {
                    group.sort_by(|a, b| {
                        (sheet_width % a.width)
                            .cmp(&(sheet_width % b.width))
                            .then(b.width.cmp(&a.width))
                    });
                } else {
                    group.sort_by(|a, b| b.width.cmp(&a.width));
                }
                (length, group)
            })
            .collect()
    }
}

impl Allocation<'_> {
    /// Allocates every piece of one ordinary row: from remnants where
    /// possible, otherwise from fresh sheets.
    pub(crate) fn allocate(&mut self, row: &NormalizedOrder) -> Result<(), CutError> {
        let length = row.length;
        let need = row.width;
        let sheet_width = self.opts.sheet_width;
        let mut remaining = row.count;

        while remaining > 0 {
            let all = self.candidates(length);
            let (same, other): (Vec<Candidate>, Vec<Candidate>) =
                all.iter().partition(|c| c.length == length);

            if remaining > 1
                && let Some(sheets) = self.co_pack_probe(length, need, remaining, &same, &other)
            {
                remaining -= sheets;
                continue;
            }

            if same.is_empty() && !other.is_empty() && self.close_last_run(length, need, remaining) {
                remaining = 0;
                continue;
            }

            if let Some(combo) = self.find_donors(length, need, &same, &all) {
                self.close_from_donors(length, need, &combo, 0);
                remaining -= 1;
                continue;
            }

            let per_sheet = sheet_width / need;
            if per_sheet == 0 {
                return Err(CutError::TooWide {
                    length,
                    width: need,
                    sheet_width,
                });
            }
            let take = remaining.min(per_sheet);
            self.record_sheets(
                length,
                1,
                vec![UsageItem {
                    width: need,
                    count: take,
                }],
            );
            remaining -= take;
        }
        Ok(())
    }

    /// Exact closure in widening circles: same-length donors only, then
    /// mixed with at least one same-length donor, then anything eligible.
    /// A combination the donor cap rejects counts as not found.
    fn find_donors(
        &self,
        length: u32,
        need: u32,
        same: &[Candidate],
        all: &[Candidate],
    ) -> Option<Combination> {
        let anti = &self.opts.anti;
        let req = SearchRequest::new(need, length, self.opts.tolerance_l);

        if let Some(combo) = anti.cap_donors(need, length, find_exact(req, same)) {
            return Some(combo);
        }
        if !same.is_empty() {
            let mixed = find_exact(req.requiring_same_length(true), all);
            if let Some(combo) = anti.cap_donors(need, length, mixed) {
                return Some(combo);
            }
        }
        anti.cap_donors(need, length, find_exact(req, all))
    }

    /// When closing needs foreign donors, check whether the offcut `W - B` of
    /// a one-piece cut would itself serve this length. If so, commit one (or
    /// two) such sheets now. Returns the number of pieces cut.
    fn co_pack_probe(
        &mut self,
        length: u32,
        need: u32,
        remaining: u32,
        same: &[Candidate],
        other: &[Candidate],
    ) -> Option<u32> {
        let offcut = self.opts.sheet_width.checked_sub(need)?;
        if !self.pool.keeps(offcut) {
            return None;
        }
        let opts = self.opts;
        let anti = &opts.anti;
        let req = SearchRequest::new(need, length, opts.tolerance_l);

        if anti.cap_donors(need, length, find_exact(req, same)).is_some() {
            return None;
        }
        let mut mixed = same.to_vec();
        mixed.extend_from_slice(other);
        let needs_foreign = anti
            .cap_donors(need, length, find_exact(req.requiring_same_length(true), &mixed))
            .is_some();
        if !needs_foreign {
            return None;
        }

        for probes in 1..=2u32 {
            if probes == 2 && remaining <= 2 {
                break;
            }
            let ids = &PROBE_IDS[..probes as usize];
            let mut with_probe = same.to_vec();
            with_probe.extend(ids.iter().map(|&id| Candidate {
                id,
                length,
                width: offcut,
            }));
            let uses_probe = anti
                .cap_donors(need, length, find_exact(req, &with_probe))
                .is_some_and(|c| ids.iter().any(|&id| c.touches(id)));
            if uses_probe {
                debug!(length, need, offcut, sheets = probes, "co-packing one piece per sheet");
                self.record_sheets(
                    length,
                    probes,
                    vec![UsageItem {
                        width: need,
                        count: 1,
                    }],
                );
                return Some(probes);
            }
        }
        None
    }

    /// The last incomplete sheet of a row: close it from foreign remnants
    /// with a tolerated missing width instead of cutting.
    fn close_last_run(&mut self, length: u32, need: u32, remaining: u32) -> bool {
        if self.opts.anti.last_missing_limit().is_none() {
            return false;
        }
        let per_sheet = self.opts.sheet_width / need;
        if per_sheet == 0 || remaining >= per_sheet {
            return false;
        }
        self.try_close_with_scrap(length, need, remaining, true)
    }

    /// Cuts whole-sheet patterns over the non-tail demand of `length` and
    /// deducts them from `group`.
    pub(crate) fn apply_patterns(&mut self, length: u32, group: &mut [NormalizedOrder]) {
        loop {
            let mut demand: BTreeMap<u32, u32> = BTreeMap::new();
            for row in group.iter().filter(|r| r.origin != Origin::SplitRest) {
                if row.count > 0 {
                    let d = demand.entry(row.width).or_insert(0);
                    *d = d.saturating_add(row.count);
                }
            }
            let Some(pattern) =
                best_pattern(&demand, self.opts.sheet_width, self.opts.min_leftover)
            else {
                break;
            };
            let times = pattern.repeats(&demand);
            if times == 0 {
                break;
            }
            debug!(length, times, waste = pattern.waste, "applying pattern");

            for item in &pattern.take {
                let mut left = item.count * times;
                for row in group
                    .iter_mut()
                    .filter(|r| r.origin != Origin::SplitRest && r.width == item.width)
                {
                    let used = row.count.min(left);
                    row.count -= used;
                    left -= used;
                }
            }
            self.record_sheets(length, times, pattern.take);
        }
    }
}

/// Computes the cutting plan for `orders`.
pub fn calculate_cuts(orders: &[Order], options: &CutOptions) -> Result<CutPlan, CutError> {
    Solver::new(options, orders).solve()
}

/// Runs an independent calculation per material kind, in first-seen order.
pub fn calculate_grouped(orders: &[Order], options: &CutOptions) -> Vec<KindPlan> {
    let mut groups: Vec<(String, Vec<Order>)> = Vec::new();
    for o in orders {
        let kind = o.kind.as_deref().map(str::trim).unwrap_or_default();
        match groups.iter_mut().find(|(k, _)| k == kind) {
            Some((_, list)) => list.push(o.clone()),
            None => groups.push((kind.to_string(), vec![o.clone()])),
        }
    }
    groups
        .into_iter()
        .map(|(kind, orders)| KindPlan {
            kind,
            result: PlanResponse::from_result(
                calculate_cuts(&orders, options),
                options.tail_wanted_b,
            ),
        })
        .collect()
}
