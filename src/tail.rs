//! Remainder-width ("tail") demand left by splitting oversize orders.

use std::collections::BTreeMap;

use tracing::debug;

use crate::context::Allocation;
use crate::donor::{SearchRequest, find_exact};
use crate::types::{NormalizedOrder, Origin, ScrapNeed, UsageItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailDemand {
    pub rest: u32,
    pub strips: u32,
    pub count: u32,
}

/// Outstanding tail demand per length, in arrival order.
#[derive(Debug, Default)]
pub struct TailQueue {
    by_length: BTreeMap<u32, Vec<TailDemand>>,
}

impl TailQueue {
    pub fn push(&mut self, length: u32, rest: u32, strips: u32, count: u32) {
        let queue = self.by_length.entry(length).or_default();
        match queue
            .iter_mut()
            .find(|d| d.rest == rest && d.strips == strips && d.count.checked_add(count).is_some())
        {
            Some(d) => d.count += count,
            None => queue.push(TailDemand {
                rest,
                strips,
                count,
            }),
        }
    }

    pub fn take(&mut self, length: u32) -> Vec<TailDemand> {
        self.by_length.remove(&length).unwrap_or_default()
    }

    /// Lengths with queued demand, longest first.
    pub fn pending_lengths(&self) -> Vec<u32> {
        self.by_length.keys().rev().copied().collect()
    }
}

impl Allocation<'_> {
    fn wants_scrap(&self, rest: u32) -> bool {
        self.opts.tail_wanted_b > 0 && rest <= self.opts.tail_wanted_b
    }

    /// Closes what it can of a tail row from remnants, one piece at a time,
    /// and queues the rest. Tails destined for scrap skip the donor search.
    pub fn resolve_tail_row(&mut self, row: &NormalizedOrder) {
        debug_assert_eq!(row.origin, Origin::SplitRest);
        let mut remaining = row.count;

        if !self.wants_scrap(row.width) {
            // The donor cap looks at the width of the whole ordered piece.
            let original = row.original_width(self.opts.sheet_width);
            let req = SearchRequest::new(row.width, row.length, self.opts.tolerance_l);
            while remaining > 0 {
                let candidates = self.candidates(row.length);
                let found = self
                    .opts
                    .anti
                    .cap_donors(original, row.length, find_exact(req, &candidates));
                let Some(combo) = found else {
                    break;
                };
                self.close_from_donors(row.length, row.width, &combo, 0);
                remaining -= 1;
            }
        }

        if remaining > 0 {
            self.tails
                .push(row.length, row.width, row.strips, remaining);
        }
    }

    /// Cuts or sources all queued tails of `length`.
    pub fn flush_tails(&mut self, length: u32) {
        for demand in self.tails.take(length) {
            self.flush_tail(length, demand);
        }
    }

    pub fn flush_all_tails(&mut self) {
        for length in self.tails.pending_lengths() {
            self.flush_tails(length);
        }
    }

    fn flush_tail(&mut self, length: u32, demand: TailDemand) {
        let TailDemand {
            rest,
            strips,
            count,
        } = demand;
        if rest == 0 || count == 0 {
            return;
        }
        let per_sheet = (self.opts.sheet_width / rest).max(1);
        let full_sheets = count / per_sheet;
        let partial = count % per_sheet;
        debug!(length, rest, count, full_sheets, partial, "flushing tail demand");

        if full_sheets > 0 {
            self.record_sheets(
                length,
                full_sheets,
                vec![UsageItem {
                    width: rest,
                    count: per_sheet,
                }],
            );
        }
        if partial == 0 {
            return;
        }

        if self.wants_scrap(rest) {
            self.scrap_needs.push(ScrapNeed {
                length,
                rest_b: rest,
                count: partial,
                k: strips,
            });
            return;
        }
        if self.try_close_with_scrap(length, rest, partial, false) {
            return;
        }
        self.record_sheets(
            length,
            1,
            vec![UsageItem {
                width: rest,
                count: partial,
            }],
        );
    }
}
