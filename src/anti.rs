//! Anti-waste policy checks, applied after a donor combination is chosen.

use crate::config::AntiWaste;
use crate::donor::Combination;

impl AntiWaste {
    /// Pieces of this length are never cut; they go to the forced map.
    pub fn forbids_cutting(&self, length: u32) -> bool {
        self.enabled && self.min_l_no_cut.is_some_and(|limit| length <= limit)
    }

    /// The donor cap only applies to widths strictly above `limitMergeB`.
    pub fn merge_limit_active(&self, target_width: u32) -> bool {
        self.enabled && self.limit_merge_b.is_some_and(|limit| target_width > limit)
    }

    /// Foreign donors allowed once the cap is active. Unset is zero, not unlimited.
    pub fn max_foreign_donors(&self) -> usize {
        self.max_merge_k.unwrap_or(0) as usize
    }

    /// Missing width (mm) the last-piece no-cut rule may leave to scrap.
    pub fn last_missing_limit(&self) -> Option<u32> {
        if !self.enabled {
            return None;
        }
        self.last_no_cut_b.filter(|&limit| limit > 0)
    }

    /// Rejects `combo` when closing `target_width` would merge more
    /// foreign-length donors than allowed. Same-length donors never count.
    pub fn cap_donors(
        &self,
        target_width: u32,
        order_length: u32,
        combo: Option<Combination>,
    ) -> Option<Combination> {
        let combo = combo?;
        if !self.merge_limit_active(target_width) {
            return Some(combo);
        }
        if combo.foreign_count(order_length) <= self.max_foreign_donors() {
            Some(combo)
        } else {
            None
        }
    }
}
