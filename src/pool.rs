use crate::donor::Candidate;
use crate::types::{Remnant, ScrapProduced};

/// Reusable offcuts shared by every length of one calculation.
///
/// Ids are assigned in insertion order and never reused.
#[derive(Debug, Clone)]
pub struct RemnantPool {
    remnants: Vec<Remnant>,
    next_id: u32,
    min_leftover: u32,
}

/// Filter for donors usable by one order length.
#[derive(Debug, Clone, Copy)]
pub struct Eligibility {
    pub order_length: u32,
    pub tolerance: u32,
    pub allow_fallback: bool,
}

impl Eligibility {
    pub fn admits(&self, length: u32) -> bool {
        length >= self.order_length
            && (length - self.order_length <= self.tolerance || self.allow_fallback)
    }
}

impl RemnantPool {
    pub fn new(min_leftover: u32) -> Self {
        Self {
            remnants: Vec::new(),
            next_id: 1,
            min_leftover,
        }
    }

    /// Width at which an offcut is worth keeping.
    pub fn keeps(&self, width: u32) -> bool {
        width > 0 && width >= self.min_leftover
    }

    pub fn push(&mut self, length: u32, width: u32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.remnants.push(Remnant { id, length, width });
        id
    }

    /// Snapshot of the donors `filter` admits, in pool order.
    pub fn candidates(&self, filter: Eligibility) -> Vec<Candidate> {
        self.remnants
            .iter()
            .filter(|r| r.width >= self.min_leftover && filter.admits(r.length))
            .map(|r| Candidate {
                id: r.id,
                length: r.length,
                width: r.width,
            })
            .collect()
    }

    /// Takes `width` off remnant `id`. Returns the width before the take.
    pub fn consume(&mut self, id: u32, width: u32) -> Option<u32> {
        let r = self.remnants.iter_mut().find(|r| r.id == id)?;
        let before = r.width;
        r.width = before.saturating_sub(width);
        Some(before)
    }

    /// Removes emptied remnants and turns those below the minimum into scrap.
    pub fn prune(&mut self, scrap: &mut Vec<ScrapProduced>) {
        let min = self.min_leftover;
        self.remnants.retain(|r| {
            if r.width == 0 {
                return false;
            }
            if r.width < min {
                scrap.push(ScrapProduced {
                    length: r.length,
                    width: r.width,
                    count: 1,
                });
                return false;
            }
            true
        });
    }

    pub fn into_remnants(self) -> Vec<Remnant> {
        self.remnants
    }

    pub fn remnants(&self) -> &[Remnant] {
        &self.remnants
    }
}
