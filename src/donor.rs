//! Remnant combination search.
//!
//! Both searches work on [`Candidate`] snapshots of the pool and never touch
//! the pool itself; the caller commits an accepted combination.

/// Candidates kept for the depth-first stage, best first.
pub const MAX_CANDIDATES: usize = 40;
/// Maximum remnants combined to close one piece exactly.
pub const MAX_PICKS: usize = 4;
/// Maximum remnants combined in a partial closure.
pub const MAX_PARTIAL_PICKS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub id: u32,
    pub length: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub donor: Candidate,
    pub used: u32,
}

impl Pick {
    fn whole(donor: Candidate) -> Self {
        Self {
            donor,
            used: donor.width,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchRequest {
    pub need: u32,
    pub order_length: u32,
    pub tolerance: u32,
    pub must_contain_same_length: bool,
}

impl SearchRequest {
    pub fn new(need: u32, order_length: u32, tolerance: u32) -> Self {
        Self {
            need,
            order_length,
            tolerance,
            must_contain_same_length: false,
        }
    }

    pub fn requiring_same_length(mut self, required: bool) -> Self {
        self.must_contain_same_length = required;
        self
    }

    fn is_fallback(&self, donor: &Candidate) -> bool {
        donor.length.saturating_sub(self.order_length) > self.tolerance
    }
}

/// A set of picks chosen to close one piece.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Combination {
    pub picks: Vec<Pick>,
}

impl Combination {
    pub fn total_used(&self) -> u32 {
        self.picks.iter().map(|p| p.used).sum()
    }

    /// Donors whose length differs from the order's.
    pub fn foreign_count(&self, order_length: u32) -> usize {
        self.picks
            .iter()
            .filter(|p| p.donor.length != order_length)
            .count()
    }

    pub fn uses_fallback(&self, order_length: u32, tolerance: u32) -> bool {
        self.picks
            .iter()
            .any(|p| p.donor.length.saturating_sub(order_length) > tolerance)
    }

    pub fn touches(&self, id: u32) -> bool {
        self.picks.iter().any(|p| p.donor.id == id)
    }
}

/// (excess, fallback, -same-length width, picks, partial, touched width)
type ExactScore = (u32, u8, i64, usize, u8, u64);

struct ExactSearch<'a> {
    req: SearchRequest,
    list: &'a [Candidate],
    best: Option<(ExactScore, Vec<Pick>)>,
}

impl ExactSearch<'_> {
    fn consider(&mut self, picks: &[Pick], total: u32, partial_used: bool) {
        let req = self.req;
        if total < req.need {
            return;
        }
        let same_used: u64 = picks
            .iter()
            .filter(|p| p.donor.length == req.order_length)
            .map(|p| p.used as u64)
            .sum();
        if req.must_contain_same_length && same_used == 0 {
            return;
        }
        let fallback = picks.iter().any(|p| req.is_fallback(&p.donor));
        let touched: u64 = picks.iter().map(|p| p.donor.width as u64).sum();
        let score = (
            total - req.need,
            fallback as u8,
            -(same_used as i64),
            picks.len(),
            partial_used as u8,
            touched,
        );
        if self.best.as_ref().is_none_or(|(s, _)| score < *s) {
            self.best = Some((score, picks.to_vec()));
        }
    }

    fn pairs_and_triples(&mut self, candidates: &[Candidate]) {
        let need = self.req.need;
        for i in 0..candidates.len() {
            let a = candidates[i];
            for j in (i + 1)..candidates.len() {
                let b = candidates[j];
                if a.width + b.width == need {
                    self.consider(&[Pick::whole(a), Pick::whole(b)], need, false);
                }
                for &c in &candidates[(j + 1)..] {
                    if a.width + b.width + c.width == need {
                        self.consider(&[Pick::whole(a), Pick::whole(b), Pick::whole(c)], need, false);
                    }
                }
            }
        }
    }

    fn dfs(&mut self, start: usize, total: u32, picks: &mut Vec<Pick>, partial_used: bool) {
        if total >= self.req.need {
            self.consider(picks, total, partial_used);
            return;
        }
        if start >= self.list.len() || picks.len() >= MAX_PICKS {
            return;
        }
        for j in start..self.list.len() {
            let donor = self.list[j];

            picks.push(Pick::whole(donor));
            self.dfs(j + 1, total + donor.width, picks, partial_used);
            picks.pop();

            // At most one bite per search: take exactly what is still missing.
            let rest = self.req.need - total;
            if !partial_used && rest < donor.width {
                picks.push(Pick { donor, used: rest });
                self.dfs(j + 1, self.req.need, picks, true);
                picks.pop();
            }
        }
    }
}

/// Finds remnants whose widths close `req.need`.
///
/// Stages, first success wins: a same-length single, any single (unless a
/// same-length donor is required), exact pairs and triples, then a bounded
/// DFS over the best [`MAX_CANDIDATES`] allowing one partial bite.
pub fn find_exact(req: SearchRequest, candidates: &[Candidate]) -> Option<Combination> {
    if req.need == 0 {
        return None;
    }

    if let Some(&single) = candidates
        .iter()
        .find(|c| c.length == req.order_length && c.width == req.need)
    {
        return Some(Combination {
            picks: vec![Pick::whole(single)],
        });
    }
    if !req.must_contain_same_length
        && let Some(&single) = candidates.iter().find(|c| c.width == req.need)
    {
        return Some(Combination {
            picks: vec![Pick::whole(single)],
        });
    }

    let mut search = ExactSearch {
        req,
        list: &[],
        best: None,
    };
    search.pairs_and_triples(candidates);
    if let Some((_, picks)) = search.best {
        return Some(Combination { picks });
    }

    let list = ranked(candidates, req.order_length, |a, b| b.width.cmp(&a.width));
    let mut search = ExactSearch {
        req,
        list: &list,
        best: None,
    };
    search.dfs(0, 0, &mut Vec::with_capacity(MAX_PICKS + 1), false);
    search.best.map(|(_, picks)| Combination { picks })
}

/// Same-length donors first, then `tie`, truncated to [`MAX_CANDIDATES`].
fn ranked(
    candidates: &[Candidate],
    order_length: u32,
    tie: impl Fn(&Candidate, &Candidate) -> std::cmp::Ordering,
) -> Vec<Candidate> {
    let mut list = candidates.to_vec();
    list.sort_by(|a, b| {
        (a.length != order_length)
            .cmp(&(b.length != order_length))
            .then_with(|| tie(a, b))
    });
    list.truncate(MAX_CANDIDATES);
    list
}

/// (missing, fallback, -same-length count, foreign count, picks, partial)
type PartialScore = (u32, u8, i64, usize, usize, u8);

struct PartialSearch<'a> {
    req: SearchRequest,
    list: &'a [Candidate],
    best: Option<(PartialScore, Vec<Pick>)>,
}

impl PartialSearch<'_> {
    fn consider(&mut self, picks: &[Pick], total: u32, partial_used: bool) {
        let req = self.req;
        let same = picks
            .iter()
            .filter(|p| p.donor.length == req.order_length)
            .count();
        if req.must_contain_same_length && same == 0 {
            return;
        }
        let fallback = picks.iter().any(|p| req.is_fallback(&p.donor));
        let score = (
            req.need.saturating_sub(total),
            fallback as u8,
            -(same as i64),
            picks.len() - same,
            picks.len(),
            partial_used as u8,
        );
        if self.best.as_ref().is_none_or(|(s, _)| score < *s) {
            self.best = Some((score, picks.to_vec()));
        }
    }

    fn dfs(&mut self, start: usize, picks: &mut Vec<Pick>, total: u32, partial_used: bool) {
        if !picks.is_empty() {
            self.consider(picks, total, partial_used);
        }
        if picks.len() >= MAX_PARTIAL_PICKS {
            return;
        }
        for i in start..self.list.len() {
            let donor = self.list[i];
            if total + donor.width <= self.req.need {
                picks.push(Pick::whole(donor));
                self.dfs(i + 1, picks, total + donor.width, partial_used);
                picks.pop();
            }
            if !partial_used {
                let rest = self.req.need - total;
                if rest > 0 && rest < donor.width {
                    picks.push(Pick { donor, used: rest });
                    self.consider(picks, self.req.need, true);
                    picks.pop();
                }
            }
        }
    }
}

/// Covers as much of `req.need` as possible without exceeding it.
///
/// Returns an empty combination when nothing can be used. The caller decides
/// whether the remaining missing width is acceptable.
pub fn find_partial(req: SearchRequest, candidates: &[Candidate]) -> Combination {
    if req.need == 0 || candidates.is_empty() {
        return Combination::default();
    }
    let mut list = candidates.to_vec();
    list.sort_by(|a, b| b.width.cmp(&a.width));
    list.truncate(MAX_CANDIDATES);

    let mut search = PartialSearch {
        req,
        list: &list,
        best: None,
    };
    search.dfs(0, &mut Vec::with_capacity(MAX_PARTIAL_PICKS), 0, false);
    Combination {
        picks: search.best.map(|(_, picks)| picks).unwrap_or_default(),
    }
}
