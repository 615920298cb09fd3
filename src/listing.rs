use std::collections::{HashMap, HashSet};

use crate::api::{FetchError, FetchResult};
use crate::bounties::Bounty;
use crate::companion::{FairFightStats, parse_stats};

/// Where a paginated listing currently is. The request offset is always derived from `page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub page: u32,
    pub page_size: u32,
    /// Known once the last page has been seen.
    pub total: Option<u32>,
}

impl Cursor {
    pub fn offset(&self) -> u32 {
        self.page_size.saturating_mul(self.page.saturating_sub(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBound {
    Fixed(u32),
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    cursor: Cursor,
    bound: PageBound,
    has_next: bool,
}

impl Listing {
    pub fn new(page_size: u32, bound: PageBound) -> Self {
        Self {
            cursor: Cursor {
                page: 1,
                page_size: page_size.max(1),
                total: None,
            },
            bound,
            has_next: false,
        }
    }

    pub fn bounties(page_size: u32, max_pages: u32) -> Self {
        Self::new(page_size, PageBound::Fixed(max_pages.max(1)))
    }

    pub fn targets(page_size: u32) -> Self {
        Self::new(page_size, PageBound::Open)
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn page(&self) -> u32 {
        self.cursor.page
    }

    pub fn bound(&self) -> PageBound {
        self.bound
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn has_prev(&self) -> bool {
        self.cursor.page > 1
    }

    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.cursor.page,
            offset: self.cursor.offset(),
            limit: self.cursor.page_size,
        }
    }

    /// Clamp `page` into range and move there. Whatever was known about the old page is dropped.
    pub fn go_to(&mut self, page: i64) -> PageRequest {
        let mut page = page.max(1);
        if let PageBound::Fixed(max) = self.bound {
            page = page.min(max as i64);
        }
        self.cursor.page = u32::try_from(page).unwrap_or(u32::MAX);
        self.has_next = false;
        self.request()
    }

    pub fn next(&mut self) -> Option<PageRequest> {
        if !self.has_next {
            return None;
        }
        Some(self.go_to(self.cursor.page as i64 + 1))
    }

    pub fn prev(&mut self) -> Option<PageRequest> {
        if !self.has_prev() {
            return None;
        }
        Some(self.go_to(self.cursor.page as i64 - 1))
    }

    /// A full page means there may be more; a short page is the last one.
    pub fn record_page(&mut self, count: usize) {
        let full = count >= self.cursor.page_size as usize;
        self.has_next = match self.bound {
            PageBound::Fixed(max) => full && self.cursor.page < max,
            PageBound::Open => full,
        };
        self.cursor.total = if full {
            None
        } else {
            Some(self.cursor.offset().saturating_add(count as u32))
        };
    }

    pub fn reset(&mut self) {
        self.cursor.page = 1;
        self.cursor.total = None;
        self.has_next = false;
    }
}

/// Stable, so equal rewards keep their listing order.
pub fn sort_by_reward_desc(bounties: &mut [Bounty]) {
    bounties.sort_by(|a, b| b.reward.total_cmp(&a.reward));
}

/// Keep the first row per known target. Run after `sort_by_reward_desc` so that row is the richest.
pub fn dedup_by_target(bounties: Vec<Bounty>) -> Vec<Bounty> {
    let mut seen = HashSet::new();
    bounties
        .into_iter()
        .filter(|b| match b.target_id {
            Some(id) => seen.insert(id),
            None => true,
        })
        .collect()
}

pub fn order_bounties(mut bounties: Vec<Bounty>) -> Vec<Bounty> {
    sort_by_reward_desc(&mut bounties);
    dedup_by_target(bounties)
}

pub fn bounty_target_ids(bounties: &[Bounty]) -> Vec<u64> {
    let mut seen = HashSet::new();
    bounties
        .iter()
        .filter_map(|b| b.target_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// A listing row with whatever the companion API knew about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<T> {
    pub row: T,
    pub stats: Option<FairFightStats>,
}

impl<T> Enriched<T> {
    pub fn fair_fight(&self) -> Option<f64> {
        self.stats
            .as_ref()
            .and_then(|s| s.fair_fight)
            .filter(|v| v.is_finite())
    }
}

pub fn enrich<T>(
    rows: Vec<T>,
    stats: &HashMap<u64, FairFightStats>,
    id_of: impl Fn(&T) -> Option<u64>,
) -> Vec<Enriched<T>> {
    rows.into_iter()
        .map(|row| {
            let stats = id_of(&row).and_then(|id| stats.get(&id).cloned());
            Enriched { row, stats }
        })
        .collect()
}

/// Scores from a companion call. Enrichment is best effort: any failure leaves rows
/// unscored, and only a failure other than a missing key yields a warning line.
pub fn scores_or_degrade(fetched: FetchResult) -> (HashMap<u64, FairFightStats>, Option<String>) {
    match fetched {
        Ok(body) => (parse_stats(&body), None),
        Err(FetchError::MissingCredential(_)) => (HashMap::new(), None),
        Err(err) => (
            HashMap::new(),
            Some(format!("[WARN] Fair fight lookup failed: {err}")),
        ),
    }
}

/// Where rows without a fairness score go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingScore {
    Last,
    First,
}

/// Ascending by fair fight; ties keep their prior order.
pub fn rank_by_fairness<T>(rows: &mut [Enriched<T>], missing: MissingScore) {
    rows.sort_by(|a, b| match (a.fair_fight(), b.fair_fight()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => match missing {
            MissingScore::Last => std::cmp::Ordering::Greater,
            MissingScore::First => std::cmp::Ordering::Less,
        },
        (Some(_), None) => match missing {
            MissingScore::Last => std::cmp::Ordering::Less,
            MissingScore::First => std::cmp::Ordering::Greater,
        },
    });
}

pub fn prepare_bounty_page(
    bounties: Vec<Bounty>,
    stats: &HashMap<u64, FairFightStats>,
) -> Vec<Enriched<Bounty>> {
    let mut rows = enrich(order_bounties(bounties), stats, |b| b.target_id);
    rank_by_fairness(&mut rows, MissingScore::Last);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page() {
        let mut listing = Listing::bounties(50, 100);
        assert_eq!(listing.request().offset, 0);
        assert_eq!(listing.go_to(3).offset, 100);
        assert_eq!(listing.go_to(-7).page, 1);
    }

    #[test]
    fn navigation_discards_stale_next_flag() {
        let mut listing = Listing::targets(10);
        listing.record_page(10);
        assert!(listing.has_next());
        let req = listing.next().unwrap();
        assert_eq!(req.page, 2);
        assert!(!listing.has_next());
        listing.record_page(4);
        assert_eq!(listing.cursor().total, Some(14));
        assert!(listing.next().is_none());
    }

    #[test]
    fn reset_returns_to_first_page() {
        let mut listing = Listing::targets(10);
        listing.go_to(5);
        listing.reset();
        assert_eq!(listing.page(), 1);
        assert!(!listing.has_prev());
    }
}
