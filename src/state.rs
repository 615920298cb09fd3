use std::collections::{HashMap, VecDeque};

use chrono::{Local, Utc};

use crate::bounties::Bounty;
use crate::companion::{FairFightStats, Target};
use crate::credentials::CredentialName;
use crate::faction::FactionMember;
use crate::listing::{Enriched, Listing, PageRequest};
use crate::player::PlayerSnapshot;
use crate::stocks::{StockCatalog, StockHolding};
use crate::war::{WarFaction, WarsOverview};
use crate::world_map::{MapPlot, plot_members};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Player,
    WorldMap,
    FactionMap,
    Stocks,
    Bounties,
    Targets,
    War,
    Settings,
    Docs,
}

impl Tab {
    pub const ALL: [Tab; 9] = [
        Tab::Player,
        Tab::WorldMap,
        Tab::FactionMap,
        Tab::Stocks,
        Tab::Bounties,
        Tab::Targets,
        Tab::War,
        Tab::Settings,
        Tab::Docs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Player => "Player",
            Tab::WorldMap => "World Map",
            Tab::FactionMap => "Faction Map",
            Tab::Stocks => "Stocks",
            Tab::Bounties => "Bounties",
            Tab::Targets => "Targets",
            Tab::War => "War",
            Tab::Settings => "Settings",
            Tab::Docs => "Docs",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// `'1'`..=`'9'`.
    pub fn from_digit(ch: char) -> Option<Tab> {
        let idx = ch.to_digit(10)?.checked_sub(1)? as usize;
        Tab::ALL.get(idx).copied()
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// One source of deltas; stamps are compared per feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Identity,
    Subject,
    /// Search lookups, ordered apart from the periodic subject refresh.
    Lookup,
    Stocks,
    Prices,
    WorldMap,
    FactionMap,
    Bounties,
    Targets,
    War,
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub feed: Feed,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NotConfigured(String),
    Error(String),
    Info(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::NotConfigured(msg) | Notice::Error(msg) | Notice::Info(msg) => msg,
        }
    }
}

/// Last good payload for a view plus whatever went wrong since.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel<T> {
    pub data: Option<T>,
    pub notice: Option<Notice>,
    pub loading: bool,
    pub updated_at: Option<String>,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            data: None,
            notice: None,
            loading: false,
            updated_at: None,
        }
    }
}

impl<T> Panel<T> {
    pub fn set(&mut self, data: T) {
        self.data = Some(data);
        self.notice = None;
        self.loading = false;
        self.updated_at = Some(clock_label());
    }

    /// Keeps the previous payload on screen.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice::Error(message.into()));
        self.loading = false;
    }

    pub fn start_loading(&mut self) {
        self.loading = true;
        if matches!(self.notice, Some(Notice::NotConfigured(_))) {
            self.notice = None;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A paginated table: cursor plus the rows of the current page only.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingView<R> {
    pub listing: Listing,
    pub rows: Vec<R>,
    pub notice: Option<Notice>,
    pub loading: bool,
    pub updated_at: Option<String>,
}

impl<R> ListingView<R> {
    pub fn new(listing: Listing) -> Self {
        Self {
            listing,
            rows: Vec::new(),
            notice: None,
            loading: false,
            updated_at: None,
        }
    }

    pub fn reset(&mut self) {
        self.listing.reset();
        self.rows.clear();
        self.notice = None;
        self.loading = false;
        self.updated_at = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapTarget {
    World,
    Faction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactionMap {
    pub faction_id: Option<u64>,
    pub members: Vec<FactionMember>,
    pub plot: MapPlot,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarBoard {
    pub overview: WarsOverview,
    pub opponent: Option<WarFaction>,
    pub members: Vec<Enriched<FactionMember>>,
    pub plot: MapPlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    PageJump,
    FactionId,
    Credential(CredentialName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    pub selected: CredentialName,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub tab: Tab,
    pub subject_id: Option<u64>,
    /// Shown in the search box; reset here after a rejected lookup.
    pub subject_input: String,
    pub own_id: Option<u64>,
    pub own_name: Option<String>,
    pub own_faction_id: Option<u64>,
    pub identity_resolved: bool,
    pub fatal: Option<String>,
    pub player: Panel<PlayerSnapshot>,
    pub player_stats: Option<FairFightStats>,
    /// Unix seconds when the player payload arrived; anchors the travel countdown.
    pub player_received_at: Option<i64>,
    pub stock_catalog: StockCatalog,
    pub stocks: Panel<Vec<StockHolding>>,
    pub world_map: Panel<FactionMap>,
    pub faction_map: Panel<FactionMap>,
    pub faction_map_id: Option<u64>,
    pub bounties: ListingView<Enriched<Bounty>>,
    pub targets: ListingView<Target>,
    pub war: Panel<WarBoard>,
    pub war_alert: bool,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub settings: SettingsForm,
    pub alert: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    last_applied: HashMap<Feed, u64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(50, 100, 50)
    }
}

impl AppState {
    pub fn new(bounty_page_size: u32, bounty_max_pages: u32, target_page_size: u32) -> Self {
        Self {
            tab: Tab::Player,
            subject_id: None,
            subject_input: String::new(),
            own_id: None,
            own_name: None,
            own_faction_id: None,
            identity_resolved: false,
            fatal: None,
            player: Panel::default(),
            player_stats: None,
            player_received_at: None,
            stock_catalog: StockCatalog::default(),
            stocks: Panel::default(),
            world_map: Panel::default(),
            faction_map: Panel::default(),
            faction_map_id: None,
            bounties: ListingView::new(Listing::bounties(bounty_page_size, bounty_max_pages)),
            targets: ListingView::new(Listing::targets(target_page_size)),
            war: Panel::default(),
            war_alert: false,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            settings: SettingsForm {
                selected: CredentialName::Primary,
                message: None,
            },
            alert: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
            last_applied: HashMap::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Drop the view's cursor and cached page so re-entering starts clean.
    pub fn reset(&mut self, view: Tab) {
        match view {
            Tab::Bounties => self.bounties.reset(),
            Tab::Targets => self.targets.reset(),
            _ => {}
        }
    }

    pub fn set_notice(&mut self, view: Tab, notice: Notice) {
        let slot = match view {
            Tab::Player => &mut self.player.notice,
            Tab::WorldMap => &mut self.world_map.notice,
            Tab::FactionMap => &mut self.faction_map.notice,
            Tab::Stocks => &mut self.stocks.notice,
            Tab::Bounties => &mut self.bounties.notice,
            Tab::Targets => &mut self.targets.notice,
            Tab::War => &mut self.war.notice,
            Tab::Settings | Tab::Docs => return,
        };
        *slot = Some(notice);
    }

    pub fn notice(&self, view: Tab) -> Option<&Notice> {
        match view {
            Tab::Player => self.player.notice.as_ref(),
            Tab::WorldMap => self.world_map.notice.as_ref(),
            Tab::FactionMap => self.faction_map.notice.as_ref(),
            Tab::Stocks => self.stocks.notice.as_ref(),
            Tab::Bounties => self.bounties.notice.as_ref(),
            Tab::Targets => self.targets.notice.as_ref(),
            Tab::War => self.war.notice.as_ref(),
            Tab::Settings | Tab::Docs => None,
        }
    }

    pub fn mark_loading(&mut self, view: Tab) {
        match view {
            Tab::Player => self.player.start_loading(),
            Tab::WorldMap => self.world_map.start_loading(),
            Tab::FactionMap => self.faction_map.start_loading(),
            Tab::Stocks => self.stocks.start_loading(),
            Tab::Bounties => {
                self.bounties.loading = true;
                self.bounties.notice = None;
            }
            Tab::Targets => {
                self.targets.loading = true;
                self.targets.notice = None;
            }
            Tab::War => self.war.start_loading(),
            Tab::Settings | Tab::Docs => {}
        }
    }

    /// Seconds of travel left, counting down locally between refreshes.
    pub fn travel_remaining(&self, now: i64) -> Option<u64> {
        let travel = self.player.data.as_ref()?.travel.as_ref()?;
        if let Some(arrival) = travel.arrival_at.filter(|a| *a > 0) {
            return Some((arrival - now).max(0) as u64);
        }
        let left = travel.time_left?;
        let elapsed = self
            .player_received_at
            .map(|at| (now - at).max(0) as u64)
            .unwrap_or(0);
        Some(left.saturating_sub(elapsed))
    }

    fn accept(&mut self, stamp: Stamp) -> bool {
        let last = self.last_applied.entry(stamp.feed).or_insert(0);
        if stamp.seq < *last {
            return false;
        }
        *last = stamp.seq;
        true
    }
}

pub fn clock_label() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[derive(Debug, Clone)]
pub enum Delta {
    IdentityResolved {
        stamp: Stamp,
        player: PlayerSnapshot,
        stats: Option<FairFightStats>,
    },
    IdentityFailed {
        stamp: Stamp,
        message: String,
    },
    SubjectLoaded {
        stamp: Stamp,
        player: PlayerSnapshot,
        stats: Option<FairFightStats>,
    },
    SubjectLookupFailed {
        stamp: Stamp,
        input: String,
        message: String,
    },
    SubjectRefreshed {
        stamp: Stamp,
        player: PlayerSnapshot,
    },
    StockCatalog {
        stamp: Stamp,
        catalog: StockCatalog,
    },
    StockPrices {
        stamp: Stamp,
        prices: HashMap<String, f64>,
    },
    StockHoldings {
        stamp: Stamp,
        holdings: Vec<StockHolding>,
    },
    FactionMembers {
        stamp: Stamp,
        target: MapTarget,
        faction_id: Option<u64>,
        members: Vec<FactionMember>,
    },
    BountyPage {
        stamp: Stamp,
        page: u32,
        /// Items the API returned before de-duplication.
        raw_count: usize,
        rows: Vec<Enriched<Bounty>>,
    },
    TargetPage {
        stamp: Stamp,
        page: u32,
        raw_count: usize,
        targets: Vec<Target>,
    },
    WarData {
        stamp: Stamp,
        board: WarBoard,
    },
    ConflictCheck {
        stamp: Stamp,
        active: bool,
    },
    FeedFailed {
        stamp: Stamp,
        message: String,
    },
    Log(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCommand {
    /// `subject` replaces the whoami call when set.
    ResolveIdentity {
        stamp: Stamp,
        subject: Option<u64>,
    },
    LookupSubject {
        stamp: Stamp,
        input: String,
    },
    RefreshSubject {
        stamp: Stamp,
        subject_id: u64,
    },
    LoadStocks {
        stamp: Stamp,
        subject_id: u64,
        catalog_loaded: bool,
    },
    RefreshPrices {
        stamp: Stamp,
    },
    LoadFactionMembers {
        stamp: Stamp,
        target: MapTarget,
        faction_id: Option<u64>,
    },
    LoadBounties {
        stamp: Stamp,
        request: PageRequest,
    },
    LoadTargets {
        stamp: Stamp,
        request: PageRequest,
    },
    LoadWar {
        stamp: Stamp,
        own_faction_id: Option<u64>,
    },
    CheckConflict {
        stamp: Stamp,
    },
}

impl ProviderCommand {
    pub fn stamp(&self) -> Stamp {
        match self {
            ProviderCommand::ResolveIdentity { stamp, .. }
            | ProviderCommand::LookupSubject { stamp, .. }
            | ProviderCommand::RefreshSubject { stamp, .. }
            | ProviderCommand::LoadStocks { stamp, .. }
            | ProviderCommand::RefreshPrices { stamp }
            | ProviderCommand::LoadFactionMembers { stamp, .. }
            | ProviderCommand::LoadBounties { stamp, .. }
            | ProviderCommand::LoadTargets { stamp, .. }
            | ProviderCommand::LoadWar { stamp, .. }
            | ProviderCommand::CheckConflict { stamp } => *stamp,
        }
    }
}

/// What the event loop has to do after a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    IdentityReady,
    SubjectChanged,
    Fatal,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) -> Option<Signal> {
    if let Some(stamp) = delta_stamp(&delta) {
        if !state.accept(stamp) {
            return None;
        }
    }
    match delta {
        Delta::IdentityResolved { player, stats, .. } => {
            state.own_id = player.id;
            state.own_name = player.name.clone();
            state.own_faction_id = player.faction_id();
            state.identity_resolved = true;
            state.fatal = None;
            if let Some(id) = player.id {
                state.subject_id = Some(id);
                state.subject_input = id.to_string();
            }
            state.push_log(format!(
                "[INFO] Signed in as {}",
                player.name.as_deref().unwrap_or("unknown player")
            ));
            state.player_stats = stats;
            state.player_received_at = Some(Utc::now().timestamp());
            state.player.set(player);
            Some(Signal::IdentityReady)
        }
        Delta::IdentityFailed { message, .. } => {
            state.subject_id = None;
            state.identity_resolved = false;
            state.push_log(format!("[ALERT] Startup failed: {message}"));
            state.fatal = Some(message);
            Some(Signal::Fatal)
        }
        Delta::SubjectLoaded { player, stats, .. } => {
            let changed = player.id.is_some() && player.id != state.subject_id;
            if let Some(id) = player.id {
                state.subject_id = Some(id);
                state.subject_input = id.to_string();
            }
            state.player_stats = stats;
            state.player_received_at = Some(Utc::now().timestamp());
            state.player.set(player);
            if changed {
                // Holdings belong to the previous subject.
                state.stocks.clear();
                Some(Signal::SubjectChanged)
            } else {
                None
            }
        }
        Delta::SubjectLookupFailed { input, message, .. } => {
            state.push_log(format!("[WARN] Lookup for '{input}' failed: {message}"));
            state.subject_input = state
                .subject_id
                .map(|id| id.to_string())
                .unwrap_or_default();
            state.player.loading = false;
            state.alert = Some(message);
            None
        }
        Delta::SubjectRefreshed { player, .. } => {
            // A refresh for a subject we've since moved away from.
            if player.id.is_some() && player.id != state.subject_id {
                return None;
            }
            match state.player.data.as_mut() {
                Some(existing) => {
                    existing.merge(player);
                    state.player.loading = false;
                    state.player.notice = None;
                    state.player.updated_at = Some(clock_label());
                }
                None => state.player.set(player),
            }
            state.player_received_at = Some(Utc::now().timestamp());
            None
        }
        Delta::StockCatalog { catalog, .. } => {
            state.push_log(format!("[INFO] Loaded {} stock names", catalog.names.len()));
            state.stock_catalog = catalog;
            None
        }
        Delta::StockPrices { prices, .. } => {
            state.stock_catalog.merge_prices(prices);
            state.stocks.updated_at = Some(clock_label());
            None
        }
        Delta::StockHoldings { holdings, .. } => {
            state.stocks.set(holdings);
            None
        }
        Delta::FactionMembers {
            target,
            faction_id,
            members,
            ..
        } => {
            let panel = match target {
                MapTarget::World => &mut state.world_map,
                MapTarget::Faction => &mut state.faction_map,
            };
            let plot = plot_members(&members);
            panel.set(FactionMap {
                faction_id,
                members,
                plot,
            });
            None
        }
        Delta::BountyPage {
            page,
            raw_count,
            rows,
            ..
        } => {
            let view = &mut state.bounties;
            if page != view.listing.page() {
                return None;
            }
            view.listing.record_page(raw_count);
            view.rows = rows;
            view.loading = false;
            view.notice = None;
            view.updated_at = Some(clock_label());
            None
        }
        Delta::TargetPage {
            page,
            raw_count,
            targets,
            ..
        } => {
            let view = &mut state.targets;
            if page != view.listing.page() {
                return None;
            }
            view.listing.record_page(raw_count);
            view.rows = targets;
            view.loading = false;
            view.notice = None;
            view.updated_at = Some(clock_label());
            None
        }
        Delta::WarData { board, .. } => {
            if board.opponent.is_none() {
                let mut board = board;
                board.members.clear();
                board.plot = MapPlot::default();
                state.war.set(board);
                state.war.notice = Some(Notice::Info(
                    "No active war found or opponent faction not identified.".to_string(),
                ));
            } else {
                state.war.set(board);
            }
            None
        }
        Delta::ConflictCheck { active, .. } => {
            if active && !state.war_alert {
                state.push_log("[ALERT] Active war detected");
            }
            state.war_alert = active;
            None
        }
        Delta::FeedFailed { stamp, message } => {
            apply_failure(state, stamp.feed, message);
            None
        }
        Delta::Log(msg) => {
            state.push_log(msg);
            None
        }
    }
}

fn apply_failure(state: &mut AppState, feed: Feed, message: String) {
    state.push_log(format!("[WARN] {}: {message}", feed_label(feed)));
    match feed {
        Feed::Identity => {
            state.fatal = Some(message);
        }
        Feed::Subject => state.player.fail(message),
        Feed::Lookup => {
            state.player.loading = false;
            state.alert = Some(message);
        }
        Feed::Stocks => state.stocks.fail(message),
        Feed::Prices => {}
        Feed::WorldMap => state.world_map.fail(message),
        Feed::FactionMap => state.faction_map.fail(message),
        Feed::Bounties => {
            state.bounties.loading = false;
            state.bounties.notice = Some(Notice::Error(message));
        }
        Feed::Targets => {
            state.targets.loading = false;
            state.targets.notice = Some(Notice::Error(message));
        }
        Feed::War => state.war.fail(message),
        Feed::Conflict => state.war_alert = false,
    }
}

pub fn feed_label(feed: Feed) -> &'static str {
    match feed {
        Feed::Identity => "Identity",
        Feed::Subject => "Player",
        Feed::Lookup => "Search",
        Feed::Stocks => "Stocks",
        Feed::Prices => "Stock prices",
        Feed::WorldMap => "World map",
        Feed::FactionMap => "Faction map",
        Feed::Bounties => "Bounties",
        Feed::Targets => "Targets",
        Feed::War => "War",
        Feed::Conflict => "War check",
    }
}

fn delta_stamp(delta: &Delta) -> Option<Stamp> {
    match delta {
        Delta::IdentityResolved { stamp, .. }
        | Delta::IdentityFailed { stamp, .. }
        | Delta::SubjectLoaded { stamp, .. }
        | Delta::SubjectLookupFailed { stamp, .. }
        | Delta::SubjectRefreshed { stamp, .. }
        | Delta::StockCatalog { stamp, .. }
        | Delta::StockPrices { stamp, .. }
        | Delta::StockHoldings { stamp, .. }
        | Delta::FactionMembers { stamp, .. }
        | Delta::BountyPage { stamp, .. }
        | Delta::TargetPage { stamp, .. }
        | Delta::WarData { stamp, .. }
        | Delta::ConflictCheck { stamp, .. }
        | Delta::FeedFailed { stamp, .. } => Some(*stamp),
        Delta::Log(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_map_to_tabs() {
        assert_eq!(Tab::from_digit('1'), Some(Tab::Player));
        assert_eq!(Tab::from_digit('9'), Some(Tab::Docs));
        assert_eq!(Tab::from_digit('0'), None);
        assert_eq!(Tab::Docs.next(), Tab::Player);
        assert_eq!(Tab::Player.prev(), Tab::Docs);
    }

    #[test]
    fn failed_refresh_keeps_previous_payload() {
        let mut panel: Panel<u32> = Panel::default();
        panel.set(7);
        panel.fail("HTTP error! status: 500");
        assert_eq!(panel.data, Some(7));
        assert!(matches!(panel.notice, Some(Notice::Error(_))));
    }
}
