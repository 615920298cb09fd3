use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::api::validate_subject_id;
use crate::config::DashboardConfig;
use crate::credentials::{CredentialName, CredentialStore};
use crate::state::{AppState, Feed, MapTarget, Notice, ProviderCommand, Stamp, Tab};

pub const SUBJECT_TIMER: &str = "subject";
pub const PRICES_TIMER: &str = "prices";
pub const CONFLICT_TIMER: &str = "conflict-check";
pub const WORLD_MAP_TIMER: &str = "world-map";
pub const WAR_TIMER: &str = "war";

pub const SUBJECT_MISSING: &str = "Please search for a user first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timer {
    interval: Duration,
    next_due: Instant,
}

/// Named recurring timers, at most one per name.
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    timers: HashMap<&'static str, Timer>,
}

impl TimerSet {
    /// Replaces any timer already registered under `name`.
    pub fn register(&mut self, name: &'static str, interval: Duration, now: Instant) {
        self.timers.insert(
            name,
            Timer {
                interval,
                next_due: now + interval,
            },
        );
    }

    pub fn clear(&mut self, name: &str) -> bool {
        self.timers.remove(name).is_some()
    }

    pub fn clear_all(&mut self) {
        self.timers.clear();
    }

    /// Names whose deadline has passed; each is rescheduled one interval from `now`.
    pub fn due(&mut self, now: Instant) -> Vec<&'static str> {
        let mut fired = Vec::new();
        for (name, timer) in self.timers.iter_mut() {
            if now >= timer.next_due {
                timer.next_due = now + timer.interval;
                fired.push(*name);
            }
        }
        fired.sort_unstable();
        fired
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.timers.contains_key(name)
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.timers.get(name).map(|t| t.interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNav {
    Next,
    Prev,
    Jump(i64),
}

/// Which view is polling, and the timers that drive it.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    timers: TimerSet,
    active: Option<Tab>,
    halted: bool,
    seq: u64,
    credentials: CredentialStore,
    subject_refresh: Duration,
    price_refresh: Duration,
    conflict_check: Duration,
    map_refresh: Duration,
    war_refresh: Duration,
    subject_override: Option<u64>,
}

impl Orchestrator {
    pub fn new(config: &DashboardConfig, credentials: CredentialStore) -> Self {
        Self {
            timers: TimerSet::default(),
            active: None,
            halted: false,
            seq: 0,
            credentials,
            subject_refresh: config.subject_refresh,
            price_refresh: config.price_refresh,
            conflict_check: config.conflict_check,
            map_refresh: config.map_refresh,
            war_refresh: config.enemy_map_refresh,
            subject_override: config.subject_override,
        }
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn active(&self) -> Option<Tab> {
        self.active
    }

    pub fn is_active(&self, tab: Tab) -> bool {
        self.active == Some(tab)
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn next_stamp(&mut self, feed: Feed) -> Stamp {
        self.seq += 1;
        Stamp {
            feed,
            seq: self.seq,
        }
    }

    /// The startup whoami call, or nothing when there is no key to make it with.
    pub fn resolve_identity(&mut self, state: &mut AppState) -> Option<ProviderCommand> {
        if self.halted {
            return None;
        }
        if !self.credentials.is_configured(CredentialName::Primary) {
            state.set_notice(Tab::Player, not_configured(CredentialName::Primary));
            return None;
        }
        state.player.start_loading();
        Some(ProviderCommand::ResolveIdentity {
            stamp: self.next_stamp(Feed::Identity),
            subject: self.subject_override,
        })
    }

    /// Start polling `view`. A second call without a `deactivate` in between does nothing.
    pub fn activate(
        &mut self,
        view: Tab,
        state: &mut AppState,
        now: Instant,
    ) -> Vec<ProviderCommand> {
        if self.halted || self.active == Some(view) {
            return Vec::new();
        }
        if let Some(previous) = self.active {
            self.deactivate(previous);
        }
        self.active = Some(view);
        if matches!(view, Tab::Bounties | Tab::Targets) {
            state.reset(view);
        }
        if let Some(notice) = self.missing_prerequisite(view, state) {
            debug!(view = view.label(), "prerequisite missing; not polling");
            state.set_notice(view, notice);
            return Vec::new();
        }

        let commands = self.cycle(view, state);
        if let Some((name, interval)) = self.view_timer(view) {
            self.timers.register(name, interval, now);
        }
        if !commands.is_empty() {
            state.mark_loading(view);
        }
        commands
    }

    /// Stop the view's timer. Fetches already in flight still land.
    pub fn deactivate(&mut self, view: Tab) {
        if let Some((name, _)) = self.view_timer(view) {
            self.timers.clear(name);
        }
        if self.active == Some(view) {
            self.active = None;
        }
    }

    /// Run the active view's cycle again without touching its cursor.
    pub fn refresh(&mut self, state: &mut AppState) -> Vec<ProviderCommand> {
        let Some(view) = self.active.filter(|_| !self.halted) else {
            return Vec::new();
        };
        if let Some(notice) = self.missing_prerequisite(view, state) {
            state.set_notice(view, notice);
            return Vec::new();
        }
        let commands = self.cycle(view, state);
        if !commands.is_empty() {
            state.mark_loading(view);
        }
        commands
    }

    /// Commands for every timer that came due.
    pub fn tick(&mut self, state: &AppState, now: Instant) -> Vec<ProviderCommand> {
        if self.halted {
            return Vec::new();
        }
        let mut commands = Vec::new();
        for name in self.timers.due(now) {
            match name {
                SUBJECT_TIMER => {
                    if let Some(subject_id) = state.subject_id {
                        commands.push(ProviderCommand::RefreshSubject {
                            stamp: self.next_stamp(Feed::Subject),
                            subject_id,
                        });
                    }
                }
                PRICES_TIMER => commands.push(ProviderCommand::RefreshPrices {
                    stamp: self.next_stamp(Feed::Prices),
                }),
                WORLD_MAP_TIMER => commands.push(ProviderCommand::LoadFactionMembers {
                    stamp: self.next_stamp(Feed::WorldMap),
                    target: MapTarget::World,
                    faction_id: None,
                }),
                WAR_TIMER => commands.push(ProviderCommand::LoadWar {
                    stamp: self.next_stamp(Feed::War),
                    own_faction_id: state.own_faction_id,
                }),
                CONFLICT_TIMER => commands.push(ProviderCommand::CheckConflict {
                    stamp: self.next_stamp(Feed::Conflict),
                }),
                _ => {}
            }
        }
        commands
    }

    /// The view-independent war check, once the subject is known.
    pub fn start_background(&mut self, now: Instant) -> Vec<ProviderCommand> {
        if self.halted {
            return Vec::new();
        }
        self.timers.register(CONFLICT_TIMER, self.conflict_check, now);
        info!(interval = self.conflict_check.as_secs(), "conflict check started");
        vec![ProviderCommand::CheckConflict {
            stamp: self.next_stamp(Feed::Conflict),
        }]
    }

    /// Fatal state: every timer stops and nothing new is issued until `resume`.
    pub fn halt(&mut self) {
        self.timers.clear_all();
        self.active = None;
        self.halted = true;
    }

    pub fn resume(&mut self) {
        self.halted = false;
    }

    /// Validate a search entry before any request is made.
    pub fn lookup(&mut self, input: &str, state: &mut AppState) -> Vec<ProviderCommand> {
        if self.halted {
            return Vec::new();
        }
        if let Err(err) = validate_subject_id(input) {
            state.alert = Some(err.to_string());
            state.subject_input = state
                .subject_id
                .map(|id| id.to_string())
                .unwrap_or_default();
            return Vec::new();
        }
        if !self.credentials.is_configured(CredentialName::Primary) {
            state.set_notice(Tab::Player, not_configured(CredentialName::Primary));
            return Vec::new();
        }
        state.player.start_loading();
        vec![ProviderCommand::LookupSubject {
            stamp: self.next_stamp(Feed::Lookup),
            input: input.trim().to_string(),
        }]
    }

    /// Move the active listing and fetch the page it lands on.
    pub fn navigate(&mut self, nav: PageNav, state: &mut AppState) -> Vec<ProviderCommand> {
        let Some(view) = self
            .active
            .filter(|v| matches!(v, Tab::Bounties | Tab::Targets))
        else {
            return Vec::new();
        };
        if self.halted {
            return Vec::new();
        }
        if let Some(notice) = self.missing_prerequisite(view, state) {
            state.set_notice(view, notice);
            return Vec::new();
        }
        let listing = match view {
            Tab::Bounties => &mut state.bounties.listing,
            _ => &mut state.targets.listing,
        };
        let request = match nav {
            PageNav::Next => listing.next(),
            PageNav::Prev => listing.prev(),
            PageNav::Jump(page) => Some(listing.go_to(page)),
        };
        let Some(request) = request else {
            return Vec::new();
        };
        let command = match view {
            Tab::Bounties => {
                state.bounties.rows.clear();
                ProviderCommand::LoadBounties {
                    stamp: self.next_stamp(Feed::Bounties),
                    request,
                }
            }
            _ => {
                state.targets.rows.clear();
                ProviderCommand::LoadTargets {
                    stamp: self.next_stamp(Feed::Targets),
                    request,
                }
            }
        };
        state.mark_loading(view);
        vec![command]
    }

    /// Point the faction map at `faction_id` and load it if that view is showing.
    pub fn load_faction_map(
        &mut self,
        faction_id: u64,
        state: &mut AppState,
    ) -> Vec<ProviderCommand> {
        state.faction_map_id = Some(faction_id);
        if self.halted || self.active != Some(Tab::FactionMap) {
            return Vec::new();
        }
        self.refresh(state)
    }

    fn missing_prerequisite(&self, view: Tab, state: &AppState) -> Option<Notice> {
        let needs_primary = !matches!(view, Tab::Targets | Tab::Settings | Tab::Docs);
        if needs_primary && !self.credentials.is_configured(CredentialName::Primary) {
            return Some(not_configured(CredentialName::Primary));
        }
        if view == Tab::Targets && !self.credentials.is_configured(CredentialName::Companion) {
            return Some(not_configured(CredentialName::Companion));
        }
        if matches!(view, Tab::Player | Tab::Stocks) && state.subject_id.is_none() {
            return Some(Notice::NotConfigured(SUBJECT_MISSING.to_string()));
        }
        None
    }

    fn view_timer(&self, view: Tab) -> Option<(&'static str, Duration)> {
        match view {
            Tab::Player => Some((SUBJECT_TIMER, self.subject_refresh)),
            Tab::WorldMap => Some((WORLD_MAP_TIMER, self.map_refresh)),
            Tab::Stocks => Some((PRICES_TIMER, self.price_refresh)),
            Tab::War => Some((WAR_TIMER, self.war_refresh)),
            _ => None,
        }
    }

    /// One fetch-and-render pass for `view`.
    fn cycle(&mut self, view: Tab, state: &mut AppState) -> Vec<ProviderCommand> {
        match view {
            Tab::Player => state
                .subject_id
                .map(|subject_id| ProviderCommand::RefreshSubject {
                    stamp: self.next_stamp(Feed::Subject),
                    subject_id,
                })
                .into_iter()
                .collect(),
            Tab::WorldMap => vec![ProviderCommand::LoadFactionMembers {
                stamp: self.next_stamp(Feed::WorldMap),
                target: MapTarget::World,
                faction_id: None,
            }],
            Tab::FactionMap => match state.faction_map_id {
                Some(id) => vec![ProviderCommand::LoadFactionMembers {
                    stamp: self.next_stamp(Feed::FactionMap),
                    target: MapTarget::Faction,
                    faction_id: Some(id),
                }],
                None => {
                    state.set_notice(
                        Tab::FactionMap,
                        Notice::Info("Press f and enter a faction ID to map its members.".to_string()),
                    );
                    Vec::new()
                }
            },
            Tab::Stocks => state
                .subject_id
                .map(|subject_id| ProviderCommand::LoadStocks {
                    stamp: self.next_stamp(Feed::Stocks),
                    subject_id,
                    catalog_loaded: state.stock_catalog.is_loaded(),
                })
                .into_iter()
                .collect(),
            Tab::Bounties => vec![ProviderCommand::LoadBounties {
                stamp: self.next_stamp(Feed::Bounties),
                request: state.bounties.listing.request(),
            }],
            Tab::Targets => vec![ProviderCommand::LoadTargets {
                stamp: self.next_stamp(Feed::Targets),
                request: state.targets.listing.request(),
            }],
            Tab::War => vec![ProviderCommand::LoadWar {
                stamp: self.next_stamp(Feed::War),
                own_faction_id: state.own_faction_id,
            }],
            Tab::Settings | Tab::Docs => Vec::new(),
        }
    }
}

pub fn not_configured(name: CredentialName) -> Notice {
    Notice::NotConfigured(crate::api::FetchError::MissingCredential(name).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_existing_timer() {
        let now = Instant::now();
        let mut timers = TimerSet::default();
        timers.register(WAR_TIMER, Duration::from_secs(5), now);
        timers.register(WAR_TIMER, Duration::from_secs(9), now);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.interval(WAR_TIMER), Some(Duration::from_secs(9)));
    }

    #[test]
    fn due_reschedules_fired_timers() {
        let now = Instant::now();
        let mut timers = TimerSet::default();
        timers.register(SUBJECT_TIMER, Duration::from_secs(5), now);
        assert!(timers.due(now + Duration::from_secs(4)).is_empty());
        assert_eq!(timers.due(now + Duration::from_secs(5)), vec![SUBJECT_TIMER]);
        assert!(timers.due(now + Duration::from_secs(6)).is_empty());
    }
}
