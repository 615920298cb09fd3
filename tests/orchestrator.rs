use std::time::{Duration, Instant};

use torn_terminal::config::DashboardConfig;
use torn_terminal::credentials::{CredentialName, CredentialStore};
use torn_terminal::faction::FactionMember;
use torn_terminal::orchestrator::{
    CONFLICT_TIMER, Orchestrator, PRICES_TIMER, PageNav, SUBJECT_TIMER, WORLD_MAP_TIMER,
};
use torn_terminal::state::{AppState, Delta, MapTarget, ProviderCommand, Tab, apply_delta};
use torn_terminal::tabs::TabController;

fn store_with(keys: &[CredentialName]) -> CredentialStore {
    let store = CredentialStore::in_memory();
    for name in keys {
        store.set_field(*name, "test-key");
    }
    store
}

fn orchestrator(keys: &[CredentialName]) -> Orchestrator {
    Orchestrator::new(&DashboardConfig::default(), store_with(keys))
}

fn state_with_subject() -> AppState {
    let mut state = AppState::default();
    state.subject_id = Some(3883628);
    state.subject_input = "3883628".to_string();
    state
}

#[test]
fn activating_twice_keeps_a_single_timer() {
    let mut orch = orchestrator(&[CredentialName::Primary]);
    let mut state = state_with_subject();
    let now = Instant::now();

    let first = orch.activate(Tab::Player, &mut state, now);
    assert_eq!(first.len(), 1);
    assert!(matches!(first[0], ProviderCommand::RefreshSubject { subject_id: 3883628, .. }));
    let second = orch.activate(Tab::Player, &mut state, now);
    assert!(second.is_empty());
    assert_eq!(orch.timers().len(), 1);
    assert_eq!(orch.timers().interval(SUBJECT_TIMER), Some(Duration::from_secs(5)));
}

#[test]
fn missing_key_shows_notice_and_schedules_nothing() {
    let mut orch = orchestrator(&[]);
    let mut state = state_with_subject();

    let cmds = orch.activate(Tab::Stocks, &mut state, Instant::now());
    assert!(cmds.is_empty());
    assert!(orch.timers().is_empty());
    assert_eq!(
        state.notice(Tab::Stocks).map(|n| n.text()),
        Some("API key not configured. Please enter your API key in the Settings tab.")
    );
}

#[test]
fn targets_need_the_companion_key_only() {
    let mut orch = orchestrator(&[CredentialName::Primary]);
    let mut state = AppState::default();
    assert!(orch.activate(Tab::Targets, &mut state, Instant::now()).is_empty());
    assert_eq!(
        state.notice(Tab::Targets).map(|n| n.text()),
        Some("FFScouter API key not configured. Please enter it in the Settings tab.")
    );

    let mut orch = orchestrator(&[CredentialName::Companion]);
    let cmds = orch.activate(Tab::Targets, &mut state, Instant::now());
    assert!(matches!(cmds.as_slice(), [ProviderCommand::LoadTargets { .. }]));
}

#[test]
fn player_view_without_subject_asks_for_a_search() {
    let mut orch = orchestrator(&[CredentialName::Primary]);
    let mut state = AppState::default();
    assert!(orch.activate(Tab::Player, &mut state, Instant::now()).is_empty());
    assert_eq!(
        state.notice(Tab::Player).map(|n| n.text()),
        Some("Please search for a user first.")
    );
}

#[test]
fn switching_away_stops_the_map_timer_but_late_data_still_lands() {
    let mut tabs = TabController::new(orchestrator(&[CredentialName::Primary]));
    let mut state = state_with_subject();
    let now = Instant::now();

    let cmds = tabs.switch(Tab::WorldMap, &mut state, now);
    let stamp = match cmds.as_slice() {
        [cmd @ ProviderCommand::LoadFactionMembers { .. }] => cmd.stamp(),
        other => panic!("unexpected commands: {other:?}"),
    };
    assert!(tabs.orchestrator().timers().contains(WORLD_MAP_TIMER));

    tabs.switch(Tab::Bounties, &mut state, now);
    assert!(!tabs.orchestrator().timers().contains(WORLD_MAP_TIMER));
    assert!(tabs.orchestrator().is_active(Tab::Bounties));

    let late = Delta::FactionMembers {
        stamp,
        target: MapTarget::World,
        faction_id: None,
        members: vec![FactionMember {
            id: 1,
            name: "Late".to_string(),
            level: None,
            position: None,
            state: "Okay".to_string(),
            description: "Okay".to_string(),
            status_until: None,
            activity: None,
            last_action: None,
            last_action_at: None,
        }],
    };
    assert!(apply_delta(&mut state, late).is_none());
    let map = state.world_map.data.as_ref().expect("map data");
    assert_eq!(map.plot.in_torn, vec!["Late".to_string()]);
    assert_eq!(state.tab, Tab::Bounties);
}

#[test]
fn stocks_poll_prices_on_their_own_timer() {
    let mut orch = orchestrator(&[CredentialName::Primary]);
    let mut state = state_with_subject();
    let now = Instant::now();

    let cmds = orch.activate(Tab::Stocks, &mut state, now);
    assert!(matches!(
        cmds.as_slice(),
        [ProviderCommand::LoadStocks { catalog_loaded: false, .. }]
    ));
    assert!(orch.tick(&state, now + Duration::from_secs(9)).is_empty());
    let due = orch.tick(&state, now + Duration::from_secs(10));
    assert!(matches!(due.as_slice(), [ProviderCommand::RefreshPrices { .. }]));
    assert!(orch.timers().contains(PRICES_TIMER));
}

#[test]
fn halt_stops_everything_until_resumed() {
    let mut orch = orchestrator(&[CredentialName::Primary]);
    let mut state = state_with_subject();
    let now = Instant::now();

    orch.start_background(now);
    orch.activate(Tab::Player, &mut state, now);
    assert!(orch.timers().contains(CONFLICT_TIMER));

    orch.halt();
    assert!(orch.is_halted());
    assert!(orch.timers().is_empty());
    assert!(orch.activate(Tab::War, &mut state, now).is_empty());
    assert!(orch.tick(&state, now + Duration::from_secs(60)).is_empty());
    assert!(orch.resolve_identity(&mut state).is_none());

    orch.resume();
    assert!(!orch.is_halted());
    assert!(orch.resolve_identity(&mut state).is_some());
}

#[test]
fn invalid_search_alerts_and_restores_last_subject() {
    let mut orch = orchestrator(&[CredentialName::Primary]);
    let mut state = state_with_subject();
    state.subject_input = "abc".to_string();

    assert!(orch.lookup("abc", &mut state).is_empty());
    assert_eq!(
        state.alert.as_deref(),
        Some("Invalid user ID: abc. User ID must be a number.")
    );
    assert_eq!(state.subject_input, "3883628");

    let cmds = orch.lookup(" 42 ", &mut state);
    assert!(matches!(
        cmds.as_slice(),
        [ProviderCommand::LookupSubject { input, .. }] if input == "42"
    ));
}

#[test]
fn page_jump_clamps_to_the_last_bounty_page() {
    let mut orch = orchestrator(&[CredentialName::Primary]);
    let mut state = AppState::default();
    orch.activate(Tab::Bounties, &mut state, Instant::now());

    let cmds = orch.navigate(PageNav::Jump(150), &mut state);
    match cmds.as_slice() {
        [ProviderCommand::LoadBounties { request, .. }] => {
            assert_eq!(request.page, 100);
            assert_eq!(request.offset, 4950);
        }
        other => panic!("unexpected commands: {other:?}"),
    }
    assert!(state.bounties.loading);
    assert!(state.bounties.rows.is_empty());

    // Nothing recorded yet, so there is no known next page.
    assert!(orch.navigate(PageNav::Next, &mut state).is_empty());
}

#[test]
fn reentering_bounties_starts_from_page_one() {
    let mut tabs = TabController::new(orchestrator(&[CredentialName::Primary]));
    let mut state = AppState::default();
    let now = Instant::now();

    tabs.switch(Tab::Bounties, &mut state, now);
    tabs.orchestrator_mut().navigate(PageNav::Jump(4), &mut state);
    assert_eq!(state.bounties.listing.page(), 4);

    tabs.switch(Tab::Targets, &mut state, now);
    let cmds = tabs.switch(Tab::Bounties, &mut state, now);
    assert_eq!(state.bounties.listing.page(), 1);
    assert!(matches!(
        cmds.as_slice(),
        [ProviderCommand::LoadBounties { request, .. }] if request.offset == 0
    ));
}
