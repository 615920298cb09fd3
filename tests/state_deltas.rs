use std::time::{Duration, Instant};

use torn_terminal::config::DashboardConfig;
use torn_terminal::credentials::{CredentialName, CredentialStore};
use torn_terminal::faction::FactionMember;
use torn_terminal::listing::Enriched;
use torn_terminal::orchestrator::Orchestrator;
use torn_terminal::player::{FactionRef, PlayerSnapshot};
use torn_terminal::state::{
    AppState, Delta, Feed, Notice, ProviderCommand, Signal, Stamp, Tab, WarBoard, apply_delta,
};
use torn_terminal::war::{WarFaction, WarsOverview};

fn stamp(feed: Feed, seq: u64) -> Stamp {
    Stamp { feed, seq }
}

fn player(id: u64, name: &str, faction: Option<u64>) -> PlayerSnapshot {
    PlayerSnapshot {
        id: Some(id),
        name: Some(name.to_string()),
        faction: faction.map(|id| FactionRef {
            id: Some(id),
            name: None,
            position: None,
        }),
        ..PlayerSnapshot::default()
    }
}

#[test]
fn identity_sets_own_faction_and_subject() {
    let mut state = AppState::default();
    let signal = apply_delta(
        &mut state,
        Delta::IdentityResolved {
            stamp: stamp(Feed::Identity, 1),
            player: player(3883628, "Raven", Some(9412)),
            stats: None,
        },
    );
    assert_eq!(signal, Some(Signal::IdentityReady));
    assert!(state.identity_resolved);
    assert_eq!(state.own_faction_id, Some(9412));
    assert_eq!(state.subject_id, Some(3883628));
    assert_eq!(state.subject_input, "3883628");
    assert!(state.logs.iter().any(|l| l == "[INFO] Signed in as Raven"));
}

#[test]
fn failed_identity_is_fatal() {
    let mut state = AppState::default();
    let signal = apply_delta(
        &mut state,
        Delta::IdentityFailed {
            stamp: stamp(Feed::Identity, 1),
            message: "Incorrect key".to_string(),
        },
    );
    assert_eq!(signal, Some(Signal::Fatal));
    assert_eq!(state.fatal.as_deref(), Some("Incorrect key"));
    assert!(state.subject_id.is_none());
}

#[test]
fn stale_responses_are_dropped() {
    let mut state = AppState::default();
    state.subject_id = Some(7);
    apply_delta(
        &mut state,
        Delta::SubjectRefreshed {
            stamp: stamp(Feed::Subject, 5),
            player: player(7, "newer", None),
        },
    );
    apply_delta(
        &mut state,
        Delta::SubjectRefreshed {
            stamp: stamp(Feed::Subject, 3),
            player: player(7, "older", None),
        },
    );
    let shown = state.player.data.as_ref().expect("player");
    assert_eq!(shown.name.as_deref(), Some("newer"));

    // Stamps are tracked per feed.
    apply_delta(
        &mut state,
        Delta::ConflictCheck {
            stamp: stamp(Feed::Conflict, 1),
            active: true,
        },
    );
    assert!(state.war_alert);
}

#[test]
fn refresh_for_a_previous_subject_is_ignored() {
    let mut state = AppState::default();
    state.subject_id = Some(8);
    apply_delta(
        &mut state,
        Delta::SubjectRefreshed {
            stamp: stamp(Feed::Subject, 1),
            player: player(7, "gone", None),
        },
    );
    assert!(state.player.data.is_none());
}

#[test]
fn failure_keeps_the_last_good_payload() {
    let mut state = AppState::default();
    state.subject_id = Some(7);
    apply_delta(
        &mut state,
        Delta::SubjectRefreshed {
            stamp: stamp(Feed::Subject, 1),
            player: player(7, "Raven", None),
        },
    );
    apply_delta(
        &mut state,
        Delta::FeedFailed {
            stamp: stamp(Feed::Subject, 2),
            message: "HTTP error! status: 502".to_string(),
        },
    );
    assert!(state.player.data.is_some());
    assert_eq!(
        state.notice(Tab::Player),
        Some(&Notice::Error("HTTP error! status: 502".to_string()))
    );
    assert!(state.logs.back().is_some_and(|l| l.starts_with("[WARN] Player:")));
}

#[test]
fn new_subject_drops_previous_holdings() {
    let mut state = AppState::default();
    state.subject_id = Some(7);
    state.stocks.set(Vec::new());
    let signal = apply_delta(
        &mut state,
        Delta::SubjectLoaded {
            stamp: stamp(Feed::Lookup, 1),
            player: player(9, "Other", None),
            stats: None,
        },
    );
    assert_eq!(signal, Some(Signal::SubjectChanged));
    assert_eq!(state.subject_id, Some(9));
    assert!(state.stocks.data.is_none());
}

#[test]
fn failed_lookup_restores_search_box() {
    let mut state = AppState::default();
    state.subject_id = Some(7);
    state.subject_input = "999999999".to_string();
    apply_delta(
        &mut state,
        Delta::SubjectLookupFailed {
            stamp: stamp(Feed::Lookup, 1),
            input: "999999999".to_string(),
            message: "Incorrect ID".to_string(),
        },
    );
    assert_eq!(state.subject_input, "7");
    assert_eq!(state.alert.as_deref(), Some("Incorrect ID"));
}

/// Player view polling subject 1, then a search for 2 and a refresh tick before it returns.
fn search_then_tick() -> (AppState, Stamp, Stamp) {
    let store = CredentialStore::in_memory();
    store.set_field(CredentialName::Primary, "test-key");
    let mut orch = Orchestrator::new(&DashboardConfig::default(), store);
    let mut state = AppState::default();
    state.subject_id = Some(1);
    state.subject_input = "1".to_string();
    let now = Instant::now();
    orch.activate(Tab::Player, &mut state, now);

    state.subject_input = "2".to_string();
    let lookup = match orch.lookup("2", &mut state).as_slice() {
        [cmd @ ProviderCommand::LookupSubject { .. }] => cmd.stamp(),
        other => panic!("unexpected commands: {other:?}"),
    };
    let refresh = match orch.tick(&state, now + Duration::from_secs(5)).as_slice() {
        [cmd @ ProviderCommand::RefreshSubject { subject_id: 1, .. }] => cmd.stamp(),
        other => panic!("unexpected commands: {other:?}"),
    };
    assert!(refresh.seq > lookup.seq);
    (state, lookup, refresh)
}

#[test]
fn search_result_survives_a_later_refresh_tick() {
    let (mut state, lookup, refresh) = search_then_tick();
    apply_delta(
        &mut state,
        Delta::SubjectRefreshed {
            stamp: refresh,
            player: player(1, "Old", None),
        },
    );
    let signal = apply_delta(
        &mut state,
        Delta::SubjectLoaded {
            stamp: lookup,
            player: player(2, "New", None),
            stats: None,
        },
    );
    assert_eq!(signal, Some(Signal::SubjectChanged));
    assert_eq!(state.subject_id, Some(2));
    assert_eq!(state.subject_input, "2");
    let shown = state.player.data.as_ref().expect("player");
    assert_eq!(shown.name.as_deref(), Some("New"));
}

#[test]
fn failed_search_alerts_even_after_a_refresh_tick() {
    let (mut state, lookup, refresh) = search_then_tick();
    apply_delta(
        &mut state,
        Delta::SubjectRefreshed {
            stamp: refresh,
            player: player(1, "Old", None),
        },
    );
    apply_delta(
        &mut state,
        Delta::SubjectLookupFailed {
            stamp: lookup,
            input: "2".to_string(),
            message: "Incorrect ID".to_string(),
        },
    );
    assert_eq!(state.alert.as_deref(), Some("Incorrect ID"));
    assert_eq!(state.subject_id, Some(1));
    assert_eq!(state.subject_input, "1");
    assert!(!state.player.loading);
}

#[test]
fn bounty_page_for_another_page_is_ignored() {
    let mut state = AppState::default();
    state.bounties.listing.go_to(2);
    apply_delta(
        &mut state,
        Delta::BountyPage {
            stamp: stamp(Feed::Bounties, 1),
            page: 1,
            raw_count: 50,
            rows: Vec::new(),
        },
    );
    assert!(!state.bounties.listing.has_next());

    apply_delta(
        &mut state,
        Delta::BountyPage {
            stamp: stamp(Feed::Bounties, 2),
            page: 2,
            raw_count: 50,
            rows: Vec::new(),
        },
    );
    assert!(state.bounties.listing.has_next());
}

#[test]
fn war_without_opponent_explains_itself() {
    let mut state = AppState::default();
    apply_delta(
        &mut state,
        Delta::WarData {
            stamp: stamp(Feed::War, 1),
            board: WarBoard::default(),
        },
    );
    assert_eq!(
        state.notice(Tab::War).map(|n| n.text()),
        Some("No active war found or opponent faction not identified.")
    );

    let board = WarBoard {
        overview: WarsOverview::default(),
        opponent: Some(WarFaction {
            id: Some(5150),
            name: "Iron Lotus".to_string(),
            score: 1310,
        }),
        members: vec![Enriched {
            row: FactionMember {
                id: 1,
                name: "enemy".to_string(),
                level: None,
                position: None,
                state: "Okay".to_string(),
                description: "Okay".to_string(),
                status_until: None,
                activity: None,
                last_action: None,
                last_action_at: None,
            },
            stats: None,
        }],
        ..WarBoard::default()
    };
    apply_delta(
        &mut state,
        Delta::WarData {
            stamp: stamp(Feed::War, 2),
            board,
        },
    );
    assert!(state.notice(Tab::War).is_none());
    assert_eq!(state.war.data.as_ref().map(|b| b.members.len()), Some(1));
}

#[test]
fn conflict_alert_is_logged_once() {
    let mut state = AppState::default();
    for seq in 1..=3 {
        apply_delta(
            &mut state,
            Delta::ConflictCheck {
                stamp: stamp(Feed::Conflict, seq),
                active: true,
            },
        );
    }
    let alerts = state
        .logs
        .iter()
        .filter(|l| l.as_str() == "[ALERT] Active war detected")
        .count();
    assert_eq!(alerts, 1);

    apply_delta(
        &mut state,
        Delta::ConflictCheck {
            stamp: stamp(Feed::Conflict, 4),
            active: false,
        },
    );
    assert!(!state.war_alert);
}

#[test]
fn log_buffer_is_bounded() {
    let mut state = AppState::default();
    for i in 0..250 {
        state.push_log(format!("[INFO] line {i}"));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("[INFO] line 50"));
}
