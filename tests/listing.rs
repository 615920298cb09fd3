use std::collections::HashMap;

use serde_json::json;
use torn_terminal::api::FetchError;
use torn_terminal::bounties::Bounty;
use torn_terminal::companion::{FairFightStats, parse_targets};
use torn_terminal::credentials::CredentialName;
use torn_terminal::fairness::{EQUAL, MISSING, Rgb, ScoreScale, color_for};
use torn_terminal::listing::{
    Listing, MissingScore, enrich, order_bounties, prepare_bounty_page, rank_by_fairness,
    scores_or_degrade,
};

fn bounty(target_id: u64, reward: f64) -> Bounty {
    Bounty {
        id: format!("{target_id}-{reward}"),
        target_id: Some(target_id),
        target_name: format!("target {target_id}"),
        target_level: Some(10),
        reward,
        quantity: 1,
        reason: None,
    }
}

fn stats(ff: Option<f64>) -> FairFightStats {
    FairFightStats {
        fair_fight: ff,
        ..FairFightStats::default()
    }
}

#[test]
fn offset_is_page_size_times_previous_pages() {
    let mut listing = Listing::bounties(50, 100);
    for page in [1_i64, 2, 7, 100] {
        let request = listing.go_to(page);
        assert_eq!(request.offset, 50 * (page as u32 - 1));
        assert_eq!(request.limit, 50);
    }
}

#[test]
fn full_page_enables_next_and_short_page_ends_listing() {
    let mut listing = Listing::targets(50);
    listing.record_page(50);
    assert!(listing.has_next());
    assert!(listing.cursor().total.is_none());

    let request = listing.next().expect("next page");
    assert_eq!(request.page, 2);
    listing.record_page(14);
    assert!(!listing.has_next());
    assert_eq!(listing.cursor().total, Some(64));
    assert!(listing.next().is_none());
    assert_eq!(listing.prev().map(|r| r.page), Some(1));
}

#[test]
fn fixed_bound_stops_at_last_page_even_when_full() {
    let mut listing = Listing::bounties(50, 100);
    let request = listing.go_to(150);
    assert_eq!(request.page, 100);
    assert_eq!(request.offset, 4950);
    listing.record_page(50);
    assert!(!listing.has_next());
}

#[test]
fn duplicate_targets_keep_only_the_richest_bounty() {
    let ordered = order_bounties(vec![
        bounty(101, 10.0),
        bounty(202, 50.0),
        bounty(202, 50.0),
        bounty(303, 5.0),
    ]);
    let rewards: Vec<f64> = ordered.iter().map(|b| b.reward).collect();
    assert_eq!(rewards, vec![50.0, 10.0, 5.0]);
    let targets: Vec<Option<u64>> = ordered.iter().map(|b| b.target_id).collect();
    assert_eq!(targets, vec![Some(202), Some(101), Some(303)]);
}

#[test]
fn bounties_without_target_id_are_never_merged() {
    let mut anonymous = bounty(0, 20.0);
    anonymous.target_id = None;
    let ordered = order_bounties(vec![anonymous.clone(), anonymous]);
    assert_eq!(ordered.len(), 2);
}

#[test]
fn bounty_page_ranks_easiest_first_with_unknowns_last() {
    let mut scores = HashMap::new();
    scores.insert(101, stats(Some(2.5)));
    scores.insert(202, stats(Some(1.1)));
    scores.insert(303, stats(None));

    let rows = prepare_bounty_page(
        vec![bounty(101, 10.0), bounty(202, 50.0), bounty(303, 5.0)],
        &scores,
    );
    let order: Vec<Option<u64>> = rows.iter().map(|r| r.row.target_id).collect();
    assert_eq!(order, vec![Some(202), Some(101), Some(303)]);
    assert_eq!(rows[2].fair_fight(), None);
}

#[test]
fn failed_companion_call_leaves_page_unscored() {
    let (scores, warning) = scores_or_degrade(Err(FetchError::Transport(
        "HTTP error! status: 502".to_string(),
    )));
    assert!(scores.is_empty());
    assert_eq!(
        warning.as_deref(),
        Some("[WARN] Fair fight lookup failed: HTTP error! status: 502")
    );

    let rows = prepare_bounty_page(
        vec![bounty(101, 10.0), bounty(202, 50.0), bounty(303, 5.0)],
        &scores,
    );
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.fair_fight().is_none()));
    // Nothing to rank on, so reward order stands.
    let order: Vec<Option<u64>> = rows.iter().map(|r| r.row.target_id).collect();
    assert_eq!(order, vec![Some(202), Some(101), Some(303)]);
}

#[test]
fn unscored_rows_rank_after_scored_ones() {
    let mut scores = HashMap::new();
    scores.insert(303, stats(Some(1.2)));
    let rows = prepare_bounty_page(
        vec![bounty(101, 10.0), bounty(202, 50.0), bounty(303, 5.0)],
        &scores,
    );
    let order: Vec<Option<u64>> = rows.iter().map(|r| r.row.target_id).collect();
    assert_eq!(order, vec![Some(303), Some(202), Some(101)]);
}

#[test]
fn missing_companion_key_degrades_quietly() {
    let (scores, warning) =
        scores_or_degrade(Err(FetchError::MissingCredential(CredentialName::Companion)));
    assert!(scores.is_empty());
    assert!(warning.is_none());

    let body = json!([{"player_id": 101, "fair_fight": 2.0}]);
    let (scores, warning) = scores_or_degrade(Ok(body));
    assert_eq!(scores[&101].fair_fight, Some(2.0));
    assert!(warning.is_none());
}

#[test]
fn target_rows_without_id_still_fill_the_page() {
    let mut items: Vec<_> = (1..=49).map(|id| json!({"player_id": id, "name": "t"})).collect();
    items.push(json!({"name": "no id"}));
    let page = parse_targets(&json!({ "targets": items }));
    assert_eq!(page.targets.len(), 49);

    let mut listing = Listing::targets(50);
    listing.record_page(page.returned);
    assert!(listing.has_next());
}

#[test]
fn war_roster_puts_unknown_scores_first() {
    let mut scores = HashMap::new();
    scores.insert(1, stats(Some(3.0)));
    scores.insert(3, stats(Some(1.5)));

    let mut rows = enrich(vec![1_u64, 2, 3], &scores, |id| Some(*id));
    rank_by_fairness(&mut rows, MissingScore::First);
    let order: Vec<u64> = rows.iter().map(|r| r.row).collect();
    assert_eq!(order, vec![2, 3, 1]);
}

#[test]
fn equal_scores_use_the_flat_color() {
    let scale = ScoreScale::from_scores([2.0, 2.0, 2.0]).expect("scale");
    assert_eq!(scale.position(2.0), None);
    assert_eq!(scale.color(Some(2.0)), EQUAL);
    assert_eq!(color_for(Some(&scale), None), MISSING);
    assert_eq!(color_for(None, Some(2.0)), MISSING);
}

#[test]
fn scale_ignores_non_finite_scores() {
    let scale = ScoreScale::from_scores([f64::NAN, 1.0, f64::INFINITY, 3.0]).expect("scale");
    assert_eq!((scale.min, scale.max), (1.0, 3.0));
    assert_eq!(scale.color(Some(2.0)), Rgb(128, 153, 119));
    assert!(ScoreScale::from_scores([f64::NAN]).is_none());
}
