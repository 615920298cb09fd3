use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use tracing::{info, warn};

use crate::api::{
    ApiClient, FetchError, SUBJECT_LOOKUP_SELECTIONS, SUBJECT_REFRESH_SELECTIONS,
    SUBJECT_STATUS_SELECTIONS,
};
use crate::bounties::parse_bounties;
use crate::companion::{FairFightStats, parse_targets, sort_targets};
use crate::config::DashboardConfig;
use crate::faction::parse_members;
use crate::listing::{
    MissingScore, PageRequest, bounty_target_ids, enrich, prepare_bounty_page, rank_by_fairness,
    scores_or_degrade,
};
use crate::player::{PlayerSnapshot, parse_player};
use crate::state::{Delta, MapTarget, ProviderCommand, Stamp, WarBoard};
use crate::stocks::{parse_holdings, parse_stock_catalog, parse_stock_prices};
use crate::war::parse_wars;
use crate::world_map::plot_members;

/// Worker thread: every command runs as its own job on the fetch pool, so responses
/// can come back in any order. `apply_delta` sorts that out with the stamps.
pub fn spawn_provider(
    api: ApiClient,
    config: DashboardConfig,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) {
    thread::spawn(move || {
        let pool = build_fetch_pool(config.fetch_parallelism);
        info!(
            threads = config.fetch_parallelism,
            pooled = pool.is_some(),
            "provider started"
        );
        while let Ok(cmd) = cmd_rx.recv() {
            let api = api.clone();
            let config = config.clone();
            let tx = tx.clone();
            let job = move || {
                for delta in execute(&api, &config, cmd) {
                    if tx.send(delta).is_err() {
                        break;
                    }
                }
            };
            if let Some(pool) = pool.as_ref() {
                pool.spawn(job);
            } else {
                thread::spawn(job);
            }
        }
        info!("provider stopped");
    });
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("fetch-{idx}"))
        .build()
        .ok()
}

/// Run one command to completion and describe the outcome as deltas.
pub fn execute(api: &ApiClient, config: &DashboardConfig, cmd: ProviderCommand) -> Vec<Delta> {
    let mut out = Vec::new();
    match cmd {
        ProviderCommand::ResolveIdentity { stamp, subject } => {
            let fetched = match subject {
                Some(id) => api.fetch_user(&id.to_string(), SUBJECT_LOOKUP_SELECTIONS),
                None => api.whoami(),
            };
            match fetched {
                Ok(body) => {
                    let player = parse_player(&body);
                    let stats = subject_stats(api, &player, &mut out);
                    out.push(Delta::IdentityResolved {
                        stamp,
                        player,
                        stats,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "identity lookup failed");
                    out.push(Delta::IdentityFailed {
                        stamp,
                        message: err.to_string(),
                    });
                }
            }
        }
        ProviderCommand::LookupSubject { stamp, input } => {
            match api.fetch_user(&input, SUBJECT_LOOKUP_SELECTIONS) {
                Ok(body) => {
                    let player = parse_player(&body);
                    let stats = subject_stats(api, &player, &mut out);
                    out.push(Delta::Log(format!(
                        "[INFO] Loaded {}",
                        player.name.as_deref().unwrap_or(&input)
                    )));
                    out.push(Delta::SubjectLoaded {
                        stamp,
                        player,
                        stats,
                    });
                }
                Err(err) => out.push(Delta::SubjectLookupFailed {
                    stamp,
                    input,
                    message: err.to_string(),
                }),
            }
        }
        ProviderCommand::RefreshSubject { stamp, subject_id } => {
            match refresh_subject(api, subject_id) {
                Ok(player) => out.push(Delta::SubjectRefreshed { stamp, player }),
                Err(err) => out.push(failed(stamp, err)),
            }
        }
        ProviderCommand::LoadStocks {
            stamp,
            subject_id,
            catalog_loaded,
        } => {
            match api.fetch_stock_catalog() {
                Ok(body) if catalog_loaded => out.push(Delta::StockPrices {
                    stamp,
                    prices: parse_stock_prices(&body),
                }),
                Ok(body) => out.push(Delta::StockCatalog {
                    stamp,
                    catalog: parse_stock_catalog(&body),
                }),
                Err(err) => {
                    out.push(failed(stamp, err));
                    return out;
                }
            }
            match api.fetch_user_stocks(subject_id) {
                Ok(body) => out.push(Delta::StockHoldings {
                    stamp,
                    holdings: parse_holdings(&body),
                }),
                Err(err) => out.push(failed(stamp, err)),
            }
        }
        ProviderCommand::RefreshPrices { stamp } => match api.fetch_stock_catalog() {
            Ok(body) => out.push(Delta::StockPrices {
                stamp,
                prices: parse_stock_prices(&body),
            }),
            Err(err) => out.push(failed(stamp, err)),
        },
        ProviderCommand::LoadFactionMembers {
            stamp,
            target,
            faction_id,
        } => match api.fetch_faction_members(faction_id) {
            Ok(body) => {
                let members = parse_members(&body);
                if target == MapTarget::Faction && members.is_empty() {
                    out.push(Delta::Log(format!(
                        "[INFO] Faction {} has no members to map",
                        faction_id.map(|id| id.to_string()).unwrap_or_default()
                    )));
                }
                out.push(Delta::FactionMembers {
                    stamp,
                    target,
                    faction_id,
                    members,
                });
            }
            Err(err) => out.push(failed(stamp, err)),
        },
        ProviderCommand::LoadBounties { stamp, request } => {
            match load_bounties(api, stamp, request, &mut out) {
                Ok(delta) => out.push(delta),
                Err(err) => out.push(failed(stamp, err)),
            }
        }
        ProviderCommand::LoadTargets { stamp, request } => {
            match api.fetch_targets(
                request.offset,
                request.limit,
                config.target_min_ff,
                config.target_max_ff,
            ) {
                Ok(body) => {
                    let mut page = parse_targets(&body);
                    let raw_count = page.returned;
                    sort_targets(&mut page.targets);
                    out.push(Delta::TargetPage {
                        stamp,
                        page: request.page,
                        raw_count,
                        targets: page.targets,
                    });
                }
                Err(err) => out.push(failed(stamp, err)),
            }
        }
        ProviderCommand::LoadWar {
            stamp,
            own_faction_id,
        } => match load_war(api, own_faction_id, &mut out) {
            Ok(board) => out.push(Delta::WarData { stamp, board }),
            Err(err) => out.push(failed(stamp, err)),
        },
        ProviderCommand::CheckConflict { stamp } => match api.fetch_wars() {
            Ok(body) => out.push(Delta::ConflictCheck {
                stamp,
                active: parse_wars(&body).has_active_conflict(),
            }),
            Err(err) => out.push(failed(stamp, err)),
        },
    }
    out
}

fn failed(stamp: Stamp, err: FetchError) -> Delta {
    warn!(feed = ?stamp.feed, error = %err, "fetch failed");
    Delta::FeedFailed {
        stamp,
        message: err.to_string(),
    }
}

/// Two calls: the volatile sections, then status and travel.
fn refresh_subject(api: &ApiClient, subject_id: u64) -> Result<PlayerSnapshot, FetchError> {
    let raw_id = subject_id.to_string();
    let mut player = parse_player(&api.fetch_user(&raw_id, SUBJECT_REFRESH_SELECTIONS)?);
    player.merge(parse_player(&api.fetch_user(&raw_id, SUBJECT_STATUS_SELECTIONS)?));
    if player.id.is_none() {
        player.id = Some(subject_id);
    }
    Ok(player)
}

/// Companion scores for `ids`. Missing key or a failed call just means no scores.
fn fair_fight_stats(
    api: &ApiClient,
    ids: &[u64],
    out: &mut Vec<Delta>,
) -> HashMap<u64, FairFightStats> {
    if ids.is_empty() {
        return HashMap::new();
    }
    let (stats, warning) = scores_or_degrade(api.fetch_fair_fight(ids));
    if let Some(line) = warning {
        warn!(count = ids.len(), "{line}");
        out.push(Delta::Log(line));
    }
    stats
}

fn subject_stats(
    api: &ApiClient,
    player: &PlayerSnapshot,
    out: &mut Vec<Delta>,
) -> Option<FairFightStats> {
    let id = player.id?;
    fair_fight_stats(api, &[id], out).remove(&id)
}

fn load_bounties(
    api: &ApiClient,
    stamp: Stamp,
    request: PageRequest,
    out: &mut Vec<Delta>,
) -> Result<Delta, FetchError> {
    let bounties = parse_bounties(&api.fetch_bounties(request.offset, request.limit)?);
    let raw_count = bounties.len();
    let stats = fair_fight_stats(api, &bounty_target_ids(&bounties), out);
    let rows = prepare_bounty_page(bounties, &stats);
    Ok(Delta::BountyPage {
        stamp,
        page: request.page,
        raw_count,
        rows,
    })
}

fn load_war(
    api: &ApiClient,
    own_faction_id: Option<u64>,
    out: &mut Vec<Delta>,
) -> Result<WarBoard, FetchError> {
    let overview = parse_wars(&api.fetch_wars()?);
    let opponent = overview.opponent(own_faction_id).cloned();
    let Some(opponent_id) = opponent.as_ref().and_then(|o| o.id) else {
        return Ok(WarBoard {
            overview,
            opponent,
            ..WarBoard::default()
        });
    };

    let members = parse_members(&api.fetch_faction_members(Some(opponent_id))?);
    let plot = plot_members(&members);
    let ids: Vec<u64> = members.iter().map(|m| m.id).collect();
    let stats = fair_fight_stats(api, &ids, out);
    let mut members = enrich(members, &stats, |m| Some(m.id));
    rank_by_fairness(&mut members, MissingScore::First);
    Ok(WarBoard {
        overview,
        opponent,
        members,
        plot,
    })
}
