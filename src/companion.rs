use std::collections::HashMap;

use serde_json::Value;

use crate::json::{entries, pick_f64, pick_i64, pick_string, pick_u64};

/// Companion-API estimate for one player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FairFightStats {
    pub fair_fight: Option<f64>,
    pub bs_estimate: Option<u64>,
    pub bs_estimate_human: Option<String>,
    pub bss_public: Option<u64>,
    pub last_updated: Option<i64>,
}

/// Accepts both the array form and the id-keyed object form of `get-stats`.
pub fn parse_stats(value: &Value) -> HashMap<u64, FairFightStats> {
    let mut out = HashMap::new();
    for (key, item) in entries(Some(value)) {
        let id = pick_u64(item, &["player_id"])
            .or_else(|| key.as_deref().and_then(|k| k.trim().parse::<u64>().ok()));
        let Some(id) = id else {
            continue;
        };
        out.insert(
            id,
            FairFightStats {
                fair_fight: pick_f64(item, &["fair_fight"]),
                bs_estimate: pick_u64(item, &["bs_estimate"]),
                bs_estimate_human: pick_string(item, &["bs_estimate_human"]),
                bss_public: pick_u64(item, &["bss_public"]),
                last_updated: pick_i64(item, &["last_updated"]),
            },
        );
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub player_id: u64,
    pub name: String,
    pub level: Option<u64>,
    pub fair_fight: Option<f64>,
    pub bs_estimate_human: Option<String>,
    pub last_action: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetPage {
    pub limit: Option<u64>,
    /// Rows the API sent, including any dropped for lacking an id.
    pub returned: usize,
    pub targets: Vec<Target>,
}

pub fn parse_targets(value: &Value) -> TargetPage {
    let limit = value
        .get("parameters")
        .and_then(|p| pick_u64(p, &["limit"]));
    let items = value.get("targets").and_then(Value::as_array);
    let returned = items.map_or(0, Vec::len);
    let targets = items
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Target {
                        player_id: pick_u64(item, &["player_id", "id"])?,
                        name: pick_string(item, &["name"]).unwrap_or_else(|| "Unknown".to_string()),
                        level: pick_u64(item, &["level"]),
                        fair_fight: pick_f64(item, &["fair_fight"]),
                        bs_estimate_human: pick_string(item, &["bs_estimate_human"]),
                        last_action: pick_i64(item, &["last_action"]),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    TargetPage {
        limit,
        returned,
        targets,
    }
}

/// Easiest first; a missing score counts as zero.
pub fn sort_targets(targets: &mut [Target]) {
    targets.sort_by(|a, b| {
        a.fair_fight
            .unwrap_or(0.0)
            .total_cmp(&b.fair_fight.unwrap_or(0.0))
    });
}
