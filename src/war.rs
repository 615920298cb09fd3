use serde_json::Value;

use crate::format::format_elapsed;
use crate::json::{pick_i64, pick_string, pick_u64};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarKind {
    Ranked,
    Raid,
    Territory,
}

impl WarKind {
    pub fn label(self) -> &'static str {
        match self {
            WarKind::Ranked => "Ranked war",
            WarKind::Raid => "Raid",
            WarKind::Territory => "Territory war",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarFaction {
    pub id: Option<u64>,
    pub name: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarSnapshot {
    pub kind: WarKind,
    pub factions: Vec<WarFaction>,
    /// Unix seconds.
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl WarSnapshot {
    pub fn has_ended(&self) -> bool {
        self.end.is_some()
    }

    pub fn clock(&self, now: i64) -> WarClock {
        WarClock {
            start: self.start,
            end: self.end,
            now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarsOverview {
    pub ranked: Option<WarSnapshot>,
    pub raids: Vec<WarSnapshot>,
    pub territory: Vec<WarSnapshot>,
}

/// Timestamps above this are milliseconds.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

pub fn normalize_timestamp(ts: i64) -> i64 {
    if ts > MILLIS_THRESHOLD { ts / 1000 } else { ts }
}

fn parse_war(kind: WarKind, value: &Value) -> Option<WarSnapshot> {
    if !value.is_object() {
        return None;
    }
    let factions = value
        .get("factions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|f| WarFaction {
                    id: pick_u64(f, &["id", "faction_id"]),
                    name: pick_string(f, &["name"]).unwrap_or_else(|| "Unknown".to_string()),
                    score: pick_i64(f, &["score"]).unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default();
    let stamp = |key: &str| {
        pick_i64(value, &[key])
            .filter(|ts| *ts > 0)
            .map(normalize_timestamp)
    };
    Some(WarSnapshot {
        kind,
        factions,
        start: stamp("start"),
        end: stamp("end"),
    })
}

pub fn parse_wars(value: &Value) -> WarsOverview {
    let wars = value.get("wars").unwrap_or(value);
    let list = |kind: WarKind, key: &str| -> Vec<WarSnapshot> {
        match wars.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(|w| parse_war(kind, w)).collect(),
            Some(other) => parse_war(kind, other).into_iter().collect(),
            None => Vec::new(),
        }
    };
    WarsOverview {
        ranked: wars
            .get("ranked")
            .and_then(|r| parse_war(WarKind::Ranked, r)),
        raids: list(WarKind::Raid, "raids"),
        territory: list(WarKind::Territory, "territory"),
    }
}

impl WarsOverview {
    fn all(&self) -> impl Iterator<Item = &WarSnapshot> {
        self.ranked
            .iter()
            .chain(self.raids.iter())
            .chain(self.territory.iter())
    }

    /// Drives the War tab highlight.
    pub fn has_active_conflict(&self) -> bool {
        if let Some(ranked) = &self.ranked {
            if ranked.has_ended() {
                return false;
            }
            if ranked.factions.len() >= 2 {
                return true;
            }
        }
        self.raids
            .iter()
            .chain(self.territory.iter())
            .any(|w| !w.has_ended() && !w.factions.is_empty())
    }

    /// The war the War tab shows: the ranked war when there is one, else the first running raid or territory war.
    pub fn active_war(&self) -> Option<&WarSnapshot> {
        if let Some(ranked) = self.ranked.as_ref().filter(|r| r.factions.len() >= 2) {
            return Some(ranked);
        }
        self.raids
            .iter()
            .chain(self.territory.iter())
            .find(|w| !w.has_ended() && !w.factions.is_empty())
    }

    /// First faction across ranked, raid and territory wars that is not ours.
    pub fn opponent(&self, own: Option<u64>) -> Option<&WarFaction> {
        let own = own?;
        self.all()
            .flat_map(|w| w.factions.iter())
            .find(|f| f.id.is_some_and(|id| id != own))
    }

    /// Own faction first when it is part of the war.
    pub fn scoreboard(&self, own: Option<u64>) -> Vec<WarFaction> {
        let Some(war) = self.active_war() else {
            return Vec::new();
        };
        let mut rows = war.factions.clone();
        if let Some(own) = own {
            rows.sort_by_key(|f| f.id != Some(own));
        }
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarClock {
    start: Option<i64>,
    end: Option<i64>,
    now: i64,
}

impl WarClock {
    pub fn label(&self) -> String {
        let Some(start) = self.start else {
            return "00:00:00".to_string();
        };
        match self.end {
            Some(end) => format!("Ended after {}", format_elapsed((end - start).max(0) as u64)),
            None if start > self.now => {
                format!("Starts in {}", format_elapsed((start - self.now) as u64))
            }
            None => format_elapsed((self.now - start) as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn millisecond_timestamps_are_normalized() {
        assert_eq!(normalize_timestamp(1_700_000_000_000), 1_700_000_000);
        assert_eq!(normalize_timestamp(1_700_000_000), 1_700_000_000);
    }

    #[test]
    fn ended_ranked_war_is_not_active() {
        let wars = parse_wars(&json!({"wars": {"ranked": {
            "start": 100, "end": 200,
            "factions": [{"id": 1, "name": "A", "score": 5}, {"id": 2, "name": "B", "score": 9}]
        }, "raids": [], "territory": []}}));
        assert!(!wars.has_active_conflict());
        let clock = wars.active_war().unwrap().clock(10_000);
        assert_eq!(clock.label(), "Ended after 00:01:40");
    }

    #[test]
    fn opponent_skips_own_faction() {
        let wars = parse_wars(&json!({"wars": {"ranked": {
            "start": 100,
            "factions": [{"id": 1, "name": "Us", "score": 5}, {"id": 2, "name": "Them", "score": 9}]
        }}}));
        assert!(wars.has_active_conflict());
        assert_eq!(wars.opponent(Some(1)).map(|f| f.name.as_str()), Some("Them"));
        assert_eq!(wars.opponent(None), None);
        assert_eq!(wars.scoreboard(Some(2))[0].name, "Them");
    }
}
