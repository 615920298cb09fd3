use serde_json::Value;

use crate::json::{as_u64, pick_f64, pick_i64, pick_string, pick_u64};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub current: u64,
    pub maximum: u64,
}

impl Bar {
    pub fn ratio(&self) -> f64 {
        if self.maximum == 0 {
            return 0.0;
        }
        (self.current as f64 / self.maximum as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bars {
    pub life: Option<Bar>,
    pub energy: Option<Bar>,
    pub nerve: Option<Bar>,
    pub happy: Option<Bar>,
}

impl Bars {
    fn is_empty(&self) -> bool {
        self.life.is_none() && self.energy.is_none() && self.nerve.is_none() && self.happy.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Money {
    pub wallet: Option<f64>,
    pub faction: Option<f64>,
    pub city_bank: Option<f64>,
    /// Unix seconds when the city bank investment is released.
    pub city_bank_until: Option<i64>,
    pub cayman_bank: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Travel {
    pub departing: Option<String>,
    pub destination: Option<String>,
    pub time_left: Option<u64>,
    pub arrival_at: Option<i64>,
}

impl Travel {
    pub fn is_travelling(&self) -> bool {
        self.time_left.is_some_and(|t| t > 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStatus {
    pub state: String,
    pub description: String,
    pub until: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleStats {
    pub strength: Option<u64>,
    pub defense: Option<u64>,
    pub dexterity: Option<u64>,
    pub speed: Option<u64>,
}

impl BattleStats {
    pub fn total(&self) -> u64 {
        [self.strength, self.defense, self.dexterity, self.speed]
            .iter()
            .flatten()
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactionRef {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub position: Option<String>,
}

/// Everything the player panel shows. Partial refreshes merge into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub level: Option<u64>,
    pub gender: Option<String>,
    pub faction: Option<FactionRef>,
    pub status: Option<PlayerStatus>,
    pub last_action: Option<i64>,
    pub bars: Bars,
    pub money: Option<Money>,
    pub travel: Option<Travel>,
    pub battlestats: Option<BattleStats>,
}

impl PlayerSnapshot {
    pub fn faction_id(&self) -> Option<u64> {
        self.faction.as_ref().and_then(|f| f.id)
    }

    /// Overlay the sections present in `newer`; absent sections keep their old value.
    pub fn merge(&mut self, newer: PlayerSnapshot) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if newer.$field.is_some() {
                    self.$field = newer.$field;
                })*
            };
        }
        take!(id, name, level, gender, faction, status, last_action, money, travel, battlestats);
        if !newer.bars.is_empty() {
            self.bars = newer.bars;
        }
    }
}

/// Torn v2 nests some sections (`profile`, `bars`) that v1 kept at the top level; accept both.
pub fn parse_player(value: &Value) -> PlayerSnapshot {
    let profile = value.get("profile").unwrap_or(value);
    let bars = value.get("bars").unwrap_or(value);

    PlayerSnapshot {
        id: pick_u64(profile, &["id", "player_id"]).or_else(|| pick_u64(value, &["player_id"])),
        name: pick_string(profile, &["name"]),
        level: pick_u64(profile, &["level"]),
        gender: pick_string(profile, &["gender"]),
        faction: value.get("faction").and_then(parse_faction_ref),
        status: profile
            .get("status")
            .or_else(|| value.get("status"))
            .map(|s| PlayerStatus {
                state: pick_string(s, &["state"]).unwrap_or_else(|| "Unknown".to_string()),
                description: pick_string(s, &["description"]).unwrap_or_default(),
                until: pick_i64(s, &["until"]),
            }),
        last_action: profile
            .get("last_action")
            .or_else(|| value.get("last_action"))
            .and_then(|la| pick_i64(la, &["timestamp"])),
        bars: Bars {
            life: bars.get("life").and_then(parse_bar),
            energy: bars.get("energy").and_then(parse_bar),
            nerve: bars.get("nerve").and_then(parse_bar),
            happy: bars.get("happy").and_then(parse_bar),
        },
        money: value.get("money").filter(|m| m.is_object()).map(parse_money),
        travel: value.get("travel").filter(|t| t.is_object()).map(parse_travel),
        battlestats: value
            .get("battlestats")
            .filter(|b| b.is_object())
            .map(parse_battlestats),
    }
}

fn parse_bar(value: &Value) -> Option<Bar> {
    Some(Bar {
        current: pick_u64(value, &["current"])?,
        maximum: pick_u64(value, &["maximum"]).unwrap_or(0),
    })
}

fn parse_faction_ref(value: &Value) -> Option<FactionRef> {
    match value {
        Value::Object(_) => Some(FactionRef {
            id: pick_u64(value, &["id", "faction_id"]),
            name: pick_string(value, &["name", "faction_name"]),
            position: pick_string(value, &["position"]),
        }),
        Value::Number(_) | Value::String(_) => Some(FactionRef {
            id: as_u64(value),
            name: None,
            position: None,
        }),
        _ => None,
    }
}

fn parse_money(value: &Value) -> Money {
    let faction = value.get("faction").and_then(|f| {
        if f.is_object() {
            pick_f64(f, &["money"])
        } else {
            pick_f64(value, &["faction"])
        }
    });
    let city_bank = value.get("city_bank");
    Money {
        wallet: pick_f64(value, &["wallet"]),
        faction,
        city_bank: city_bank.and_then(|b| pick_f64(b, &["amount"])),
        city_bank_until: city_bank.and_then(|b| pick_i64(b, &["until"])),
        cayman_bank: pick_f64(value, &["cayman_bank"]),
    }
}

fn parse_travel(value: &Value) -> Travel {
    Travel {
        departing: pick_string(value, &["departing", "departed_from"]),
        destination: pick_string(value, &["destination"]),
        time_left: pick_u64(value, &["time_left", "timeleft", "time_remaining"]),
        arrival_at: pick_i64(value, &["arrival_at", "timestamp"]),
    }
}

fn parse_battlestats(value: &Value) -> BattleStats {
    let stat = |key: &str| {
        value
            .get(key)
            .and_then(|s| pick_u64(s, &["value"]).or_else(|| as_u64(s)))
    };
    BattleStats {
        strength: stat("strength"),
        defense: stat("defense"),
        dexterity: stat("dexterity"),
        speed: stat("speed"),
    }
}

/// Whole days until `until`, rounded up; `None` once released.
pub fn days_remaining(until: i64, now: i64) -> Option<i64> {
    let secs = until - now;
    if secs <= 0 {
        return None;
    }
    Some((secs + 86_399) / 86_400)
}
