use serde_json::Value;

use crate::json::{entries, pick_i64, pick_string, pick_u64};

#[derive(Debug, Clone, PartialEq)]
pub struct FactionMember {
    pub id: u64,
    pub name: String,
    pub level: Option<u64>,
    pub position: Option<String>,
    pub state: String,
    pub description: String,
    pub status_until: Option<i64>,
    /// "Online", "Idle" or "Offline".
    pub activity: Option<String>,
    pub last_action: Option<String>,
    pub last_action_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Online,
    Idle,
    Offline,
    Unknown,
}

impl FactionMember {
    pub fn activity(&self) -> Activity {
        let text = self
            .activity
            .as_deref()
            .or(self.last_action.as_deref())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if text.contains("online") {
            Activity::Online
        } else if text.contains("idle") {
            Activity::Idle
        } else if text.contains("offline") {
            Activity::Offline
        } else {
            Activity::Unknown
        }
    }
}

/// `members` may be an id-keyed object (v1) or an array (v2).
pub fn parse_members(value: &Value) -> Vec<FactionMember> {
    let mut members: Vec<FactionMember> = entries(value.get("members"))
        .into_iter()
        .filter_map(|(key, item)| {
            let id = pick_u64(item, &["id", "player_id"])
                .or_else(|| key.as_deref().and_then(|k| k.trim().parse::<u64>().ok()))?;
            let status = item.get("status");
            let last_action = item.get("last_action");
            Some(FactionMember {
                id,
                name: pick_string(item, &["name"]).unwrap_or_else(|| format!("User {id}")),
                level: pick_u64(item, &["level"]),
                position: pick_string(item, &["position"]),
                state: status
                    .and_then(|s| pick_string(s, &["state"]))
                    .unwrap_or_else(|| "Unknown".to_string()),
                description: status
                    .and_then(|s| pick_string(s, &["description"]))
                    .unwrap_or_default(),
                status_until: status.and_then(|s| pick_i64(s, &["until"])),
                activity: last_action.and_then(|la| pick_string(la, &["status"])),
                last_action: last_action.and_then(|la| pick_string(la, &["relative"])),
                last_action_at: last_action.and_then(|la| pick_i64(la, &["timestamp"])),
            })
        })
        .collect();
    members.sort_by_key(|m| m.id);
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_form_uses_keys_as_ids() {
        let members = parse_members(&json!({"members": {
            "77": {"name": "Kit", "level": 12,
                   "status": {"state": "Okay", "description": "Okay"},
                   "last_action": {"status": "Idle", "relative": "5 minutes ago"}}
        }}));
        assert_eq!(members[0].id, 77);
        assert_eq!(members[0].activity(), Activity::Idle);
    }
}
