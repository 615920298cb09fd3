use serde_json::Value;

use crate::json::{entries, pick_f64, pick_string, pick_u64};

#[derive(Debug, Clone, PartialEq)]
pub struct Bounty {
    pub id: String,
    /// `None` when the listing does not say who the target is; such rows are never merged.
    pub target_id: Option<u64>,
    pub target_name: String,
    pub target_level: Option<u64>,
    pub reward: f64,
    pub quantity: u64,
    pub reason: Option<String>,
}

/// Accepts `{bounties: {id: {...}}}` as well as `{bounties: [...]}`.
pub fn parse_bounties(value: &Value) -> Vec<Bounty> {
    entries(value.get("bounties"))
        .into_iter()
        .enumerate()
        .map(|(idx, (key, item))| {
            let target_id = pick_u64(item, &["target_id"]).filter(|id| *id > 0);
            let target_name = pick_string(item, &["target_name"]).unwrap_or_else(|| match target_id {
                Some(id) => format!("User {id}"),
                None => "User Unknown".to_string(),
            });
            Bounty {
                id: key
                    .or_else(|| pick_string(item, &["id", "bounty_id"]))
                    .unwrap_or_else(|| idx.to_string()),
                target_id,
                target_name,
                target_level: pick_u64(item, &["target_level"]),
                reward: pick_f64(item, &["reward"]).unwrap_or(0.0),
                quantity: pick_u64(item, &["quantity"]).unwrap_or(1),
                reason: pick_string(item, &["reason"]),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_targets_keep_placeholder_name() {
        let rows = parse_bounties(&json!({"bounties": [
            {"target_id": "Unknown", "reward": 100},
            {"target_id": 5, "reward": "250"}
        ]}));
        assert_eq!(rows[0].target_id, None);
        assert_eq!(rows[0].target_name, "User Unknown");
        assert_eq!(rows[1].target_name, "User 5");
        assert_eq!(rows[1].reward, 250.0);
    }
}
