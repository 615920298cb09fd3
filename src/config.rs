use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.torn.com/v2";
pub const DEFAULT_COMPANION_BASE_URL: &str = "https://ffscouter.com/api/v1";

/// Runtime knobs for the dashboard, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_base_url: String,
    pub companion_base_url: String,
    pub subject_refresh: Duration,
    pub price_refresh: Duration,
    pub conflict_check: Duration,
    pub map_refresh: Duration,
    pub enemy_map_refresh: Duration,
    pub bounty_page_size: u32,
    /// The bounty endpoint reports no total, so the last page is an assumption.
    pub bounty_max_pages: u32,
    pub target_page_size: u32,
    pub target_min_ff: f64,
    pub target_max_ff: f64,
    pub http_timeout: Option<Duration>,
    pub fetch_parallelism: usize,
    pub subject_override: Option<u64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let url = |key: &str, default: &str| {
            lookup(key)
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let secs = |key: &str, default: u64, min: u64| {
            Duration::from_secs(parse_or(&lookup, key, default).max(min))
        };

        let target_min_ff = parse_or(&lookup, "TARGET_MIN_FF", 2.0_f64).clamp(1.0, 10.0);
        let target_max_ff = parse_or(&lookup, "TARGET_MAX_FF", 2.95_f64).clamp(target_min_ff, 10.0);
        let timeout_secs = parse_or(&lookup, "HTTP_TIMEOUT_SECS", 10_u64).min(300);

        Self {
            api_base_url: url("TORN_API_BASE_URL", DEFAULT_API_BASE_URL),
            companion_base_url: url("FFSCOUTER_BASE_URL", DEFAULT_COMPANION_BASE_URL),
            subject_refresh: secs("SUBJECT_POLL_SECS", 5, 2),
            price_refresh: secs("PRICE_POLL_SECS", 10, 5),
            conflict_check: secs("WAR_CHECK_POLL_SECS", 30, 10),
            map_refresh: secs("MAP_POLL_SECS", 60, 15),
            enemy_map_refresh: secs("WAR_POLL_SECS", 5, 2),
            bounty_page_size: parse_or(&lookup, "BOUNTY_PAGE_SIZE", 50_u32).clamp(1, 100),
            bounty_max_pages: parse_or(&lookup, "BOUNTY_MAX_PAGES", 100_u32).max(1),
            target_page_size: parse_or(&lookup, "TARGET_PAGE_SIZE", 50_u32).clamp(1, 100),
            target_min_ff,
            target_max_ff,
            http_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            fetch_parallelism: parse_or(&lookup, "FETCH_PARALLELISM", 4_usize).clamp(1, 16),
            subject_override: lookup("TORN_SUBJECT_ID")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|id| *id > 0),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> DashboardConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_dashboard_cadence() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.subject_refresh, Duration::from_secs(5));
        assert_eq!(cfg.price_refresh, Duration::from_secs(10));
        assert_eq!(cfg.conflict_check, Duration::from_secs(30));
        assert_eq!(cfg.map_refresh, Duration::from_secs(60));
        assert_eq!(cfg.enemy_map_refresh, Duration::from_secs(5));
        assert_eq!(cfg.bounty_page_size, 50);
        assert_eq!(cfg.bounty_max_pages, 100);
        assert_eq!(cfg.http_timeout, Some(Duration::from_secs(10)));
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn overrides_are_clamped() {
        let cfg = config_with(&[
            ("SUBJECT_POLL_SECS", "0"),
            ("BOUNTY_PAGE_SIZE", "500"),
            ("BOUNTY_MAX_PAGES", "0"),
            ("HTTP_TIMEOUT_SECS", "0"),
            ("TORN_API_BASE_URL", "http://localhost:9000/v2/"),
            ("TORN_SUBJECT_ID", "abc"),
        ]);
        assert_eq!(cfg.subject_refresh, Duration::from_secs(2));
        assert_eq!(cfg.bounty_page_size, 100);
        assert_eq!(cfg.bounty_max_pages, 1);
        assert_eq!(cfg.http_timeout, None);
        assert_eq!(cfg.api_base_url, "http://localhost:9000/v2");
        assert_eq!(cfg.subject_override, None);
    }
}
