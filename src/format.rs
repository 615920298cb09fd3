fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_number(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Whole dollars with separators, e.g. `$1,234,567`.
pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let whole = value.abs().round() as u64;
    format!("{sign}${}", format_number(whole))
}

/// Two decimals, used for share prices.
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${}.{:02}", format_number(cents / 100), cents % 100)
}

/// `2h 15m`, `45m 30s`, or `-` when nothing is left.
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds == 0 {
        return "-".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 && hours == 0 {
        parts.push(format!("{secs}s"));
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}

pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

pub fn relative_time(timestamp: Option<i64>, now: i64) -> String {
    let Some(ts) = timestamp.filter(|ts| *ts > 0) else {
        return "-".to_string();
    };
    let diff = now - ts;
    if diff < 0 {
        return "Recently".to_string();
    }
    let units = [
        (31_536_000, "year"),
        (2_592_000, "month"),
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
    ];
    for (size, unit) in units {
        let count = diff / size;
        if count > 0 {
            let plural = if count > 1 { "s" } else { "" };
            return format!("{count} {unit}{plural} ago");
        }
    }
    "Just now".to_string()
}

pub fn format_fair_fight(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "-".to_string(),
    }
}

pub fn profile_url(player_id: u64) -> String {
    format!("https://www.torn.com/profiles.php?XID={player_id}")
}

pub fn attack_url(player_id: u64) -> String {
    format!("https://www.torn.com/loader.php?sid=attack&user2ID={player_id}")
}
