use once_cell::sync::Lazy;

use crate::faction::FactionMember;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn midpoint(self, other: Coord) -> Coord {
        Coord::new((self.lat + other.lat) / 2.0, (self.lon + other.lon) / 2.0)
    }

    fn near(self, other: Coord) -> bool {
        const TOLERANCE: f64 = 0.001;
        (self.lat - other.lat).abs() < TOLERANCE && (self.lon - other.lon).abs() < TOLERANCE
    }
}

pub const HOME_CITY: &str = "Torn";

/// Travel destinations, in lookup priority order.
static CITIES: Lazy<Vec<(&'static str, Coord)>> = Lazy::new(|| {
    vec![
        (HOME_CITY, Coord::new(39.0997, -94.5786)),
        ("United Kingdom", Coord::new(51.5074, -0.1278)),
        ("UK", Coord::new(51.5074, -0.1278)),
        ("Mexico", Coord::new(31.6904, -106.4244)),
        ("Cayman Islands", Coord::new(19.3133, -81.2546)),
        ("Canada", Coord::new(43.6532, -79.3832)),
        ("Hawaii", Coord::new(21.3099, -157.8581)),
        ("Switzerland", Coord::new(47.3769, 8.5417)),
        ("Argentina", Coord::new(-34.6037, -58.3816)),
        ("Japan", Coord::new(35.6762, 139.6503)),
        ("China", Coord::new(39.9042, 116.4074)),
        ("UAE", Coord::new(25.2048, 55.2708)),
        ("United Arab Emirates", Coord::new(25.2048, 55.2708)),
        ("South Africa", Coord::new(-26.2041, 28.0473)),
    ]
});

/// Unique city positions for the base map labels.
pub fn city_markers() -> Vec<(&'static str, Coord)> {
    let mut out: Vec<(&'static str, Coord)> = Vec::new();
    for (name, coord) in CITIES.iter() {
        if !out.iter().any(|(_, c)| c.near(*coord)) {
            out.push((*name, *coord));
        }
    }
    out
}

/// Exact name, then case-insensitive, then substring either way.
pub fn city_coordinates(name: &str) -> Option<Coord> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some((_, c)) = CITIES.iter().find(|(city, _)| *city == trimmed) {
        return Some(*c);
    }
    let lower = trimmed.to_lowercase();
    if let Some((_, c)) = CITIES.iter().find(|(city, _)| city.to_lowercase() == lower) {
        return Some(*c);
    }
    CITIES
        .iter()
        .find(|(city, _)| {
            let city = city.to_lowercase();
            lower.contains(&city) || city.contains(&lower)
        })
        .map(|(_, c)| *c)
}

fn hospital_city(adjective: &str) -> String {
    match adjective.trim().to_lowercase().as_str() {
        "chinese" => "China".to_string(),
        "swiss" => "Switzerland".to_string(),
        "british" | "uk" => "United Kingdom".to_string(),
        "south african" => "South Africa".to_string(),
        "emirati" | "united arab emirates" | "uae" => "UAE".to_string(),
        "mexican" => "Mexico".to_string(),
        "canadian" => "Canada".to_string(),
        "hawaiian" => "Hawaii".to_string(),
        "argentinian" => "Argentina".to_string(),
        "japanese" => "Japan".to_string(),
        "caymanian" => "Cayman Islands".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    /// Abroad or in a foreign hospital.
    Abroad,
    Outbound,
    Inbound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberLocation {
    InTorn,
    Placed { coord: Coord, heading: Heading },
    Unplaced,
}

/// Where a status description puts a member on the map.
pub fn locate(description: &str) -> MemberLocation {
    let text = description.trim();
    let lower = text.to_lowercase();
    if text == "Okay" || lower == "hospitalized" || lower.contains("in hospital") {
        return MemberLocation::InTorn;
    }

    let placed = |coord: Option<Coord>, heading: Heading| match coord {
        Some(coord) => MemberLocation::Placed { coord, heading },
        None => MemberLocation::Unplaced,
    };
    let home = city_coordinates(HOME_CITY);

    if let Some(rest) = lower.strip_prefix("in a ") {
        if let Some(adjective) = rest.strip_suffix(" hospital").or_else(|| {
            rest.find(" hospital").map(|idx| &rest[..idx])
        }) {
            return placed(city_coordinates(&hospital_city(adjective)), Heading::Abroad);
        }
    }
    if lower.starts_with("in ") {
        return placed(city_coordinates(text.get(3..).unwrap_or_default()), Heading::Abroad);
    }
    if let Some(idx) = lower.find("returning to torn from ") {
        let origin = text.get(idx + "returning to torn from ".len()..).unwrap_or_default();
        let coord = city_coordinates(origin).zip(home).map(|(o, h)| o.midpoint(h));
        return placed(coord, Heading::Inbound);
    }
    for prefix in ["travelling to ", "traveling to "] {
        if let Some(idx) = lower.find(prefix) {
            let destination = text.get(idx + prefix.len()..).unwrap_or_default();
            let coord = home
                .zip(city_coordinates(destination))
                .map(|(h, d)| h.midpoint(d));
            return placed(coord, Heading::Outbound);
        }
    }
    MemberLocation::Unplaced
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGroup {
    pub coord: Coord,
    pub heading: Heading,
    /// Sorted case-insensitively.
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapPlot {
    /// Sorted case-insensitively.
    pub in_torn: Vec<String>,
    pub markers: Vec<MarkerGroup>,
    pub unplaced: Vec<String>,
}

impl MapPlot {
    pub fn placed_count(&self) -> usize {
        self.markers.iter().map(|m| m.names.len()).sum()
    }
}

pub fn plot_members(members: &[FactionMember]) -> MapPlot {
    let mut plot = MapPlot::default();
    for member in members {
        match locate(&member.description) {
            MemberLocation::InTorn => plot.in_torn.push(member.name.clone()),
            MemberLocation::Unplaced => plot.unplaced.push(member.name.clone()),
            MemberLocation::Placed { coord, heading } => {
                let existing = plot
                    .markers
                    .iter()
                    .position(|g| g.heading == heading && g.coord.near(coord));
                match existing {
                    Some(idx) => plot.markers[idx].names.push(member.name.clone()),
                    None => plot.markers.push(MarkerGroup {
                        coord,
                        heading,
                        names: vec![member.name.clone()],
                    }),
                }
            }
        }
    }
    let by_name = |a: &String, b: &String| a.to_lowercase().cmp(&b.to_lowercase());
    plot.in_torn.sort_by(by_name);
    plot.unplaced.sort_by(by_name);
    for group in &mut plot.markers {
        group.names.sort_by(by_name);
    }
    plot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_partial_match() {
        assert_eq!(city_coordinates("japan"), Some(Coord::new(35.6762, 139.6503)));
        assert_eq!(city_coordinates("the Cayman Islands"), Some(Coord::new(19.3133, -81.2546)));
        assert_eq!(city_coordinates(""), None);
        assert_eq!(city_coordinates("Atlantis"), None);
    }

    #[test]
    fn status_descriptions_resolve() {
        assert_eq!(locate("Okay"), MemberLocation::InTorn);
        assert_eq!(locate("In hospital for 12 mins"), MemberLocation::InTorn);
        assert_eq!(
            locate("In a Swiss hospital for 3 mins"),
            MemberLocation::Placed {
                coord: Coord::new(47.3769, 8.5417),
                heading: Heading::Abroad
            }
        );
        assert_eq!(
            locate("In a South African hospital"),
            MemberLocation::Placed {
                coord: Coord::new(-26.2041, 28.0473),
                heading: Heading::Abroad
            }
        );
        assert!(matches!(
            locate("Returning to Torn from Japan"),
            MemberLocation::Placed { heading: Heading::Inbound, .. }
        ));
        assert!(matches!(
            locate("Traveling to Mexico"),
            MemberLocation::Placed { heading: Heading::Outbound, .. }
        ));
        assert_eq!(locate("In jail for 2 hrs"), MemberLocation::Unplaced);
    }
}
