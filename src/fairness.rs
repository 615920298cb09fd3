use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn as_color(self) -> Color {
        Color::Rgb(self.0, self.1, self.2)
    }
}

/// Easiest score on the page.
pub const LOW: Rgb = Rgb(0, 255, 136);
/// Hardest score on the page.
pub const HIGH: Rgb = Rgb(255, 51, 102);
/// Used when every known score on the page is the same.
pub const EQUAL: Rgb = LOW;
pub const MISSING: Rgb = Rgb(192, 192, 192);

/// Min/max of the finite scores currently on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreScale {
    pub min: f64,
    pub max: f64,
}

impl ScoreScale {
    pub fn from_scores(scores: impl IntoIterator<Item = f64>) -> Option<Self> {
        scores
            .into_iter()
            .filter(|s| s.is_finite())
            .fold(None, |acc: Option<Self>, s| match acc {
                None => Some(Self { min: s, max: s }),
                Some(scale) => Some(Self {
                    min: scale.min.min(s),
                    max: scale.max.max(s),
                }),
            })
    }

    /// Position of `value` between min and max, or `None` when there is no spread.
    pub fn position(&self, value: f64) -> Option<f64> {
        let span = self.max - self.min;
        if !(span > 0.0) || !span.is_finite() {
            return None;
        }
        Some(((value - self.min) / span).clamp(0.0, 1.0))
    }

    pub fn color(&self, value: Option<f64>) -> Rgb {
        match value.filter(|v| v.is_finite()) {
            None => MISSING,
            Some(v) => match self.position(v) {
                Some(t) => lerp(LOW, HIGH, t),
                None => EQUAL,
            },
        }
    }
}

pub fn color_for(scale: Option<&ScoreScale>, value: Option<f64>) -> Rgb {
    match scale {
        Some(scale) => scale.color(value),
        None => MISSING,
    }
}

pub fn lerp(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgb(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_midpoint() {
        let scale = ScoreScale::from_scores([1.0, 3.0]).unwrap();
        assert_eq!(scale.color(Some(1.0)), LOW);
        assert_eq!(scale.color(Some(3.0)), HIGH);
        assert_eq!(scale.color(Some(2.0)), Rgb(128, 153, 119));
        assert_eq!(scale.color(None), MISSING);
    }

    #[test]
    fn ignores_non_finite_scores() {
        let scale = ScoreScale::from_scores([f64::NAN, 2.0, f64::INFINITY]).unwrap();
        assert_eq!(scale.min, 2.0);
        assert_eq!(scale.max, 2.0);
        assert!(ScoreScale::from_scores([f64::NAN]).is_none());
    }
}
