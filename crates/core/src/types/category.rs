//! Product categories.

use serde::{Deserialize, Serialize};

/// The fixed set of catalog categories.
///
/// Input also accepts the historical `shortsleves` / `longsleves` spellings
/// that older clients still send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_category", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "shortsleves")]
    ShortSleeves,
    #[serde(alias = "longsleves")]
    LongSleeves,
    SweatShirts,
    Hoodies,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 4] = [
        Self::ShortSleeves,
        Self::LongSleeves,
        Self::SweatShirts,
        Self::Hoodies,
    ];

    /// The canonical tag stored and returned by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShortSleeves => "shortsleeves",
            Self::LongSleeves => "longsleeves",
            Self::SweatShirts => "sweatshirts",
            Self::Hoodies => "hoodies",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shortsleeves" | "shortsleves" => Ok(Self::ShortSleeves),
            "longsleeves" | "longsleves" => Ok(Self::LongSleeves),
            "sweatshirts" => Ok(Self::SweatShirts),
            "hoodies" => Ok(Self::Hoodies),
            _ => Err(format!(
                "please select category from: shortsleeves, longsleeves, sweatshirts, hoodies (got {s})"
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_historical_spellings() {
        assert_eq!("shortsleves".parse::<Category>().unwrap(), Category::ShortSleeves);
        let parsed: Category = serde_json::from_str("\"longsleves\"").unwrap();
        assert_eq!(parsed, Category::LongSleeves);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"longsleeves\"");
    }

    #[test]
    fn test_unknown_category() {
        assert!("tank-tops".parse::<Category>().is_err());
    }
}
