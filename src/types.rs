use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Title/price pair the scraper emits when it could not parse a card.
pub const PLACEHOLDER_TITLE: &str = "No Title";
pub const PLACEHOLDER_PRICE: &str = "No Price";

/// Input keys with a typed view on [`RawListing`].
pub const LISTING_FIELDS: [&str; 6] = ["name", "title", "price", "miles", "link", "location"];

/// One scraped marketplace listing as it appears in a batch file.
///
/// The typed fields are a lenient view over `original`: strings are taken
/// as-is, numbers as their JSON text, anything else reads as absent. The
/// object itself is kept untouched and is what gets archived.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawListing {
    pub name: Option<String>,
    pub title: Option<String>,
    pub price: Option<String>,
    pub miles: Option<String>,
    pub link: Option<String>,
    pub location: Option<String>,
    pub original: Map<String, Value>,
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RawListing {
    pub fn from_map(original: Map<String, Value>) -> Self {
        Self {
            name: text_field(&original, "name"),
            title: text_field(&original, "title"),
            price: text_field(&original, "price"),
            miles: text_field(&original, "miles"),
            link: text_field(&original, "link"),
            location: text_field(&original, "location"),
            original,
        }
    }

    /// `None` unless `value` is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from_map(map)),
            _ => None,
        }
    }

    /// `name`, falling back to `title`.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.title.as_deref())
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref().filter(|l| !l.trim().is_empty())
    }

    pub fn is_placeholder(&self) -> bool {
        self.display_name() == Some(PLACEHOLDER_TITLE)
            && self.price.as_deref() == Some(PLACEHOLDER_PRICE)
    }

    /// Original fields outside [`LISTING_FIELDS`], in key order.
    pub fn extra_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.original
            .iter()
            .filter(|(key, _)| !LISTING_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl Serialize for RawListing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.original.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawListing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_map)
    }
}

/// Represents a listing whose price, mileage and model year all parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub listing: RawListing,
    pub price_value: f64,
    pub miles_value: f64,
    pub model_year: i32,
    pub age: i32,
}

/// Represents a feature row priced against this run's fair-value model.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub features: FeatureRow,
    pub predicted_price: f64,
    pub residual: f64,
}

impl ScoredRow {
    pub fn link(&self) -> &str {
        self.features.listing.link().unwrap_or_default()
    }
}

/// Why a record never became a [`FeatureRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    MissingPrice,
    MissingMiles,
    MissingYear,
    BelowYearFloor { year: i32, floor: i32 },
    FutureModelYear { year: i32, current: i32 },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPrice => f.write_str("unparseable price"),
            Self::MissingMiles => f.write_str("unparseable miles"),
            Self::MissingYear => f.write_str("no model year in title"),
            Self::BelowYearFloor { year, floor } => {
                write!(f, "model year {} below floor {}", year, floor)
            }
            Self::FutureModelYear { year, current } => {
                write!(f, "model year {} after current year {}", year, current)
            }
        }
    }
}

/// Represents one record dropped before fitting, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub link: String,
    pub reason: RejectionReason,
}

/// A deal that crossed the alert threshold for the first time this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDeal {
    pub link: String,
    pub name: Option<String>,
    pub price: Option<String>,
    pub miles: Option<String>,
    pub location: Option<String>,
    pub predicted_price: f64,
    pub residual: f64,
    pub alerted_at: String,
}

impl NewDeal {
    pub fn from_scored(row: &ScoredRow, alerted_at: &str) -> Self {
        let listing = &row.features.listing;
        Self {
            link: row.link().to_string(),
            name: listing.display_name().map(str::to_string),
            price: listing.price.clone(),
            miles: listing.miles.clone(),
            location: listing.location.clone(),
            predicted_price: row.predicted_price,
            residual: row.residual,
            alerted_at: alerted_at.to_string(),
        }
    }
}
