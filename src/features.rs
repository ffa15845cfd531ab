use crate::types::{FeatureRow, RawListing, Rejection, RejectionReason};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

lazy_static! {
    static ref NON_NUMERIC: Regex = Regex::new(r"[^0-9.]").unwrap();
    static ref THOUSANDS: Regex = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*k(?:\b|mi)").unwrap();
    static ref MODEL_YEAR: Regex = Regex::new(r"(?:19|20)\d{2}").unwrap();
}

/// Strips everything but digits and `.` and parses what is left.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(text, "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Like [`parse_price`], but `"120K miles"`, `"120Kmi"` and `"1.5k"` expand
/// to thousands. `"120 km"` does not.
pub fn parse_miles(text: &str) -> Option<f64> {
    let without_commas = text.replace(',', "");
    let expanded = THOUSANDS.replace_all(&without_commas, |caps: &regex::Captures<'_>| {
        caps[1]
            .parse::<f64>()
            .map(|v| (v * 1000.0).round().to_string())
            .unwrap_or_else(|_| caps[0].to_string())
    });
    parse_price(&expanded)
}

/// First `19xx`/`20xx` run anywhere in the title.
pub fn parse_model_year(title: &str) -> Option<i32> {
    MODEL_YEAR.find(title).and_then(|m| m.as_str().parse().ok())
}

/// Turns raw listings into regression inputs.
#[derive(Debug, Clone, Copy)]
pub struct FeatureNormalizer {
    current_year: i32,
    min_model_year: i32,
}

impl FeatureNormalizer {
    pub fn new(current_year: i32, min_model_year: i32) -> Self {
        Self { current_year, min_model_year }
    }

    pub fn normalize(&self, listing: &RawListing) -> Result<FeatureRow, RejectionReason> {
        let price_value = listing
            .price
            .as_deref()
            .and_then(parse_price)
            .ok_or(RejectionReason::MissingPrice)?;
        let miles_value = listing
            .miles
            .as_deref()
            .and_then(parse_miles)
            .ok_or(RejectionReason::MissingMiles)?;
        let model_year = listing
            .display_name()
            .and_then(parse_model_year)
            .ok_or(RejectionReason::MissingYear)?;

        if model_year < self.min_model_year {
            return Err(RejectionReason::BelowYearFloor {
                year: model_year,
                floor: self.min_model_year,
            });
        }
        let age = self.current_year - model_year;
        if age < 0 {
            return Err(RejectionReason::FutureModelYear {
                year: model_year,
                current: self.current_year,
            });
        }

        Ok(FeatureRow {
            listing: listing.clone(),
            price_value,
            miles_value,
            model_year,
            age,
        })
    }

    /// Accepted rows keep input order; rejections are collected, not dropped.
    pub fn normalize_all(&self, listings: &[RawListing]) -> (Vec<FeatureRow>, Vec<Rejection>) {
        let mut rows = Vec::with_capacity(listings.len());
        let mut rejections = Vec::new();

        for listing in listings {
            match self.normalize(listing) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    let link = listing.link().unwrap_or_default().to_string();
                    debug!("[Features] Rejected {}: {}", link, reason);
                    rejections.push(Rejection { link, reason });
                }
            }
        }

        info!(
            "[Features] {} row(s) accepted, {} rejected",
            rows.len(),
            rejections.len()
        );
        (rows, rejections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str, price: &str, miles: &str) -> RawListing {
        RawListing {
            name: Some(name.into()),
            price: Some(price.into()),
            miles: Some(miles.into()),
            link: Some("l".into()),
            ..Default::default()
        }
    }

    #[test]
    fn parses_currency_and_mileage_text() {
        assert_eq!(parse_price("$10,000"), Some(10000.0));
        assert_eq!(parse_price("No Price"), None);
        assert_eq!(parse_miles("50,000 miles"), Some(50000.0));
        assert_eq!(parse_miles("120K miles"), Some(120000.0));
        assert_eq!(parse_miles("1.5k"), Some(1500.0));
        assert_eq!(parse_miles("120Kmi"), Some(120000.0));
        assert_eq!(parse_miles("85kmiles"), Some(85000.0));
        assert_eq!(parse_miles("120 km"), Some(120.0));
        assert_eq!(parse_miles(""), None);
    }

    #[test]
    fn finds_first_plausible_model_year() {
        assert_eq!(parse_model_year("2015 Honda Civic"), Some(2015));
        assert_eq!(parse_model_year("Toyota Camry SE 2019 (2020 tags)"), Some(2019));
        assert_eq!(parse_model_year("Honda Civic 1800cc"), None);
    }

    #[test]
    fn rejections_carry_a_reason() {
        let normalizer = FeatureNormalizer::new(2025, 2010);
        assert_eq!(
            normalizer.normalize(&listing("2008 Honda Accord", "$4,000", "150K")),
            Err(RejectionReason::BelowYearFloor { year: 2008, floor: 2010 })
        );
        assert_eq!(
            normalizer.normalize(&listing("2027 Toyota Prius", "$30,000", "10")),
            Err(RejectionReason::FutureModelYear { year: 2027, current: 2025 })
        );
        assert_eq!(
            normalizer.normalize(&listing("Honda Accord", "$4,000", "150K")),
            Err(RejectionReason::MissingYear)
        );
        assert_eq!(
            normalizer.normalize(&listing("2015 Honda Accord", "$4,000", "")),
            Err(RejectionReason::MissingMiles)
        );

        let row = normalizer
            .normalize(&listing("2015 Honda Civic", "$10,000", "50,000 miles"))
            .unwrap();
        assert_eq!(row.age, 10);
        assert_eq!(row.price_value, 10000.0);
        assert_eq!(row.miles_value, 50000.0);
    }

    #[test]
    fn title_is_used_when_name_is_absent() {
        let normalizer = FeatureNormalizer::new(2025, 2010);
        let raw = RawListing {
            title: Some("2020 Honda CR-V".into()),
            price: Some("$21,500".into()),
            miles: Some("40K miles".into()),
            link: Some("t".into()),
            ..Default::default()
        };
        assert_eq!(normalizer.normalize(&raw).unwrap().model_year, 2020);
    }
}
