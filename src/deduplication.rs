use crate::types::RawListing;
use std::collections::HashSet;

/// Outcome of offering one listing to the [`Deduplicator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Placeholder,
    MissingLink,
    Duplicate,
}

/// First-wins dedup keyed on listing link, shared across every file of a run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen_links: HashSet<String>,
    kept: Vec<RawListing>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, listing: RawListing) -> Admission {
        if listing.is_placeholder() {
            return Admission::Placeholder;
        }
        let Some(link) = listing.link() else {
            return Admission::MissingLink;
        };
        if !self.seen_links.insert(link.to_string()) {
            return Admission::Duplicate;
        }
        self.kept.push(listing);
        Admission::Accepted
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    pub fn into_records(self) -> Vec<RawListing> {
        self.kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(link: &str, price: &str) -> RawListing {
        RawListing {
            name: Some("2016 Toyota Corolla".into()),
            price: Some(price.into()),
            link: Some(link.into()),
            ..Default::default()
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let mut dedup = Deduplicator::new();
        assert_eq!(dedup.offer(listing("a", "$1")), Admission::Accepted);
        assert_eq!(dedup.offer(listing("a", "$2")), Admission::Duplicate);
        let records = dedup.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price.as_deref(), Some("$1"));
    }

    #[test]
    fn placeholders_and_linkless_rows_are_dropped() {
        let mut dedup = Deduplicator::new();
        let placeholder = RawListing {
            name: Some("No Title".into()),
            price: Some("No Price".into()),
            link: Some("p".into()),
            ..Default::default()
        };
        assert_eq!(dedup.offer(placeholder), Admission::Placeholder);
        assert_eq!(dedup.offer(listing("  ", "$5")), Admission::MissingLink);

        // Only both placeholders together mark a failed parse.
        let half = RawListing {
            name: Some("No Title".into()),
            price: Some("$4,000".into()),
            link: Some("h".into()),
            ..Default::default()
        };
        assert_eq!(dedup.offer(half), Admission::Accepted);
        assert_eq!(dedup.len(), 1);
    }
}
