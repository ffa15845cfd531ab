use crate::types::ScoredRow;

/// The `k` most underpriced rows, ascending by residual. The sort is stable,
/// so equal residuals keep their record order.
pub fn top_deals(mut scored: Vec<ScoredRow>, k: usize) -> Vec<ScoredRow> {
    scored.sort_by(|a, b| a.residual.total_cmp(&b.residual));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureRow, RawListing};

    fn scored(link: &str, residual: f64) -> ScoredRow {
        ScoredRow {
            features: FeatureRow {
                listing: RawListing {
                    link: Some(link.into()),
                    ..Default::default()
                },
                price_value: 0.0,
                miles_value: 0.0,
                model_year: 2020,
                age: 5,
            },
            predicted_price: 0.0,
            residual,
        }
    }

    #[test]
    fn keeps_k_smallest_with_stable_ties() {
        let rows = vec![
            scored("a", 100.0),
            scored("b", -300.0),
            scored("c", -300.0),
            scored("d", -50.0),
            scored("e", -900.0),
        ];
        let links: Vec<String> = top_deals(rows, 3).iter().map(|r| r.link().to_string()).collect();
        assert_eq!(links, vec!["e", "b", "c"]);
    }

    #[test]
    fn k_larger_than_population_returns_everything() {
        let rows = vec![scored("a", 1.0), scored("b", -1.0)];
        assert_eq!(top_deals(rows, 25).len(), 2);
        assert!(top_deals(Vec::new(), 25).is_empty());
    }
}
