use crate::types::{FeatureRow, ScoredRow};
use std::collections::HashSet;
use tracing::{info, warn};

/// Relative floor on `1 - ρ²` between the centred features.
const SINGULAR_EPS: f64 = 1e-10;

/// `price ≈ intercept + age_coef·age + miles_coef·miles`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FairValueModel {
    pub intercept: f64,
    pub age_coef: f64,
    pub miles_coef: f64,
}

impl FairValueModel {
    /// Ordinary least squares on this run's rows. Returns `None` when fewer
    /// than two distinct `(age, miles)` combinations exist.
    ///
    /// Features are centred first; a rank-deficient design (for example every
    /// row sharing one age) resolves to the minimum-norm solution.
    pub fn fit(rows: &[FeatureRow]) -> Option<Self> {
        let distinct: HashSet<(i32, u64)> = rows
            .iter()
            .map(|r| (r.age, r.miles_value.to_bits()))
            .collect();
        if distinct.len() < 2 {
            return None;
        }

        let n = rows.len() as f64;
        let mean_age = rows.iter().map(|r| r.age as f64).sum::<f64>() / n;
        let mean_miles = rows.iter().map(|r| r.miles_value).sum::<f64>() / n;
        let mean_price = rows.iter().map(|r| r.price_value).sum::<f64>() / n;

        let (mut saa, mut sam, mut smm, mut sap, mut smp) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for r in rows {
            let a = r.age as f64 - mean_age;
            let m = r.miles_value - mean_miles;
            let p = r.price_value - mean_price;
            saa += a * a;
            sam += a * m;
            smm += m * m;
            sap += a * p;
            smp += m * p;
        }

        let (age_coef, miles_coef) = solve_symmetric_2x2(saa, sam, smm, sap, smp);
        Some(Self {
            intercept: mean_price - age_coef * mean_age - miles_coef * mean_miles,
            age_coef,
            miles_coef,
        })
    }

    pub fn predict(&self, age: i32, miles: f64) -> f64 {
        self.intercept + self.age_coef * age as f64 + self.miles_coef * miles
    }

    pub fn score(&self, rows: Vec<FeatureRow>) -> Vec<ScoredRow> {
        rows.into_iter()
            .map(|features| {
                let predicted_price = self.predict(features.age, features.miles_value);
                ScoredRow {
                    residual: features.price_value - predicted_price,
                    predicted_price,
                    features,
                }
            })
            .collect()
    }
}

/// Pseudo-inverse solve of `[[a, b], [b, d]] · x = [u, v]` for a positive
/// semi-definite matrix.
fn solve_symmetric_2x2(a: f64, b: f64, d: f64, u: f64, v: f64) -> (f64, f64) {
    let trace = a + d;
    if trace <= 0.0 {
        return (0.0, 0.0);
    }
    let det = a * d - b * b;
    if det > SINGULAR_EPS * a * d {
        return ((d * u - b * v) / det, (a * v - b * u) / det);
    }
    // Rank one: M = λ·wwᵀ with λ = trace, so M⁺ = M / λ².
    let scale = trace * trace;
    ((a * u + b * v) / scale, (b * u + d * v) / scale)
}

/// Fits and scores; an unfittable sample yields no scored rows.
pub fn fit_and_score(rows: Vec<FeatureRow>) -> (Option<FairValueModel>, Vec<ScoredRow>) {
    let Some(model) = FairValueModel::fit(&rows) else {
        warn!(
            "[Model] Unfittable: {} row(s) with fewer than 2 distinct (age, miles) combinations; skipping scoring",
            rows.len()
        );
        return (None, Vec::new());
    };
    info!(
        "[Model] Fitted on {} row(s): price = {:.2} + {:.2}·age + {:.5}·miles",
        rows.len(),
        model.intercept,
        model.age_coef,
        model.miles_coef
    );
    (Some(model), model.score(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawListing;

    fn row(age: i32, miles: f64, price: f64) -> FeatureRow {
        FeatureRow {
            listing: RawListing::default(),
            price_value: price,
            miles_value: miles,
            model_year: 2025 - age,
            age,
        }
    }

    #[test]
    fn recovers_exact_linear_relation() {
        let rows: Vec<FeatureRow> = [(1, 12000.0), (3, 41000.0), (5, 52000.0), (8, 99000.0), (10, 140000.0)]
            .iter()
            .map(|&(age, miles)| row(age, miles, 100000.0 - 5000.0 * age as f64 - 0.05 * miles))
            .collect();
        let model = FairValueModel::fit(&rows).unwrap();
        assert!((model.intercept - 100000.0).abs() < 1e-2);
        assert!((model.age_coef + 5000.0).abs() < 1e-3);
        assert!((model.miles_coef + 0.05).abs() < 1e-6);
        for scored in model.score(rows) {
            assert!(scored.residual.abs() < 1e-4, "residual {}", scored.residual);
        }
    }

    #[test]
    fn identical_features_are_unfittable() {
        let rows = vec![row(5, 50000.0, 9000.0), row(5, 50000.0, 12000.0)];
        assert!(FairValueModel::fit(&rows).is_none());
        assert!(FairValueModel::fit(&rows[..1]).is_none());
        assert!(FairValueModel::fit(&[]).is_none());
        let (model, scored) = fit_and_score(rows);
        assert!(model.is_none());
        assert!(scored.is_empty());
    }

    #[test]
    fn shared_age_falls_back_to_minimum_norm() {
        let rows = vec![row(4, 10000.0, 20000.0), row(4, 30000.0, 18000.0), row(4, 50000.0, 16000.0)];
        let model = FairValueModel::fit(&rows).unwrap();
        assert_eq!(model.age_coef, 0.0);
        assert!((model.miles_coef + 0.1).abs() < 1e-9);
        for scored in model.score(rows) {
            assert!(scored.residual.abs() < 1e-6);
        }
    }
}
