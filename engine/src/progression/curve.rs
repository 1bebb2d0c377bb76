//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Experience curve
//!
//! The curve answers two questions: how much experience one level step costs, and how much
//! experience an award is worth. Step cost is `base_cost * (1 + level * growth)`; with the
//! defaults (100, 0.1) every level costs 10% of the base more than the previous one.

use crate::progression::formula::{DEFAULT_AWARD_FORMULA, Formula, FormulaInputs};

pub const DEFAULT_STEP_BASE: f64 = 100.0;
pub const DEFAULT_STEP_GROWTH: f64 = 0.1;
pub const DEFAULT_MAX_LEVEL: u32 = 100;

/// Step-cost policy and award formula shared by every skill.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceCurve {
    base_cost: f64,
    growth: f64,
    max_level: u32,
    award_formula: Option<Formula>,
}

impl Default for ExperienceCurve {
    fn default() -> Self {
        Self {
            base_cost: DEFAULT_STEP_BASE,
            growth: DEFAULT_STEP_GROWTH,
            max_level: DEFAULT_MAX_LEVEL,
            award_formula: Formula::parse(DEFAULT_AWARD_FORMULA).ok(),
        }
    }
}

impl ExperienceCurve {
    /// Build a curve. A non-positive base cost or negative growth would break
    /// monotonicity, so those fall back to the defaults.
    pub fn new(base_cost: f64, growth: f64) -> Self {
        let base_cost = if base_cost.is_finite() && base_cost > 0.0 {
            base_cost
        } else {
            tracing::warn!(
                "Invalid experience step base {}, using {}",
                base_cost,
                DEFAULT_STEP_BASE
            );
            DEFAULT_STEP_BASE
        };
        let growth = if growth.is_finite() && growth >= 0.0 {
            growth
        } else {
            tracing::warn!(
                "Invalid experience step growth {}, using {}",
                growth,
                DEFAULT_STEP_GROWTH
            );
            DEFAULT_STEP_GROWTH
        };
        Self {
            base_cost,
            growth,
            ..Default::default()
        }
    }

    /// Replace the award formula. `None` means plain `base * multiplier`.
    pub fn with_award_formula(mut self, formula: Option<Formula>) -> Self {
        self.award_formula = formula;
        self
    }

    /// Replace the level cap
    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn award_formula(&self) -> Option<&Formula> {
        self.award_formula.as_ref()
    }

    /// Experience needed to go from `level` to `level + 1`. Always positive.
    pub fn exp_to_next_level(&self, level: u32) -> f64 {
        self.base_cost * (1.0 + f64::from(level) * self.growth)
    }

    /// Total experience needed to reach `level` from level 0.
    pub fn cumulative_exp_for(&self, level: u32) -> f64 {
        (0..level).fold(0.0, |total, l| total + self.exp_to_next_level(l))
    }

    /// Highest level, up to the cap, whose cumulative cost is covered by `total`.
    pub fn level_for_total_exp(&self, total: f64) -> u32 {
        if !total.is_finite() || total <= 0.0 {
            return 0;
        }
        let mut level = 0u32;
        let mut needed = 0.0;
        while level < self.max_level {
            let next = needed + self.exp_to_next_level(level);
            if next > total {
                break;
            }
            needed = next;
            level += 1;
        }
        level
    }

    /// Consume banked experience into levels.
    ///
    /// Returns the resulting `(level, remainder)`. The loop runs once per level gained and
    /// stops at the cap; nothing is banked at or above the cap.
    pub fn advance(&self, mut level: u32, mut experience: f64) -> (u32, f64) {
        if !experience.is_finite() || experience < 0.0 {
            return (level, 0.0);
        }
        while level < self.max_level {
            let step = self.exp_to_next_level(level);
            if experience < step {
                break;
            }
            experience -= step;
            level += 1;
        }
        if level >= self.max_level {
            return (level, 0.0);
        }
        (level, experience)
    }

    /// Experience awarded for an action worth `base` at `level`.
    ///
    /// Formula failures are logged and fall back to `base * multiplier` for this award only.
    pub fn award_amount(&self, base: f64, level: u32, multiplier: f64) -> f64 {
        let fallback = base * multiplier;
        let Some(formula) = &self.award_formula else {
            return fallback.max(0.0);
        };
        let inputs = FormulaInputs {
            base,
            level,
            multiplier,
        };
        match formula.evaluate(inputs) {
            Ok(amount) => amount.max(0.0),
            Err(error) => {
                tracing::warn!(
                    "Experience formula {:?} failed ({}), awarding base * multiplier",
                    formula.source(),
                    error
                );
                fallback.max(0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_step_costs() {
        let curve = ExperienceCurve::default();
        assert_eq!(curve.exp_to_next_level(0), 100.0);
        assert_eq!(curve.exp_to_next_level(1), 100.0 * (1.0 + 0.1));
        assert_eq!(curve.exp_to_next_level(10), 200.0);
    }

    #[test]
    fn test_level_for_total_exp_boundaries() {
        let curve = ExperienceCurve::new(100.0, 0.5);
        assert_eq!(curve.level_for_total_exp(0.0), 0);
        assert_eq!(curve.level_for_total_exp(99.0), 0);
        assert_eq!(curve.level_for_total_exp(100.0), 1);
        assert_eq!(curve.level_for_total_exp(249.0), 1);
        assert_eq!(curve.level_for_total_exp(250.0), 2);
        assert_eq!(curve.level_for_total_exp(-5.0), 0);
        assert_eq!(curve.level_for_total_exp(f64::NAN), 0);
    }

    #[test]
    fn test_advance_consumes_whole_steps() {
        let curve = ExperienceCurve::default();
        assert_eq!(curve.advance(0, 100.0), (1, 0.0));
        assert_eq!(curve.advance(0, 99.5), (0, 99.5));
        assert_eq!(curve.advance(4, -1.0), (4, 0.0));
    }

    #[test]
    fn test_advance_stops_at_level_cap() {
        let curve = ExperienceCurve::default();
        let started = std::time::Instant::now();
        assert_eq!(curve.advance(0, 1e30), (DEFAULT_MAX_LEVEL, 0.0));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(curve.level_for_total_exp(1e30), DEFAULT_MAX_LEVEL);

        let capped = ExperienceCurve::default().with_max_level(3);
        assert_eq!(capped.advance(2, 500.0), (3, 0.0));
        // levels above a lowered cap are kept but bank nothing
        assert_eq!(capped.advance(7, 50.0), (7, 0.0));
        assert_eq!(capped.level_for_total_exp(10_000.0), 3);
    }

    #[test]
    fn test_invalid_parameters_fall_back() {
        let curve = ExperienceCurve::new(0.0, -1.0);
        assert_eq!(curve, ExperienceCurve::default());
    }

    #[test]
    fn test_award_amount_uses_formula() {
        let curve = ExperienceCurve::default();
        assert_eq!(curve.award_amount(10.0, 0, 1.0), 10.0);
        assert_eq!(curve.award_amount(10.0, 10, 2.0), 10.0 * (1.0 + (10.0 * 0.1)) * 2.0);
    }

    #[test]
    fn test_award_amount_falls_back_on_error() {
        let curve = ExperienceCurve::default()
            .with_award_formula(Some(Formula::parse("base / level").unwrap()));
        // level 0 divides by zero
        assert_eq!(curve.award_amount(7.0, 0, 2.0), 14.0);
        assert_eq!(curve.award_amount(8.0, 2, 1.0), 4.0);

        let plain = ExperienceCurve::default().with_award_formula(None);
        assert_eq!(plain.award_amount(7.0, 50, 1.5), 10.5);
    }

    proptest! {
        #[test]
        fn step_cost_is_positive_and_non_decreasing(
            level in 0u32..10_000,
            base in 1.0f64..1000.0,
            growth in 0.0f64..2.0,
        ) {
            let curve = ExperienceCurve::new(base, growth);
            prop_assert!(curve.exp_to_next_level(level) > 0.0);
            prop_assert!(curve.exp_to_next_level(level + 1) >= curve.exp_to_next_level(level));
        }

        #[test]
        fn level_for_total_exp_is_bracketed(total in 0.0f64..500_000.0) {
            let curve = ExperienceCurve::default().with_max_level(10_000);
            let level = curve.level_for_total_exp(total);
            prop_assert!(curve.cumulative_exp_for(level) <= total);
            prop_assert!(total < curve.cumulative_exp_for(level + 1));
        }

        #[test]
        fn split_awards_match_single_award(a in 0u32..20_000, b in 0u32..20_000) {
            // Integer step costs keep every intermediate value exact.
            let curve = ExperienceCurve::new(100.0, 0.5).with_max_level(10_000);
            let (level, rest) = curve.advance(0, f64::from(a));
            let split = curve.advance(level, rest + f64::from(b));
            let single = curve.advance(0, f64::from(a) + f64::from(b));
            prop_assert_eq!(split, single);
        }
    }
}
