//! Budget tier scaling and display helpers.

use crate::model::{AnalysisRecord, BudgetEstimate, BudgetTier, RecordUpdate};

/// Fallback base when neither a stored base nor an estimate exists.
const DEFAULT_BASE_MIN: f64 = 500_000.0;
const DEFAULT_BASE_MAX: f64 = 2_000_000.0;

pub struct TierInfo {
    pub label: &'static str,
    pub range: &'static str,
}

impl BudgetTier {
    /// (min, max) multipliers applied to the tier-agnostic base estimate.
    pub fn multipliers(self) -> (f64, f64) {
        match self {
            BudgetTier::Micro => (0.1, 0.3),
            BudgetTier::Indie => (1.0, 1.0),
            BudgetTier::Studio => (10.0, 20.0),
        }
    }

    pub fn info(self) -> TierInfo {
        match self {
            BudgetTier::Micro => TierInfo {
                label: "Micro-Budget",
                range: "$50K - $500K",
            },
            BudgetTier::Indie => TierInfo {
                label: "Independent",
                range: "$500K - $5M",
            },
            BudgetTier::Studio => TierInfo {
                label: "Studio",
                range: "$5M - $100M+",
            },
        }
    }
}

/// Base estimate for a record: the stored base, else the current estimate, else the default.
pub fn base_estimate(record: &AnalysisRecord) -> BudgetEstimate {
    record
        .base_budget
        .clone()
        .or_else(|| record.analysis.budget_estimate.clone())
        .unwrap_or(BudgetEstimate {
            min: Some(DEFAULT_BASE_MIN),
            max: Some(DEFAULT_BASE_MAX),
            top_cost_drivers: Vec::new(),
        })
}

pub fn scale_estimate(base: &BudgetEstimate, tier: BudgetTier) -> BudgetEstimate {
    let (min_mult, max_mult) = tier.multipliers();
    BudgetEstimate {
        min: base.min.map(|v| (v * min_mult).round()),
        max: base.max.map(|v| (v * max_mult).round()),
        top_cost_drivers: base.top_cost_drivers.clone(),
    }
}

/// Build the update that switches `record` to `tier`.
///
/// The base is written back alongside so later switches keep scaling from the same
/// numbers instead of compounding.
pub fn tier_change(record: &AnalysisRecord, tier: BudgetTier) -> RecordUpdate {
    let base = base_estimate(record);
    RecordUpdate {
        budget_tier: Some(tier),
        budget_estimate: Some(scale_estimate(&base, tier)),
        base_budget: Some(base),
        ..Default::default()
    }
}

pub fn format_currency(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.0}K", value / 1_000.0)
    } else {
        format!("${}", group_thousands(value.round() as i64))
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnalysisRecord;

    fn record_with(estimate: Option<BudgetEstimate>) -> AnalysisRecord {
        let mut r = AnalysisRecord::new(
            "id1".into(),
            "Script".into(),
            "file:///x.txt".into(),
            BudgetTier::Indie,
        );
        r.analysis.budget_estimate = estimate;
        r
    }

    fn est(min: f64, max: f64) -> BudgetEstimate {
        BudgetEstimate {
            min: Some(min),
            max: Some(max),
            top_cost_drivers: vec!["Night exteriors".into()],
        }
    }

    #[test]
    fn tiers_scale_base_estimate() {
        let r = record_with(Some(est(1_000_000.0, 4_000_000.0)));

        let micro = tier_change(&r, BudgetTier::Micro);
        let e = micro.budget_estimate.unwrap();
        assert_eq!(e.min, Some(100_000.0));
        assert_eq!(e.max, Some(1_200_000.0));
        assert_eq!(e.top_cost_drivers, vec!["Night exteriors".to_string()]);

        let studio = tier_change(&r, BudgetTier::Studio).budget_estimate.unwrap();
        assert_eq!(studio.min, Some(10_000_000.0));
        assert_eq!(studio.max, Some(80_000_000.0));

        let indie = tier_change(&r, BudgetTier::Indie).budget_estimate.unwrap();
        assert_eq!(indie.min, Some(1_000_000.0));
        assert_eq!(indie.max, Some(4_000_000.0));
    }

    #[test]
    fn repeated_changes_do_not_compound() {
        let mut r = record_with(Some(est(1_000_000.0, 4_000_000.0)));
        r.apply(tier_change(&r, BudgetTier::Studio));
        r.apply(tier_change(&r, BudgetTier::Micro));
        let e = r.analysis.budget_estimate.clone().unwrap();
        assert_eq!(e.min, Some(100_000.0));
        assert_eq!(e.max, Some(1_200_000.0));
        assert_eq!(r.budget_tier, BudgetTier::Micro);
    }

    #[test]
    fn default_base_when_no_estimate() {
        let r = record_with(None);
        let e = tier_change(&r, BudgetTier::Micro).budget_estimate.unwrap();
        assert_eq!(e.min, Some(50_000.0));
        assert_eq!(e.max, Some(600_000.0));
    }

    #[test]
    fn rounds_scaled_values() {
        let r = record_with(Some(est(333_333.0, 777_777.0)));
        let e = tier_change(&r, BudgetTier::Micro).budget_estimate.unwrap();
        assert_eq!(e.min, Some(33_333.0));
        assert_eq!(e.max, Some(233_333.0));
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(2_500_000.0), "$2.5M");
        assert_eq!(format_currency(750_000.0), "$750K");
        assert_eq!(format_currency(999.0), "$999");
        assert_eq!(format_currency(0.0), "$0");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(100), "100");
        assert_eq!(group_thousands(-4500), "-4,500");
    }
}
