//! Portfolio distribution over time.

use chrono::NaiveDate;
use folio_core::AlignedFrame;
use serde::Serialize;

/// One holding's share of the portfolio on a date.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Allocation {
    /// Stock symbol.
    pub stock: String,
    /// Market value.
    pub value: f64,
    /// Percentage of the day's total value.
    pub share_pct: f64,
}

/// The portfolio's allocation on one calendar day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistributionSnapshot {
    /// Calendar day.
    pub date: NaiveDate,
    /// Sum of every holding's value, unset holdings as zero.
    pub total_value: f64,
    /// Holdings with a strictly positive value, in symbol order.
    pub allocations: Vec<Allocation>,
}

/// One snapshot per row of an aligned market value frame.
#[must_use]
pub fn timeline(market_value: &AlignedFrame) -> Vec<DistributionSnapshot> {
    market_value
        .dates()
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let row = market_value.row(i);
            let total_value: f64 = row.iter().flatten().sum();
            let allocations = market_value
                .stocks()
                .iter()
                .zip(row)
                .filter_map(|(stock, value)| {
                    let value = value.filter(|v| *v > 0.0)?;
                    Some(Allocation {
                        stock: stock.clone(),
                        value,
                        share_pct: value / total_value * 100.0,
                    })
                })
                .collect();
            DistributionSnapshot {
                date: *date,
                total_value,
                allocations,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline() {
        let d1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let aligned = AlignedFrame::from_parts(
            vec![d1, d2],
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec![
                vec![Some(300.0), Some(0.0)],
                vec![None, Some(250.0)],
                vec![Some(100.0), Some(750.0)],
            ],
        )
        .unwrap();

        let snapshots = timeline(&aligned);
        assert_eq!(snapshots.len(), 2);

        assert_eq!(snapshots[0].total_value, 400.0);
        assert_eq!(snapshots[0].allocations.len(), 2);
        assert_eq!(snapshots[0].allocations[0].share_pct, 75.0);

        let stocks: Vec<_> = snapshots[1].allocations.iter().map(|a| a.stock.as_str()).collect();
        assert_eq!(stocks, vec!["B", "C"]);
        assert_eq!(snapshots[1].allocations[1].share_pct, 75.0);
    }
}
