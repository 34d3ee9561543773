use crate::calendar::quarter_of;
use crate::models::{ContributionData, ContributionPoint, DateRange, Item, QuarterBucket};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-day item counts grouped by calendar quarter, for the heatmap.
///
/// The dataset is sparse: days without items are left out and quarters
/// without items are not emitted at all.
pub fn build_contribution_data(items: &[Item]) -> ContributionData {
    let mut quarters: BTreeMap<DateRange, BTreeMap<NaiveDate, u64>> = BTreeMap::new();

    for item in items {
        let day = item.day();
        *quarters
            .entry(quarter_of(day))
            .or_default()
            .entry(day)
            .or_default() += 1;
    }

    ContributionData {
        quarters: quarters
            .into_iter()
            .map(|(daterange, days)| QuarterBucket {
                daterange,
                dataset: days
                    .into_iter()
                    .map(|(date, count)| ContributionPoint { date, count })
                    .collect(),
            })
            .collect(),
    }
}
