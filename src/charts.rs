use crate::calendar::{month_label, month_of, week_label, week_of};
use crate::models::{ChartData, DateRange, DayBucket, Item, RangeBucket};
use crate::stats::MetricTable;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Sums item metrics per UTC day, ISO week and calendar month.
///
/// Only buckets holding at least one item are emitted, oldest first. Each
/// dataset starts with `count` and `duration`, followed by the metrics seen in
/// that bucket in order of first appearance.
pub fn build_chart_data(items: &[Item]) -> ChartData {
    let mut days: BTreeMap<NaiveDate, MetricTable> = BTreeMap::new();
    let mut weeks: BTreeMap<DateRange, MetricTable> = BTreeMap::new();
    let mut months: BTreeMap<DateRange, MetricTable> = BTreeMap::new();

    for item in items {
        let day = item.day();
        days.entry(day)
            .or_insert_with(MetricTable::new)
            .add_item(item);
        weeks
            .entry(week_of(day))
            .or_insert_with(MetricTable::new)
            .add_item(item);
        months
            .entry(month_of(day))
            .or_insert_with(MetricTable::new)
            .add_item(item);
    }

    ChartData {
        days: days
            .into_iter()
            .map(|(date, table)| DayBucket {
                date,
                dataset: table.into_dataset(),
            })
            .collect(),
        weeks: range_buckets(weeks, week_label),
        months: range_buckets(months, month_label),
    }
}

fn range_buckets(
    buckets: BTreeMap<DateRange, MetricTable>,
    label: fn(&DateRange) -> String,
) -> Vec<RangeBucket> {
    buckets
        .into_iter()
        .map(|(daterange, table)| RangeBucket {
            label: label(&daterange),
            daterange,
            dataset: table.into_dataset(),
        })
        .collect()
}
