use crate::models::{DatasetEntry, Item, MetricDefinition, Stat};
use std::collections::HashMap;

pub const COUNT_KEY: &str = "count";
pub const DURATION_KEY: &str = "duration";

/// Running total/min/max for one metric key.
#[derive(Debug, Clone)]
struct Accumulator {
    key: String,
    name: String,
    unit: String,
    items: u64,
    total: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new(key: &str, name: &str, unit: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            items: 0,
            total: 0.0,
            min: 0.0,
            max: 0.0,
        }
    }

    fn push(&mut self, value: f64) {
        if self.items == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.total += value;
        self.items += 1;
    }

    fn into_stat(self) -> Stat {
        let average = if self.items == 0 {
            0.0
        } else {
            // Summation rounding can drift past the observed extremes.
            (self.total / self.items as f64).clamp(self.min, self.max)
        };
        Stat {
            metric_key: self.key,
            metric_name: self.name,
            metric_unit: self.unit,
            total_items: self.items,
            total_value: self.total,
            average_value: average,
            min_value: self.min,
            max_value: self.max,
        }
    }

    fn into_dataset_entry(self) -> DatasetEntry {
        DatasetEntry {
            metric_key: self.key,
            metric_name: self.name,
            metric_unit: self.unit,
            total_value: self.total,
        }
    }
}

/// Per-metric accumulators in output order: count, duration, then user
/// metrics by first appearance.
#[derive(Debug, Clone)]
pub(crate) struct MetricTable {
    entries: Vec<Accumulator>,
    index: HashMap<String, usize>,
}

impl MetricTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: vec![
                Accumulator::new(COUNT_KEY, "Count", ""),
                Accumulator::new(DURATION_KEY, "Duration", "ms"),
            ],
            index: HashMap::new(),
        }
    }

    pub(crate) fn add_item(&mut self, item: &Item) {
        self.entries[0].push(1.0);
        self.entries[1].push(item.duration_ms() as f64);

        // Repeated quantities for one metric on the same item fold into one value.
        let mut per_metric: Vec<(&MetricDefinition, f64)> = Vec::new();
        for quantity in &item.metric_quantities {
            match per_metric
                .iter_mut()
                .find(|(metric, _)| metric.uid == quantity.metric.uid)
            {
                Some((_, value)) => *value += quantity.quantity,
                None => per_metric.push((&quantity.metric, quantity.quantity)),
            }
        }

        for (metric, value) in per_metric {
            self.entry(metric).push(value);
        }
    }

    fn entry(&mut self, metric: &MetricDefinition) -> &mut Accumulator {
        let position = match self.index.get(&metric.uid) {
            Some(position) => *position,
            None => {
                self.entries
                    .push(Accumulator::new(&metric.uid, &metric.name, &metric.unit));
                let position = self.entries.len() - 1;
                self.index.insert(metric.uid.clone(), position);
                position
            }
        };
        &mut self.entries[position]
    }

    pub(crate) fn into_stats(self) -> Vec<Stat> {
        self.entries.into_iter().map(Accumulator::into_stat).collect()
    }

    pub(crate) fn into_dataset(self) -> Vec<DatasetEntry> {
        self.entries
            .into_iter()
            .map(Accumulator::into_dataset_entry)
            .collect()
    }
}

pub fn build_stats<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<Stat> {
    let mut table = MetricTable::new();
    for item in items {
        table.add_item(item);
    }
    table.into_stats()
}

/// Renders milliseconds as `H:mm:ss`; hours keep counting past 24.
pub fn format_duration(ms: f64) -> String {
    let total_seconds = (ms.max(0.0) / 1000.0).floor() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
