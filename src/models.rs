use crate::errors::TaskError;
use crate::stats::format_duration;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    pub uid: String,
    pub name: String,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub uid: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub uid: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Task {
    pub fn metric(&self, uid: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|metric| metric.uid == uid)
    }

    pub fn item(&self, uid: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.uid == uid)
    }

    /// Checks that every quantity on `item` points at a metric this task defines.
    pub fn check_item(&self, item: &Item) -> Result<(), TaskError> {
        for quantity in &item.metric_quantities {
            if self.metric(&quantity.metric.uid).is_none() {
                return Err(TaskError::UnknownMetric {
                    task_uid: self.uid.clone(),
                    item_uid: item.uid.clone(),
                    metric_uid: quantity.metric.uid.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Closed time span of an item. `end` is never before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "(DateTime<Utc>, DateTime<Utc>)",
    into = "(DateTime<Utc>, DateTime<Utc>)"
)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TaskError> {
        if end < start {
            return Err(TaskError::InvalidTimePeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

impl TryFrom<(DateTime<Utc>, DateTime<Utc>)> for Period {
    type Error = TaskError;

    fn try_from((start, end): (DateTime<Utc>, DateTime<Utc>)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl From<Period> for (DateTime<Utc>, DateTime<Utc>) {
    fn from(period: Period) -> Self {
        (period.start, period.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    pub period: Period,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metric_quantities: Vec<MetricQuantity>,
}

impl Item {
    pub fn duration_ms(&self) -> i64 {
        self.period.duration_ms()
    }

    /// UTC calendar date the item is bucketed under.
    pub fn day(&self) -> NaiveDate {
        self.period.start().date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuantity {
    pub uid: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: f64,
    pub metric: MetricDefinition,
    pub created_at: DateTime<Utc>,
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawQuantity {
        Number(f64),
        Text(String),
    }

    let value = match RawQuantity::deserialize(deserializer)? {
        RawQuantity::Number(value) => value,
        RawQuantity::Text(text) => text.trim().parse::<f64>().map_err(|err| {
            serde::de::Error::custom(format!("invalid quantity {text:?}: {err}"))
        })?,
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom("quantity must be a finite number"));
    }
    Ok(value)
}

/// Decodes a record pushed in from the API layer.
///
/// Periods are checked before the typed decode so a reversed period surfaces
/// as [`TaskError::InvalidTimePeriod`] rather than a generic parse failure.
pub fn decode_record<T: DeserializeOwned>(value: Value) -> Result<T, TaskError> {
    check_periods(&value)?;
    serde_json::from_value(value).map_err(|err| TaskError::Malformed(err.to_string()))
}

fn check_periods(value: &Value) -> Result<(), TaskError> {
    match value {
        Value::Array(values) => values.iter().try_for_each(check_periods),
        Value::Object(fields) => {
            if let Some(period) = fields.get("period") {
                if let Ok((start, end)) =
                    <(DateTime<Utc>, DateTime<Utc>)>::deserialize(period)
                {
                    Period::new(start, end)?;
                }
            }
            fields.values().try_for_each(check_periods)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub metric_key: String,
    pub metric_name: String,
    pub metric_unit: String,
    pub total_items: u64,
    pub total_value: f64,
    pub average_value: f64,
    pub min_value: f64,
    pub max_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetEntry {
    pub metric_key: String,
    pub metric_name: String,
    pub metric_unit: String,
    pub total_value: f64,
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub dataset: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBucket {
    pub label: String,
    pub daterange: DateRange,
    pub dataset: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub days: Vec<DayBucket>,
    pub weeks: Vec<RangeBucket>,
    pub months: Vec<RangeBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionPoint {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterBucket {
    pub daterange: DateRange,
    pub dataset: Vec<ContributionPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionData {
    pub quarters: Vec<QuarterBucket>,
}

/// A task together with everything derived from its items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub stats: Vec<Stat>,
    pub chart_data: ChartData,
    pub contribution_data: ContributionData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub duration: i64,
    /// `duration` as `H:mm:ss`.
    pub duration_label: String,
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        let duration = item.duration_ms();
        Self {
            duration_label: format_duration(duration as f64),
            item,
            duration,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    #[default]
    CreatedAt,
    Start,
    End,
    Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTaskRequest {
    pub task_uid: Option<String>,
}
