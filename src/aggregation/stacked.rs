//! Single-level stacked aggregation for stacked-bar charts.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::filters::FilterSet;
use super::record::{category, measure, Record};

/// Bucket for records with no usable category.
pub const STACK_FALLBACK_LABEL: &str = "OTROS";

/// One X-axis category with a value per stack key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedRow {
    pub name: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
    pub total: f64,
}

impl StackedRow {
    pub fn value(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }
}

/// Rows by descending total, keys by descending global sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StackedAggregate {
    pub data: Vec<StackedRow>,
    pub keys: Vec<String>,
}

impl StackedAggregate {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sum of every row total.
    pub fn grand_total(&self) -> f64 {
        self.data.iter().map(|row| row.total).sum()
    }
}

/// Groups filtered records by `x_key` and sums the measure per normalized
/// `stack_key` value.
///
/// The measure is `value_key`, falling back to the `count` field. Ties in
/// either ordering keep first-appearance order.
pub fn aggregate_stacked(
    records: &[Record],
    x_key: &str,
    stack_key: &str,
    value_key: &str,
    filters: &FilterSet,
) -> StackedAggregate {
    let mut rows: Vec<StackedRow> = Vec::new();
    let mut row_index: HashMap<String, usize> = HashMap::new();
    let mut key_sums: Vec<(String, f64)> = Vec::new();
    let mut key_index: HashMap<String, usize> = HashMap::new();

    for record in filters.apply(records) {
        let name = category(record, x_key).unwrap_or_else(|| STACK_FALLBACK_LABEL.to_string());
        let key = category(record, stack_key)
            .map(|k| k.to_uppercase())
            .unwrap_or_else(|| STACK_FALLBACK_LABEL.to_string());
        let value = measure(record, value_key);

        let row = *row_index.entry(name.clone()).or_insert_with(|| {
            rows.push(StackedRow {
                name,
                values: BTreeMap::new(),
                total: 0.0,
            });
            rows.len() - 1
        });
        *rows[row].values.entry(key.clone()).or_insert(0.0) += value;
        rows[row].total += value;

        let slot = *key_index.entry(key.clone()).or_insert_with(|| {
            key_sums.push((key, 0.0));
            key_sums.len() - 1
        });
        key_sums[slot].1 += value;
    }

    // Stable sorts keep first appearance on ties
    rows.sort_by(|a, b| b.total.total_cmp(&a.total));
    key_sums.sort_by(|a, b| b.1.total_cmp(&a.1));

    StackedAggregate {
        data: rows,
        keys: key_sums.into_iter().map(|(key, _)| key).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn sample() -> Vec<Record> {
        records(json!([
            {"regional": "Norte", "estado": "mora", "saldo": 10},
            {"regional": "Norte", "estado": " al dia ", "saldo": 5},
            {"regional": "Sur", "estado": "AL DIA", "saldo": "30"},
            {"regional": "Centro", "estado": "mora", "count": 4},
            {"regional": "Centro", "saldo": 1}
        ]))
    }

    #[test]
    fn groups_normalizes_and_orders() {
        let result = aggregate_stacked(&sample(), "regional", "estado", "saldo", &FilterSet::new());

        let names: Vec<&str> = result.data.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Sur", "Norte", "Centro"]);
        assert_eq!(result.keys, vec!["AL DIA", "MORA", "OTROS"]);

        let norte = &result.data[1];
        assert_eq!(norte.value("MORA"), 10.0);
        assert_eq!(norte.value("AL DIA"), 5.0);
        assert_eq!(norte.total, 15.0);

        let centro = &result.data[2];
        assert_eq!(centro.value("MORA"), 4.0);
        assert_eq!(centro.value(STACK_FALLBACK_LABEL), 1.0);
    }

    #[test]
    fn no_row_is_dropped() {
        let input = sample();
        let result = aggregate_stacked(&input, "regional", "estado", "saldo", &FilterSet::new());

        let input_sum: f64 = input.iter().map(|r| measure(r, "saldo")).sum();
        assert_eq!(result.grand_total(), input_sum);
    }

    #[test]
    fn equal_key_sums_keep_first_appearance() {
        let input = records(json!([
            {"x": "a", "k": "z", "v": 2},
            {"x": "a", "k": "y", "v": 2}
        ]));

        let result = aggregate_stacked(&input, "x", "k", "v", &FilterSet::new());

        assert_eq!(result.keys, vec!["Z", "Y"]);
    }

    #[test]
    fn filtered_result_is_a_subset() {
        let input = sample();
        let full = aggregate_stacked(&input, "regional", "estado", "saldo", &FilterSet::new());
        let filters = FilterSet::new().with("regional", ["Norte", "Centro"]);

        let filtered = aggregate_stacked(&input, "regional", "estado", "saldo", &filters);

        assert!(filtered.keys.iter().all(|k| full.keys.contains(k)));
        assert!(filtered.grand_total() <= full.grand_total());
        assert_eq!(filtered.data.len(), 2);
    }

    #[test]
    fn empty_input_gives_empty_aggregate() {
        let result = aggregate_stacked(&[], "regional", "estado", "saldo", &FilterSet::new());
        assert_eq!(result, StackedAggregate::default());

        let nothing_passes = FilterSet::new().with("regional", ["Oriente"]);
        let result = aggregate_stacked(&sample(), "regional", "estado", "saldo", &nothing_passes);
        assert!(result.is_empty());
        assert!(result.keys.is_empty());
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let input = sample();
        let first = aggregate_stacked(&input, "regional", "estado", "saldo", &FilterSet::new());
        let second = aggregate_stacked(&input, "regional", "estado", "saldo", &FilterSet::new());
        assert_eq!(first, second);
    }

    #[test]
    fn serializes_stack_keys_inline() {
        let input = records(json!([{"x": "a", "k": "mora", "v": 3}]));
        let result = aggregate_stacked(&input, "x", "k", "v", &FilterSet::new());

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"data": [{"name": "a", "MORA": 3.0, "total": 3.0}], "keys": ["MORA"]})
        );
    }
}
