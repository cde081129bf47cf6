//! Two-level hierarchical aggregation for nested-ring (sunburst) charts.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use super::filters::FilterSet;
use super::record::{category, measure, Record};

/// Bucket for records with no usable category, at either level.
pub const UNASSIGNED_LABEL: &str = "SIN ASIGNAR";

/// Child label used under buckets whose sub-category carries no meaning.
pub const GENERAL_LABEL: &str = "GENERAL";

/// Minimum share of the grand total a positive slice is drawn with.
pub const DEFAULT_VISUAL_FLOOR: f64 = 0.02;

// ─────────────────────────────────────────────────────────────────────────────
// Bucket catalog
// ─────────────────────────────────────────────────────────────────────────────

/// A canonical level-1 category and the fragments that map onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
    /// Uppercase, accent-free fragments matched as substrings.
    pub patterns: Vec<String>,
    /// Children collapse into a single [`GENERAL_LABEL`] node.
    pub flat: bool,
}

impl Bucket {
    pub fn new(name: &str, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| fold(p)).collect(),
            flat: false,
        }
    }

    pub fn flat(mut self) -> Self {
        self.flat = true;
        self
    }
}

/// Ordered level-1 normalization rules plus the visual floor ratio.
///
/// Buckets are tried in order and the first match wins, so a more specific
/// fragment (`PREJURIDIC`) must come before one it contains (`JURIDIC`).
#[derive(Debug, Clone, PartialEq)]
pub struct BucketCatalog {
    buckets: Vec<Bucket>,
    visual_floor: f64,
}

impl Default for BucketCatalog {
    /// Portfolio ("cartera") collection stages.
    fn default() -> Self {
        Self::new(vec![
            Bucket::new("PREJURIDICO", &["PREJURIDIC"]),
            Bucket::new("JURIDICO", &["JURIDIC"]).flat(),
            Bucket::new("CASTIGO", &["CASTIG"]).flat(),
            Bucket::new("AL DIA", &["CORRIENTE", "AL DIA"]),
            Bucket::new("EN MORA", &["VENCID", "MORA"]),
        ])
    }
}

impl BucketCatalog {
    pub fn new(buckets: Vec<Bucket>) -> Self {
        Self {
            buckets,
            visual_floor: DEFAULT_VISUAL_FLOOR,
        }
    }

    /// No canonical buckets: every value keeps its uppercased raw form.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Ratio in `[0, 1]`; out-of-range values are clamped.
    pub fn with_visual_floor(mut self, ratio: f64) -> Self {
        self.visual_floor = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn visual_floor(&self) -> f64 {
        self.visual_floor
    }

    /// Canonical bucket for `raw`, if any fragment matches.
    pub fn classify(&self, raw: &str) -> Option<&Bucket> {
        let folded = fold(raw);
        self.buckets
            .iter()
            .find(|bucket| bucket.patterns.iter().any(|p| folded.contains(p.as_str())))
    }

    /// Level-1 label and whether its children are collapsed.
    fn level1(&self, raw: Option<String>) -> (String, bool) {
        let Some(raw) = raw else {
            return (UNASSIGNED_LABEL.to_string(), false);
        };
        match self.classify(&raw) {
            Some(bucket) => (bucket.name.clone(), bucket.flat),
            None => (raw.to_uppercase(), false),
        }
    }
}

/// Uppercases and strips Spanish accents so `Jurídico` matches `JURIDIC`.
fn fold(value: &str) -> String {
    value
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' | 'À' => 'A',
            'É' | 'È' => 'E',
            'Í' | 'Ì' => 'I',
            'Ó' | 'Ò' => 'O',
            'Ú' | 'Ù' | 'Ü' => 'U',
            other => other,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

/// Level-2 slice with a back-reference to its parent.
///
/// `visual_value` only drives geometry; shown numbers use `value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyLeaf {
    pub name: String,
    pub value: f64,
    pub visual_value: f64,
    pub parent_name: String,
    pub parent_value: f64,
}

impl HierarchyLeaf {
    pub fn share_of_parent(&self) -> f64 {
        ratio(self.value, self.parent_value)
    }

    pub fn share_of_total(&self, total: f64) -> f64 {
        ratio(self.value, total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub name: String,
    /// Always the sum of the children's values.
    pub value: f64,
    pub visual_value: f64,
    pub children: Vec<HierarchyLeaf>,
}

impl HierarchyNode {
    pub fn share_of_total(&self, total: f64) -> f64 {
        ratio(self.value, total)
    }

    fn largest_child(&self) -> f64 {
        self.children
            .iter()
            .map(|c| c.value)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// `level2` lists every child, contiguous and in `level1` order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HierarchyAggregate {
    pub level1: Vec<HierarchyNode>,
    pub level2: Vec<HierarchyLeaf>,
}

impl HierarchyAggregate {
    pub fn is_empty(&self) -> bool {
        self.level1.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.level1.iter().map(|n| n.value).sum()
    }

    pub fn node(&self, name: &str) -> Option<&HierarchyNode> {
        self.level1.iter().find(|n| n.name == name)
    }
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregation
// ─────────────────────────────────────────────────────────────────────────────

/// Groups filtered records into catalog-normalized level-1 buckets and
/// `level2_key` children.
pub fn aggregate_hierarchy(
    records: &[Record],
    level1_key: &str,
    level2_key: &str,
    value_key: &str,
    filters: &FilterSet,
    catalog: &BucketCatalog,
) -> HierarchyAggregate {
    // (parent name, children in first-appearance order)
    let mut groups: Vec<(String, Vec<(String, f64)>)> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for record in filters.apply(records) {
        let (parent, flat) = catalog.level1(category(record, level1_key));
        let child = if flat {
            GENERAL_LABEL.to_string()
        } else {
            category(record, level2_key)
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| UNASSIGNED_LABEL.to_string())
        };
        let value = measure(record, value_key);

        let idx = *group_index.entry(parent.clone()).or_insert_with(|| {
            groups.push((parent, Vec::new()));
            groups.len() - 1
        });
        let children = &mut groups[idx].1;
        match children.iter_mut().find(|(name, _)| *name == child) {
            Some((_, sum)) => *sum += value,
            None => children.push((child, value)),
        }
    }

    if groups.is_empty() {
        return HierarchyAggregate::default();
    }

    let total: f64 = groups
        .iter()
        .flat_map(|(_, children)| children.iter().map(|(_, v)| *v))
        .sum();
    let floor = total.max(0.0) * catalog.visual_floor();

    let mut level1: Vec<HierarchyNode> = groups
        .into_iter()
        .map(|(parent, mut children)| {
            children.sort_by(|a, b| by_value_then_name(a.1, &a.0, b.1, &b.0));
            let value: f64 = children.iter().map(|(_, v)| *v).sum();

            let leaves: Vec<HierarchyLeaf> = children
                .into_iter()
                .map(|(name, value)| HierarchyLeaf {
                    visual_value: visual(value, floor),
                    name,
                    value,
                    parent_name: parent.clone(),
                    parent_value: 0.0,
                })
                .collect();

            HierarchyNode {
                visual_value: leaves.iter().map(|l| l.visual_value).sum(),
                name: parent,
                value,
                children: leaves,
            }
        })
        .map(|mut node| {
            for leaf in &mut node.children {
                leaf.parent_value = node.value;
            }
            node
        })
        .collect();

    level1.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| b.largest_child().total_cmp(&a.largest_child()))
            .then_with(|| a.name.cmp(&b.name))
    });

    let level2 = level1
        .iter()
        .flat_map(|node| node.children.iter().cloned())
        .collect();

    HierarchyAggregate { level1, level2 }
}

fn by_value_then_name(a_value: f64, a_name: &str, b_value: f64, b_name: &str) -> Ordering {
    b_value.total_cmp(&a_value).then_with(|| a_name.cmp(b_name))
}

fn visual(value: f64, floor: f64) -> f64 {
    if value > 0.0 {
        value.max(floor)
    } else {
        0.0
    }
}
