//! Group-by/aggregate over in-memory records.
//!
//! Groups come back in order of first key occurrence; nothing is sorted.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl Cell<'_> {
    fn as_number(&self) -> f64 {
        match self {
            Cell::Number(n) => *n,
            _ => 0.0,
        }
    }

    fn distinct_key(&self) -> Option<DistinctKey> {
        match self {
            Cell::Text(t) => Some(DistinctKey::Text(t.to_string())),
            // -0.0 and 0.0 are the same value
            Cell::Number(n) => Some(DistinctKey::Number((n + 0.0).to_bits())),
            Cell::Date(d) => Some(DistinctKey::Date(*d)),
            Cell::Missing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DistinctKey {
    Text(String),
    Number(u64),
    Date(NaiveDate),
}

/// A record the engine can read cells from by column name.
pub trait Row {
    fn cell(&self, column: &str) -> Cell<'_>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Sum of numeric cells; non-numeric cells add nothing.
    Sum,
    /// Number of rows with a present cell.
    Count,
    /// Number of distinct present values.
    CountDistinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metric {
    pub column: &'static str,
    pub reducer: Reducer,
    pub output: &'static str,
}

impl Metric {
    pub const fn sum(column: &'static str, output: &'static str) -> Self {
        Self {
            column,
            reducer: Reducer::Sum,
            output,
        }
    }

    pub const fn count(column: &'static str, output: &'static str) -> Self {
        Self {
            column,
            reducer: Reducer::Count,
            output,
        }
    }

    pub const fn count_distinct(column: &'static str, output: &'static str) -> Self {
        Self {
            column,
            reducer: Reducer::CountDistinct,
            output,
        }
    }
}

enum Accumulator {
    Sum(f64),
    Count(usize),
    Distinct(HashSet<DistinctKey>),
}

impl Accumulator {
    fn for_reducer(reducer: Reducer) -> Self {
        match reducer {
            Reducer::Sum => Accumulator::Sum(0.0),
            Reducer::Count => Accumulator::Count(0),
            Reducer::CountDistinct => Accumulator::Distinct(HashSet::new()),
        }
    }

    fn push(&mut self, cell: Cell<'_>) {
        match self {
            Accumulator::Sum(total) => *total += cell.as_number(),
            Accumulator::Count(count) => {
                if cell != Cell::Missing {
                    *count += 1;
                }
            }
            Accumulator::Distinct(seen) => {
                if let Some(key) = cell.distinct_key() {
                    seen.insert(key);
                }
            }
        }
    }

    fn finish(self) -> f64 {
        match self {
            Accumulator::Sum(total) => total,
            Accumulator::Count(count) => count as f64,
            Accumulator::Distinct(seen) => seen.len() as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group<'m, K> {
    pub key: K,
    pub values: Vec<f64>,
    metrics: &'m [Metric],
}

impl<K> Group<'_, K> {
    /// Aggregate for the metric named `output`, or `0.0` if no such metric.
    pub fn value(&self, output: &str) -> f64 {
        self.metrics
            .iter()
            .position(|m| m.output == output)
            .map_or(0.0, |idx| self.values[idx])
    }

    pub fn count(&self, output: &str) -> usize {
        self.value(output).round() as usize
    }
}

pub fn group_by<'m, R, K, F>(rows: &[R], key_fn: F, metrics: &'m [Metric]) -> Vec<Group<'m, K>>
where
    R: Row,
    K: Eq + Hash + Clone,
    F: Fn(&R) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<Accumulator>)> = Vec::new();

    for row in rows {
        let key = key_fn(row);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((
                key,
                metrics
                    .iter()
                    .map(|m| Accumulator::for_reducer(m.reducer))
                    .collect(),
            ));
            groups.len() - 1
        });

        for (metric, acc) in metrics.iter().zip(groups[slot].1.iter_mut()) {
            acc.push(row.cell(metric.column));
        }
    }

    groups
        .into_iter()
        .map(|(key, accs)| Group {
            key,
            values: accs.into_iter().map(Accumulator::finish).collect(),
            metrics,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        who: &'static str,
        what: Option<&'static str>,
        amount: f64,
    }

    impl Row for Sample {
        fn cell(&self, column: &str) -> Cell<'_> {
            match column {
                "who" => Cell::Text(self.who),
                "what" => self.what.map_or(Cell::Missing, Cell::Text),
                "amount" => Cell::Number(self.amount),
                _ => Cell::Missing,
            }
        }
    }

    fn sample(who: &'static str, what: Option<&'static str>, amount: f64) -> Sample {
        Sample { who, what, amount }
    }

    const METRICS: [Metric; 3] = [
        Metric::sum("amount", "total"),
        Metric::count("what", "rows"),
        Metric::count_distinct("what", "kinds"),
    ];

    #[test]
    fn reduces_per_group() {
        let rows = vec![
            sample("b", Some("x"), 1.0),
            sample("a", Some("x"), 2.0),
            sample("b", Some("x"), 3.5),
            sample("b", Some("y"), 0.5),
            sample("b", None, 1.0),
        ];

        let groups = group_by(&rows, |r| r.who, &METRICS);
        assert_eq!(groups.len(), 2);

        let b = &groups[0];
        assert_eq!(b.key, "b");
        assert_eq!(b.value("total"), 6.0);
        assert_eq!(b.count("rows"), 3);
        assert_eq!(b.count("kinds"), 2);

        let a = &groups[1];
        assert_eq!(a.value("total"), 2.0);
        assert_eq!(a.count("rows"), 1);
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let rows = vec![
            sample("z", None, 0.0),
            sample("a", None, 0.0),
            sample("m", None, 0.0),
            sample("a", None, 0.0),
        ];
        let keys: Vec<&str> = group_by(&rows, |r| r.who, &METRICS)
            .into_iter()
            .map(|g| g.key)
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn unknown_columns_reduce_to_zero() {
        let rows = vec![sample("a", Some("x"), 1.0)];
        let metrics = [Metric::sum("missing", "m"), Metric::count("missing", "c")];
        let groups = group_by(&rows, |r| r.who, &metrics);
        assert_eq!(groups[0].value("m"), 0.0);
        assert_eq!(groups[0].value("c"), 0.0);
        assert_eq!(groups[0].value("not-a-metric"), 0.0);
    }

    #[test]
    fn empty_input_has_no_groups() {
        let rows: Vec<Sample> = Vec::new();
        assert!(group_by(&rows, |r| r.who, &METRICS).is_empty());
    }
}
