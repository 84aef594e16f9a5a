use std::cmp::Ordering;
use std::collections::HashMap;

/// String-keyed accumulator table that iterates in first-insertion order.
///
/// Every ranked view in the summary is a stable sort over a `Tally`, so equal
/// values keep the order in which their keys first appeared in the data.
#[derive(Debug, Clone)]
pub struct Tally<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V> Default for Tally<V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<V> Tally<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}

impl<V: Default> Tally<V> {
    pub fn entry(&mut self, key: &str) -> &mut V {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.index.insert(key.to_string(), i);
                self.entries.push((key.to_string(), V::default()));
                i
            }
        };
        &mut self.entries[i].1
    }
}

impl Tally<usize> {
    pub fn bump(&mut self, key: &str) {
        *self.entry(key) += 1;
    }
}

/// Stable descending sort on a float key; NaN compares equal.
pub fn sort_desc_by<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

/// Stable ascending sort on a float key; NaN compares equal.
pub fn sort_asc_by<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingCell<'a> {
    pub weekday: &'a str,
    pub time: &'a str,
    pub value: f64,
}

/// Accumulated metric keyed `country -> weekday -> time token`.
///
/// Each level iterates in first-insertion order, so the cells of one country
/// are visited weekday by weekday (in the order each weekday first appeared)
/// and, within a weekday, time token by time token. Optimal-timing tie breaks
/// depend on this order.
#[derive(Debug, Clone, Default)]
pub struct TimingTable {
    countries: Tally<Tally<Tally<f64>>>,
}

impl TimingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, country: &str, weekday: &str, time: &str, amount: f64) {
        *self.countries.entry(country).entry(weekday).entry(time) += amount;
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> + '_ {
        self.countries.keys()
    }

    pub fn cells(&self, country: &str) -> Vec<TimingCell<'_>> {
        let Some(days) = self.countries.get(country) else {
            return Vec::new();
        };
        days.iter()
            .flat_map(|(weekday, slots)| {
                slots.iter().map(move |(time, value)| TimingCell {
                    weekday,
                    time,
                    value: *value,
                })
            })
            .collect()
    }
}
