// Keyed container of units with filtering and state counting

use crate::error::CheckError;
use crate::systemd::filter::{NameFilter, PatternSet};
use crate::systemd::Unit;
use std::collections::{BTreeMap, HashMap};

/// Units indexed by name, iterated in insertion order
#[derive(Debug, Clone, Default)]
pub struct UnitCollection {
    units: HashMap<String, Unit>,
    name_filter: NameFilter,
}

impl UnitCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit, replacing an existing one with the same name
    pub fn add(&mut self, unit: Unit) {
        let name = unit.name().to_string();
        self.name_filter.add(name.clone());
        self.units.insert(name, unit);
    }

    pub fn get(&self, name: &str) -> Option<&Unit> {
        self.units.get(name)
    }

    pub fn count(&self) -> usize {
        self.units.len()
    }

    /// Units matching `include` (if given) and not matching `exclude`
    pub fn filter<'a, 'p>(
        &'a self,
        include: &'p PatternSet,
        exclude: &'p PatternSet,
    ) -> impl Iterator<Item = &'a Unit> + 'p
    where
        'a: 'p,
    {
        self.name_filter
            .filter(include, exclude)
            .filter_map(move |name| self.units.get(name))
    }

    /// A new collection holding only the units that pass the filter
    pub fn filtered(&self, include: &PatternSet, exclude: &PatternSet) -> Self {
        let mut collection = Self::new();
        for unit in self.filter(include, exclude) {
            collection.add(unit.clone());
        }
        collection
    }

    /// Count units per `property:value` spec, for example `active_state:failed`.
    ///
    /// Every spec is evaluated on its own, so one unit may be counted by
    /// several specs.
    pub fn count_by_states<S: AsRef<str>>(
        &self,
        specs: &[S],
    ) -> Result<BTreeMap<String, usize>, CheckError> {
        let mut parsed = Vec::with_capacity(specs.len());
        let mut counter = BTreeMap::new();
        for spec in specs {
            let spec = spec.as_ref();
            let (property, value) = spec
                .split_once(':')
                .ok_or_else(|| CheckError::InvalidStateSpec(spec.to_string()))?;
            if !matches!(property, "name" | "active_state" | "sub_state" | "load_state") {
                return Err(CheckError::InvalidStateSpec(spec.to_string()));
            }
            parsed.push((spec, property, value));
            counter.insert(spec.to_string(), 0);
        }

        for unit in self.units.values() {
            for (spec, property, value) in &parsed {
                if unit.property(property) == Some(*value) {
                    if let Some(count) = counter.get_mut(*spec) {
                        *count += 1;
                    }
                }
            }
        }

        Ok(counter)
    }
}

impl FromIterator<Unit> for UnitCollection {
    fn from_iter<I: IntoIterator<Item = Unit>>(iter: I) -> Self {
        let mut collection = Self::new();
        for unit in iter {
            collection.add(unit);
        }
        collection
    }
}
