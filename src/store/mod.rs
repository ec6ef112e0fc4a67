//! In-memory historical distribution store.
//!
//! One [`Observation`] per (location, commodity, month) is loaded from the
//! source CSV at startup and never mutated afterwards. Every page of the
//! dashboard reads from this store: cascading filter options, history
//! charts, choropleth aggregation, and the lag-feature defaults fed into
//! the demand model.
//!
//! Observations are held sorted by (period, key), so any filtered subset
//! comes back period-ascending without re-sorting.

pub mod loader;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single monthly distribution record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub county: String,
    pub sub_county: String,
    pub ward: String,
    pub facility: String,
    pub commodity: String,
    /// First day of the reporting month.
    pub period: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn key(&self) -> EntityKey {
        EntityKey {
            county: self.county.clone(),
            sub_county: self.sub_county.clone(),
            ward: self.ward.clone(),
            facility: self.facility.clone(),
            commodity: self.commodity.clone(),
        }
    }

    pub fn month(&self) -> u32 {
        self.period.month()
    }

    pub fn year(&self) -> i32 {
        self.period.year()
    }
}

/// Identifies one time series: a facility's history for one commodity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub county: String,
    pub sub_county: String,
    pub ward: String,
    pub facility: String,
    pub commodity: String,
}

impl EntityKey {
    fn matches(&self, obs: &Observation) -> bool {
        obs.county == self.county
            && obs.sub_county == self.sub_county
            && obs.ward == self.ward
            && obs.facility == self.facility
            && obs.commodity == self.commodity
    }
}

/// Exact-match filter over any subset of the key dimensions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterCriteria {
    pub county: Option<String>,
    pub sub_county: Option<String>,
    pub ward: Option<String>,
    pub facility: Option<String>,
    pub commodity: Option<String>,
}

impl FilterCriteria {
    pub fn matches(&self, obs: &Observation) -> bool {
        fn ok(filter: &Option<String>, actual: &str) -> bool {
            match filter {
                Some(wanted) => wanted == actual,
                None => true,
            }
        }
        ok(&self.county, &obs.county)
            && ok(&self.sub_county, &obs.sub_county)
            && ok(&self.ward, &obs.ward)
            && ok(&self.facility, &obs.facility)
            && ok(&self.commodity, &obs.commodity)
    }
}

/// Headline dataset stats for the summary endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub observation_count: usize,
    pub county_count: usize,
    pub facility_count: usize,
    pub commodity_count: usize,
    pub total_value: f64,
    pub first_period: Option<NaiveDate>,
    pub last_period: Option<NaiveDate>,
}

/// Immutable collection of observations, shared read-only for the process
/// lifetime.
#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    observations: Vec<Observation>,
}

impl TimeSeriesStore {
    /// Build a store from raw observations. Sorts once; the loader has
    /// already resolved duplicate (key, period) rows.
    pub fn from_observations(mut observations: Vec<Observation>) -> Self {
        observations.sort_by(|a, b| {
            a.period
                .cmp(&b.period)
                .then_with(|| a.county.cmp(&b.county))
                .then_with(|| a.sub_county.cmp(&b.sub_county))
                .then_with(|| a.ward.cmp(&b.ward))
                .then_with(|| a.facility.cmp(&b.facility))
                .then_with(|| a.commodity.cmp(&b.commodity))
        });
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// All observations matching the criteria, period ascending.
    /// An empty result is an empty vec, never an error.
    pub fn filter(&self, criteria: &FilterCriteria) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|obs| criteria.matches(obs))
            .collect()
    }

    /// The full series for one entity key, period ascending. At most one
    /// observation per period (enforced at load).
    pub fn series_for(&self, key: &EntityKey) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|obs| key.matches(obs))
            .collect()
    }

    /// Period-ascending values for one entity key, ready for lag extraction.
    pub fn values_for(&self, key: &EntityKey) -> Vec<f64> {
        self.series_for(key).iter().map(|obs| obs.value).collect()
    }

    /// Distinct counties, sorted.
    pub fn counties(&self) -> Vec<String> {
        self.distinct(&FilterCriteria::default(), |obs| &obs.county)
    }

    /// Distinct sub-counties within a county, sorted.
    pub fn sub_counties(&self, county: &str) -> Vec<String> {
        let criteria = FilterCriteria {
            county: Some(county.to_string()),
            ..Default::default()
        };
        self.distinct(&criteria, |obs| &obs.sub_county)
    }

    /// Distinct wards within a (county, sub-county), sorted.
    pub fn wards(&self, county: &str, sub_county: &str) -> Vec<String> {
        let criteria = FilterCriteria {
            county: Some(county.to_string()),
            sub_county: Some(sub_county.to_string()),
            ..Default::default()
        };
        self.distinct(&criteria, |obs| &obs.ward)
    }

    /// Distinct facilities within a (county, sub-county, ward), sorted.
    pub fn facilities(&self, county: &str, sub_county: &str, ward: &str) -> Vec<String> {
        let criteria = FilterCriteria {
            county: Some(county.to_string()),
            sub_county: Some(sub_county.to_string()),
            ward: Some(ward.to_string()),
            ..Default::default()
        };
        self.distinct(&criteria, |obs| &obs.facility)
    }

    /// Distinct commodities under the given criteria, sorted.
    pub fn commodities(&self, criteria: &FilterCriteria) -> Vec<String> {
        self.distinct(criteria, |obs| &obs.commodity)
    }

    fn distinct<'a, F>(&'a self, criteria: &FilterCriteria, field: F) -> Vec<String>
    where
        F: Fn(&'a Observation) -> &'a String,
    {
        let set: BTreeSet<&String> = self
            .observations
            .iter()
            .filter(|obs| criteria.matches(obs))
            .map(field)
            .collect();
        set.into_iter().cloned().collect()
    }

    /// Headline stats for the summary endpoint.
    pub fn summary(&self) -> StoreSummary {
        let counties: BTreeSet<&String> = self.observations.iter().map(|o| &o.county).collect();
        let facilities: BTreeSet<&String> = self.observations.iter().map(|o| &o.facility).collect();
        let commodities: BTreeSet<&String> =
            self.observations.iter().map(|o| &o.commodity).collect();
        StoreSummary {
            observation_count: self.observations.len(),
            county_count: counties.len(),
            facility_count: facilities.len(),
            commodity_count: commodities.len(),
            total_value: self.observations.iter().map(|o| o.value).sum(),
            first_period: self.observations.first().map(|o| o.period),
            last_period: self.observations.last().map(|o| o.period),
        }
    }

    /// Total value per period for the matching observations, period
    /// ascending. Backs the history time-series chart.
    pub fn period_totals(&self, criteria: &FilterCriteria) -> Vec<(NaiveDate, f64)> {
        let mut totals: Vec<(NaiveDate, f64)> = Vec::new();
        for obs in self.observations.iter().filter(|obs| criteria.matches(obs)) {
            match totals.last_mut() {
                Some((period, total)) if *period == obs.period => *total += obs.value,
                _ => totals.push((obs.period, obs.value)),
            }
        }
        totals
    }

    /// Total value per county, sorted by county name. Restricted to a
    /// commodity subset when one is supplied. Backs the choropleth.
    pub fn county_totals(&self, commodities: Option<&[String]>) -> Vec<(String, f64)> {
        let mut totals: Vec<(String, f64)> = Vec::new();
        for obs in &self.observations {
            if let Some(wanted) = commodities {
                if !wanted.iter().any(|c| c == &obs.commodity) {
                    continue;
                }
            }
            match totals.iter_mut().find(|(name, _)| name == &obs.county) {
                Some((_, total)) => *total += obs.value,
                None => totals.push((obs.county.clone(), obs.value)),
            }
        }
        totals.sort_by(|a, b| a.0.cmp(&b.0));
        totals
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn obs(
        county: &str,
        sub_county: &str,
        ward: &str,
        facility: &str,
        commodity: &str,
        period: NaiveDate,
        value: f64,
    ) -> Observation {
        Observation {
            county: county.to_string(),
            sub_county: sub_county.to_string(),
            ward: ward.to_string(),
            facility: facility.to_string(),
            commodity: commodity.to_string(),
            period,
            value,
        }
    }

    pub fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }
}
