use std::collections::BTreeMap;
use std::ops::AddAssign;
use tracing::{debug, info};

use crate::iso::IsoTable;
use crate::report::CountryRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseCounts {
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
}

// Sums saturate at u64::MAX.
impl AddAssign<&CaseCounts> for CaseCounts {
    fn add_assign(&mut self, other: &CaseCounts) {
        self.confirmed = self.confirmed.saturating_add(other.confirmed);
        self.deaths = self.deaths.saturating_add(other.deaths);
        self.recovered = self.recovered.saturating_add(other.recovered);
    }
}

impl AddAssign<&CountryRecord> for CaseCounts {
    fn add_assign(&mut self, record: &CountryRecord) {
        *self += &CaseCounts {
            confirmed: record.confirmed,
            deaths: record.deaths,
            recovered: record.recovered,
        };
    }
}

/// Per-country totals for one report, keyed by upper-case ISO code.
#[derive(Debug, Default)]
pub struct CountryAggregate {
    pub countries: BTreeMap<String, CaseCounts>,
    pub unmapped_rows: u32,
    pub codeless_rows: u32,
    /// Mapped rows carrying FIPS, Admin2 or Province_State qualifiers.
    pub sub_national_rows: u32,
}

impl CountryAggregate {
    pub fn get(&self, code: &str) -> Option<&CaseCounts> {
        self.countries.get(code)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn total(&self) -> CaseCounts {
        self.countries
            .values()
            .fold(CaseCounts::default(), |mut acc, counts| {
                acc += counts;
                acc
            })
    }
}

pub fn aggregate<'a, I>(records: I, table: &IsoTable) -> CountryAggregate
where
    I: IntoIterator<Item = &'a CountryRecord>,
{
    let mut result = CountryAggregate::default();

    for record in records {
        match table.resolve(&record.country_region) {
            None => {
                debug!(action = "drop", component = "aggregation", country = %record.country_region, province = ?record.province_state, admin2 = ?record.admin2, fips = ?record.fips, "Unmapped country name");
                result.unmapped_rows += 1;
            }
            Some("") => {
                debug!(action = "drop", component = "aggregation", country = %record.country_region, province = ?record.province_state, "Entity has no ISO code");
                result.codeless_rows += 1;
            }
            Some(code) => {
                if record.is_sub_national() {
                    debug!(action = "fold", component = "aggregation", code = code, province = ?record.province_state, admin2 = ?record.admin2, fips = ?record.fips, "Folding sub-national row into country");
                    result.sub_national_rows += 1;
                }
                *result.countries.entry(code.to_string()).or_default() += record;
            }
        }
    }

    info!(
        action = "complete",
        component = "aggregation",
        country_count = result.countries.len(),
        unmapped_rows = result.unmapped_rows,
        codeless_rows = result.codeless_rows,
        sub_national_rows = result.sub_national_rows,
        "Aggregated report rows"
    );
    result
}
