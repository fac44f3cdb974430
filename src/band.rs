use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::aggregate::CountryAggregate;

/// Confirmed-case magnitude bucket, each drawn in its own fill colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    Ones,
    Tens,
    Hundreds,
    Thousands,
    TensOfThousands,
    HundredThousandsPlus,
}

/// Ordered `(low, high, band)` ranges, both bounds inclusive, `None` meaning
/// unbounded. Contiguous from 1 upwards.
const BAND_RANGES: [(u64, Option<u64>, Band); 6] = [
    (1, Some(9), Band::Ones),
    (10, Some(99), Band::Tens),
    (100, Some(999), Band::Hundreds),
    (1_000, Some(9_999), Band::Thousands),
    (10_000, Some(99_999), Band::TensOfThousands),
    (100_000, None, Band::HundredThousandsPlus),
];

impl Band {
    pub const ALL: [Band; 6] = [
        Band::Ones,
        Band::Tens,
        Band::Hundreds,
        Band::Thousands,
        Band::TensOfThousands,
        Band::HundredThousandsPlus,
    ];

    pub fn for_count(confirmed: u64) -> Option<Band> {
        BAND_RANGES
            .iter()
            .find(|(low, high, _)| confirmed >= *low && high.map_or(true, |high| confirmed <= high))
            .map(|(_, _, band)| *band)
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Ones => "1-9",
            Band::Tens => "10-99",
            Band::Hundreds => "100-999",
            Band::Thousands => "1000-9999",
            Band::TensOfThousands => "10000-99999",
            Band::HundredThousandsPlus => "100000+",
        }
    }

    /// Hex RGB fill colour without the leading `#`.
    pub fn colour(self) -> &'static str {
        match self {
            Band::Ones => "ffc0c0",
            Band::Tens => "ffa0a0",
            Band::Hundreds => "ee7070",
            Band::Thousands => "c80200",
            Band::TensOfThousands => "900000",
            Band::HundredThousandsPlus => "510000",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Band membership as lower-case ISO codes. Every band is present, possibly
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    members: BTreeMap<Band, BTreeSet<String>>,
}

impl Default for ClassMap {
    fn default() -> Self {
        Self {
            members: Band::ALL.iter().map(|band| (*band, BTreeSet::new())).collect(),
        }
    }
}

impl ClassMap {
    pub fn insert(&mut self, band: Band, code: &str) {
        self.members
            .entry(band)
            .or_default()
            .insert(code.to_lowercase());
    }

    pub fn members(&self, band: Band) -> impl Iterator<Item = &str> {
        self.members.get(&band).into_iter().flatten().map(String::as_str)
    }

    pub fn count(&self, band: Band) -> usize {
        self.members.get(&band).map_or(0, BTreeSet::len)
    }

    pub fn band_of(&self, code: &str) -> Option<Band> {
        let code = code.to_lowercase();
        Band::ALL
            .into_iter()
            .find(|band| self.members.get(band).is_some_and(|set| set.contains(&code)))
    }
}

pub fn classify(aggregate: &CountryAggregate) -> ClassMap {
    let mut classes = ClassMap::default();
    for (code, counts) in &aggregate.countries {
        if let Some(band) = Band::for_count(counts.confirmed) {
            classes.insert(band, code);
        }
    }
    classes
}
