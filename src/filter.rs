use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, TimeZone};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Geographical granularity of the requested data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaType {
    /// Overview data for the United Kingdom.
    Overview,
    /// Nation data (England, Northern Ireland, Scotland, and Wales).
    Nation,
    /// Region data.
    Region,
    /// NHS Region data.
    NhsRegion,
    /// Upper-tier local authority data.
    Utla,
    /// Lower-tier local authority data.
    Ltla,
}

impl AreaType {
    pub const ALL: [AreaType; 6] = [
        AreaType::Overview,
        AreaType::Nation,
        AreaType::Region,
        AreaType::NhsRegion,
        AreaType::Utla,
        AreaType::Ltla,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AreaType::Overview => "overview",
            AreaType::Nation => "nation",
            AreaType::Region => "region",
            AreaType::NhsRegion => "nhsRegion",
            AreaType::Utla => "utla",
            AreaType::Ltla => "ltla",
        }
    }
}

impl fmt::Display for AreaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match AreaType::ALL.into_iter().find(|t| t.as_str() == s) {
            Some(t) => Ok(t),
            None => bail!("unknown area type [{}]", s),
        }
    }
}

/// A single named constraint narrowing the data returned by `GET /data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    AreaName(String),
    AreaCode(String),
    AreaType(AreaType),
    /// Rendered as `YYYY-MM-DD`.
    Date(NaiveDate),
    /// Any other metric the API accepts as a filter.
    Metric { name: String, value: String },
}

impl Filter {
    /// Retrieves data for the area name provided. The name is not validated.
    pub fn area_name(name: impl Into<String>) -> Self {
        Filter::AreaName(name.into())
    }

    /// Retrieves data for the ONS area code provided, e.g. `E09000023`.
    pub fn area_code(code: impl Into<String>) -> Self {
        Filter::AreaCode(code.into())
    }

    pub fn date(date: NaiveDate) -> Self {
        Filter::Date(date)
    }

    /// Retrieves data for the calendar date of `at` in its own time zone.
    ///
    /// No normalisation is performed: pass a timestamp in the zone whose
    /// local date you mean.
    pub fn date_of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Filter::Date(at.date_naive())
    }

    pub fn metric(name: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Metric {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn metric_name(&self) -> &str {
        match self {
            Filter::AreaName(_) => "areaName",
            Filter::AreaCode(_) => "areaCode",
            Filter::AreaType(_) => "areaType",
            Filter::Date(_) => "date",
            Filter::Metric { name, .. } => name,
        }
    }

    pub fn value(&self) -> Cow<'_, str> {
        match self {
            Filter::AreaName(v) | Filter::AreaCode(v) => Cow::Borrowed(v),
            Filter::AreaType(t) => Cow::Borrowed(t.as_str()),
            Filter::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
            Filter::Metric { value, .. } => Cow::Borrowed(value),
        }
    }

    /// `<metricName>=<value>`
    pub fn encode(&self) -> String {
        format!("{}={}", self.metric_name(), self.value())
    }
}

impl From<AreaType> for Filter {
    fn from(t: AreaType) -> Self {
        Filter::AreaType(t)
    }
}

/// An ordered list of filters.
///
/// The API does not accept the usual repeated-key or bracketed array query
/// encodings; filters travel as one `filters` parameter of `;`-joined pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<Filter>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: impl Into<Filter>) {
        self.0.push(filter.into());
    }

    /// Formats the value of the `filters` query parameter:
    /// `name1=value1;name2=value2`, in list order.
    pub fn as_parameter(&self) -> String {
        self.0
            .iter()
            .map(Filter::encode)
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_parameter())
    }
}

impl From<Vec<Filter>> for Filters {
    fn from(v: Vec<Filter>) -> Self {
        Filters(v)
    }
}

impl FromIterator<Filter> for Filters {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Filters(iter.into_iter().collect())
    }
}
