//! Shared vocabulary: dimensions, metrics, filter operators and the other
//! enumerations both backends validate against.
//!
//! Every enum parses from the API's string tokens and rejects anything else
//! with `InvalidArgument`, so a bad token fails at builder-call time rather
//! than after a network round trip.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchlensError};

/// A categorical axis search-performance rows can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Country,
    Device,
    Page,
    Query,
    SearchAppearance,
    Date,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Country,
        Dimension::Device,
        Dimension::Page,
        Dimension::Query,
        Dimension::SearchAppearance,
        Dimension::Date,
    ];

    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "country" => Ok(Dimension::Country),
            "device" => Ok(Dimension::Device),
            "page" => Ok(Dimension::Page),
            "query" => Ok(Dimension::Query),
            "searchAppearance" => Ok(Dimension::SearchAppearance),
            "date" => Ok(Dimension::Date),
            other => Err(SearchlensError::InvalidArgument(format!(
                "unknown dimension '{other}'"
            ))),
        }
    }

    /// Token used by the analytics API and as the report column name.
    pub fn api_name(&self) -> &'static str {
        match self {
            Dimension::Country => "country",
            Dimension::Device => "device",
            Dimension::Page => "page",
            Dimension::Query => "query",
            Dimension::SearchAppearance => "searchAppearance",
            Dimension::Date => "date",
        }
    }

    /// Column name in the warehouse export tables. The export renames a
    /// couple of axes: `page` is stored as `url` and `date` as `data_date`.
    pub fn warehouse_column(&self) -> &'static str {
        match self {
            Dimension::Country => "country",
            Dimension::Device => "device",
            Dimension::Page => "url",
            Dimension::Query => "query",
            Dimension::SearchAppearance => "search_appearance",
            Dimension::Date => "data_date",
        }
    }

    /// Whether the dimension exists on the site-level export table. Only
    /// `page` forces the (larger) URL-level table.
    pub fn site_level(&self) -> bool {
        !matches!(self, Dimension::Page)
    }

    /// The date axis is owned by the range predicate in generated SQL, so it
    /// is not a valid warehouse filter dimension.
    pub fn warehouse_filterable(&self) -> bool {
        !matches!(self, Dimension::Date)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// A measured quantity attached to each report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Clicks,
    Impressions,
    Ctr,
    Position,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Clicks,
        Metric::Impressions,
        Metric::Ctr,
        Metric::Position,
    ];

    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "clicks" => Ok(Metric::Clicks),
            "impressions" => Ok(Metric::Impressions),
            "ctr" => Ok(Metric::Ctr),
            "position" => Ok(Metric::Position),
            other => Err(SearchlensError::InvalidArgument(format!(
                "unknown metric '{other}'"
            ))),
        }
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            Metric::Clicks => "clicks",
            Metric::Impressions => "impressions",
            Metric::Ctr => "ctr",
            Metric::Position => "position",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Predicate operator for a single filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    IncludingRegex,
    ExcludingRegex,
}

impl Operator {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "equals" => Ok(Operator::Equals),
            "notEquals" => Ok(Operator::NotEquals),
            "contains" => Ok(Operator::Contains),
            "notContains" => Ok(Operator::NotContains),
            "includingRegex" => Ok(Operator::IncludingRegex),
            "excludingRegex" => Ok(Operator::ExcludingRegex),
            other => Err(SearchlensError::InvalidArgument(format!(
                "unknown operator '{other}'"
            ))),
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::IncludingRegex => "includingRegex",
            Operator::ExcludingRegex => "excludingRegex",
        }
    }
}

/// Search surface the analytics API should report on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    #[default]
    Web,
    Image,
    Video,
    News,
    Discover,
    GoogleNews,
}

impl SearchType {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "web" => Ok(SearchType::Web),
            "image" => Ok(SearchType::Image),
            "video" => Ok(SearchType::Video),
            "news" => Ok(SearchType::News),
            "discover" => Ok(SearchType::Discover),
            "googleNews" => Ok(SearchType::GoogleNews),
            other => Err(SearchlensError::InvalidArgument(format!(
                "unknown search type '{other}'"
            ))),
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            SearchType::Web => "web",
            SearchType::Image => "image",
            SearchType::Video => "video",
            SearchType::News => "news",
            SearchType::Discover => "discover",
            SearchType::GoogleNews => "googleNews",
        }
    }
}

/// Freshness of the data the analytics API serves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataState {
    All,
    #[default]
    Final,
}

impl DataState {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "all" => Ok(DataState::All),
            "final" => Ok(DataState::Final),
            other => Err(SearchlensError::InvalidArgument(format!(
                "unknown data state '{other}'"
            ))),
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            DataState::All => "all",
            DataState::Final => "final",
        }
    }
}

/// Resampling period for `Report::group_data_by_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Period {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "D" => Ok(Period::Day),
            "W" => Ok(Period::Week),
            "M" => Ok(Period::Month),
            "Q" => Ok(Period::Quarter),
            "Y" => Ok(Period::Year),
            other => Err(SearchlensError::InvalidArgument(format!(
                "unknown period '{other}', expected one of D, W, M, Q, Y"
            ))),
        }
    }
}
