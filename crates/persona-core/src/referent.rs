//! Pre-resolved referents
//!
//! Geo, organization, date and similar entities recognised upstream. The
//! person pipeline consumes them as opaque tokens and only asks a few
//! questions (is this a state? which organization type?).

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Kind of an external referent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentKind {
    Geo,
    Organization,
    Date,
    DateRange,
    Address,
    Transport,
    Phone,
    Uri,
    NamedEntity,
}

impl ReferentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geo => "GEO",
            Self::Organization => "ORGANIZATION",
            Self::Date => "DATE",
            Self::DateRange => "DATERANGE",
            Self::Address => "ADDRESS",
            Self::Transport => "TRANSPORT",
            Self::Phone => "PHONE",
            Self::Uri => "URI",
            Self::NamedEntity => "NAMEDENTITY",
        }
    }
}

impl std::fmt::Display for ReferentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved non-person entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReferent {
    pub kind: ReferentKind,
    /// Canonical text (РОССИЯ, МИНИСТЕРСТВО ФИНАНСОВ)
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Upper bound of a date range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    /// Year-only dates (1950 г.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Free-form attributes; `type` holds the geo/organization type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl ExternalReferent {
    pub fn new(kind: ReferentKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            date: None,
            date_to: None,
            year: None,
            attrs: BTreeMap::new(),
        }
    }

    /// Geo entity with a type (state, city, region)
    pub fn geo(value: impl Into<String>, typ: &str) -> Self {
        Self::new(ReferentKind::Geo, value).with_attr("type", typ)
    }

    /// Organization with a type (министерство, компания)
    pub fn organization(value: impl Into<String>, typ: &str) -> Self {
        Self::new(ReferentKind::Organization, value).with_attr("type", typ)
    }

    pub fn full_date(date: NaiveDate) -> Self {
        let mut r = Self::new(ReferentKind::Date, date.format("%d.%m.%Y").to_string());
        r.date = Some(date);
        r.year = Some(date.year());
        r
    }

    pub fn year_date(year: i32) -> Self {
        let mut r = Self::new(ReferentKind::Date, format!("{year}"));
        r.year = Some(year);
        r
    }

    pub fn date_range(from: Option<i32>, to: Option<i32>) -> Self {
        let value = format!(
            "{}-{}",
            from.map(|y| y.to_string()).unwrap_or_default(),
            to.map(|y| y.to_string()).unwrap_or_default()
        );
        let mut r = Self::new(ReferentKind::DateRange, value);
        r.year = from;
        if let Some(to) = to {
            r.attrs.insert("year_to".to_string(), to.to_string());
        }
        r
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    fn geo_type(&self) -> Option<String> {
        if self.kind != ReferentKind::Geo {
            return None;
        }
        self.attr("type").map(str::to_lowercase)
    }

    /// Country or sovereign state
    pub fn is_state(&self) -> bool {
        matches!(
            self.geo_type().as_deref(),
            Some("state" | "country" | "государство" | "страна")
        )
    }

    pub fn is_city(&self) -> bool {
        matches!(
            self.geo_type().as_deref(),
            Some("city" | "город" | "село" | "поселок" | "деревня")
        )
    }

    pub fn is_region(&self) -> bool {
        matches!(
            self.geo_type().as_deref(),
            Some("region" | "область" | "край" | "район" | "республика" | "округ" | "штат")
        )
    }

    /// Organization type in lower case
    pub fn org_type(&self) -> Option<String> {
        if self.kind != ReferentKind::Organization {
            return None;
        }
        self.attr("type").map(str::to_lowercase)
    }

    /// Upper year bound of a date range
    pub fn year_to(&self) -> Option<i32> {
        self.date_to
            .map(|d| d.year())
            .or_else(|| self.attr("year_to").and_then(|y| y.parse().ok()))
    }
}

impl std::fmt::Display for ExternalReferent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.attr("type") {
            Some(typ) if matches!(self.kind, ReferentKind::Geo | ReferentKind::Organization) => {
                write!(f, "{} {}", typ, self.value)
            }
            _ => write!(f, "{}", self.value),
        }
    }
}

/// Referent covering the byte range `begin..end` of a text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferentSpan {
    pub begin: usize,
    pub end: usize,
    pub referent: ExternalReferent,
}

impl ReferentSpan {
    pub fn new(begin: usize, end: usize, referent: ExternalReferent) -> Self {
        Self {
            begin,
            end,
            referent,
        }
    }

    pub fn overlaps(&self, other: &ReferentSpan) -> bool {
        self.begin < other.end && other.begin < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_types() {
        let state = ExternalReferent::geo("РОССИЯ", "государство");
        assert!(state.is_state());
        assert!(!state.is_city());

        let city = ExternalReferent::geo("МОСКВА", "город");
        assert!(city.is_city());
        assert_eq!(city.to_string(), "город МОСКВА");
    }

    #[test]
    fn test_org_type_only_for_organizations() {
        let org = ExternalReferent::organization("ГАЗПРОМ", "ПАО");
        assert_eq!(org.org_type().as_deref(), Some("пао"));
        assert!(ExternalReferent::geo("КИЕВ", "city").org_type().is_none());
    }

    #[test]
    fn test_date_range_years() {
        let range = ExternalReferent::date_range(Some(1950), Some(2010));
        assert_eq!(range.year, Some(1950));
        assert_eq!(range.year_to(), Some(2010));
        assert_eq!(range.value, "1950-2010");
    }

    #[test]
    fn test_span_json() {
        let json = r#"{"begin":0,"end":12,"referent":{"kind":"GEO","value":"РОССИЯ","attrs":{"type":"state"}}}"#;
        let span: ReferentSpan = serde_json::from_str(json).unwrap();
        assert!(span.referent.is_state());
        assert!(span.overlaps(&ReferentSpan::new(10, 20, span.referent.clone())));
    }
}
