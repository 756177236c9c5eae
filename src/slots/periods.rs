//! Period extraction
//!
//! Periods normalize to canonical strings: `"YYYY"`, `"YYYY-Q#"` and
//! `"YYYY-M##"`. Relative phrases ("last quarter", "ytd") resolve against an
//! explicit `today` so callers and tests control the clock.
//!
//! Mentions are scanned left to right in a single pass. A month or quarter
//! named without a year ("January and February 2025") takes the nearest
//! following explicit year, else the nearest preceding one, else it is
//! dropped.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

const YEAR: &str = r"(?:19|20)\d{2}";
const MONTH_ANY: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
const MONTH_FULL: &str =
    r"january|february|march|april|may|june|july|august|september|october|november|december";
// "may" on its own is too often a verb to count as a month
const MONTH_BARE: &str =
    r"january|february|march|april|june|july|august|september|october|november|december";

static PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = [
        r"(?P<rel>(?:this|current|last|previous|prior|next)\s+(?:year|quarter|month))".to_string(),
        r"(?P<todate>ytd|qtd|mtd|(?:year|quarter|month)[\s-]+to[\s-]+date)".to_string(),
        format!(r"(?P<qq>q[1-4])(?:\s+of)?[\s-]*(?P<qq_y>{YEAR})"),
        format!(r"(?P<yq_y>{YEAR})[\s-]*(?P<yq>q[1-4])"),
        format!(r"(?P<cm_y>{YEAR})-m(?P<cm>0[1-9]|1[0-2])"),
        format!(r"(?P<my>{MONTH_ANY})\.?,?\s+(?:of\s+)?(?P<my_y>{YEAR})"),
        format!(r"(?P<ym_y>{YEAR})\s+(?P<ym>{MONTH_FULL})"),
        format!(r"(?P<year>{YEAR})"),
        format!(r"(?P<bare_month>{MONTH_BARE})"),
        r"(?P<bare_quarter>q[1-4])".to_string(),
    ]
    .join("|");
    Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).unwrap()
});

static CANONICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((?:19|20)\d{2})(?:-Q([1-4])|-M(0[1-9]|1[0-2]))?$").unwrap()
});

/// Nouns that make a following number an identifier, not a year
const REFERENCE_NOUNS: &[&str] = &["building", "tenant", "suite", "unit", "no", "number"];

// ============================================================================
// Types
// ============================================================================

/// Granularity of a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodLevel {
    Year,
    Quarter,
    Month,
}

impl PeriodLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodLevel::Year => "year",
            PeriodLevel::Quarter => "quarter",
            PeriodLevel::Month => "month",
        }
    }
}

impl fmt::Display for PeriodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete calendar period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Year(i32),
    Quarter { year: i32, quarter: u8 },
    Month { year: i32, month: u8 },
}

impl Period {
    pub fn level(&self) -> PeriodLevel {
        match self {
            Period::Year(_) => PeriodLevel::Year,
            Period::Quarter { .. } => PeriodLevel::Quarter,
            Period::Month { .. } => PeriodLevel::Month,
        }
    }

    pub fn year(&self) -> i32 {
        match *self {
            Period::Year(year) | Period::Quarter { year, .. } | Period::Month { year, .. } => year,
        }
    }

    /// The period of `level` containing `today`
    pub fn containing(level: PeriodLevel, today: NaiveDate) -> Self {
        let year = today.year();
        match level {
            PeriodLevel::Year => Period::Year(year),
            PeriodLevel::Quarter => Period::Quarter {
                year,
                quarter: (today.month0() / 3 + 1) as u8,
            },
            PeriodLevel::Month => Period::Month {
                year,
                month: today.month() as u8,
            },
        }
    }

    /// Move by `delta` periods of the same level
    pub fn shift(self, delta: i32) -> Self {
        match self {
            Period::Year(year) => Period::Year(year + delta),
            Period::Quarter { year, quarter } => {
                let index = year * 4 + i32::from(quarter) - 1 + delta;
                Period::Quarter {
                    year: index.div_euclid(4),
                    quarter: (index.rem_euclid(4) + 1) as u8,
                }
            }
            Period::Month { year, month } => {
                let index = year * 12 + i32::from(month) - 1 + delta;
                Period::Month {
                    year: index.div_euclid(12),
                    month: (index.rem_euclid(12) + 1) as u8,
                }
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(year) => write!(f, "{}", year),
            Period::Quarter { year, quarter } => write!(f, "{}-Q{}", year, quarter),
            Period::Month { year, month } => write!(f, "{}-M{:02}", year, month),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a canonical period: {0:?}")]
pub struct ParsePeriodError(pub String);

impl FromStr for Period {
    type Err = ParsePeriodError;

    /// Parse a canonical period string only
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CANONICAL_RE
            .captures(s.trim())
            .ok_or_else(|| ParsePeriodError(s.to_string()))?;
        let year = capture_number(&caps, 1).ok_or_else(|| ParsePeriodError(s.to_string()))?;
        Ok(match (capture_number(&caps, 2), capture_number(&caps, 3)) {
            (Some(quarter), _) => Period::Quarter {
                year,
                quarter: quarter as u8,
            },
            (_, Some(month)) => Period::Month {
                year,
                month: month as u8,
            },
            _ => Period::Year(year),
        })
    }
}

/// Structured view of the first period in a text; all fields `None` when
/// nothing was found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodHint {
    /// Canonical string
    pub label: Option<String>,
    pub level: Option<PeriodLevel>,
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub month: Option<u8>,
}

impl PeriodHint {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
    }

    /// Hint for a canonical string; empty when it does not parse
    pub fn from_canonical(value: &str) -> Self {
        value.parse::<Period>().map(Self::from).unwrap_or_default()
    }
}

impl From<Period> for PeriodHint {
    fn from(period: Period) -> Self {
        let (quarter, month) = match period {
            Period::Year(_) => (None, None),
            Period::Quarter { quarter, .. } => (Some(quarter), None),
            Period::Month { month, .. } => (None, Some(month)),
        };
        Self {
            label: Some(period.to_string()),
            level: Some(period.level()),
            year: Some(period.year()),
            quarter,
            month,
        }
    }
}

// ============================================================================
// Scanning
// ============================================================================

enum Mention {
    Concrete(Period),
    BareMonth(u8),
    BareQuarter(u8),
}

impl Mention {
    fn explicit_year(&self) -> Option<i32> {
        match self {
            Mention::Concrete(period) => Some(period.year()),
            _ => None,
        }
    }
}

fn capture_number(caps: &Captures<'_>, group: usize) -> Option<i32> {
    caps.get(group)?.as_str().parse().ok()
}

fn named_number(caps: &Captures<'_>, name: &str) -> Option<i32> {
    caps.name(name)?.as_str().parse().ok()
}

fn quarter_number(caps: &Captures<'_>, name: &str) -> Option<u8> {
    caps.name(name)?.as_str()[1..].parse().ok()
}

fn month_number(name: &str) -> Option<u8> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let index = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ]
    .iter()
    .position(|m| *m == prefix)?;
    Some(index as u8 + 1)
}

fn preceded_by_reference_noun(text: &str, start: usize) -> bool {
    text[..start]
        .split_whitespace()
        .next_back()
        .is_some_and(|word| {
            let word = word.trim_end_matches(['#', '.', ':']).to_lowercase();
            REFERENCE_NOUNS.contains(&word.as_str())
        })
}

fn relative_period(phrase: &str, today: NaiveDate) -> Option<Period> {
    let lowered = phrase.to_lowercase();
    let mut words = lowered.split_whitespace();
    let offset = match words.next()? {
        "this" | "current" => 0,
        "last" | "previous" | "prior" => -1,
        "next" => 1,
        _ => return None,
    };
    let level = parse_granularity(words.next()?)?;
    Some(Period::containing(level, today).shift(offset))
}

fn to_date_period(phrase: &str, today: NaiveDate) -> Option<Period> {
    let level = match phrase.chars().next()?.to_ascii_lowercase() {
        'y' => PeriodLevel::Year,
        'q' => PeriodLevel::Quarter,
        'm' => PeriodLevel::Month,
        _ => return None,
    };
    Some(Period::containing(level, today))
}

fn scan(text: &str, today: NaiveDate) -> Vec<Mention> {
    let mut mentions = Vec::new();
    for caps in PERIOD_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let starts_with_digit = whole.as_str().starts_with(|c: char| c.is_ascii_digit());
        if starts_with_digit && preceded_by_reference_noun(text, whole.start()) {
            continue;
        }

        let mention = if let Some(m) = caps.name("rel") {
            relative_period(m.as_str(), today).map(Mention::Concrete)
        } else if let Some(m) = caps.name("todate") {
            to_date_period(m.as_str(), today).map(Mention::Concrete)
        } else if caps.name("qq").is_some() {
            named_number(&caps, "qq_y")
                .zip(quarter_number(&caps, "qq"))
                .map(|(year, quarter)| Mention::Concrete(Period::Quarter { year, quarter }))
        } else if caps.name("yq").is_some() {
            named_number(&caps, "yq_y")
                .zip(quarter_number(&caps, "yq"))
                .map(|(year, quarter)| Mention::Concrete(Period::Quarter { year, quarter }))
        } else if let Some(m) = caps.name("cm") {
            named_number(&caps, "cm_y").and_then(|year| {
                let month = m.as_str().parse().ok()?;
                Some(Mention::Concrete(Period::Month { year, month }))
            })
        } else if let Some(m) = caps.name("my") {
            named_number(&caps, "my_y")
                .zip(month_number(m.as_str()))
                .map(|(year, month)| Mention::Concrete(Period::Month { year, month }))
        } else if let Some(m) = caps.name("ym") {
            named_number(&caps, "ym_y")
                .zip(month_number(m.as_str()))
                .map(|(year, month)| Mention::Concrete(Period::Month { year, month }))
        } else if caps.name("year").is_some() {
            named_number(&caps, "year").map(|year| Mention::Concrete(Period::Year(year)))
        } else if let Some(m) = caps.name("bare_month") {
            month_number(m.as_str()).map(Mention::BareMonth)
        } else {
            quarter_number(&caps, "bare_quarter").map(Mention::BareQuarter)
        };
        mentions.extend(mention);
    }
    mentions
}

fn resolve_mentions(mentions: &[Mention]) -> Vec<Period> {
    let inherited_year = |i: usize| {
        mentions[i + 1..]
            .iter()
            .find_map(Mention::explicit_year)
            .or_else(|| mentions[..i].iter().rev().find_map(Mention::explicit_year))
    };

    let mut periods: Vec<Period> = Vec::new();
    for (i, mention) in mentions.iter().enumerate() {
        let period = match *mention {
            Mention::Concrete(period) => Some(period),
            Mention::BareMonth(month) => inherited_year(i).map(|year| Period::Month { year, month }),
            Mention::BareQuarter(quarter) => {
                inherited_year(i).map(|year| Period::Quarter { year, quarter })
            }
        };
        if let Some(period) = period {
            if !periods.contains(&period) {
                periods.push(period);
            }
        }
    }
    periods
}

// ============================================================================
// Public extractors
// ============================================================================

/// Today's date on the local clock
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Every distinct period in `text`, left to right
pub fn extract_periods_at(text: &str, today: NaiveDate) -> Vec<Period> {
    resolve_mentions(&scan(text, today))
}

pub fn extract_period_hint(text: &str) -> PeriodHint {
    extract_period_hint_at(text, local_today())
}

/// First period in `text` as a structured hint. Never fails.
pub fn extract_period_hint_at(text: &str, today: NaiveDate) -> PeriodHint {
    extract_periods_at(text, today)
        .into_iter()
        .next()
        .map(PeriodHint::from)
        .unwrap_or_default()
}

pub fn extract_comparison_periods(text: &str, max: usize) -> Vec<String> {
    extract_comparison_periods_at(text, max, local_today())
}

/// Up to `max` canonical periods in mention order
pub fn extract_comparison_periods_at(text: &str, max: usize, today: NaiveDate) -> Vec<String> {
    extract_periods_at(text, today)
        .into_iter()
        .take(max)
        .map(|p| p.to_string())
        .collect()
}

/// Canonical form of a loosely written period ("Mar 2025" → "2025-M03")
pub fn normalize_period_string(value: &str) -> Option<String> {
    if let Ok(period) = value.parse::<Period>() {
        return Some(period.to_string());
    }
    extract_periods_at(value, local_today())
        .into_iter()
        .next()
        .map(|p| p.to_string())
}

/// A bare granularity word: "year", "quarterly", "monthly", ...
///
/// Returns `None` when no such word appears or when the text names more
/// than one granularity.
pub fn parse_granularity(text: &str) -> Option<PeriodLevel> {
    let mut found: Option<PeriodLevel> = None;
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let level = match word.to_lowercase().as_str() {
            "year" | "years" | "yearly" | "annual" | "annually" => PeriodLevel::Year,
            "quarter" | "quarters" | "quarterly" => PeriodLevel::Quarter,
            "month" | "months" | "monthly" => PeriodLevel::Month,
            _ => continue,
        };
        match found {
            Some(existing) if existing != level => return None,
            _ => found = Some(level),
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn labels(text: &str, today: NaiveDate) -> Vec<String> {
        extract_periods_at(text, today)
            .into_iter()
            .map(|p| p.to_string())
            .collect()
    }

    #[test]
    fn test_absolute_forms() {
        let today = day(2025, 6, 1);
        assert_eq!(labels("P&L for March 2025", today), vec!["2025-M03"]);
        assert_eq!(labels("2024 december numbers", today), vec!["2024-M12"]);
        assert_eq!(labels("Sept. 2023", today), vec!["2023-M09"]);
        assert_eq!(labels("Q1 2025 and 2024-Q3", today), vec!["2025-Q1", "2024-Q3"]);
        assert_eq!(labels("q2 of 2025", today), vec!["2025-Q2"]);
        assert_eq!(labels("for 2025-M07", today), vec!["2025-M07"]);
        assert_eq!(labels("the whole of 2025", today), vec!["2025"]);
    }

    #[test]
    fn test_relative_forms() {
        let today = day(2025, 5, 15);
        assert_eq!(labels("this year", today), vec!["2025"]);
        assert_eq!(labels("last year", today), vec!["2024"]);
        assert_eq!(labels("last quarter", today), vec!["2025-Q1"]);
        assert_eq!(labels("next month", today), vec!["2025-M06"]);
        assert_eq!(labels("YTD", today), vec!["2025"]);
        assert_eq!(labels("qtd", today), vec!["2025-Q2"]);
        assert_eq!(labels("month to date", today), vec!["2025-M05"]);
    }

    #[test]
    fn test_relative_forms_wrap_year() {
        let today = day(2025, 1, 10);
        assert_eq!(labels("last month", today), vec!["2024-M12"]);
        assert_eq!(labels("previous quarter", today), vec!["2024-Q4"]);
        assert_eq!(labels("next quarter", day(2025, 11, 2)), vec!["2026-Q1"]);
    }

    #[test]
    fn test_bare_months_inherit_year() {
        let today = day(2025, 6, 1);
        assert_eq!(
            labels("Compare January and February 2025", today),
            vec!["2025-M01", "2025-M02"]
        );
        assert_eq!(labels("Q1 2024 versus March", today), vec!["2024-Q1", "2024-M03"]);
        assert_eq!(labels("Q1 versus Q2 2023", today), vec!["2023-Q1", "2023-Q2"]);
        assert!(labels("January and February", today).is_empty());
    }

    #[test]
    fn test_identifiers_are_not_years() {
        let today = day(2025, 6, 1);
        assert_eq!(labels("Building 2020 in 2024", today), vec!["2024"]);
        assert!(labels("Tenant 2019", today).is_empty());
        assert!(labels("may I see the rent roll", today).is_empty());
    }

    #[test]
    fn test_period_hint() {
        let hint = extract_period_hint_at("Show me the P&L for Building 180 for March 2025.", day(2025, 6, 1));
        assert_eq!(hint.label.as_deref(), Some("2025-M03"));
        assert_eq!(hint.level, Some(PeriodLevel::Month));
        assert_eq!(hint.year, Some(2025));
        assert_eq!(hint.month, Some(3));
        assert_eq!(hint.quarter, None);

        let empty = extract_period_hint_at("Give me the P&L for Building 180.", day(2025, 6, 1));
        assert!(empty.is_empty());
        assert_eq!(empty, PeriodHint::default());
    }

    #[test]
    fn test_comparison_periods_limit() {
        let periods = extract_comparison_periods_at("2023 vs 2024 vs 2025", 2, day(2025, 6, 1));
        assert_eq!(periods, vec!["2023", "2024"]);
    }

    #[test]
    fn test_canonical_parse() {
        assert_eq!("2025-q2".parse::<Period>().unwrap().to_string(), "2025-Q2");
        assert_eq!(
            "2025-M11".parse::<Period>().unwrap(),
            Period::Month { year: 2025, month: 11 }
        );
        assert!("2025-M13".parse::<Period>().is_err());
        assert!("March 2025".parse::<Period>().is_err());
        assert_eq!(normalize_period_string("Mar 2025").as_deref(), Some("2025-M03"));
        assert_eq!(normalize_period_string("soon"), None);
        assert_eq!(PeriodHint::from_canonical("2024-Q4").quarter, Some(4));
    }

    #[test]
    fn test_parse_granularity() {
        assert_eq!(parse_granularity("year"), Some(PeriodLevel::Year));
        assert_eq!(parse_granularity("Quarterly please"), Some(PeriodLevel::Quarter));
        assert_eq!(parse_granularity("monthly."), Some(PeriodLevel::Month));
        assert_eq!(parse_granularity("month or year"), None);
        assert_eq!(parse_granularity("whatever"), None);
    }
}
