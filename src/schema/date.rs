use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Largest absolute year accepted; anything beyond is left unparsed.
pub const MAX_YEAR: u32 = 9999;

/// How a GEDCOM date value qualifies its calendar point(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateQualifier {
    Exact,
    /// `ABT`
    About,
    /// `CAL`
    Calculated,
    /// `EST`
    Estimated,
    /// `BEF`
    Before,
    /// `AFT`
    After,
    /// `BET .. AND ..`
    Between,
    /// `FROM .. TO ..`, or either half alone.
    Period,
    /// `INT .. (phrase)`
    Interpreted,
}

impl DateQualifier {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "ABT" | "ABOUT" | "CIRCA" | "C." => Some(Self::About),
            "CAL" => Some(Self::Calculated),
            "EST" => Some(Self::Estimated),
            "BEF" | "BEFORE" => Some(Self::Before),
            "AFT" | "AFTER" => Some(Self::After),
            "BET" | "BETWEEN" => Some(Self::Between),
            "FROM" | "TO" => Some(Self::Period),
            "INT" => Some(Self::Interpreted),
            _ => None,
        }
    }
}

/// A possibly partial point on the calendar: year is always known,
/// month and day may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarPoint {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,
}

impl CalendarPoint {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    /// Compare at the finest precision both points share. Returns `None`
    /// when the points agree on everything they both know.
    pub fn compare_known(&self, other: &CalendarPoint) -> Option<Ordering> {
        match self.year.cmp(&other.year) {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
        let (Some(m1), Some(m2)) = (self.month, other.month) else {
            return None;
        };
        match m1.cmp(&m2) {
            Ordering::Equal => {}
            ord => return Some(ord),
        }
        let (Some(d1), Some(d2)) = (self.day, other.day) else {
            return None;
        };
        match d1.cmp(&d2) {
            Ordering::Equal => None,
            ord => Some(ord),
        }
    }

    /// Whole years elapsed from `self` to `later`. Falls back to the plain
    /// year difference when month or day precision is missing.
    pub fn years_until(&self, later: &CalendarPoint) -> i32 {
        let mut years = later.year.saturating_sub(self.year);
        if let (Some(m1), Some(m2)) = (self.month, later.month) {
            let before_anniversary = match m2.cmp(&m1) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => matches!((self.day, later.day), (Some(d1), Some(d2)) if d2 < d1),
            };
            if before_anniversary {
                years = years.saturating_sub(1);
            }
        }
        years
    }

    /// Sort key with unknown month/day ordered first within a year.
    pub fn sort_key(&self) -> (i32, u8, u8) {
        (self.year, self.month.unwrap_or(0), self.day.unwrap_or(0))
    }
}

impl fmt::Display for CalendarPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(day) = self.day {
            write!(f, "{} ", day)?;
        }
        if let Some(name) = self
            .month
            .and_then(|m| usize::from(m).checked_sub(1))
            .and_then(|idx| MONTHS.get(idx))
        {
            write!(f, "{} ", name)?;
        }
        if self.year < 0 {
            write!(f, "{} BC", self.year.unsigned_abs())
        } else {
            write!(f, "{}", self.year)
        }
    }
}

/// A parsed GEDCOM `DATE` value. The raw text is always kept; `start` and
/// `end` are filled in only as far as the text could be understood, so an
/// unreadable date is still representable and compares as unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GedDate {
    pub raw: String,
    pub qualifier: DateQualifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<CalendarPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<CalendarPoint>,
}

impl GedDate {
    /// Parse a GEDCOM date value. Never fails: text that cannot be read
    /// yields a date with no calendar points.
    pub fn parse(raw: &str) -> GedDate {
        let raw = raw.trim().to_string();
        let upper = raw.to_uppercase();
        // Date phrases in parentheses carry no calendar information.
        let without_phrase = match upper.find('(') {
            Some(idx) => &upper[..idx],
            None => upper.as_str(),
        };
        let words: Vec<&str> = without_phrase.split_whitespace().collect();

        let (qualifier, rest) = match words.first().and_then(|w| DateQualifier::from_keyword(w)) {
            Some(q) => (q, &words[1..]),
            None => (DateQualifier::Exact, &words[..]),
        };

        let (start, end) = match qualifier {
            DateQualifier::Between => split_range(rest, &["AND", "-"]),
            DateQualifier::Period if words.first() == Some(&"TO") => (None, parse_point(rest)),
            DateQualifier::Period => split_range(rest, &["TO"]),
            _ => (parse_point(rest), None),
        };

        GedDate {
            raw,
            qualifier,
            start,
            end,
        }
    }

    /// The most representative calendar point: the start, or the end for
    /// open-ended periods such as `TO 1900`.
    pub fn point(&self) -> Option<CalendarPoint> {
        self.start.or(self.end)
    }

    pub fn year(&self) -> Option<i32> {
        self.point().map(|p| p.year)
    }

    /// True when the date is qualified, a range, or unreadable.
    pub fn is_approximate(&self) -> bool {
        self.qualifier != DateQualifier::Exact || self.start.is_none()
    }

    /// Narrative-friendly phrase, e.g. "in 1850", "around 1850",
    /// "on 3 MAR 1850".
    pub fn narrative_phrase(&self) -> String {
        let Some(point) = self.point() else {
            return "on an unknown date".to_string();
        };
        match self.qualifier {
            DateQualifier::About | DateQualifier::Calculated | DateQualifier::Estimated => {
                format!("around {}", point)
            }
            DateQualifier::Before => format!("before {}", point),
            DateQualifier::After => format!("after {}", point),
            DateQualifier::Between => match (self.start, self.end) {
                (Some(a), Some(b)) => format!("between {} and {}", a, b),
                _ => format!("around {}", point),
            },
            DateQualifier::Period => match (self.start, self.end) {
                (Some(a), Some(b)) => format!("from {} to {}", a, b),
                (Some(a), None) => format!("from {}", a),
                _ => format!("until {}", point),
            },
            DateQualifier::Exact | DateQualifier::Interpreted => {
                if point.day.is_some() {
                    format!("on {}", point)
                } else {
                    format!("in {}", point)
                }
            }
        }
    }
}

fn split_range(
    words: &[&str],
    separators: &[&str],
) -> (Option<CalendarPoint>, Option<CalendarPoint>) {
    match words.iter().position(|w| separators.contains(w)) {
        Some(idx) => (parse_point(&words[..idx]), parse_point(&words[idx + 1..])),
        None => (parse_point(words), None),
    }
}

fn parse_point(words: &[&str]) -> Option<CalendarPoint> {
    let mut day = None;
    let mut month = None;
    let mut year = None;

    for (i, word) in words.iter().enumerate() {
        if let Some(m) = month_number(word) {
            month = Some(m);
            continue;
        }
        if *word == "BC" || *word == "B.C." || *word == "BCE" {
            year = year.map(|y: i32| -y);
            continue;
        }
        // Dual dating such as 1750/51: the first year is the one we keep.
        let digits = word.split('/').next().unwrap_or(word);
        let Ok(n) = digits.parse::<i32>() else {
            continue;
        };
        let is_last = i + 1 == words.len();
        if digits.len() <= 2 && month.is_none() && !is_last && (1..=31).contains(&n) {
            day = Some(n as u8);
        } else {
            year = Some(n);
        }
    }

    let year = year.filter(|y: &i32| y.unsigned_abs() <= MAX_YEAR)?;
    let month = month.filter(|m| (1..=12).contains(m));
    Some(CalendarPoint {
        year,
        month,
        day: if month.is_some() { day } else { None },
    })
}

fn month_number(word: &str) -> Option<u8> {
    if word.len() < 3 || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let prefix = &word[..3];
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| idx as u8 + 1)
}
