//! Longest-prefix lookup over an opened [`PhoneIndex`].

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::binary::{primary_zone_name, PhoneIndex, ABSENT};

/// E.164 numbers carry at most 15 digits.
pub const MAX_DIGITS: usize = 15;

/// Clock style for [`Location::local_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    #[default]
    H12,
    H24,
}

/// Metadata merged along the matched prefix path.
///
/// Strings borrow from the index mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location<'a> {
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    /// Primary zone name (first `&` alternative)
    pub timezone: Option<&'a str>,
    /// Resolved zone; `None` with `timezone` set means the name is unresolvable
    #[serde(skip)]
    pub zone: Option<Tz>,
}

impl<'a> Location<'a> {
    /// "City, State", or whichever of the two is set.
    pub fn display_location(&self) -> Option<String> {
        match (self.city, self.state) {
            (Some(city), Some(state)) => Some(format!("{}, {}", city, state)),
            (Some(city), None) => Some(city.to_string()),
            (None, Some(state)) => Some(state.to_string()),
            (None, None) => None,
        }
    }

    /// Wall clock time in the resolved zone at `now`.
    pub fn local_time(&self, now: DateTime<Utc>, format: TimeFormat) -> Option<String> {
        let local = now.with_timezone(&self.zone?);
        let pattern = match format {
            TimeFormat::H12 => "%I:%M %p",
            TimeFormat::H24 => "%H:%M",
        };
        Some(local.format(pattern).to_string())
    }
}

/// Outcome of a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupResult<'a> {
    /// No prefix of the number carries any data
    NotFound,
    /// The number was rejected without consulting the index
    InvalidInput { digits: usize },
    Found(Location<'a>),
}

impl<'a> LookupResult<'a> {
    pub fn location(&self) -> Option<&Location<'a>> {
        match self {
            LookupResult::Found(location) => Some(location),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, LookupResult::Found(_))
    }

    /// Text report as printed by `mitu lookup`, one item per line.
    ///
    /// A timezone name that did not resolve is still shown, followed by
    /// `Timezone: N/A` in place of the local time.
    pub fn report(&self, now: DateTime<Utc>, format: TimeFormat) -> String {
        let location = match self {
            LookupResult::InvalidInput { .. } => return "Invalid number: Too long.".to_string(),
            LookupResult::NotFound => return "No data found for this number.".to_string(),
            LookupResult::Found(location) => location,
        };

        let mut lines = vec!["(o>".to_string()];
        if let Some(place) = location.display_location() {
            lines.push(format!("Location: {}", place));
        }
        if let Some(name) = location.timezone {
            lines.push(format!("Timezone: {}", name));
            match location.local_time(now, format) {
                Some(time) => lines.push(format!("Local Time: {}", time)),
                None => lines.push("Timezone: N/A".to_string()),
            }
        }
        lines.join("\n")
    }
}

impl PhoneIndex {
    /// Look up a sanitized digit string.
    ///
    /// Walks from the root one digit at a time and stops at the first
    /// missing child, invalid child index, or non-digit. Each field takes
    /// the value of the deepest record on the path that sets it.
    pub fn lookup(&self, digits: &str) -> LookupResult<'_> {
        if digits.len() > MAX_DIGITS {
            return LookupResult::InvalidInput {
                digits: digits.len(),
            };
        }

        let mut node = 0;
        let mut city_off = ABSENT;
        let mut state_off = ABSENT;
        let mut tz_off = ABSENT;

        for b in digits.bytes() {
            if !b.is_ascii_digit() {
                break;
            }
            node = match self.child(node, (b - b'0') as usize) {
                Some(next) => next,
                None => break,
            };
            if let Some(record) = self.record_of(node) {
                if record.city_off != ABSENT {
                    city_off = record.city_off;
                }
                if record.state_off != ABSENT {
                    state_off = record.state_off;
                }
                if record.tz_off != ABSENT {
                    tz_off = record.tz_off;
                }
            }
        }

        if city_off == ABSENT && state_off == ABSENT && tz_off == ABSENT {
            return LookupResult::NotFound;
        }

        let field = |off: i32| (off != ABSENT).then(|| self.get_string(off));
        let timezone = field(tz_off).map(primary_zone_name);
        LookupResult::Found(Location {
            city: field(city_off),
            state: field(state_off),
            timezone,
            zone: timezone.and_then(|name| self.zone(name)),
        })
    }
}

/// Keep ASCII digits only, dropping leading zeros.
pub fn sanitize_digits(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .skip_while(|&c| c == '0')
        .collect()
}
