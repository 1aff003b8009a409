//! Engine construction options and order-independent option sets.
//!
//! Options configure a whole engine instance, so two tasks may only share an
//! instance when their option sets are equal. Equality is by value and
//! ignores order and duplicates.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Time zone an engine evaluates its schedules in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// System local time.
    Local,
    /// Coordinated universal time.
    Utc,
    /// Fixed offset east of UTC, in seconds.
    Fixed {
        /// Seconds east of UTC.
        east_secs: i32,
    },
}

/// A single engine configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineOption {
    /// Specs carry a leading seconds field (6 fields instead of 5).
    Seconds,
    /// Evaluate schedules in the given location instead of local time.
    Location(Location),
    /// Catch panics raised by jobs and log them.
    Recover,
    /// Skip a trigger while the previous run of the same entry is still active.
    SkipIfStillRunning,
    /// Hold a trigger until the previous run of the same entry has finished.
    DelayIfStillRunning,
}

impl fmt::Display for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds => write!(f, "seconds"),
            Self::Location(Location::Local) => write!(f, "location=local"),
            Self::Location(Location::Utc) => write!(f, "location=utc"),
            Self::Location(Location::Fixed { east_secs }) => {
                write!(f, "location={east_secs:+}s")
            }
            Self::Recover => write!(f, "recover"),
            Self::SkipIfStillRunning => write!(f, "skip_if_still_running"),
            Self::DelayIfStillRunning => write!(f, "delay_if_still_running"),
        }
    }
}

/// Set of options an engine instance was created with.
///
/// The empty set is the default configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionSet(BTreeSet<EngineOption>);

impl OptionSet {
    /// The default (empty) configuration.
    pub const fn default_config() -> Self {
        Self(BTreeSet::new())
    }

    /// Build a set from a slice, collapsing duplicates.
    pub fn from_slice(options: &[EngineOption]) -> Self {
        options.iter().copied().collect()
    }

    /// True for the default configuration.
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no option is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the set contains `option`.
    pub fn contains(&self, option: &EngineOption) -> bool {
        self.0.contains(option)
    }

    /// Iterate options in their canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &EngineOption> {
        self.0.iter()
    }

    /// Location requested by the set; the last one in canonical order wins
    /// when several are present. Defaults to local time.
    pub fn location(&self) -> Location {
        self.0
            .iter()
            .rev()
            .find_map(|opt| match opt {
                EngineOption::Location(loc) => Some(*loc),
                _ => None,
            })
            .unwrap_or(Location::Local)
    }
}

impl FromIterator<EngineOption> for OptionSet {
    fn from_iter<I: IntoIterator<Item = EngineOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            return write!(f, "default");
        }
        let mut first = true;
        for opt in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{opt}")?;
            first = false;
        }
        Ok(())
    }
}
