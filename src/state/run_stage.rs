/// Run stage definitions for tracking pipeline progress
///
/// This module defines every stage a scrape run passes through and which
/// moves between them are legal.
use std::fmt;

/// Represents the current stage of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    // ===== Active Stages =====
    /// Run has been created but nothing has happened yet
    Idle,

    /// URLs are being planned (link pagination fetches here)
    Planning,

    /// A page or batch of pages is being fetched
    Fetching,

    /// Fetched pages are being parsed into raw records
    Parsing,

    // ===== Collection Outcomes =====
    /// A product cap was reached and page iteration stopped early
    Capped,

    /// Every planned page was processed without reaching a cap
    Exhausted,

    // ===== Finishing Stages =====
    /// Raw records are being cleaned into products
    Cleaning,

    /// The run is complete
    Done,
}

impl RunStage {
    /// Returns true if the run may move from this stage to `next`
    ///
    /// Fetching and parsing alternate page by page, and a dry run skips
    /// cleaning entirely. Staying in the same stage is not a transition.
    pub fn can_transition_to(&self, next: Self) -> bool {
        use RunStage::*;

        matches!(
            (self, next),
            (Idle, Planning)
                | (Planning, Fetching)
                | (Planning, Parsing)
                | (Planning, Exhausted)
                | (Fetching, Parsing)
                | (Fetching, Exhausted)
                | (Parsing, Fetching)
                | (Parsing, Capped)
                | (Parsing, Exhausted)
                | (Capped, Cleaning)
                | (Exhausted, Cleaning)
                | (Capped, Done)
                | (Exhausted, Done)
                | (Cleaning, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Capped => "capped",
            Self::Exhausted => "exhausted",
            Self::Cleaning => "cleaning",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
