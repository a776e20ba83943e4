//! Callback-payload codec.
//!
//! Button presses carry a short `action:argument` string. It is parsed into
//! a tagged variant at the router boundary; raw payload strings never travel
//! deeper into the system. Anything malformed maps to `Unknown`, which the
//! router answers and drops.

use std::fmt;

/// What a pressed button asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Navigate the current result list to a 0-based page.
    GoToPage(usize),
    /// Fetch the magnet link of the result at a 0-based global index.
    GetMagnet(usize),
    /// Discard the session and prompt for a fresh query.
    NewSearch,
    /// Show the pressing user's usage statistics.
    ShowStats,
    /// Unrecognized payload; ignored safely.
    Unknown,
}

const PAGE: &str = "page";
const GET_MAGNET: &str = "get_magnet";
const NEW_SEARCH: &str = "start_search";
const MY_STATS: &str = "my_stats";

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        match data.split_once(':') {
            None => match data {
                NEW_SEARCH => Self::NewSearch,
                MY_STATS => Self::ShowStats,
                _ => Self::Unknown,
            },
            Some((PAGE, n)) => n.parse().map(Self::GoToPage).unwrap_or(Self::Unknown),
            Some((GET_MAGNET, i)) => i.parse().map(Self::GetMagnet).unwrap_or(Self::Unknown),
            Some(_) => Self::Unknown,
        }
    }
}

/// `Display` renders the wire form, so buttons are built with `to_string()`.
impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoToPage(n) => write!(f, "{PAGE}:{n}"),
            Self::GetMagnet(i) => write!(f, "{GET_MAGNET}:{i}"),
            Self::NewSearch => f.write_str(NEW_SEARCH),
            Self::ShowStats => f.write_str(MY_STATS),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_payloads_round_trip() {
        for action in [
            CallbackAction::GoToPage(0),
            CallbackAction::GoToPage(17),
            CallbackAction::GetMagnet(3),
            CallbackAction::NewSearch,
            CallbackAction::ShowStats,
        ] {
            assert_eq!(CallbackAction::parse(&action.to_string()), action);
        }
    }

    #[test]
    fn wire_strings_are_stable() {
        assert_eq!(CallbackAction::parse("page:2"), CallbackAction::GoToPage(2));
        assert_eq!(
            CallbackAction::parse("get_magnet:0"),
            CallbackAction::GetMagnet(0)
        );
        assert_eq!(
            CallbackAction::parse("start_search"),
            CallbackAction::NewSearch
        );
    }

    #[test]
    fn malformed_payloads_parse_to_unknown() {
        for data in [
            "",
            "page",
            "page:",
            "page:-1",
            "page:two",
            "page:184467440737095516150",
            "get_magnet:x",
            "magnet:?xt=urn:btih:abc",
            "askuser:1:2",
            "drop table",
        ] {
            assert_eq!(CallbackAction::parse(data), CallbackAction::Unknown, "{data}");
        }
    }
}
