use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Good,
    Bad,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Good => "good",
            Mood::Bad => "bad",
        }
    }
}

impl Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match on `good` / `bad`.
impl FromStr for Mood {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Mood::Good),
            "bad" => Ok(Mood::Bad),
            _ => Err(ParseMoodError(s.to_owned())),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct ParseMoodError(pub String);

impl Display for ParseMoodError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}' is not a mood", self.0)
    }
}

impl std::error::Error for ParseMoodError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_values_only() {
        assert_eq!("good".parse(), Ok(Mood::Good));
        assert_eq!("bad".parse(), Ok(Mood::Bad));
        for s in &["", "Good", "BAD", " good", "good ", "1", "null", "neutral"] {
            assert!(s.parse::<Mood>().is_err(), "{:?} should be rejected", s);
        }
    }

    #[test]
    fn displays_wire_name() {
        assert_eq!(Mood::Good.to_string(), "good");
        assert_eq!(serde_json::to_string(&Mood::Bad).unwrap(), "\"bad\"");
    }
}
