//! Header filter expressions
//!
//! `Player:Carlsen,Nepo;Result:1-0` keeps games where either player name
//! contains "carlsen" or "nepo" AND the result is exactly 1-0. Matching is
//! case-insensitive. The single word `Interesting` selects decisive games
//! between strong players, or upsets.

use tracing::warn;

/// Keys compared for equality; every other key matches substrings
const EXACT_KEYS: [&str; 4] = ["result", "round", "date", "eco"];

/// One `Key:Value[,Value...]` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    key: String,
    values: Vec<String>,
}

impl Clause {
    fn matches(&self, headers: &[(String, String)]) -> bool {
        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.to_lowercase())
                .unwrap_or_default()
        };

        let fields: Vec<String> = match self.key.as_str() {
            "player" => vec![get("White"), get("Black")],
            "title" => vec![get("WhiteTitle"), get("BlackTitle")],
            _ => {
                let value = headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(&self.key))
                    .map(|(_, v)| v.to_lowercase())
                    .unwrap_or_default();
                vec![value]
            }
        };

        let exact = EXACT_KEYS.contains(&self.key.as_str());
        self.values.iter().any(|wanted| {
            fields.iter().any(|field| {
                if exact {
                    field == wanted
                } else {
                    field.contains(wanted.as_str())
                }
            })
        })
    }
}

/// A parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum GameFilter {
    /// Keeps every game
    All,
    /// Decisive games where both players are rated at least `rating`, or a
    /// player rated at least `rating` lost to one below it
    Interesting { rating: u32 },
    /// Every clause must match
    Clauses(Vec<Clause>),
}

impl GameFilter {
    /// Parses an expression; malformed clauses are logged and skipped
    pub fn parse(expression: &str, interesting_rating: u32) -> Self {
        let expression = expression.trim();
        if expression.is_empty() || expression.eq_ignore_ascii_case("none") {
            return GameFilter::All;
        }
        if expression == "Interesting" {
            return GameFilter::Interesting {
                rating: interesting_rating,
            };
        }

        let mut clauses = Vec::new();
        for item in expression.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((key, values)) = item.split_once(':') else {
                warn!(clause = item, "ignoring filter clause without 'Key:Value'");
                continue;
            };
            clauses.push(Clause {
                key: key.trim().to_lowercase(),
                values: values
                    .split(',')
                    .map(|v| v.trim().to_lowercase())
                    .filter(|v| !v.is_empty())
                    .collect(),
            });
        }
        GameFilter::Clauses(clauses)
    }

    pub fn matches(&self, headers: &[(String, String)]) -> bool {
        match self {
            GameFilter::All => true,
            GameFilter::Interesting { rating } => is_interesting(headers, *rating),
            GameFilter::Clauses(clauses) => clauses.iter().all(|c| c.matches(headers)),
        }
    }
}

fn is_interesting(headers: &[(String, String)], threshold: u32) -> bool {
    let get = |name: &str| headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
    let rating = |name: &str| get(name).and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(0);

    let white_strong = rating("WhiteElo") >= threshold;
    let black_strong = rating("BlackElo") >= threshold;

    match get("Result") {
        Some("1-0") => (white_strong && black_strong) || (black_strong && !white_strong),
        Some("0-1") => (white_strong && black_strong) || (white_strong && !black_strong),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_player_and_result() {
        let filter = GameFilter::parse("Player:Carlsen;Result:1-0", 2650);
        let game = headers(&[("White", "Carlsen, Magnus"), ("Black", "Caruana, Fabiano"), ("Result", "1-0")]);
        assert!(filter.matches(&game));

        let lost = headers(&[("White", "Carlsen, Magnus"), ("Black", "Caruana, Fabiano"), ("Result", "0-1")]);
        assert!(!filter.matches(&lost));

        let as_black = headers(&[("White", "So, Wesley"), ("Black", "CARLSEN, Magnus"), ("Result", "1-0")]);
        assert!(filter.matches(&as_black));
    }

    #[test]
    fn test_values_are_ored() {
        let filter = GameFilter::parse("Event:olympiad, candidates", 2650);
        assert!(filter.matches(&headers(&[("Event", "FIDE Candidates 2024")])));
        assert!(filter.matches(&headers(&[("Event", "44th Olympiad")])));
        assert!(!filter.matches(&headers(&[("Event", "Tata Steel")])));
    }

    #[test]
    fn test_exact_keys() {
        let filter = GameFilter::parse("Round:1", 2650);
        assert!(filter.matches(&headers(&[("Round", "1")])));
        assert!(!filter.matches(&headers(&[("Round", "11")])));

        let eco = GameFilter::parse("ECO:b90", 2650);
        assert!(eco.matches(&headers(&[("ECO", "B90")])));
        assert!(!eco.matches(&headers(&[("ECO", "B90a")])));

        let site = GameFilter::parse("Site:lichess", 2650);
        assert!(site.matches(&headers(&[("Site", "https://lichess.org/abc")])));
    }

    #[test]
    fn test_title_matches_either_side() {
        let filter = GameFilter::parse("Title:GM", 2650);
        assert!(filter.matches(&headers(&[("WhiteTitle", "IM"), ("BlackTitle", "GM")])));
        assert!(!filter.matches(&headers(&[("WhiteTitle", "FM")])));
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(GameFilter::parse("", 2650), GameFilter::All);
        assert_eq!(GameFilter::parse("None", 2650), GameFilter::All);
        assert!(GameFilter::parse("  ", 2650).matches(&[]));

        // the malformed clause is dropped, the rest still applies
        let filter = GameFilter::parse("garbage;Result:1/2-1/2", 2650);
        assert!(filter.matches(&headers(&[("Result", "1/2-1/2")])));
        assert!(!filter.matches(&headers(&[("Result", "1-0")])));
    }

    #[test]
    fn test_missing_header_never_matches() {
        let filter = GameFilter::parse("Annotator:Stockfish", 2650);
        assert!(!filter.matches(&headers(&[("White", "Stockfish")])));
    }

    #[test]
    fn test_interesting() {
        let filter = GameFilter::parse("Interesting", 2650);
        assert_eq!(filter, GameFilter::Interesting { rating: 2650 });

        let strong = headers(&[("WhiteElo", "2700"), ("BlackElo", "2660"), ("Result", "0-1")]);
        assert!(filter.matches(&strong));

        let strong_draw = headers(&[("WhiteElo", "2700"), ("BlackElo", "2660"), ("Result", "1/2-1/2")]);
        assert!(!filter.matches(&strong_draw));

        let upset = headers(&[("WhiteElo", "2400"), ("BlackElo", "2750"), ("Result", "1-0")]);
        assert!(filter.matches(&upset));

        let expected = headers(&[("WhiteElo", "2400"), ("BlackElo", "2750"), ("Result", "0-1")]);
        assert!(!filter.matches(&expected));

        let unrated = headers(&[("WhiteElo", "?"), ("Result", "1-0")]);
        assert!(!filter.matches(&unrated));

        let lower = GameFilter::parse("Interesting", 2000);
        assert!(lower.matches(&headers(&[("WhiteElo", "2100"), ("BlackElo", "2050"), ("Result", "1-0")])));
    }
}
