use std::sync::LazyLock;

use regex::Regex;

const SPLITOFF_WORDS: &[&str] = &["splitoff", "split off", "split-off"];
const EXCHANGE_WORDS: &[&str] = &[
    "exchange offer",
    "tax-free exchange",
    "tax free exchange",
    "share exchange",
    "exchange of share",
    "exchange-of-share",
];
const STOCK_EXCHANGE_WORDS: &[&str] = &["stock exchange"];

static SPLITOFF_RE: LazyLock<Regex> = LazyLock::new(|| any_of(SPLITOFF_WORDS));
static EXCHANGE_RE: LazyLock<Regex> = LazyLock::new(|| any_of(EXCHANGE_WORDS));
static STOCK_EXCHANGE_RE: LazyLock<Regex> = LazyLock::new(|| any_of(STOCK_EXCHANGE_WORDS));

fn any_of(words: &[&str]) -> Regex {
    let alternation: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    Regex::new(&alternation.join("|")).expect("escaped literals always compile")
}

/// Number of lines mentioning each keyword family. A line counts once per
/// family however many times it repeats the phrase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordCounts {
    pub splitoff: u32,
    pub exchange: u32,
    pub stock_exchange: u32,
}

impl KeywordCounts {
    /// `line` must already be lower-cased.
    pub fn tally(&mut self, line: &str) {
        if SPLITOFF_RE.is_match(line) {
            self.splitoff += 1;
        }
        if EXCHANGE_RE.is_match(line) {
            self.exchange += 1;
        }
        if STOCK_EXCHANGE_RE.is_match(line) {
            self.stock_exchange += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(lines: &[&str]) -> KeywordCounts {
        let mut counts = KeywordCounts::default();
        for line in lines {
            counts.tally(line);
        }
        counts
    }

    #[test]
    fn families_are_independent() {
        let c = count(&["the stock exchange approved the exchange offer"]);
        assert_eq!(
            c,
            KeywordCounts {
                splitoff: 0,
                exchange: 1,
                stock_exchange: 1
            }
        );
    }

    #[test]
    fn each_spelling_of_splitoff_counts() {
        let c = count(&["a splitoff", "a split off", "a split-off", "a split"]);
        assert_eq!(c.splitoff, 3);
    }

    #[test]
    fn repeated_phrase_on_one_line_counts_once() {
        let c = count(&["share exchange, share exchange, tax free exchange"]);
        assert_eq!(c.exchange, 1);
    }

    #[test]
    fn punctuation_in_keywords_is_literal() {
        // "-" must not act as a character class or wildcard.
        let c = count(&["exchange of shares", "exchange-of-share", "exchangexofxshare"]);
        assert_eq!(c.exchange, 2);
    }

    #[test]
    fn order_does_not_matter() {
        let a = count(&["stock exchange", "exchange offer", "split off"]);
        let b = count(&["split off", "exchange offer", "stock exchange"]);
        assert_eq!(a, b);
    }
}
