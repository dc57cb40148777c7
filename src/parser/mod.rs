pub mod header;
pub mod keywords;

use header::HeaderFields;
use keywords::KeywordCounts;

use crate::db::ExtractedFiling;

/// Result of one pass over a filing's normalized lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub header: HeaderFields,
    pub counts: KeywordCounts,
}

impl Extraction {
    pub fn into_filing(self, source_url: &str, category: &str) -> ExtractedFiling {
        ExtractedFiling {
            cik: self.header.cik,
            filing_date: self.header.filing_date,
            form_type: self.header.form_type,
            company_name: self.header.company_name,
            source_url: source_url.to_string(),
            splitoff_count: self.counts.splitoff,
            exchange_count: self.counts.exchange,
            stock_exchange_count: self.counts.stock_exchange,
            category: category.to_string(),
        }
    }
}

/// Trim trailing whitespace, lower-case, drop blank lines.
pub fn normalize(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Single scan: keyword tallies and header labels are checked on every line.
pub fn extract<S: AsRef<str>>(lines: &[S]) -> Extraction {
    let mut out = Extraction::default();
    for line in lines {
        let line = line.as_ref();
        out.counts.tally(line);
        out.header.capture(line);
    }
    out
}

/// Normalize a raw document body and run the extractor over it.
pub fn process_document(body: &str) -> Extraction {
    extract(&normalize(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILING: &str = "<SEC-DOCUMENT>0000123-20-000001.txt : 20200101\n\
        <SEC-HEADER>0000123-20-000001.hdr.sgml : 20200101\n\
        CONFORMED SUBMISSION TYPE:\t8-K   \n\
        FILED AS OF DATE:\t\t20200101\n\
        \n\
        FILER:\n\
        \tCOMPANY DATA:\t\n\
        \t\tCOMPANY CONFORMED NAME:\t\t\tACME CORP\n\
        \t\tCENTRAL INDEX KEY:\t\t\t0000123\n\
        </SEC-HEADER>\n\
        \n   \n\
        Item 8.01 Other Events. ACME announced a Split-Off of its widget unit\n\
        by way of an Exchange Offer.\n\
        Shares trade on the New York Stock Exchange.\n";

    #[test]
    fn normalize_lowercases_and_drops_blank_lines() {
        let lines = normalize("  Foo Bar  \n\n \t\nBAZ\t\n");
        assert_eq!(lines, vec!["  foo bar", "baz"]);
    }

    #[test]
    fn full_document_extraction() {
        let filing = process_document(FILING).into_filing("https://x.test/doc1.txt", "8-k");
        assert_eq!(filing.cik, "0000123");
        assert_eq!(filing.company_name, "acme corp");
        assert_eq!(filing.form_type, "8-k");
        assert_eq!(filing.filing_date, "2020/01/01");
        assert_eq!(filing.splitoff_count, 1);
        assert_eq!(filing.exchange_count, 1);
        assert_eq!(filing.stock_exchange_count, 1);
        assert_eq!(filing.source_url, "https://x.test/doc1.txt");
        assert_eq!(filing.category, "8-k");
    }

    #[test]
    fn one_line_can_hit_several_counters() {
        let e = extract(&["this stock exchange filing covers an exchange offer"]);
        assert_eq!(e.counts.stock_exchange, 1);
        assert_eq!(e.counts.exchange, 1);
        assert_eq!(e.counts.splitoff, 0);
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(process_document(""), Extraction::default());
    }

    #[test]
    fn extraction_is_independent_between_calls() {
        let first = extract(&["stock exchange", "central index key: 1"]);
        let second = extract(&["nothing"]);
        assert_eq!(first.counts.stock_exchange, 1);
        assert_eq!(second, Extraction::default());
    }
}
