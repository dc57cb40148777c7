const COMPANY_NAME: &str = "company conformed name:";
const CIK: &str = "central index key:";
const FILED_AS_OF: &str = "filed as of date:";
const SUBMISSION_TYPE: &str = "conformed submission type:";

/// Labeled metadata from the SGML-ish header block. Missing labels leave
/// their field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    pub cik: String,
    pub filing_date: String,
    pub form_type: String,
    pub company_name: String,
}

impl HeaderFields {
    /// Capture any labels present on `line`. The last occurrence of a label wins.
    pub fn capture(&mut self, line: &str) {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(COMPANY_NAME) {
            self.company_name = rest.trim().to_string();
        }
        if let Some(rest) = after(line, CIK) {
            self.cik = rest.to_string();
        }
        if let Some(rest) = after(line, FILED_AS_OF) {
            self.filing_date = reformat_filing_date(rest).unwrap_or_default();
        }
        if let Some(rest) = after(line, SUBMISSION_TYPE) {
            self.form_type = rest.to_string();
        }
    }
}

fn after<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.split_once(label).map(|(_, rest)| rest.trim())
}

/// `YYYYMMDD` → `YYYY/MM/DD`. Anything after the eighth character is kept
/// behind the last separator. `None` for values shorter than eight characters.
pub fn reformat_filing_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.chars().count() < 8 {
        return None;
    }
    let year = raw.get(0..4)?;
    let month = raw.get(4..6)?;
    let day = raw.get(6..)?;
    Some(format!("{}/{}/{}", year, month, day))
}
