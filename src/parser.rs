//! Statement text parser
//!
//! Walks the lines extracted from one statement PDF and reconstructs
//! transaction records from a fixed 8-line positional layout. The layout is
//! brittle by construction: it encodes one observed statement format, and
//! behavioral parity with that format is the acceptance bar. Do not "fix"
//! the offsets, the stripping rules, or the recovery policy.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::models::TransactionRecord;

/// Matches the date line that opens a transaction block, e.g. "Jan 05, 2024".
static DATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) \d{2}, \d{4}$")
        .expect("date line pattern is valid")
});

/// Matches the direction prefix on the description line, e.g. "Paid to ".
static DESCRIPTION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(Paid to|Received from)\s*").expect("description prefix pattern is valid")
});

/// Positional grammar of one statement layout.
///
/// A block occupies exactly `block_len` consecutive lines starting at a line
/// matching `date_pattern`; the remaining fields sit at fixed offsets from
/// that line. Offsets between the named ones are filler and skipped.
#[derive(Debug, Clone)]
pub struct StatementFormat {
    pub date_pattern: Regex,
    pub description_prefix: Regex,
    pub block_len: usize,
    pub time_offset: usize,
    pub description_offset: usize,
    pub type_offset: usize,
    pub amount_offset: usize,
    /// Currency code stripped from the amount line before numeric parsing
    pub currency_code: String,
}

impl Default for StatementFormat {
    fn default() -> Self {
        Self {
            date_pattern: DATE_LINE.clone(),
            description_prefix: DESCRIPTION_PREFIX.clone(),
            block_len: 8,
            time_offset: 1,
            description_offset: 2,
            type_offset: 6,
            amount_offset: 7,
            currency_code: "INR".to_string(),
        }
    }
}

impl StatementFormat {
    /// Default layout with a different currency code.
    pub fn with_currency_code(currency_code: &str) -> Self {
        Self {
            currency_code: currency_code.to_string(),
            ..Self::default()
        }
    }

    /// Default layout with the configured currency code and description
    /// prefixes. Prefixes are matched case-insensitively at the start of the
    /// description line; an empty list disables stripping.
    pub fn with_rules(currency_code: &str, description_prefixes: &[String]) -> Self {
        Self {
            currency_code: currency_code.to_string(),
            description_prefix: prefix_pattern(description_prefixes),
            ..Self::default()
        }
    }
}

/// Build the anchored, case-insensitive alternation for the given prefixes.
fn prefix_pattern(prefixes: &[String]) -> Regex {
    if prefixes.is_empty() {
        // Matches nothing, so no stripping occurs
        return Regex::new(r"[^\s\S]").expect("empty-set pattern is valid");
    }
    let alternation = prefixes
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)^({})\s*", alternation)).expect("escaped prefix pattern is valid")
}

/// Parse an ordered sequence of statement text lines into transaction records.
///
/// Pure transformation: scans with a cursor, emitting one record per
/// recognized block in source order. Malformed blocks are logged and
/// discarded with the cursor advancing by exactly one line, so a wrong
/// fixed-offset assumption for one block never aborts the whole extraction.
/// A successful block advances the cursor by exactly `block_len` lines
/// without re-validating that the slice didn't overrun the next date line.
/// No matching blocks yields an empty vector, not an error.
pub fn parse_statement_text(lines: &[String], format: &StatementFormat) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !format.date_pattern.is_match(&lines[i]) {
            i += 1;
            continue;
        }

        match parse_block(lines, i, format) {
            Ok(record) => {
                records.push(record);
                i += format.block_len;
            }
            Err(reason) => {
                warn!(line = i, %reason, "skipping malformed block");
                i += 1;
            }
        }
    }

    if records.is_empty() {
        debug!("no transaction blocks found");
    }

    records
}

/// Parse one block starting at the date line at `start`.
///
/// Any failure (field out of range, unparseable amount) discards the block.
fn parse_block(
    lines: &[String],
    start: usize,
    format: &StatementFormat,
) -> std::result::Result<TransactionRecord, String> {
    let field = |offset: usize| -> std::result::Result<&str, String> {
        lines
            .get(start + offset)
            .map(|line| line.trim())
            .ok_or_else(|| format!("line {} out of range", start + offset))
    };

    let date = field(0)?;
    let time = field(format.time_offset)?;
    let txn_line = field(format.description_offset)?;
    let txn_type = field(format.type_offset)?;
    let amount_line = field(format.amount_offset)?;

    let amount = amount_line
        .replace(&format.currency_code, "")
        .replace(',', "")
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("amount {:?} did not parse: {}", amount_line, e))?;

    let description = format.description_prefix.replace(txn_line, "").to_string();

    Ok(TransactionRecord {
        date_time: format!("{} {}", date, time),
        description,
        txn_type: txn_type.to_string(),
        amount,
    })
}
