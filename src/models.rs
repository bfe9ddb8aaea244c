use serde::{Deserialize, Serialize};

/// Column names of the persisted dataset, in fixed order.
///
/// These are also the JSON keys of each record in the `/extract-transactions`
/// response, so the serde renames below must stay in sync.
pub const DATASET_COLUMNS: [&str; 4] = ["Date & Time", "Transaction", "Type", "Amount"];

/// One transaction reconstructed from a statement block.
///
/// `date_time` joins the date and time source lines with a single space.
/// Immutable once appended to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "Date & Time")]
    pub date_time: String,
    #[serde(rename = "Transaction")]
    pub description: String,
    #[serde(rename = "Type")]
    pub txn_type: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
}

/// Ordered collection of transaction records produced by one extraction run.
///
/// Records accumulate in message-arrival order (oldest message first) then
/// block order within each attachment. Built in memory for the lifetime of
/// one extraction request; it has no longer-lived identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionDataset {
    records: Vec<TransactionRecord>,
}

impl TransactionDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the records parsed from one attachment, preserving order.
    pub fn extend(&mut self, records: Vec<TransactionRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names in persisted/response order.
    pub fn columns() -> &'static [&'static str] {
        &DATASET_COLUMNS
    }
}
