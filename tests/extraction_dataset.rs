//! Extraction flow from raw statement lines to the persisted dataset.

use tempfile::TempDir;

use upi_statement_api::dataset::{find_latest_csv, write_csv};
use upi_statement_api::parser::{parse_statement_text, StatementFormat};
use upi_statement_api::models::TransactionDataset;

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

/// Two attachments' worth of text, the second containing one malformed block.
fn first_attachment() -> Vec<String> {
    lines(&[
        "Transaction Statement",
        "Jan 05, 2024",
        "10:30 AM",
        "Paid to John Doe",
        "UPI Ref 40012345",
        "",
        "DEBITED FROM",
        "Debit",
        "INR 1,200.50",
        "Jan 06, 2024",
        "09:15 PM",
        "Received from Acme Corp",
        "UPI Ref 40012399",
        "",
        "CREDITED TO",
        "Credit",
        "INR 25,000.00",
        "Page 1 of 1",
    ])
}

fn second_attachment() -> Vec<String> {
    lines(&[
        "Feb 01, 2024",
        "08:00 AM",
        "Paid to Grocery Store",
        "UPI Ref 40100001",
        "",
        "DEBITED FROM",
        "Debit",
        "INR abc", // malformed amount: block discarded, cursor advances by 1
        "Feb 02, 2024",
        "11:45 AM",
        "Paid to Coffee House",
        "UPI Ref 40100002",
        "",
        "DEBITED FROM",
        "Debit",
        "INR 320.00",
    ])
}

#[test]
fn records_accumulate_across_attachments_in_order() {
    let format = StatementFormat::default();
    let mut dataset = TransactionDataset::new();
    dataset.extend(parse_statement_text(&first_attachment(), &format));
    dataset.extend(parse_statement_text(&second_attachment(), &format));

    let descriptions: Vec<&str> = dataset
        .records()
        .iter()
        .map(|r| r.description.as_str())
        .collect();
    assert_eq!(descriptions, vec!["John Doe", "Acme Corp", "Coffee House"]);

    assert_eq!(dataset.records()[0].date_time, "Jan 05, 2024 10:30 AM");
    assert_eq!(dataset.records()[1].amount, 25000.00);
    assert_eq!(dataset.records()[2].txn_type, "Debit");
}

#[test]
fn dataset_persists_and_is_found_as_latest() {
    let format = StatementFormat::default();
    let mut dataset = TransactionDataset::new();
    dataset.extend(parse_statement_text(&first_attachment(), &format));

    let dir = TempDir::new().unwrap();
    let processed = dir.path().join("processed");
    let path = processed.join("unlabeled_transactions.csv");

    write_csv(&dataset, &path).unwrap();

    let latest = find_latest_csv(&processed).unwrap();
    assert_eq!(latest, Some(path.clone()));

    let content = std::fs::read_to_string(&path).unwrap();
    let mut csv_lines = content.lines();
    assert_eq!(csv_lines.next(), Some("Date & Time,Transaction,Type,Amount"));
    assert_eq!(
        csv_lines.next(),
        Some("\"Jan 05, 2024 10:30 AM\",John Doe,Debit,1200.5")
    );
    assert_eq!(
        csv_lines.next(),
        Some("\"Jan 06, 2024 09:15 PM\",Acme Corp,Credit,25000.0")
    );
    assert_eq!(csv_lines.next(), None);
}
