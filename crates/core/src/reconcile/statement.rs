//! Bank statement parsing and normalization.
//!
//! Statements arrive as CSV exports from different banks with varying
//! header spellings. Parsing resolves the headers against a small alias
//! table, then normalizes each line into a `BankTransaction`. Parsing
//! is strict per line: a malformed line fails the whole statement with
//! its 1-based line number (the header is line 1).

use std::io::Read;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::ledger::error::LedgerError;

/// Accepted header spellings for the transaction ID column.
const TRANSACTION_ID_ALIASES: &[&str] = &["transaction_id", "transactionid", "txn_id", "id"];
/// Accepted header spellings for the amount column.
const AMOUNT_ALIASES: &[&str] = &["amount"];
/// Accepted header spellings for the date column.
const DATE_ALIASES: &[&str] = &["date", "value_date"];
/// Accepted header spellings for the optional reference column.
const REFERENCE_ALIASES: &[&str] = &["reference", "notes"];

/// Date formats tried in order when parsing the date column.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// A normalized bank statement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTransaction {
    /// The bank's transaction identifier.
    pub transaction_id: String,
    /// The transferred amount; always positive.
    pub amount: Decimal,
    /// The value date of the transfer.
    pub date: NaiveDate,
    /// Free-text reference or notes, if the statement carries one.
    pub reference: Option<String>,
}

/// Resolved column positions within one statement's header row.
struct ColumnMap {
    transaction_id: usize,
    amount: usize,
    date: usize,
    reference: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LedgerError> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.contains(&h.trim().to_ascii_lowercase().as_str()))
        };

        Ok(Self {
            transaction_id: find(TRANSACTION_ID_ALIASES).ok_or(LedgerError::MissingColumn {
                column: "transaction_id",
            })?,
            amount: find(AMOUNT_ALIASES).ok_or(LedgerError::MissingColumn { column: "amount" })?,
            date: find(DATE_ALIASES).ok_or(LedgerError::MissingColumn { column: "date" })?,
            reference: find(REFERENCE_ALIASES),
        })
    }
}

/// Parses a CSV bank statement into normalized transactions.
///
/// The first row must be a header. Lines are numbered from 1 including
/// the header, so the first data line is line 2.
///
/// # Errors
///
/// `MissingColumn` when a required column cannot be resolved from the
/// header, `MalformedStatementLine` for the first line that fails to
/// parse.
pub fn parse_statement<R: Read>(reader: R) -> Result<Vec<BankTransaction>, LedgerError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|err| LedgerError::MalformedStatementLine {
            line: 1,
            message: err.to_string(),
        })?
        .clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut transactions = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let line = index + 2;
        let record = record.map_err(|err| LedgerError::MalformedStatementLine {
            line,
            message: err.to_string(),
        })?;
        transactions.push(parse_line(&record, &columns, line)?);
    }

    debug!(lines = transactions.len(), "parsed bank statement");
    Ok(transactions)
}

fn parse_line(
    record: &csv::StringRecord,
    columns: &ColumnMap,
    line: usize,
) -> Result<BankTransaction, LedgerError> {
    let field = |index: usize, column: &str| {
        record
            .get(index)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| LedgerError::MalformedStatementLine {
                line,
                message: format!("missing {column}"),
            })
    };

    let transaction_id = field(columns.transaction_id, "transaction ID")?.to_string();

    let amount_text = field(columns.amount, "amount")?;
    let amount =
        Decimal::from_str(amount_text).map_err(|err| LedgerError::MalformedStatementLine {
            line,
            message: format!("invalid amount {amount_text:?}: {err}"),
        })?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::MalformedStatementLine {
            line,
            message: format!("amount must be positive, got {amount}"),
        });
    }

    let date_text = field(columns.date, "date")?;
    let date = parse_date(date_text).ok_or_else(|| LedgerError::MalformedStatementLine {
        line,
        message: format!("unrecognized date {date_text:?}"),
    })?;

    let reference = columns
        .reference
        .and_then(|index| record.get(index))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    Ok(BankTransaction {
        transaction_id,
        amount,
        date,
        reference,
    })
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}
