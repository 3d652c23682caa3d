use std::collections::BTreeMap;
use std::io::Read;

use crate::domain::request::GatewayParams;
use crate::error::{PaymentError, Result};

/// Reads recorded gateway feedback (one webhook payload per row) from a CSV source.
///
/// The header row names the gateway fields (`orderID`, `PAYID`, `STATUS`, ...).
/// Whitespace is trimmed and empty cells are kept as empty values.
pub struct FeedbackReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> FeedbackReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily yields one payload per row.
    pub fn payloads(self) -> impl Iterator<Item = Result<GatewayParams>> {
        self.reader
            .into_deserialize::<BTreeMap<String, String>>()
            .map(|row| row.map(GatewayParams::from).map_err(PaymentError::from))
    }
}
