use crate::application::payouts::PayoutFormData;
use crate::error::{PaymentError, Result};
use std::io::Read;

/// Reads payout rows (`bank_account,amount,description`) from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so a row without a description still parses and fails form validation
/// instead.
pub struct PayoutReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PayoutReader<R> {
    /// Creates a new `PayoutReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes payout rows.
    pub fn payouts(self) -> impl Iterator<Item = Result<PayoutFormData>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
