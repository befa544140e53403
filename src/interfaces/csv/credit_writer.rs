use crate::domain::credit::Credit;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct CreditRow<'a> {
    uri: &'a str,
    bank_account: &'a str,
    amount: String,
    status: String,
    description: &'a str,
}

/// Writes issued credits as CSV, one row per credit.
pub struct CreditWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CreditWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_credits<'a, I>(&mut self, credits: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Credit>,
    {
        for credit in credits {
            self.writer.serialize(CreditRow {
                uri: credit.uri.as_str(),
                bank_account: credit.bank_account.as_str(),
                amount: credit.amount.to_string(),
                status: credit.status.to_string(),
                description: credit.description.as_deref().unwrap_or_default(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
