pub mod credit_writer;
pub mod payout_reader;
