// Value model, rich types, the encoder registry, date/time text and errors.
pub mod datetime;
pub mod error;
pub mod registry;
pub mod rich;
pub mod value;
