mod charge;
pub mod composition;
mod count;
pub(crate) mod element;
pub mod errors;
mod mass_number;
pub mod mass_table;
