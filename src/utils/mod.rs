pub mod filename;
pub mod pdf;
