pub mod dates;
pub mod labels;
