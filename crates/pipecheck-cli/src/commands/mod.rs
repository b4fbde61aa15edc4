pub mod check;
pub mod expect;
pub mod rank;
