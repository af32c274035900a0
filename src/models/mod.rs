pub mod bar;
pub mod quote;
pub mod stock;
