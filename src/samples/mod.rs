pub mod lifecycle;
pub mod models;
pub mod qr;
pub mod report;
pub mod results;
pub mod services;
#[cfg(test)]
mod tests;
pub mod views;
