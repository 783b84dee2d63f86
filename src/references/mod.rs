pub mod models;
#[cfg(test)]
mod tests;
pub mod views;
