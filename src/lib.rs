pub mod aggregation;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod gateway;
pub mod notifications;
pub mod status;

#[cfg(test)]
mod test_support;
