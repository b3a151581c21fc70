pub mod dispute_api;
pub mod errors;
pub mod order_flow_api;
pub mod quote_api;
