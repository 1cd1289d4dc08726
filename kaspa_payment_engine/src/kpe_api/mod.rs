pub mod exchange_objects;
pub mod flow_objects;
pub mod payment_flow_api;
