pub mod alias;
pub mod catalog;
pub mod order;
pub mod payment;
pub mod ports;
pub mod request;
pub mod signature;
pub mod status;
