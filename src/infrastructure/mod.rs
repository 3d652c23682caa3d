pub mod in_memory;
pub mod scripted_gateway;
