pub mod feedback_reader;
pub mod order_reader;
pub mod order_writer;
