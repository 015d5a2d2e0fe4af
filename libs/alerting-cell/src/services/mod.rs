pub mod dedup;
pub mod dispatcher;
pub mod sinks;
