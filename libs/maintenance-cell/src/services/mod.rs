pub mod analysis;
pub mod scheduler;
