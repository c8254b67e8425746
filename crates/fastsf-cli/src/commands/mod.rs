pub mod compute;
pub mod partition;
