pub mod batch;
pub mod predict;
pub mod status;
