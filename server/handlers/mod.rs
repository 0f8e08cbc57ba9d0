pub mod control;
pub mod train;
