pub mod route;
pub mod train;
