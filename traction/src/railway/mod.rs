pub mod airbrake;
pub mod car;
pub mod dispatch;
pub mod handles;
pub mod train;
