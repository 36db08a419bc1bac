pub mod controller;
pub mod state;
pub mod sync_task;
pub mod ticker;

pub use controller::{ControllerSettings, StartContext, TimerController};
pub use state::{TimerStatus, TimerView};
