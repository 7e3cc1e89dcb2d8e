mod bus;
mod handlers;
mod types;

pub use bus::{BusStatusDisplay, EventBus, EventReceiver};
pub use handlers::ConsoleStatusHandler;
pub use types::{EventSequence, StatusEvent, StatusPayload, FAILURE_DISPLAY_MS, SUCCESS_DISPLAY_MS};
