//! Event mechanics: the `Event` contract and the pub/sub sink events are emitted to.
//!
//! Concrete events live with the domain that raises them; this crate only knows
//! how to carry them.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
