//! The lifecycle coordinator: a pure [`machine`] and the [`handlers`] that execute it.

mod error;
pub mod handlers;
pub mod machine;

pub use error::HandlerError;
pub use handlers::{Collaborators, Coordinator};
pub use machine::{Action, Event, Observation, Transition, transition};
