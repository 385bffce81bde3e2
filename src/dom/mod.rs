/// web-sys implementations of the page-facing traits
pub use observe::{Observation, observe};
pub use page::{DomPage, DomRow};
pub use timers::BrowserScheduler;

pub mod observe;
pub mod page;
pub mod timers;
