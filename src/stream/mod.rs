//! Stream combinators used by live subscriptions.

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
