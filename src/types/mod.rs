//! Value types shared by the store, the lap index and live subscribers.

mod sample;
mod update_rate;

pub use sample::TelemetrySample;
pub use update_rate::UpdateRate;
