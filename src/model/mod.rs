pub mod events;
pub mod series;
pub mod tick;

pub use events::{
    Direction, LeveragedSeries, MoveEvent, RatioSample, RatioStats, RatioWindowSummary,
    ResponsePoint, StopTriggerEvent,
};
pub use series::TickSeries;
pub use tick::Tick;
