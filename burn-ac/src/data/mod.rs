pub mod collect;
pub mod memory;
pub mod stream;
pub mod trajectory;

pub use memory::TrajectoryMemory;
pub use trajectory::{EpochFilter, SliceRequest, TrajectorySlice, TrajectorySource};
