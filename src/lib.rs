pub mod convert;
pub mod fiber;
pub mod field;
pub mod grid;
pub mod io;
pub mod logger;
pub mod pipeline;
pub mod report;
pub mod tensor;
pub mod voxelize;
pub mod warp;
