pub mod math;
pub mod sort;
pub mod text;
