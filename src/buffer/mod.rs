pub mod singleton;
pub mod vec;
