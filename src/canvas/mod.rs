pub mod compositor;
pub mod source;
pub mod surface;
