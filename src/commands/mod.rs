pub mod annotate;
pub mod extract;
