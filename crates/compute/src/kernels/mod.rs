// Host implementations of the compute kernels.

pub mod raymarch_op;
pub use raymarch_op::handle_raymarch;
pub mod sdf;
