#[cfg(use_cl)]
pub mod opencl;
