pub(crate) mod block;
pub(crate) mod frame;
pub(crate) mod motion;
pub(crate) mod mse;
pub(crate) mod plane;
