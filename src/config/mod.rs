mod rc;

pub use rc::RcConfig;
