pub mod compile;
pub mod decode;
pub mod inspect;
pub mod pool_loader;
