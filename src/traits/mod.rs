pub mod executor;
pub mod operator;

pub use executor::GraphExecutor;
pub use operator::{Emitter, Operator, OperatorContext};
