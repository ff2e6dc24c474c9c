mod billing;
mod kpi;
mod recommendation;

pub use billing::*;
pub use kpi::*;
pub use recommendation::*;
