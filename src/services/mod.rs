pub mod compiled_rule;
pub mod droid;
pub mod extractor;
pub mod fetcher;
pub mod job_controller;
pub mod lease;
pub mod reconciler;
pub mod scheduler;

pub use compiled_rule::*;
pub use droid::*;
pub use extractor::*;
pub use fetcher::*;
pub use job_controller::*;
pub use lease::*;
pub use reconciler::*;
pub use scheduler::*;
