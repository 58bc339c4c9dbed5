pub mod linker;
pub mod queue;
pub mod worker;

pub use linker::{AutoLinkReport, AutoLinker};
pub use queue::{ChannelJobQueue, Job, JobQueue};
pub use worker::Worker;
