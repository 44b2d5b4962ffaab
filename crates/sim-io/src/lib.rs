pub mod metrics;
pub mod protocol;
pub mod rig;
pub mod scenario;

pub use metrics::{init_metrics, render as render_metrics};
pub use protocol::{LedValue, OutcomeRecord, ProtocolVersion, RunSummary, Status, Step};
pub use rig::{Device, Rig};
pub use scenario::{Scenario, ScenarioError, ScenarioLoader, ServoSpec};
