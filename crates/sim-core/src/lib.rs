pub mod annunciator;
pub mod error;
pub mod hal;
pub mod hal_sim;
pub mod led;
pub mod limits;
pub mod object;
pub mod power;
pub mod registry;
pub mod scale_map;
pub mod servo;

pub use annunciator::{Annunciator, Indication, MasterCaution, SystemAnnunciator};
pub use error::{OutputError, SelfTestOutcome, SimError, SkipReason};
pub use hal::{PinFault, PinId, PinIo, WriteStats};
pub use hal_sim::{PinWrite, SimulatedPins, DEFAULT_HISTORY_LIMIT};
pub use led::{IntLed, LedConfig, RealLed, SimLed};
pub use limits::{LedLimits, Level, Setpoint, Unvalidated, Validated};
pub use object::{Peripheral, PinBound, PowerAware, SimObject};
pub use power::{PowerFlag, PowerSupply};
pub use registry::{AngleMapRegistry, AngleMapSource};
pub use scale_map::{ScaleMap, ScalePoint};
pub use servo::{ServoConfig, SimServo, UnresolvedServo, NO_REST_ANGLE};
