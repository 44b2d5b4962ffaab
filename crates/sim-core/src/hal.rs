use thiserror::Error;

pub type PinId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PinFault {
    #[error("pin is not available on this board")]
    Unavailable,
    #[error("driver reported a fault")]
    DriverFault,
}

#[derive(Clone, Default, Debug)]
pub struct WriteStats {
    pub writes: u64,
    pub faults: u64,
    pub last_pin: Option<PinId>,
}

/// Pin-level collaborator every simulated peripheral writes through.
pub trait PinIo: Send {
    fn pin_is_valid(&self, pin: PinId) -> bool;
    fn write_pin(&mut self, pin: PinId, value: f64) -> Result<(), PinFault>;
    fn write_stats(&self) -> WriteStats;
}
