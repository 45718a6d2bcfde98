// Domain models

mod network;
mod sensors;
mod snapshot;
mod storage;
mod system;

pub use network::{InterfaceInfo, NetIoCounters, NetIoRate, NetworkMetrics};
pub use sensors::{FanReading, SensorMetrics, TemperatureReading};
pub use snapshot::{CustomMetrics, DomainSample, Snapshot};
pub use storage::{DiskIoCounters, DiskIoRate, DiskMetrics, PartitionUsage};
pub use system::{
    CpuMetrics, CpuTimes, HostMetrics, LoadAverage, MemoryMetrics, SwapMetrics, percent_of,
};
