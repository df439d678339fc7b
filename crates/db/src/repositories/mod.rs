//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod attendance_repo;
pub mod device_event_repo;
pub mod door_access_repo;
pub mod temperature_log_repo;

pub use attendance_repo::AttendanceRepo;
pub use device_event_repo::DeviceEventRepo;
pub use door_access_repo::DoorAccessRepo;
pub use temperature_log_repo::TemperatureLogRepo;
