pub mod aggregate;
pub mod allocation;
pub mod attendance;
pub mod time;
pub mod users;

pub use allocation::TaskService;
pub use attendance::AttendanceService;
pub use users::UserDirectory;
