pub mod booking;
pub mod catalog;
pub mod lifecycle;

pub use booking::BookingService;
pub use catalog::ServiceCatalog;
pub use lifecycle::AppointmentLifecycleService;
