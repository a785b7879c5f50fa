pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

// Re-export the engine surface the app composes
pub use models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, CatalogEntry, SchedulingError,
    ServiceType,
};
pub use services::{BookingService, ServiceCatalog};
