pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

// Re-export the pieces the booking engine and the app compose
pub use models::{
    AvailabilityError, AvailabilityResponse, DateOutcome, SetAvailabilityRequest, SlotSet,
};
pub use services::availability::AvailabilityService;
