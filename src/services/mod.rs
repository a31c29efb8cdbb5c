pub mod attendance_service;
pub mod auth_service;
pub mod participants_service;
pub mod staff_service;
pub mod statistics_service;
