pub mod attendance_repo;
pub mod participants_repo;
pub mod schema;
