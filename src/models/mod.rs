pub mod attendance;
pub mod participant;
pub mod staff;

pub use attendance::{AttendanceRecord, AttendanceRow};
pub use participant::{normalize_id, Participant, ParticipantsRow};
pub use staff::{Role, StaffAccount, StaffDocument, StaffProfile};
