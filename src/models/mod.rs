pub mod attendance;
pub mod facility;
pub mod slot;

pub use attendance::{
    AttendanceInput, AttendanceRecord, AttendanceRequest, ClassAttendance, LabAttendance,
    deserialize_lenient_int, parse_date, parse_leading_int,
};
pub use facility::{ClassRoom, Facility, FacilityInput, FacilityRequest, Lab};
pub use slot::{EntityKind, Slot};
