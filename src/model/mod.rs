//! Immutable, shared value types for the entity catalog.
//!
//! Plain `Debug + Clone` structs with opaque `String` cross-references
//! resolved through a catalog, never owning cycles.

pub mod course;
pub mod faculty;
pub mod room;
pub mod student;
pub mod timeslot;

pub use course::Course;
pub use faculty::Faculty;
pub use room::Room;
pub use student::Student;
pub use timeslot::TimeSlot;

pub type CourseId = String;
pub type FacultyId = String;
pub type RoomId = String;
pub type SlotId = String;
pub type StudentId = String;
pub type DeptId = String;

/// Wall-clock coordinate: two slots collide iff `(day, period)` coincide,
/// independent of which department's slot IDs are involved.
pub type Day = u32;
pub type Period = u32;
pub type WallClock = (Day, Period);
