//! Domain models shared by the services

pub mod notification;
pub mod profile;
pub mod task;
pub mod tracking;
pub mod user;

// Re-export for convenience
pub use notification::{DeviceToken, NewNotification, Notification};
pub use profile::{
    BiologicalSex, BiologicalType, Facet, FacetKind, FacetRecord, FemaleCycle, MaleEnergyPattern,
    MobilityProfile, SleepRoutine, TaskPreference, UserProfile,
};
pub use task::{DayCount, Priority, SyncOutcome, Task, TaskChanges, TaskDraft, TaskStatus};
pub use tracking::{CheckIn, NewCheckIn, NewWearableSample, WearableSample};
pub use user::{NewUser, PublicUser, User};
