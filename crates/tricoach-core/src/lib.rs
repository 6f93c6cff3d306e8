//! Training plan engine, session lifecycle, milestones, the coach mutation
//! protocol, refresh planning and the messaging-channel gateway.
//!
//! Every operation takes a `&dyn TrainingStore`; mutating operations also
//! take the process-wide [`AthleteLocks`] so that changes to one athlete's
//! sessions are serialized.

pub mod channel;
pub mod coach;
pub mod lock;
pub mod milestone;
pub mod onboarding;
pub mod planning;
pub mod refresh;
pub mod session;

pub use lock::AthleteLocks;
