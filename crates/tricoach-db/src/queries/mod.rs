pub mod conversations;
pub mod logs;
pub mod metrics;
pub mod milestones;
pub mod pairing;
pub mod plans;
pub mod profiles;
pub mod sessions;
