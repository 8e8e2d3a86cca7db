//! Teaserbot Gateway - HTTP surface, chat bridge client, and daily scheduler

pub mod auth;
pub mod bridge;
pub mod scheduler;
pub mod server;

pub use auth::ResolvedAuth;
pub use bridge::{BridgeClient, LogOutbox};
pub use scheduler::DailySchedule;
pub use server::{build_orchestrator, router, start_gateway, AppState};
