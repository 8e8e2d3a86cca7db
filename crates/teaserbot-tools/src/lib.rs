//! Teaserbot Tools - assistant-callable functions and the store behind them
//!
//! Each tool is a self-contained struct in src/tools/.
//! To add a tool: implement the Tool trait there and register it below.

pub mod memory;
pub mod registry;
pub mod store;
pub mod tools;

pub use memory::MemoryStore;
pub use registry::{parse_args, Tool, ToolError, ToolRegistry};
pub use store::*;

use std::sync::Arc;

/// Names of the tools registered by [`create_default_registry`].
pub const BUILTIN_TOOLS: &[&str] = &[
    "award_points",
    "get_current_brainteaser",
    "get_leaderboard",
    "judge_solution",
    "list_solutions",
    "submit_brainteaser",
    "submit_solution",
    "update_brainteaser",
];

/// Create the registry with every builtin tool bound to `store`.
pub fn create_default_registry(store: Arc<dyn BrainteaserStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // --- Brainteasers ---
    registry.register(tools::brainteasers::SubmitBrainteaserTool::new(store.clone()));
    registry.register(tools::brainteasers::UpdateBrainteaserTool::new(store.clone()));
    registry.register(tools::brainteasers::CurrentBrainteaserTool::new(store.clone()));

    // --- Solutions ---
    registry.register(tools::solutions::SubmitSolutionTool::new(store.clone()));
    registry.register(tools::solutions::JudgeSolutionTool::new(store.clone()));
    registry.register(tools::solutions::ListSolutionsTool::new(store.clone()));

    // --- Scoring ---
    registry.register(tools::points::AwardPointsTool::new(store.clone()));
    registry.register(tools::points::LeaderboardTool::new(store));

    registry
}
