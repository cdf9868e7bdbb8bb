pub mod metrics;
pub mod monte_carlo;
pub mod orchestrator;
pub mod statistical;
pub mod valuation;
pub mod walk_forward;

pub use monte_carlo::{run_monte_carlo, run_monte_carlo_cancellable, MonteCarloConfig};
pub use orchestrator::BacktestOrchestrator;
pub use walk_forward::WalkForwardConfig;
