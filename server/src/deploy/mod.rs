//! Deployment pipeline: lifecycle state machine, repository fetch,
//! process supervision, and the orchestrator that drives them.

pub mod fetch;
pub mod fsm;
pub mod orchestrator;
pub mod supervisor;
