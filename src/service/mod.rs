//! Service layer containing business logic orchestration.

mod compress_service;
mod hook_service;
mod session_service;
mod tracker;

pub use compress_service::CompressService;
pub use hook_service::HookService;
pub use session_service::SessionService;
pub use tracker::{resolve_session_id, SavingsTracker};
