//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod accounts;
pub mod institution;
pub mod logging;
pub mod migration;
pub mod transactions;

pub use accounts::{build_view, AccountService};
pub use institution::InstitutionService;
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use transactions::merge_transactions;
