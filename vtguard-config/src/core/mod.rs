pub mod backup;
pub mod confirmation;
pub mod history;
pub mod logging;
pub mod permissions;
pub mod policy;
pub mod trash;

pub use backup::BackupConfig;
pub use confirmation::ConfirmationConfig;
pub use history::HistoryConfig;
pub use logging::LoggingConfig;
pub use permissions::PermissionsConfig;
pub use policy::PolicyConfig;
pub use trash::TrashConfig;
