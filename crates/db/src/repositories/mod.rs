pub mod contractor_repo;

pub use contractor_repo::{ContractorRepo, DuplicateGroup, MergeOutcome};
