pub mod contractor;
pub mod stats;

pub use contractor::{
    Contractor, ContractorFilter, ContractorPage, EnrichmentTargets, EnrichmentUpdate,
    NewContractor,
};
pub use stats::{CategoryCount, CityState, EnrichmentStats, StoreLocations, StoreStats};
