//! Slot extractors
//!
//! Stateless functions turning raw text into address phrases, tenant names
//! and canonical periods. The only shared state they read is the catalog
//! snapshot passed in by the caller.

pub mod addresses;
pub mod periods;
pub mod tenants;

pub use addresses::{extract_addresses, AddressSource, ExtractedAddress};
pub use periods::{
    extract_comparison_periods, extract_comparison_periods_at, extract_period_hint,
    extract_period_hint_at, extract_periods_at, local_today, normalize_period_string,
    parse_granularity, Period, PeriodHint, PeriodLevel,
};
pub use tenants::{extract_tenant_names, missing_tenant_references};
