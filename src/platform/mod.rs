// Platform-specific data sources

pub mod df;
pub mod dhcp;
pub mod host;
pub mod services;

// Re-exports
pub use df::{parse_df_output, read_disk_usage};
pub use dhcp::{parse_dhcp_leases, read_dhcp_leases};
pub use host::OsProvider;
pub use services::{parse_service_statuses, read_service_statuses};
