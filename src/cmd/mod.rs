//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled |
//! |------------|------------------|
//! | `connect`  | `Connect`        |
//! | `services` | `Services`       |
//! | `status`   | `Status`         |
//! | `report`   | `Report`         |
//! | `config`   | `Config`         |

pub mod config;
pub mod connect;
pub mod report;
pub mod services;
pub mod status;

pub use config::cmd_config;
pub use connect::cmd_connect;
pub use report::cmd_report;
pub use services::cmd_services;
pub use status::cmd_status;
