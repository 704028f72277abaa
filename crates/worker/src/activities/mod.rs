//! Activity adapters: one module per external collaborator, each exposing
//! an adapter struct, its wire input/output shapes, and the `rpc_activity!`
//! bindings that register with the worker pool.

pub mod binding;
pub mod core_store;
pub mod dns_backend;
pub mod external;
pub mod http;
pub mod incident_agent;
pub mod node_agent;
pub mod stalwart;

pub use binding::{activity_handler, activity_handler_driving, core_error_to_activity_error};
pub use http::RpcClient;
