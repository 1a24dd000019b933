//! Service layer

pub mod api2d;
pub mod auth;
pub mod feature_gate;
pub mod key_lifecycle;

pub use api2d::{Api2dClient, KeyAuthority, RemoteKeyDescriptor};
pub use auth::AuthService;
pub use feature_gate::FeatureGate;
pub use key_lifecycle::KeyLifecycleService;
