pub mod error;
pub mod kubernetes;
pub mod local;
pub mod platform;

pub use error::PlatformError;
pub use kubernetes::KubernetesPlatform;
pub use local::LocalPlatform;
pub use platform::Platform;
