//! Device location resolution for the Lumigram engine.
//!
//! A [`LocationResolver`] walks an ordered chain of [`LocationProvider`]s:
//! typically a native platform service, a legacy in-host API and a
//! standards-based fallback. Each provider has its own availability check and
//! timeout. The first fix wins; failures fall through to the next provider
//! and only exhaustion of the whole chain is reported.
//!
//! Continuous tracking binds to the first provider able to open a watch and
//! stays with it until the returned [`LiveTracking`] handle is stopped or
//! dropped.

mod error;
mod fixed;
mod platform;
mod provider;
mod resolver;

#[doc(hidden)]
pub mod test_support;

pub use error::{LocationError, ProviderError};
pub use fixed::FixedProvider;
pub use platform::{PlatformFeed, PlatformProvider};
pub use provider::{
    DEFAULT_FALLBACK_TIMEOUT, DEFAULT_MAXIMUM_AGE, DEFAULT_PLATFORM_TIMEOUT, LocationProvider,
    LocationStream, ProviderOptions,
};
pub use resolver::{LiveTracking, LocationResolver};
