pub mod relay;
pub mod support;

pub use relay::ChatRelay;
pub use support::SupportService;
