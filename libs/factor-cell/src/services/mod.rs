pub mod factor;

pub use factor::FactorService;
