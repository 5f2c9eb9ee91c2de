pub mod insurance;

pub use insurance::InsuranceService;
