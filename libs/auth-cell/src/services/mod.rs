pub mod token;

pub use token::AuthService;
