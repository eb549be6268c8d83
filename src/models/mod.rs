pub mod staff;
pub mod office;
pub mod assignment;
pub mod visit;
pub mod vehicle;
pub mod purchase;
pub mod config;

pub use staff::*;
pub use office::*;
pub use assignment::*;
pub use visit::*;
pub use vehicle::*;
pub use purchase::*;
pub use config::*;
