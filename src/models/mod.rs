pub mod page;
pub mod payment;
pub mod response;
pub mod units;

pub use page::*;
pub use payment::*;
pub use response::*;
pub use units::*;
