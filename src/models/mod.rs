pub mod health;
pub mod diagnostics;
pub mod error;
pub mod messages;
pub mod user;
pub mod room;
pub mod document;

pub use health::*;
pub use diagnostics::*;
pub use error::*;
pub use user::*;
pub use room::*;
pub use document::*;
