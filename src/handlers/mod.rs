pub mod health;
pub mod auth;
pub mod rooms;
pub mod documents;
pub mod diagnostics;

pub use health::*;
pub use auth::*;
pub use rooms::*;
pub use documents::*;
pub use diagnostics::*;
