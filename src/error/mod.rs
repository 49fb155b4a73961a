mod satchel;

pub use satchel::{ErrorPage, SatchelError};
