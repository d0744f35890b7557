pub mod countdown;
pub mod domain;
pub mod session;
