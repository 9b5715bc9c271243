pub mod backend;
pub mod encoding;
pub mod font;
pub mod layout;
pub mod outline;
