mod layout;

pub use layout::Layered;
