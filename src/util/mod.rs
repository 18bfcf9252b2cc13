//! Small size and layout helpers.

pub(crate) mod layout;
pub(crate) mod size;
