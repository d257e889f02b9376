pub mod discussion;
pub mod docs;
pub mod model;
