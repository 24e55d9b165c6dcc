pub mod add;
pub mod delete;
pub mod list;
pub mod set_default;
