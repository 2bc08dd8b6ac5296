pub mod inspect;
pub mod process;
