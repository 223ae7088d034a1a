pub mod shifts;
pub mod system;
