pub mod horizontal_flip;
pub mod retiming;
