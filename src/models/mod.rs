pub mod assignment;
pub mod employee;
pub mod productivity;
pub mod task;
