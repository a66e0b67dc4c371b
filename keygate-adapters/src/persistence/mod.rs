pub mod memory_unit_of_work;
pub mod postgres_unit_of_work;
