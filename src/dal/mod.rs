pub mod course_db;
pub mod job_db;
pub mod memory_db;
pub mod scraped_data_db;
pub mod store;
pub mod university_db;

pub use memory_db::MemoryStore;
pub use store::*;
