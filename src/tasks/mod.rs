pub mod console_task;
pub mod crsf_task;
pub mod perception_task;
