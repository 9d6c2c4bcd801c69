pub mod camera_link;
pub mod crsf;
