pub mod command_utils;
pub mod file_utils;
