pub mod multipart;
pub mod naming;
pub mod spreadsheet;

pub use multipart::{UploadedFile, file_extension, read_file_field};
pub use naming::{export_timestamp, timestamped_file_name};
pub use spreadsheet::parse_participants;
