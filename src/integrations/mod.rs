pub mod cloudinary;
pub mod google_sheets;
