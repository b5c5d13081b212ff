pub mod builder;
pub mod find;
pub mod index;
pub mod jobs;
pub mod library;
pub mod thumbnails;
pub mod tree;
