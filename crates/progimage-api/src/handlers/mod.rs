pub mod health;
pub mod image_create;
pub mod image_get;
