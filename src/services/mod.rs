pub mod auth;
pub mod chat;
pub mod doctor;
pub mod exercise;
pub mod exercise_runner;
pub mod feed;
pub mod profile;
