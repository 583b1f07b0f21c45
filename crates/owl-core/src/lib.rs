pub mod habitica;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod sqlite;
pub mod workflows;
