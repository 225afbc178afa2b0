pub mod brand_kits;
pub mod config;
pub mod content;
pub mod db;
pub mod editor;
pub mod errors;
pub mod generation;
pub mod history;
pub mod layout;
pub mod llm_client;
pub mod onepagers;
pub mod persistence;
pub mod render;
pub mod routes;
pub mod state;
pub mod templates;
