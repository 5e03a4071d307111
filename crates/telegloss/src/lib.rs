pub mod agent;
pub mod content;
pub mod errors;
pub mod glossary;
pub mod imgbb;
pub mod marker;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod settings;
pub mod syntax;
pub mod systems;
pub mod telegram;
pub mod telegraph;
pub mod tools;
