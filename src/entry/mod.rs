mod component;
pub mod condition;
pub mod checksum;
mod delete;
mod directory;
pub mod file;
mod icon;
mod ini;
mod is_sig_key;
mod language;
pub mod location;
mod message;
mod permission;
pub mod registry;
pub mod run;
mod task;
mod r#type;

pub use component::Component;
pub use condition::Condition;
pub use delete::DeleteEntry;
pub use directory::Directory;
pub use file::File;
pub use icon::Icon;
pub use ini::Ini;
pub use is_sig_key::ISSigKey;
pub use language::Language;
pub use location::FileLocation;
pub use message::{Message, MessageEntry};
pub use permission::Permission;
pub use registry::RegistryEntry;
pub use run::RunEntry;
pub use task::Task;
pub use r#type::Type;
