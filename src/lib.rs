pub mod codec;
pub mod config;
pub mod dragdrop;
pub mod error;
pub mod export;
pub mod fs;
pub mod history;
pub mod import;
pub mod model;
pub mod path;
pub mod scanner;
pub mod service;
pub mod storage;
pub mod tree;
pub mod util;

pub use config::FavoritesConfig;
pub use error::FavoritesError;
pub use model::{DEFAULT_GROUP, FavoriteItem, Group};
pub use service::{FavoritesService, ServiceEvent};
pub use tree::{DeleteMode, GroupTree};
