pub mod dashboard;
pub mod notifier;

pub use dashboard::Dashboard;
pub use notifier::{Notice, NoticeLevel, Notifier};
