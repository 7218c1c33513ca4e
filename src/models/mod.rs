mod article;
mod email;
mod subscriber;
mod summary;
mod tag;

pub use article::{Article, NewArticle};
pub use email::{EmailQueueItem, EmailStatus};
pub use subscriber::{weekday_code, Subscriber};
pub use summary::DailySummary;
pub use tag::Tag;
