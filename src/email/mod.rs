mod mailer;
mod matcher;
mod queue;

pub use mailer::{HttpMailer, MailTransport};
pub use matcher::{enqueue_due_digests, find_due_subscribers};
pub use queue::{DeliveryQueue, DrainReport};
