use std::sync::Arc;

use crate::ai::{ChatApi, SummaryClient};
use crate::config::Config;
use crate::db::Repository;
use crate::digest::{Backfill, DigestAssembler, Orchestrator, TagDigestGenerator};
use crate::email::{DeliveryQueue, HttpMailer, MailTransport};
use crate::error::Result;

/// Wires the pipeline together: one repository, one chat client, one mail
/// transport, shared by the scheduler loops and the one-shot commands.
pub struct App {
    pub config: Config,
    pub repository: Arc<Repository>,
    pub chat: Arc<dyn ChatApi>,
    pub orchestrator: Orchestrator,
    pub backfill: Backfill,
    pub assembler: DigestAssembler,
    pub queue: Arc<DeliveryQueue>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);
        let chat: Arc<dyn ChatApi> = Arc::new(SummaryClient::new(&config.summary_api)?);
        let transport: Arc<dyn MailTransport> = Arc::new(HttpMailer::new(&config.mailer)?);

        let anchor_hour = config.schedule.anchor_hour;
        let generator = TagDigestGenerator::new(Arc::clone(&repository), Arc::clone(&chat));
        let orchestrator = Orchestrator::new(Arc::clone(&repository), generator, anchor_hour);
        let backfill = Backfill::new(Arc::clone(&repository), Arc::clone(&chat));
        let assembler = DigestAssembler::new(Arc::clone(&repository), anchor_hour);
        let queue = Arc::new(DeliveryQueue::new(Arc::clone(&repository), transport));

        Ok(Self {
            config: config.clone(),
            repository,
            chat,
            orchestrator,
            backfill,
            assembler,
            queue,
        })
    }
}
