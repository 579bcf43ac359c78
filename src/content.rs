//! Site content: news feed and the enquiry audit trail.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::NewsConfig;

#[derive(Debug, Clone, Serialize)]
pub struct NewsItem {
    pub id: u64,
    pub title: String,
    pub excerpt: String,
    pub date: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// One accepted enquiry, recorded before any delivery attempt so the
/// audit trail survives mail failures.
#[derive(Debug, Clone, Serialize)]
pub struct EnquiryRecord {
    pub id: String,
    pub product_id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub enquiry: String,
    pub issued_at: i64,
    pub to: String,
    pub cc: String,
    pub recorded_at: i64,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn news(&self) -> Vec<NewsItem>;

    async fn record_enquiry(&self, record: EnquiryRecord) -> anyhow::Result<()>;
}

/// Configuration-backed news plus an in-memory enquiry log.
pub struct MemoryContent {
    news: Vec<NewsItem>,
    enquiries: Mutex<Vec<EnquiryRecord>>,
}

impl MemoryContent {
    pub fn new(news: &[NewsConfig]) -> Self {
        Self {
            news: news
                .iter()
                .map(|n| NewsItem {
                    id: n.id,
                    title: n.title.clone(),
                    excerpt: n.excerpt.clone(),
                    date: n.date.clone(),
                    link: n.link.clone(),
                    thumbnail_url: n.thumbnail_url.clone(),
                })
                .collect(),
            enquiries: Mutex::new(Vec::new()),
        }
    }

    pub async fn enquiries(&self) -> Vec<EnquiryRecord> {
        self.enquiries.lock().await.clone()
    }
}

#[async_trait]
impl ContentStore for MemoryContent {
    async fn news(&self) -> Vec<NewsItem> {
        self.news.clone()
    }

    async fn record_enquiry(&self, record: EnquiryRecord) -> anyhow::Result<()> {
        self.enquiries.lock().await.push(record);
        Ok(())
    }
}
