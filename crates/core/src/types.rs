/// Campaign identifiers are random v4 UUIDs, generated at creation.
pub type CampaignId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
