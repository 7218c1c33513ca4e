pub const SCHEMA: &str = r#"
-- articles table (rows are written by the external crawler; the pipeline
-- reads them and only ever updates summary and tags)
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    url TEXT NOT NULL,
    source TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    published_at TEXT NOT NULL,
    crawled_at TEXT NOT NULL DEFAULT (datetime('now')),
    summary TEXT
);

CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at DESC);

-- tags table (reference list of topics; maintained by the admin UI)
CREATE TABLE IF NOT EXISTS tags (
    tag TEXT PRIMARY KEY,
    is_active INTEGER NOT NULL DEFAULT 1
);

-- daily_summaries table
CREATE TABLE IF NOT EXISTS daily_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    tag TEXT NOT NULL,
    summary TEXT NOT NULL,
    news_count INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(date, tag)
);

CREATE INDEX IF NOT EXISTS idx_daily_summaries_date ON daily_summaries(date);

-- users table (settings are edited elsewhere; the pipeline only reads)
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    interest_tags TEXT NOT NULL DEFAULT '[]',
    is_subscribed INTEGER NOT NULL DEFAULT 0,
    email_schedule_days TEXT NOT NULL DEFAULT '[]',
    email_schedule_time TEXT NOT NULL DEFAULT '08:00',
    ai_prompt TEXT
);

CREATE INDEX IF NOT EXISTS idx_users_is_subscribed ON users(is_subscribed);

-- email_queue table
CREATE TABLE IF NOT EXISTS email_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    sent_at TEXT,
    failure_reason TEXT
);

CREATE INDEX IF NOT EXISTS idx_email_queue_status ON email_queue(status);
"#;
