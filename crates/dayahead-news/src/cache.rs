//! SQLite-based offline cache for headlines.

use std::path::Path;

use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tokio::sync::watch;

use crate::types::Article;

/// SQLite cache holding the last full headline batch.
pub struct ArticleCache {
    conn: Mutex<Connection>,
    tx: watch::Sender<Vec<Article>>,
}

impl ArticleCache {
    /// Create a new cache at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory cache (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        let articles = Self::read_all(&conn)?;
        let (tx, _) = watch::channel(articles);

        Ok(Self {
            conn: Mutex::new(conn),
            tx,
        })
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                source TEXT,
                url TEXT,
                category TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category);
            "#,
        )?;
        Ok(())
    }

    fn read_all(conn: &Connection) -> Result<Vec<Article>> {
        let mut stmt =
            conn.prepare("SELECT title, source, url, category FROM articles ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok(Article {
                title: row.get(0)?,
                source: row.get(1)?,
                url: row.get(2)?,
                category: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to read articles: {}", e))
    }

    /// Replace every stored article with `articles` in one transaction.
    ///
    /// The new batch is published while the connection is still held, so
    /// concurrent writers publish in commit order.
    pub fn replace_all(&self, articles: &[Article]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM articles", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO articles (title, source, url, category) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for article in articles {
                stmt.execute(params![
                    article.title,
                    article.source,
                    article.url,
                    article.category
                ])?;
            }
        }
        tx.commit()?;
        let stored = Self::read_all(&conn)?;

        tracing::debug!("Stored {} articles", stored.len());
        self.tx.send_replace(stored);
        Ok(())
    }

    /// Every stored article, in feed order.
    pub fn get(&self) -> Vec<Article> {
        self.tx.borrow().clone()
    }

    /// Stored articles for one category.
    pub fn articles_in(&self, category: &str) -> Vec<Article> {
        self.tx
            .borrow()
            .iter()
            .filter(|a| a.category == category)
            .cloned()
            .collect()
    }

    /// Subscribe to batch replacements; the current batch is delivered first.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Article>> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
