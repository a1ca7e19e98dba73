//! SQLite persistence for the flyer catalog.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{info, warn};

use super::{CatalogError, Result};
use crate::classify::{keywords, text_from_filename, words_from_filename, MetadataDetector, MAX_URGENCY};
use crate::models::{CatalogRecord, ImageFile};
use crate::scan::ImageScanner;

/// Category used for images sitting directly in the catalog root.
pub const UNCATEGORIZED: &str = "sem_categoria";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS flyers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        categoria TEXT NOT NULL,
        subcategoria TEXT NOT NULL DEFAULT '',
        nome_arquivo TEXT NOT NULL,
        caminho_relativo TEXT NOT NULL,
        texto_extraido_nome TEXT NOT NULL DEFAULT '',
        palavras_chave TEXT NOT NULL DEFAULT '',
        data_processamento TEXT NOT NULL,
        tamanho_arquivo INTEGER NOT NULL DEFAULT 0,
        ano INTEGER,
        serie TEXT,
        plataforma TEXT,
        promocao TEXT,
        categoria_ia TEXT NOT NULL,
        tom_marketing TEXT NOT NULL,
        urgencia INTEGER NOT NULL DEFAULT 0 CHECK (urgencia BETWEEN 0 AND 10),
        hash_conteudo TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_flyers_categoria ON flyers(categoria, subcategoria);
    CREATE INDEX IF NOT EXISTS idx_flyers_hash ON flyers(hash_conteudo);
"#;

const INSERT: &str = r#"
    INSERT INTO flyers (
        categoria, subcategoria, nome_arquivo, caminho_relativo,
        texto_extraido_nome, palavras_chave, data_processamento,
        tamanho_arquivo, ano, serie, plataforma, promocao,
        categoria_ia, tom_marketing, urgencia, hash_conteudo
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
"#;

/// Outcome of [`CatalogRepository::rebuild`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Rows removed before inserting.
    pub deleted: usize,
    pub inserted: usize,
    /// Images that could not be read.
    pub errors: usize,
}

/// SQLite-backed flyer catalog.
///
/// A connection is opened per operation and dropped when it finishes.
pub struct CatalogRepository {
    db_path: PathBuf,
}

impl CatalogRepository {
    /// Open the catalog at `db_path`, creating the table if needed.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Replace the whole catalog with one row per image under `root`.
    ///
    /// Category and subcategory come from the first two directories below
    /// `root`. Deleting and inserting happen in a single transaction.
    pub fn rebuild(&self, root: &Path, detector: &MetadataDetector) -> Result<RebuildSummary> {
        if !root.is_dir() {
            return Err(CatalogError::RootMissing(root.to_path_buf()));
        }

        let images = ImageScanner::new(true).scan(root)?;
        let mut summary = RebuildSummary::default();
        let mut records = Vec::with_capacity(images.len());

        for image in &images {
            match build_record(root, image, detector) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping {}: {}", image.path.display(), e);
                    summary.errors += 1;
                }
            }
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        summary.deleted = tx.execute("DELETE FROM flyers", [])?;
        {
            let mut stmt = tx.prepare(INSERT)?;
            for record in &records {
                stmt.execute(params![
                    record.category,
                    record.subcategory,
                    record.file_name,
                    record.relative_path,
                    record.extracted_text,
                    record.keywords_joined(),
                    record.processed_at.to_rfc3339(),
                    record.file_size as i64,
                    record.year,
                    record.series,
                    record.platform,
                    record.promotion,
                    record.content_category,
                    record.tone,
                    i64::from(record.urgency),
                    record.content_hash,
                ])?;
                summary.inserted += 1;
            }
        }
        tx.commit()?;

        info!(
            "Catalog rebuilt: {} rows ({} removed, {} errors)",
            summary.inserted, summary.deleted, summary.errors
        );
        Ok(summary)
    }

    /// Every row, ordered by category, subcategory and path.
    pub fn all(&self) -> Result<Vec<CatalogRecord>> {
        self.query(
            "SELECT * FROM flyers ORDER BY categoria, subcategoria, caminho_relativo",
            &[],
        )
    }

    /// Rows whose extracted text, file name or keywords contain `term`.
    pub fn search(&self, term: &str) -> Result<Vec<CatalogRecord>> {
        let pattern = format!("%{}%", term);
        self.query(
            r#"
            SELECT * FROM flyers
            WHERE texto_extraido_nome LIKE ?1
               OR nome_arquivo LIKE ?1
               OR palavras_chave LIKE ?1
            ORDER BY categoria, subcategoria, caminho_relativo
            "#,
            &[&pattern],
        )
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM flyers", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Groups of rows sharing the same content hash.
    pub fn duplicates(&self) -> Result<Vec<Vec<CatalogRecord>>> {
        let rows = self.query(
            r#"
            SELECT * FROM flyers
            WHERE hash_conteudo IN (
                SELECT hash_conteudo FROM flyers
                GROUP BY hash_conteudo
                HAVING COUNT(*) > 1
            )
            ORDER BY hash_conteudo, caminho_relativo
            "#,
            &[],
        )?;

        let mut groups: Vec<Vec<CatalogRecord>> = Vec::new();
        for record in rows {
            match groups.last_mut() {
                Some(group) if group[0].content_hash == record.content_hash => group.push(record),
                _ => groups.push(vec![record]),
            }
        }
        Ok(groups)
    }

    fn query(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<CatalogRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(args, row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CatalogRecord> {
    Ok(CatalogRecord {
        id: row.get("id")?,
        category: row.get("categoria")?,
        subcategory: row.get("subcategoria")?,
        file_name: row.get("nome_arquivo")?,
        relative_path: row.get("caminho_relativo")?,
        extracted_text: row.get("texto_extraido_nome")?,
        keywords: CatalogRecord::split_keywords(&row.get::<_, String>("palavras_chave")?),
        processed_at: parse_datetime(&row.get::<_, String>("data_processamento")?),
        file_size: row.get::<_, i64>("tamanho_arquivo")?.max(0) as u64,
        year: row.get("ano")?,
        series: row.get("serie")?,
        platform: row.get("plataforma")?,
        promotion: row.get("promocao")?,
        content_category: row.get("categoria_ia")?,
        tone: row.get("tom_marketing")?,
        urgency: row.get::<_, i64>("urgencia")?.clamp(0, i64::from(MAX_URGENCY)) as u8,
        content_hash: row.get("hash_conteudo")?,
    })
}

/// Parse a stored timestamp, defaulting to the Unix epoch.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Build a catalog row for one image under `root`.
pub fn build_record(root: &Path, image: &ImageFile, detector: &MetadataDetector) -> Result<CatalogRecord> {
    let content = std::fs::read(&image.path).map_err(|source| CatalogError::Io {
        path: image.path.clone(),
        source,
    })?;

    let relative = image.path.strip_prefix(root).unwrap_or(&image.path);
    let dirs: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    let relative_path = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");

    let text = text_from_filename(&image.file_name);
    let meta = detector.detect(&words_from_filename(&image.file_name));

    Ok(CatalogRecord {
        id: 0,
        category: dirs.first().cloned().unwrap_or_else(|| UNCATEGORIZED.to_string()),
        subcategory: dirs.get(1).cloned().unwrap_or_default(),
        file_name: image.file_name.clone(),
        relative_path,
        keywords: keywords(&text),
        extracted_text: text,
        processed_at: Utc::now(),
        file_size: content.len() as u64,
        year: meta.year,
        series: meta.series,
        platform: meta.platform,
        promotion: meta.promotion,
        content_category: meta.content_category,
        tone: meta.tone,
        urgency: meta.urgency,
        content_hash: CatalogRecord::compute_hash(&content),
    })
}
