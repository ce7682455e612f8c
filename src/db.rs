use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use crate::model::Template;

const DB_PATH: &str = "data/catalog.sqlite";

pub fn connect() -> Result<Connection> {
    std::fs::create_dir_all("data")?;
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS extracts (
            id         TEXT PRIMARY KEY,
            filename   TEXT NOT NULL,
            format     TEXT NOT NULL,
            text       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Structured template fields are JSON columns
        CREATE TABLE IF NOT EXISTS templates (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            required      TEXT NOT NULL,
            optional      TEXT NOT NULL,
            label_aliases TEXT NOT NULL,
            field_hints   TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS generated (
            id          TEXT PRIMARY KEY,
            template_id TEXT NOT NULL REFERENCES templates(id),
            extract_id  TEXT REFERENCES extracts(id),
            format      TEXT NOT NULL,
            html        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_generated_template ON generated(template_id);
        ",
    )?;
    Ok(())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ── Extracts ──

pub struct ExtractRow {
    pub id: String,
    pub filename: String,
    pub format: String,
    pub text: String,
}

pub fn insert_extract(
    conn: &Connection,
    filename: &str,
    format: &str,
    text: &str,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO extracts (id, filename, format, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, filename, format, text, now()],
    )?;
    Ok(id)
}

pub fn fetch_extract(conn: &Connection, id: &str) -> Result<Option<ExtractRow>> {
    let mut stmt =
        conn.prepare("SELECT id, filename, format, text FROM extracts WHERE id = ?1")?;
    let row = stmt
        .query_map([id], |row| {
            Ok(ExtractRow {
                id: row.get(0)?,
                filename: row.get(1)?,
                format: row.get(2)?,
                text: row.get(3)?,
            })
        })?
        .next()
        .transpose()?;
    Ok(row)
}

// ── Templates ──

/// Store a template, assigning a fresh id when it has none. Returns the id.
pub fn upsert_template(conn: &Connection, template: &Template) -> Result<String> {
    let id = template
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO templates (id, name, required, optional, label_aliases, field_hints, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             required = excluded.required,
             optional = excluded.optional,
             label_aliases = excluded.label_aliases,
             field_hints = excluded.field_hints",
        rusqlite::params![
            id,
            template.name,
            serde_json::to_string(&template.required)?,
            serde_json::to_string(&template.optional)?,
            serde_json::to_string(&template.label_aliases)?,
            serde_json::to_string(&template.field_hints)?,
            now(),
        ],
    )?;
    Ok(id)
}

type TemplateParts = (Template, String, String, String, String);

fn template_from_row(row: &rusqlite::Row) -> rusqlite::Result<TemplateParts> {
    Ok((
        Template {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            required: Vec::new(),
            optional: Vec::new(),
            label_aliases: Default::default(),
            field_hints: Default::default(),
        },
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn hydrate(parts: TemplateParts) -> Result<Template> {
    let (mut template, required, optional, aliases, hints) = parts;
    template.required = serde_json::from_str(&required)?;
    template.optional = serde_json::from_str(&optional)?;
    template.label_aliases = serde_json::from_str(&aliases)?;
    template.field_hints = serde_json::from_str(&hints)?;
    Ok(template)
}

pub fn fetch_template(conn: &Connection, id: &str) -> Result<Option<Template>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, required, optional, label_aliases, field_hints
         FROM templates WHERE id = ?1",
    )?;
    let parts = stmt
        .query_map([id], template_from_row)?
        .next()
        .transpose()?;
    parts.map(hydrate).transpose()
}

pub fn list_templates(conn: &Connection) -> Result<Vec<Template>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, required, optional, label_aliases, field_hints
         FROM templates ORDER BY created_at",
    )?;
    let rows = stmt
        .query_map([], template_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(hydrate).collect()
}

// ── Generated catalogs ──

pub struct GeneratedRow {
    pub id: String,
    pub template_id: String,
    pub extract_id: Option<String>,
    pub format: String,
    pub html: String,
}

pub fn insert_generated(
    conn: &Connection,
    template_id: &str,
    extract_id: Option<&str>,
    format: &str,
    html: &str,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO generated (id, template_id, extract_id, format, html, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![id, template_id, extract_id, format, html, now()],
    )?;
    Ok(id)
}

pub fn fetch_generated(conn: &Connection, id: &str) -> Result<Option<GeneratedRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, template_id, extract_id, format, html FROM generated WHERE id = ?1",
    )?;
    let row = stmt
        .query_map([id], |row| {
            Ok(GeneratedRow {
                id: row.get(0)?,
                template_id: row.get(1)?,
                extract_id: row.get(2)?,
                format: row.get(3)?,
                html: row.get(4)?,
            })
        })?
        .next()
        .transpose()?;
    Ok(row)
}

// ── Stats ──

pub struct Stats {
    pub extracts: i64,
    pub templates: i64,
    pub generated: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |table: &str| -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    };
    Ok(Stats {
        extracts: count("extracts")?,
        templates: count("templates")?,
        generated: count("generated")?,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn extract_round_trip() {
        let conn = memory_conn();
        let id = insert_extract(&conn, "list.pdf", "pdf", "Widget A\nrow").unwrap();
        let row = fetch_extract(&conn, &id).unwrap().unwrap();
        assert_eq!(row.filename, "list.pdf");
        assert_eq!(row.text, "Widget A\nrow");
        assert!(fetch_extract(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn template_round_trip_assigns_id() {
        let conn = memory_conn();
        let template = Template::new("spring");
        let id = upsert_template(&conn, &template).unwrap();
        let stored = fetch_template(&conn, &id).unwrap().unwrap();
        assert_eq!(stored.id.as_deref(), Some(id.as_str()));
        assert_eq!(stored.name, "spring");
        assert_eq!(stored.required, vec!["name"]);
        assert_eq!(stored.label_aliases, template.label_aliases);
        assert_eq!(stored.field_hints, template.field_hints);
    }

    #[test]
    fn upsert_keeps_existing_id() {
        let conn = memory_conn();
        let mut template = Template::new("spring");
        let id = upsert_template(&conn, &template).unwrap();
        template.id = Some(id.clone());
        template.name = "summer".to_string();
        let id2 = upsert_template(&conn, &template).unwrap();
        assert_eq!(id, id2);
        assert_eq!(list_templates(&conn).unwrap().len(), 1);
        assert_eq!(fetch_template(&conn, &id).unwrap().unwrap().name, "summer");
    }

    #[test]
    fn generated_round_trip() {
        let conn = memory_conn();
        let tpl_id = upsert_template(&conn, &Template::new("t")).unwrap();
        let id = insert_generated(&conn, &tpl_id, None, "html", "<html></html>").unwrap();
        let row = fetch_generated(&conn, &id).unwrap().unwrap();
        assert_eq!(row.template_id, tpl_id);
        assert_eq!(row.extract_id, None);
        assert_eq!(row.html, "<html></html>");
    }

    #[test]
    fn stats_count_rows() {
        let conn = memory_conn();
        insert_extract(&conn, "a.txt", "text", "x\ny").unwrap();
        upsert_template(&conn, &Template::new("t")).unwrap();
        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.extracts, 1);
        assert_eq!(stats.templates, 1);
        assert_eq!(stats.generated, 0);
    }
}
