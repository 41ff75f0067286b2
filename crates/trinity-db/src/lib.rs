// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod seed;
pub mod transfer;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tracing::debug;
use trinity_app::{
    AgreeOutcome, AgreeRejection, Comment, CommentId, Item, ItemDetail, ItemDraft, ItemId,
    ListQuery, PageResponse, User, UserId,
};

pub use transfer::{CSV_COLUMNS, ImportSummary};

pub const APP_NAME: &str = "trinity";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("users", &["id", "username", "is_admin", "created_at"]),
    (
        "items",
        &[
            "id",
            "name",
            "name_en",
            "field",
            "element1",
            "element2",
            "element3",
            "description",
            "element1_sacrifice_explanation",
            "element2_sacrifice_explanation",
            "element3_sacrifice_explanation",
            "hyperlink",
            "element1_image_url",
            "element2_image_url",
            "element3_image_url",
            "agree_count",
            "author_id",
            "created_at",
            "updated_at",
        ],
    ),
    ("agreements", &["user_id", "item_id", "created_at"]),
    (
        "comments",
        &["id", "item_id", "user_id", "content", "created_at"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_users_username",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users (username);",
    },
    RequiredIndex {
        name: "idx_items_created_at",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_items_created_at ON items (created_at DESC, id DESC);",
    },
    RequiredIndex {
        name: "idx_items_field",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_items_field ON items (field);",
    },
    RequiredIndex {
        name: "idx_agreements_item_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_agreements_item_id ON agreements (item_id);",
    },
    RequiredIndex {
        name: "idx_comments_item_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_comments_item_id ON comments (item_id);",
    },
];

const ITEM_COLUMNS: &str = "
  i.id, i.name, i.field, i.element1, i.element2, i.element3,
  i.element1_sacrifice_explanation, i.element2_sacrifice_explanation,
  i.element3_sacrifice_explanation, i.description, i.agree_count,
  (SELECT COUNT(*) FROM comments c WHERE c.item_id = i.id) AS comments_count,
  i.created_at
";

const DRAFT_COLUMNS: &str = "
  name, name_en, field, element1, element2, element3, description,
  element1_sacrifice_explanation, element2_sacrifice_explanation,
  element3_sacrifice_explanation, hyperlink,
  element1_image_url, element2_image_url, element3_image_url
";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            debug!("creating catalog schema");
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)
    }

    /// Insert the demo catalog and its `demo` user when the catalog is empty.
    /// Returns the number of items inserted.
    pub fn seed_demo_data(&self) -> Result<usize> {
        let author = self.ensure_user("demo")?;
        if self.item_count()? > 0 {
            return Ok(0);
        }
        let drafts = seed::demo_drafts();
        for draft in &drafts {
            self.create_item(draft, Some(author))?;
        }
        Ok(drafts.len())
    }

    pub fn create_user(&self, username: &str, is_admin: bool) -> Result<UserId> {
        let username = username.trim();
        if username.is_empty() {
            bail!("username is required -- pass a non-empty name");
        }
        if self.find_user(username)?.is_some() {
            bail!("user {username:?} already exists");
        }
        let now = timestamp_now()?;
        self.conn
            .execute(
                "INSERT INTO users (username, is_admin, created_at) VALUES (?, ?, ?)",
                params![username, is_admin, now],
            )
            .with_context(|| format!("insert user {username}"))?;
        Ok(UserId::new(self.conn.last_insert_rowid()))
    }

    pub fn ensure_user(&self, username: &str) -> Result<UserId> {
        match self.find_user(username)? {
            Some(user) => Ok(user.id),
            None => self.create_user(username, false),
        }
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, is_admin, created_at FROM users WHERE username = ?",
                params![username.trim()],
                |row| {
                    let created_at_raw: String = row.get(3)?;
                    Ok(User {
                        id: UserId::new(row.get(0)?),
                        username: row.get(1)?,
                        is_admin: row.get(2)?,
                        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load user {username}"))
    }

    pub fn create_item(&self, draft: &ItemDraft, author: Option<UserId>) -> Result<ItemId> {
        draft.validate()?;
        let now = timestamp_now()?;
        self.conn
            .execute(
                "
                INSERT INTO items (
                  name, name_en, field, element1, element2, element3, description,
                  element1_sacrifice_explanation, element2_sacrifice_explanation,
                  element3_sacrifice_explanation, hyperlink,
                  element1_image_url, element2_image_url, element3_image_url,
                  author_id, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    draft.name.trim(),
                    draft.name_en_or_default(),
                    draft.field.trim(),
                    draft.element1.trim(),
                    draft.element2.trim(),
                    draft.element3.trim(),
                    draft.description,
                    draft.element1_sacrifice_explanation,
                    draft.element2_sacrifice_explanation,
                    draft.element3_sacrifice_explanation,
                    draft.hyperlink.trim(),
                    draft.element1_image_url.trim(),
                    draft.element2_image_url.trim(),
                    draft.element3_image_url.trim(),
                    author.map(UserId::get),
                    now,
                    now,
                ],
            )
            .with_context(|| format!("insert item {}", draft.name.trim()))?;

        Ok(ItemId::new(self.conn.last_insert_rowid()))
    }

    pub fn update_item(&self, item_id: ItemId, draft: &ItemDraft) -> Result<()> {
        draft.validate()?;
        let now = timestamp_now()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE items
                SET
                  name = ?, name_en = ?, field = ?,
                  element1 = ?, element2 = ?, element3 = ?,
                  description = ?,
                  element1_sacrifice_explanation = ?,
                  element2_sacrifice_explanation = ?,
                  element3_sacrifice_explanation = ?,
                  hyperlink = ?,
                  element1_image_url = ?, element2_image_url = ?, element3_image_url = ?,
                  updated_at = ?
                WHERE id = ?
                ",
                params![
                    draft.name.trim(),
                    draft.name_en_or_default(),
                    draft.field.trim(),
                    draft.element1.trim(),
                    draft.element2.trim(),
                    draft.element3.trim(),
                    draft.description,
                    draft.element1_sacrifice_explanation,
                    draft.element2_sacrifice_explanation,
                    draft.element3_sacrifice_explanation,
                    draft.hyperlink.trim(),
                    draft.element1_image_url.trim(),
                    draft.element2_image_url.trim(),
                    draft.element3_image_url.trim(),
                    now,
                    item_id.get(),
                ],
            )
            .with_context(|| format!("update item {item_id}"))?;
        if rows_affected == 0 {
            bail!("item {item_id} not found -- choose an existing item and retry");
        }
        Ok(())
    }

    pub fn delete_item(&self, item_id: ItemId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM items WHERE id = ?", params![item_id.get()])
            .with_context(|| format!("delete item {item_id}"))?;
        if rows_affected == 0 {
            bail!("item {item_id} not found");
        }
        Ok(())
    }

    pub fn item_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .context("count items")?;
        Ok(count.max(0) as u64)
    }

    pub fn get_item(&self, item_id: ItemId) -> Result<Item> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ?"),
                params![item_id.get()],
                item_from_row,
            )
            .with_context(|| format!("load item {item_id}"))
    }

    pub fn item_detail(&self, item_id: ItemId) -> Result<Option<ItemDetail>> {
        let extra = self
            .conn
            .query_row(
                "
                SELECT i.name_en, i.hyperlink,
                  i.element1_image_url, i.element2_image_url, i.element3_image_url,
                  u.username
                FROM items i
                LEFT JOIN users u ON u.id = i.author_id
                WHERE i.id = ?
                ",
                params![item_id.get()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        non_empty(row.get(1)?),
                        [
                            non_empty(row.get(2)?),
                            non_empty(row.get(3)?),
                            non_empty(row.get(4)?),
                        ],
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()
            .with_context(|| format!("load item detail {item_id}"))?;

        let Some((name_en, hyperlink, element_image_urls, author)) = extra else {
            return Ok(None);
        };
        Ok(Some(ItemDetail {
            item: self.get_item(item_id)?,
            name_en,
            hyperlink,
            element_image_urls,
            author,
        }))
    }

    /// One page of items, newest first. Repeated calls with the same query
    /// return the same page while the catalog is unchanged.
    pub fn list_page(&self, query: &ListQuery) -> Result<PageResponse> {
        let query = query.clone().clamped();
        let mut filters = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(field) = &query.field {
            filters.push("i.field = ?");
            values.push(Value::Text(field.clone()));
        }
        if let Some(search) = &query.search {
            filters.push(
                "(i.name LIKE ? ESCAPE '\\' OR i.description LIKE ? ESCAPE '\\'
                  OR i.element1 LIKE ? ESCAPE '\\' OR i.element2 LIKE ? ESCAPE '\\'
                  OR i.element3 LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(search);
            values.extend(std::iter::repeat_n(Value::Text(pattern), 5));
        }

        let where_clause = if filters.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let total: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM items i {where_clause}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .context("count list query matches")?;

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items i {where_clause}
             ORDER BY i.created_at DESC, i.id DESC
             LIMIT ? OFFSET ?"
        );
        values.push(Value::Integer(i64::from(query.per_page)));
        values.push(Value::Integer(
            i64::try_from(query.offset()).context("list query offset overflow")?,
        ));

        let mut stmt = self.conn.prepare(&sql).context("prepare list query")?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), item_from_row)
            .context("run list query")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect list query rows")?;

        let shown = u64::from(query.page) * u64::from(query.per_page);
        let has_more = u64::try_from(total).unwrap_or(0) > shown;
        debug!(
            page = query.page,
            per_page = query.per_page,
            returned = items.len(),
            has_more,
            "list query"
        );
        Ok(PageResponse::new(items, query.page, has_more))
    }

    /// Distinct non-empty field labels, ascending.
    pub fn list_fields(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT field FROM items WHERE field <> '' ORDER BY field ASC")
            .context("prepare field list query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query fields")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect fields")
    }

    /// Record one agreement by `user` for the item with `raw_id`. At most one
    /// agreement per (user, item) is ever counted.
    pub fn agree(&self, user: Option<UserId>, raw_id: i64) -> Result<AgreeOutcome> {
        let Some(user) = user else {
            return Ok(AgreeOutcome::rejected(AgreeRejection::NotLoggedIn));
        };
        if raw_id <= 0 {
            return Ok(AgreeOutcome::rejected(AgreeRejection::InvalidId));
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin agree transaction")?;

        let user_exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)",
                params![user.get()],
                |row| row.get(0),
            )
            .context("check agreeing user")?;
        if !user_exists {
            return Ok(AgreeOutcome::rejected(AgreeRejection::NotLoggedIn));
        }

        let item_exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?)",
                params![raw_id],
                |row| row.get(0),
            )
            .context("check agreed item")?;
        if !item_exists {
            return Ok(AgreeOutcome::rejected(AgreeRejection::NotFound));
        }

        let now = timestamp_now()?;
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO agreements (user_id, item_id, created_at) VALUES (?, ?, ?)",
                params![user.get(), raw_id, now],
            )
            .context("record agreement")?;
        if inserted == 0 {
            return Ok(AgreeOutcome::rejected(AgreeRejection::AlreadyAgreed));
        }

        tx.execute(
            "UPDATE items SET agree_count = agree_count + 1 WHERE id = ?",
            params![raw_id],
        )
        .context("increment agree count")?;
        let count: i64 = tx
            .query_row(
                "SELECT agree_count FROM items WHERE id = ?",
                params![raw_id],
                |row| row.get(0),
            )
            .context("read agree count")?;
        tx.commit().context("commit agreement")?;

        Ok(AgreeOutcome::agreed(count.max(0) as u64))
    }

    pub fn has_agreed(&self, user: UserId, item_id: ItemId) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM agreements WHERE user_id = ? AND item_id = ?)",
                params![user.get(), item_id.get()],
                |row| row.get(0),
            )
            .with_context(|| format!("check agreement on item {item_id}"))
    }

    pub fn add_comment(
        &self,
        item_id: ItemId,
        user: Option<UserId>,
        content: &str,
    ) -> Result<CommentId> {
        let content = content.trim();
        if content.is_empty() {
            bail!("comment is empty -- write something and retry");
        }
        let exists: bool = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?)",
                params![item_id.get()],
                |row| row.get(0),
            )
            .context("check commented item")?;
        if !exists {
            bail!("item {item_id} not found -- cannot comment on a missing item");
        }

        let now = timestamp_now()?;
        self.conn
            .execute(
                "INSERT INTO comments (item_id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
                params![item_id.get(), user.map(UserId::get), content, now],
            )
            .context("insert comment")?;
        Ok(CommentId::new(self.conn.last_insert_rowid()))
    }

    pub fn list_comments(&self, item_id: ItemId) -> Result<Vec<Comment>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT c.id, c.item_id, COALESCE(u.username, 'anonymous'), c.content, c.created_at
                FROM comments c
                LEFT JOIN users u ON u.id = c.user_id
                WHERE c.item_id = ?
                ORDER BY c.created_at ASC, c.id ASC
                ",
            )
            .context("prepare comments query")?;
        let rows = stmt
            .query_map(params![item_id.get()], |row| {
                let created_at_raw: String = row.get(4)?;
                Ok(Comment {
                    id: CommentId::new(row.get(0)?),
                    item_id: ItemId::new(row.get(1)?),
                    author: row.get(2)?,
                    content: row.get(3)?,
                    created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query comments")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect comments")
    }

    /// The author of `item_id`, or `None` when the item does not exist.
    /// An item whose author was removed has `Some(None)`.
    pub fn item_author(&self, item_id: ItemId) -> Result<Option<Option<UserId>>> {
        self.conn
            .query_row(
                "SELECT author_id FROM items WHERE id = ?",
                params![item_id.get()],
                |row| Ok(row.get::<_, Option<i64>>(0)?.map(UserId::new)),
            )
            .optional()
            .with_context(|| format!("load author of item {item_id}"))
    }

    /// The editable record behind `item_id`.
    pub fn item_draft(&self, item_id: ItemId) -> Result<Option<ItemDraft>> {
        self.conn
            .query_row(
                &format!("SELECT {DRAFT_COLUMNS} FROM items WHERE id = ?"),
                params![item_id.get()],
                draft_from_row,
            )
            .optional()
            .with_context(|| format!("load draft of item {item_id}"))
    }

    /// The item a comment belongs to, or `None` for an unknown comment.
    pub fn comment_item(&self, comment_id: CommentId) -> Result<Option<ItemId>> {
        self.conn
            .query_row(
                "SELECT item_id FROM comments WHERE id = ?",
                params![comment_id.get()],
                |row| Ok(ItemId::new(row.get(0)?)),
            )
            .optional()
            .with_context(|| format!("load comment {comment_id}"))
    }

    pub fn delete_comment(&self, comment_id: CommentId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM comments WHERE id = ?", params![comment_id.get()])
            .with_context(|| format!("delete comment {comment_id}"))?;
        if rows_affected == 0 {
            bail!("comment {comment_id} not found");
        }
        Ok(())
    }

    /// Every item as an editable draft, oldest first.
    pub fn list_drafts(&self) -> Result<Vec<ItemDraft>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {DRAFT_COLUMNS} FROM items ORDER BY created_at ASC, id ASC"
            ))
            .context("prepare draft export query")?;
        let rows = stmt
            .query_map([], draft_from_row)
            .context("query drafts")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect drafts")
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("TRINITY_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set TRINITY_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("trinity.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn draft_from_row(row: &Row<'_>) -> rusqlite::Result<ItemDraft> {
    Ok(ItemDraft {
        name: row.get(0)?,
        name_en: row.get(1)?,
        field: row.get(2)?,
        element1: row.get(3)?,
        element2: row.get(4)?,
        element3: row.get(5)?,
        description: row.get(6)?,
        element1_sacrifice_explanation: row.get(7)?,
        element2_sacrifice_explanation: row.get(8)?,
        element3_sacrifice_explanation: row.get(9)?,
        hyperlink: row.get(10)?,
        element1_image_url: row.get(11)?,
        element2_image_url: row.get(12)?,
        element3_image_url: row.get(13)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let agree_count: i64 = row.get(10)?;
    let comments_count: i64 = row.get(11)?;
    let created_at_raw: String = row.get(12)?;
    Ok(Item {
        id: ItemId::new(row.get(0)?),
        name: row.get(1)?,
        field: non_empty(row.get(2)?),
        element1: row.get(3)?,
        element2: row.get(4)?,
        element3: row.get(5)?,
        element1_sacrifice_explanation: non_empty(row.get(6)?),
        element2_sacrifice_explanation: non_empty(row.get(7)?),
        element3_sacrifice_explanation: non_empty(row.get(8)?),
        description: non_empty(row.get(9)?),
        agree_count: agree_count.max(0) as u64,
        comments_count: comments_count.max(0) as u64,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point storage.db_path at a trinity database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; the database predates this version",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

/// Current UTC time with fixed-width fractional seconds, so stored
/// timestamps sort lexically in creation order.
fn timestamp_now() -> Result<String> {
    OffsetDateTime::now_utc()
        .to_offset(UtcOffset::UTC)
        .format(&format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
        ))
        .context("format current timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = OffsetDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}
