// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Catalog edits made on behalf of a user: items and comments. Permission
//! checks live here so the site and the CLI refuse the same things.

use anyhow::{Result, bail};
use trinity_app::{CommentId, ItemDraft, ItemId, User};
use trinity_db::Store;

/// Why an edit was refused. Refusals are answers, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    NotLoggedIn,
    NotFound,
    Forbidden,
    EmptyComment,
}

impl Refusal {
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotLoggedIn => "You must be logged in.",
            Self::NotFound => "Not found.",
            Self::Forbidden => "You do not have permission to change this.",
            Self::EmptyComment => "Comment cannot be empty.",
        }
    }

    pub const fn status(self) -> u16 {
        match self {
            Self::NotLoggedIn => 401,
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::EmptyComment => 400,
        }
    }
}

pub type Decision<T> = std::result::Result<T, Refusal>;

/// Flags that set one draft column each, in CSV column order.
pub const DRAFT_FLAGS: [&str; 14] = [
    "--name",
    "--name-en",
    "--field",
    "--element1",
    "--element2",
    "--element3",
    "--description",
    "--explain1",
    "--explain2",
    "--explain3",
    "--hyperlink",
    "--image1",
    "--image2",
    "--image3",
];

fn draft_slot<'a>(draft: &'a mut ItemDraft, flag: &str) -> Option<&'a mut String> {
    let slot = match flag {
        "--name" => &mut draft.name,
        "--name-en" => &mut draft.name_en,
        "--field" => &mut draft.field,
        "--element1" => &mut draft.element1,
        "--element2" => &mut draft.element2,
        "--element3" => &mut draft.element3,
        "--description" => &mut draft.description,
        "--explain1" => &mut draft.element1_sacrifice_explanation,
        "--explain2" => &mut draft.element2_sacrifice_explanation,
        "--explain3" => &mut draft.element3_sacrifice_explanation,
        "--hyperlink" => &mut draft.hyperlink,
        "--image1" => &mut draft.element1_image_url,
        "--image2" => &mut draft.element2_image_url,
        "--image3" => &mut draft.element3_image_url,
        _ => return None,
    };
    Some(slot)
}

/// Overwrite the columns named by `edits`, given as `(flag, value)`.
pub fn apply_edits(draft: &mut ItemDraft, edits: &[(String, String)]) -> Result<()> {
    for (flag, value) in edits {
        let Some(slot) = draft_slot(draft, flag) else {
            bail!("unknown item flag {flag:?}; expected one of {}", DRAFT_FLAGS.join(", "));
        };
        *slot = value.clone();
    }
    Ok(())
}

fn may_modify(actor: &User, author: Option<trinity_app::UserId>) -> bool {
    actor.is_admin || author == Some(actor.id)
}

pub fn add_item(store: &Store, actor: Option<&User>, draft: &ItemDraft) -> Result<Decision<ItemId>> {
    let Some(actor) = actor else {
        return Ok(Err(Refusal::NotLoggedIn));
    };
    Ok(Ok(store.create_item(draft, Some(actor.id))?))
}

/// Only the author or an admin may edit an item.
pub fn edit_item(
    store: &Store,
    actor: Option<&User>,
    item_id: ItemId,
    edits: &[(String, String)],
) -> Result<Decision<()>> {
    let Some(actor) = actor else {
        return Ok(Err(Refusal::NotLoggedIn));
    };
    let Some(author) = store.item_author(item_id)? else {
        return Ok(Err(Refusal::NotFound));
    };
    if !may_modify(actor, author) {
        return Ok(Err(Refusal::Forbidden));
    }
    let Some(mut draft) = store.item_draft(item_id)? else {
        return Ok(Err(Refusal::NotFound));
    };
    apply_edits(&mut draft, edits)?;
    store.update_item(item_id, &draft)?;
    Ok(Ok(()))
}

pub fn delete_item(store: &Store, actor: Option<&User>, item_id: ItemId) -> Result<Decision<()>> {
    let Some(actor) = actor else {
        return Ok(Err(Refusal::NotLoggedIn));
    };
    let Some(author) = store.item_author(item_id)? else {
        return Ok(Err(Refusal::NotFound));
    };
    if !may_modify(actor, author) {
        return Ok(Err(Refusal::Forbidden));
    }
    store.delete_item(item_id)?;
    Ok(Ok(()))
}

pub fn add_comment(
    store: &Store,
    actor: Option<&User>,
    item_id: ItemId,
    content: &str,
) -> Result<Decision<CommentId>> {
    let Some(actor) = actor else {
        return Ok(Err(Refusal::NotLoggedIn));
    };
    if store.item_author(item_id)?.is_none() {
        return Ok(Err(Refusal::NotFound));
    }
    if content.trim().is_empty() {
        return Ok(Err(Refusal::EmptyComment));
    }
    Ok(Ok(store.add_comment(item_id, Some(actor.id), content)?))
}

/// Comment removal is an admin action. Returns the item the comment was on.
pub fn delete_comment(
    store: &Store,
    actor: Option<&User>,
    comment_id: CommentId,
) -> Result<Decision<ItemId>> {
    let Some(actor) = actor else {
        return Ok(Err(Refusal::NotLoggedIn));
    };
    let Some(item_id) = store.comment_item(comment_id)? else {
        return Ok(Err(Refusal::NotFound));
    };
    if !actor.is_admin {
        return Ok(Err(Refusal::Forbidden));
    }
    store.delete_comment(comment_id)?;
    Ok(Ok(item_id))
}
