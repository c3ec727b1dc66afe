//! Keeping recurring templates in step with the tiles they came from.
//!
//! Templates are matched by `recurringId`. Templates written before ids existed
//! have none and are matched by exact label instead; two such templates on one
//! day with the same label are indistinguishable and both match.

use crate::ids::IdGenerator;
use crate::models::{Block, Day, RecurringTemplates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// OFF to ON
    Enabled,
    /// ON to ON
    Updated,
    /// ON to OFF
    Disabled,
    /// OFF to OFF
    Unchanged,
}

impl Transition {
    #[must_use]
    pub fn between(was_recurring: bool, is_recurring: bool) -> Self {
        match (was_recurring, is_recurring) {
            (false, true) => Transition::Enabled,
            (true, true) => Transition::Updated,
            (true, false) => Transition::Disabled,
            (false, false) => Transition::Unchanged,
        }
    }
}

/// Give a recurring block its join key, or strip it from a non-recurring one.
/// An existing key is never replaced.
pub fn assign_recurring_id(block: &mut Block, ids: &mut IdGenerator) {
    if !block.recurring {
        block.recurring_id = None;
    } else if block.recurring_id.is_none() {
        block.recurring_id = Some(ids.next_recurring_id());
    }
}

fn matches(template: &Block, key: &Block) -> bool {
    match (&template.recurring_id, &key.recurring_id) {
        (Some(t), Some(k)) => t == k,
        _ => template.label == key.label,
    }
}

/// Insert `block` as the day's template, replacing whatever matches any of `keys`.
/// The first match is replaced in place; further matches are dropped.
fn upsert(templates: &mut RecurringTemplates, day: Day, block: &Block, keys: &[&Block]) {
    let list = templates.day_mut(day);
    let mut replaced = false;
    list.retain_mut(|t| {
        if !keys.iter().any(|k| matches(t, k)) {
            return true;
        }
        if replaced {
            return false;
        }
        *t = block.clone();
        replaced = true;
        true
    });
    if !replaced {
        list.push(block.clone());
    }
}

/// Drop the day's templates matching `key`. Returns whether any were removed.
pub fn remove_template(templates: &mut RecurringTemplates, day: Day, key: &Block) -> bool {
    let list = templates.day_mut(day);
    let before = list.len();
    list.retain(|t| !matches(t, key));
    list.len() != before
}

/// Apply a save of `after` (previously `before`, if it existed) on `day`.
///
/// `after` must already have been through [`assign_recurring_id`].
pub fn sync_on_save(
    templates: &mut RecurringTemplates,
    day: Day,
    before: Option<&Block>,
    after: &Block,
) -> Transition {
    let was = before.is_some_and(|b| b.recurring);
    let transition = Transition::between(was, after.recurring);
    match transition {
        Transition::Enabled => upsert(templates, day, after, &[after]),
        Transition::Updated => {
            let mut keys = vec![after];
            if let Some(b) = before {
                keys.push(b);
            }
            upsert(templates, day, after, &keys);
        }
        Transition::Disabled => {
            if let Some(b) = before {
                remove_template(templates, day, b);
            }
        }
        Transition::Unchanged => {}
    }
    transition
}

/// Apply the deletion of `deleted` from `day`. Non-recurring blocks are ignored.
pub fn sync_on_delete(templates: &mut RecurringTemplates, day: Day, deleted: &Block) -> bool {
    if !deleted.recurring {
        return false;
    }
    remove_template(templates, day, deleted)
}
