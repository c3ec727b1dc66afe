mod export;
mod helpers;
mod tile;
mod week;

pub(crate) use export::cmd_export;
pub(crate) use tile::{BlockOptions, cmd_add, cmd_delete, cmd_duplicate, cmd_edit, cmd_move};
pub(crate) use week::{cmd_groceries, cmd_nutrition, cmd_show, cmd_templates, parse_day};
