use std::fmt::Write as _;

use client_core::ListSnapshot;

pub fn render(snapshot: &ListSnapshot) -> String {
    let mut out = String::new();
    if snapshot.items.is_empty() {
        out.push_str("  (no todos yet)\n");
    }
    for (index, item) in snapshot.items.iter().enumerate() {
        let editing = snapshot.edit.as_ref().filter(|cursor| cursor.id == item.id);
        let marker = if editing.is_some() { '*' } else { ' ' };
        let _ = write!(out, "{marker}{:>3}. {}", index + 1, item.name);
        let _ = write!(out, "  [{}]", item.id);
        if let Some(cursor) = editing {
            let _ = write!(out, "  -> \"{}\"", cursor.buffer);
        }
        out.push('\n');
    }
    if !snapshot.draft_name.is_empty() {
        let _ = writeln!(out, "draft: \"{}\"", snapshot.draft_name);
    }
    out
}
