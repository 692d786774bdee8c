use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use keymapping::keymap::{KeyMap, KeyValue, KeyboardLayoutInfo};
use keymapping::keys::ModifierState;

fn value_cell(value: Option<&KeyValue>) -> Cell {
    let cell = match value {
        Some(KeyValue::Literal(s)) if s == " " => Cell::new("␠"),
        Some(KeyValue::Literal(s)) => Cell::new(s),
        Some(KeyValue::Dead { accent }) => {
            Cell::new(format!("dead {}", accent.as_deref().unwrap_or("?"))).fg(Color::Yellow)
        }
        Some(KeyValue::Unassigned) | None => Cell::new(""),
    };
    cell.set_alignment(CellAlignment::Center)
}

pub fn print_key_map(map: &KeyMap, only_assigned: bool) {
    // Only chords some key actually reports get a column.
    let columns: Vec<ModifierState> = ModifierState::ALL
        .iter()
        .copied()
        .filter(|m| {
            *m == ModifierState::None || map.iter().any(|e| e.value(*m).is_some())
        })
        .collect();

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Code").add_attribute(Attribute::Bold)];
    header.extend(columns.iter().map(|m| Cell::new(m).fg(Color::Cyan)));
    table.set_header(header);

    let mut shown = 0;
    for entry in map {
        if only_assigned && entry.is_unassigned() {
            continue;
        }
        let mut row = vec![Cell::new(entry.code).add_attribute(Attribute::Bold)];
        row.extend(columns.iter().map(|m| value_cell(entry.value(*m))));
        table.add_row(row);
        shown += 1;
    }

    println!("{}", table);
    println!("{} of {} keys shown", shown, map.len());
}

pub fn print_layout(layout: Option<&KeyboardLayoutInfo>) {
    let Some(layout) = layout else {
        println!("No active keyboard layout could be determined.");
        return;
    };

    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.add_row(vec![
        Cell::new("Id").add_attribute(Attribute::Bold),
        Cell::new(&layout.id),
    ]);
    table.add_row(vec![
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new(&layout.display_name),
    ]);
    println!("{}", table);
}
