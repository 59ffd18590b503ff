use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

use super::{render_empty, titled_block};
use crate::ui::app::App;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let p = app.palette();
    let types = &app.state.types;
    if types.is_empty() {
        render_empty(f, area, p, "Expense Types (0)", &["No types yet", "Press n to add one"]);
        return;
    }

    let items: Vec<ListItem> = types
        .iter()
        .enumerate()
        .skip(app.type_scroll)
        .take(area.height.saturating_sub(2) as usize)
        .map(|(i, name)| {
            let style = if i == app.type_index {
                p.selected_style()
            } else if i % 2 == 1 {
                p.alt_row_style()
            } else {
                p.normal_style()
            };
            ListItem::new(Line::from(Span::styled(format!("  {name}"), style)))
        })
        .collect();

    let list = List::new(items).block(titled_block(
        p,
        format!("Expense Types ({})", types.len()),
    ));
    f.render_widget(list, area);
}
