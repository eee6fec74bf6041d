use iced::widget::{button, column, container, horizontal_space, row, scrollable, text};
use iced::{Alignment, Element, Length};
use iced_aw::Wrap;

use super::picture;
use crate::state::data::ImageEntry;
use crate::Message;

/// Card width in pixels
const CARD_WIDTH: f32 = 260.0;
/// Height of the picture inside a card
const CARD_IMAGE_HEIGHT: f32 = 320.0;
const SPACING: f32 = 16.0;

/// Wrapping grid of cards, one per entry.
/// `menu_open` is the card whose overflow menu is expanded.
pub fn view<'a>(entries: &'a [ImageEntry], menu_open: Option<usize>) -> Element<'a, Message> {
    if entries.is_empty() {
        return container(text("No images yet. Use \"Add image\" to upload one.").size(16))
            .center_x(Length::Fill)
            .padding(40)
            .into();
    }

    let cards = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| card(index, entry, menu_open == Some(index)))
        .collect();

    scrollable(
        Wrap::with_elements(cards)
            .spacing(SPACING)
            .line_spacing(SPACING),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .into()
}

fn card<'a>(index: usize, entry: &'a ImageEntry, menu_open: bool) -> Element<'a, Message> {
    // Clicking the picture opens the zoom modal
    let thumb = button(picture(entry, CARD_IMAGE_HEIGHT))
        .on_press(Message::OpenZoom(index))
        .padding(0)
        .style(button::text);

    let created = entry
        .created_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string();

    let footer = row![
        text(created).size(13),
        horizontal_space(),
        button(text("⋮").size(14))
            .on_press(Message::ToggleMenu(index))
            .style(button::secondary),
    ]
    .align_y(Alignment::Center);

    let mut content = column![thumb, footer].spacing(8);

    if menu_open {
        content = content.push(
            row![
                button(text("Edit"))
                    .on_press(Message::OpenEdit(index))
                    .width(Length::Fill),
                button(text("Delete"))
                    .on_press(Message::RequestDelete(index))
                    .style(button::danger)
                    .width(Length::Fill),
            ]
            .spacing(8),
        );
    }

    container(content)
        .width(Length::Fixed(CARD_WIDTH))
        .padding(8)
        .style(container::rounded_box)
        .into()
}
