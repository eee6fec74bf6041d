use iced::widget::{
    button, center, column, container, horizontal_space, image, mouse_area, opaque, row, stack,
    text,
};
use iced::{Color, Element, Length};

use super::picture;
use crate::state::gallery::{Gallery, Modal};
use crate::Message;

const DIALOG_WIDTH: f32 = 640.0;
const ZOOM_HEIGHT: f32 = 560.0;
const PREVIEW_HEIGHT: f32 = 360.0;

/// Show `dialog` centered over a dimmed `base`. Clicking the dimmed area
/// closes the modal.
pub fn overlay<'a>(
    base: impl Into<Element<'a, Message>>,
    dialog: Element<'a, Message>,
) -> Element<'a, Message> {
    stack![
        base.into(),
        opaque(
            mouse_area(center(opaque(dialog)).style(|_theme| container::Style {
                background: Some(Color { a: 0.8, ..Color::BLACK }.into()),
                ..container::Style::default()
            }))
            .on_press(Message::CloseModal)
        )
    ]
    .into()
}

/// Dialog for the active modal, None when closed
pub fn dialog(gallery: &Gallery) -> Option<Element<'_, Message>> {
    let content = match gallery.modal() {
        Modal::Closed => return None,
        Modal::Zoom { index } => zoom(gallery, *index)?,
        Modal::Upload | Modal::Edit { .. } => upload(gallery),
        Modal::ConfirmDelete { .. } => confirm_delete(gallery),
    };

    Some(
        container(content)
            .width(Length::Fixed(DIALOG_WIDTH))
            .padding(20)
            .style(container::rounded_box)
            .into(),
    )
}

fn zoom(gallery: &Gallery, index: usize) -> Option<Element<'_, Message>> {
    let entry = gallery.entries().get(index)?;

    Some(
        column![
            picture(entry, ZOOM_HEIGHT),
            row![horizontal_space(), close_button("Close")],
        ]
        .spacing(16)
        .into(),
    )
}

fn upload(gallery: &Gallery) -> Element<'_, Message> {
    let mut body = column![].spacing(12);

    match gallery.staged() {
        Some(staged) => {
            if let Some(preview) = &staged.preview {
                body = body.push(
                    image(image::Handle::from_path(preview.path()))
                        .width(Length::Fill)
                        .height(Length::Fixed(PREVIEW_HEIGHT)),
                );
            }
            body = body.push(text(staged.name.as_str()).size(14));
        }
        None => {
            body = body.push(text("No file selected").size(14));
        }
    }

    body = body.push(button(text("Choose file…")).on_press_maybe(
        (!gallery.is_busy()).then_some(Message::ChooseFile),
    ));

    let label = gallery.primary_label().unwrap_or("Upload");
    let status = if gallery.is_busy() { "Uploading…" } else { "" };

    let footer = row![
        text(status).size(14),
        horizontal_space(),
        close_button("Close"),
        button(text(label))
            .on_press_maybe(gallery.can_commit().then_some(Message::CommitUpload))
            .style(button::primary),
    ]
    .spacing(8);

    column![body, footer].spacing(20).into()
}

fn confirm_delete(gallery: &Gallery) -> Element<'_, Message> {
    let status = if gallery.is_busy() { "Deleting…" } else { "" };

    column![
        text("Are you sure you want to delete this image?").size(18),
        row![
            text(status).size(14),
            horizontal_space(),
            button(text("Confirm"))
                .on_press_maybe(gallery.can_commit().then_some(Message::ConfirmDelete))
                .style(button::danger),
            close_button("Cancel"),
        ]
        .spacing(8),
    ]
    .spacing(20)
    .into()
}

fn close_button(label: &str) -> iced::widget::Button<'_, Message> {
    button(text(label))
        .on_press(Message::CloseModal)
        .style(button::secondary)
}
