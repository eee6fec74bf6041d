/// UI views
///
/// - Card grid of the gallery entries (grid.rs)
/// - Modal dialogs and the overlay that hosts them (modal.rs)

pub mod grid;
pub mod modal;

use iced::widget::{container, image, text};
use iced::{ContentFit, Element, Length};

use crate::state::data::ImageEntry;
use crate::Message;

/// The entry's picture, or a placeholder when its URL isn't a local file
fn picture<'a>(entry: &ImageEntry, height: f32) -> Element<'a, Message> {
    match entry.local_path() {
        Some(path) => image(image::Handle::from_path(path))
            .content_fit(ContentFit::Cover)
            .width(Length::Fill)
            .height(Length::Fixed(height))
            .into(),
        None => container(text(entry.handle.name().to_string()).size(14))
            .center_x(Length::Fill)
            .center_y(Length::Fixed(height))
            .into(),
    }
}
