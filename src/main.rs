use iced::widget::{button, column, container, horizontal_space, row, text, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod state;
mod storage;
mod sync;
mod ui;

use config::Config;
use error::StartupError;
use state::data::{ImageEntry, StagedFile};
use state::gallery::{Gallery, RefreshToken, UploadSession};
use state::preview::{self, IMAGE_EXTENSIONS};
use storage::local::LocalBucket;
use storage::ObjectStore;

/// Main application state
struct CloudGallery {
    /// Entries, modal and staged upload
    gallery: Gallery,
    /// Where the images live
    store: Arc<dyn ObjectStore>,
    config: Config,
    /// Card whose overflow menu is expanded
    menu_open: Option<usize>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User asked to reload the list
    Refresh,
    /// Background list fetch finished
    RefreshComplete(RefreshToken, Result<Vec<ImageEntry>, String>),
    OpenZoom(usize),
    OpenUpload,
    OpenEdit(usize),
    RequestDelete(usize),
    /// Expand or collapse a card's Edit/Delete menu
    ToggleMenu(usize),
    CloseModal,
    /// User clicked "Choose file…" in the upload/edit modal
    ChooseFile,
    /// Picked file was read and its preview rendered, for the modal
    /// session that asked for it
    FileStaged(UploadSession, Result<Arc<StagedFile>, String>),
    CommitUpload,
    UploadComplete(Result<(), String>),
    ConfirmDelete,
    DeleteComplete(Result<(), String>),
    DismissNotice,
}

impl CloudGallery {
    /// Create the application and start the first list fetch
    fn new(config: Config, store: Arc<dyn ObjectStore>) -> (Self, Task<Message>) {
        let mut app = CloudGallery {
            gallery: Gallery::new(config.prefix.clone()),
            store,
            config,
            menu_open: None,
        };
        let task = app.refresh();
        (app, task)
    }

    /// Re-list the whole prefix; local state is only a cache of the store
    fn refresh(&mut self) -> Task<Message> {
        let token = self.gallery.begin_refresh();
        Task::perform(
            sync::fetch_entries(Arc::clone(&self.store), self.gallery.prefix().to_string()),
            move |result| Message::RefreshComplete(token, result.map_err(|e| e.to_string())),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Refresh => self.refresh(),
            Message::RefreshComplete(token, result) => {
                if self.gallery.apply_refresh(token, result) {
                    // Positions may have shifted
                    self.menu_open = None;
                }
                Task::none()
            }
            Message::OpenZoom(index) => {
                self.menu_open = None;
                self.gallery.open_zoom(index);
                Task::none()
            }
            Message::OpenUpload => {
                self.menu_open = None;
                self.gallery.open_upload();
                Task::none()
            }
            Message::OpenEdit(index) => {
                self.menu_open = None;
                if let Some(entry) = self.gallery.entries().get(index).cloned() {
                    self.gallery.open_edit(entry);
                }
                Task::none()
            }
            Message::RequestDelete(index) => {
                self.menu_open = None;
                self.gallery.request_delete(index);
                Task::none()
            }
            Message::ToggleMenu(index) => {
                self.menu_open = if self.menu_open == Some(index) {
                    None
                } else {
                    Some(index)
                };
                Task::none()
            }
            Message::CloseModal => {
                self.gallery.close_modal();
                Task::none()
            }
            Message::ChooseFile => {
                // Show the native file picker dialog
                let file = FileDialog::new()
                    .set_title("Select an image")
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_file();

                let Some(path) = file else {
                    return Task::none();
                };

                let session = self.gallery.upload_session();
                Task::perform(
                    preview::stage_file(
                        path,
                        self.config.preview_dir.clone(),
                        self.config.preview_size,
                    ),
                    move |result| {
                        Message::FileStaged(session, result.map(Arc::new).map_err(|e| e.to_string()))
                    },
                )
            }
            Message::FileStaged(session, Ok(file)) => {
                self.gallery.stage_upload(session, file);
                Task::none()
            }
            Message::FileStaged(_, Err(error)) => {
                tracing::warn!("Could not stage file: {error}");
                self.gallery.report(format!("Could not open file: {error}"));
                Task::none()
            }
            Message::CommitUpload => match self.gallery.commit_upload() {
                Some(request) => Task::perform(
                    sync::upload(Arc::clone(&self.store), request),
                    |result| Message::UploadComplete(result.map_err(|e| e.to_string())),
                ),
                None => Task::none(),
            },
            Message::UploadComplete(result) => {
                if self.gallery.upload_finished(result) {
                    return self.refresh();
                }
                Task::none()
            }
            Message::ConfirmDelete => match self.gallery.confirm_delete() {
                Some(handle) => Task::perform(
                    sync::delete(Arc::clone(&self.store), handle),
                    |result| Message::DeleteComplete(result.map_err(|e| e.to_string())),
                ),
                None => Task::none(),
            },
            Message::DeleteComplete(result) => {
                if self.gallery.delete_finished(result) {
                    return self.refresh();
                }
                Task::none()
            }
            Message::DismissNotice => {
                self.gallery.dismiss_notice();
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let header = row![
            text("Gallery").size(32),
            horizontal_space(),
            button(text("Refresh"))
                .on_press(Message::Refresh)
                .style(button::secondary)
                .padding(10),
            button(text("Add image"))
                .on_press_maybe((!self.gallery.is_busy()).then_some(Message::OpenUpload))
                .padding(10),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let notice = self.gallery.notice().map(|notice| {
            container(
                row![
                    text(notice).size(14),
                    horizontal_space(),
                    button(text("Dismiss"))
                        .on_press(Message::DismissNotice)
                        .style(button::secondary),
                ]
                .align_y(Alignment::Center),
            )
            .padding(10)
            .width(Length::Fill)
            .style(container::rounded_box)
        });

        let content: Column<Message> = column![header]
            .push_maybe(notice)
            .push(ui::grid::view(self.gallery.entries(), self.menu_open))
            .spacing(20);

        let base = container(content)
            .padding(20)
            .width(Length::Fill)
            .height(Length::Fill);

        match ui::modal::dialog(&self.gallery) {
            Some(dialog) => ui::modal::overlay(base, dialog),
            None => base.into(),
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env()?;
    let bucket = LocalBucket::open(&config.bucket_dir)?;
    tracing::info!(
        bucket = %bucket.root().display(),
        prefix = %config.prefix,
        "Cloud Gallery starting"
    );
    let store: Arc<dyn ObjectStore> = Arc::new(bucket);

    iced::application("Cloud Gallery", CloudGallery::update, CloudGallery::view)
        .theme(CloudGallery::theme)
        .centered()
        .run_with(move || CloudGallery::new(config, store))?;

    Ok(())
}
