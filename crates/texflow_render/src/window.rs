//! Window management
//!
//! Cross-platform window creation via winit. In winit 0.30 windows must be
//! created inside `ApplicationHandler::resumed`, so this only builds the
//! attributes.

use winit::window::{Window, WindowAttributes};

pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "texflow".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

pub fn window_attributes(config: &WindowConfig) -> WindowAttributes {
    Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
}
