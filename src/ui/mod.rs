mod app;
pub mod image_loader;
pub mod kiosk;
pub mod shortcuts;
pub mod window_surface;

pub use app::run_kiosk;
pub use image_loader::{load_image, DecodedImage, ImageLoadError};
pub use kiosk::KioskView;
pub use shortcuts::{KioskAction, ShortcutManager};
pub use window_surface::{KioskEvent, SharedListener, WindowSurface};
