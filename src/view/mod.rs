pub mod app;
pub mod headless;
pub mod palette;
pub mod ui;

pub use app::App;
pub use headless::run_headless;
