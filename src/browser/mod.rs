pub mod chrome_session;
pub mod connection;
pub mod headless;
pub mod scripts;

pub use chrome_session::{ChromeLauncher, ChromeSession};
pub use connection::attach_to_browser;
pub use headless::launch_browser;
