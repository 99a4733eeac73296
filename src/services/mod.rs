pub mod captcha_solver;
pub mod report_renderer;
pub mod result_extractor;

pub use captcha_solver::{CaptchaSolver, TesseractSolver};
pub use report_renderer::ReportRenderer;
pub use result_extractor::ResultExtractor;
