pub mod case_ctx;
pub mod details;
pub mod page_outcome;
pub mod portal_form;
pub mod submit_loop;

pub use case_ctx::CaseCtx;
pub use details::fetch_case_html;
pub use page_outcome::{PageOutcome, ResultsKind};
pub use submit_loop::{ResultsPage, SubmitRetryLoop};
