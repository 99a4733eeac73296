pub mod captcha;
pub mod case_query;
pub mod case_record;
pub mod report;

pub use captcha::CaptchaAttempt;
pub use case_query::{CaseQuery, CaseQueryRequest, YearField};
pub use case_record::{CaseRecord, Fields, SectionContent, Table};
pub use report::Report;
