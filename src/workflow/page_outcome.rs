//! 提交后的页面判定
//!
//! 按固定优先级读取快照：结果标记 > 弹窗 > 拒绝文本 > 无记录文本

use crate::infrastructure::PageSnapshot;
use crate::utils::logging::truncate_text;
use crate::workflow::portal_form::{NO_RECORD_PHRASES, REJECTION_PHRASES};

/// 验证码通过后看到的页面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsKind {
    /// 有结果列表或案件详情
    Results,
    /// 门户提示查无此案
    NoRecords,
}

/// 一次提交的结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Accepted(ResultsKind),
    /// 验证码被拒，附带门户给出的提示
    Rejected(String),
}

impl PageOutcome {
    /// 判定页面状态；还看不出结论时返回 None
    pub fn classify(snapshot: &PageSnapshot) -> Option<Self> {
        if !snapshot.visible_markers.is_empty() {
            return Some(PageOutcome::Accepted(ResultsKind::Results));
        }

        if let Some(dialog) = snapshot.dialogs.iter().find(|d| !d.trim().is_empty()) {
            return Some(PageOutcome::Rejected(dialog.trim().to_string()));
        }

        let text = snapshot.body_text.to_lowercase();
        if let Some(phrase) = REJECTION_PHRASES.iter().find(|p| text.contains(*p)) {
            return Some(PageOutcome::Rejected((*phrase).to_string()));
        }

        if NO_RECORD_PHRASES.iter().any(|p| text.contains(p)) {
            return Some(PageOutcome::Accepted(ResultsKind::NoRecords));
        }

        None
    }
}

/// 用于诊断的页面摘要
pub fn describe(snapshot: &PageSnapshot) -> String {
    let body = snapshot.body_text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut state = truncate_text(&body, 300);
    if !snapshot.dialogs.is_empty() {
        state = format!("弹窗 {:?}; {}", snapshot.dialogs, state);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(body: &str, markers: &[&str], dialogs: &[&str]) -> PageSnapshot {
        PageSnapshot {
            body_text: body.to_string(),
            visible_markers: markers.iter().map(|m| m.to_string()).collect(),
            dialogs: dialogs.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn results_marker_wins_over_rejection_text() {
        let page = snapshot("Enter Verification Code", &["#showList"], &[]);
        assert_eq!(
            PageOutcome::classify(&page),
            Some(PageOutcome::Accepted(ResultsKind::Results))
        );
    }

    #[test]
    fn dialog_is_a_rejection() {
        let page = snapshot("", &[], &["Invalid Captcha"]);
        assert_eq!(
            PageOutcome::classify(&page),
            Some(PageOutcome::Rejected("Invalid Captcha".into()))
        );
    }

    #[test]
    fn rejection_text_is_case_insensitive() {
        let page = snapshot("Captcha does NOT match, try again", &[], &[]);
        assert_eq!(
            PageOutcome::classify(&page),
            Some(PageOutcome::Rejected("does not match".into()))
        );
    }

    #[test]
    fn no_records_counts_as_accepted() {
        let page = snapshot("Record Not Found", &[], &[]);
        assert_eq!(
            PageOutcome::classify(&page),
            Some(PageOutcome::Accepted(ResultsKind::NoRecords))
        );
    }

    #[test]
    fn quiet_page_is_inconclusive() {
        assert_eq!(PageOutcome::classify(&snapshot("Case Status", &[], &[])), None);
    }

    #[test]
    fn describe_collapses_whitespace_and_lists_dialogs() {
        let page = snapshot("a\n\n  b", &[], &["Wrong"]);
        assert_eq!(describe(&page), r#"弹窗 ["Wrong"]; a b"#);
    }
}
