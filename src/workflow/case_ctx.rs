//! 请求处理上下文
//!
//! 封装"我正在处理哪个请求的哪个案件"这一信息，只用于日志

use std::fmt::Display;

use crate::models::CaseQuery;

/// 请求处理上下文
#[derive(Debug, Clone)]
pub struct CaseCtx {
    /// 进程内递增的请求编号
    pub request_id: u64,

    /// 案件简称，如 `Cr.A(SJ) 460/2006`
    pub label: String,
}

impl CaseCtx {
    pub fn new(request_id: u64, query: &CaseQuery) -> Self {
        Self {
            request_id,
            label: query.to_string(),
        }
    }
}

impl Display for CaseCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[请求 #{} 案件 {}]", self.request_id, self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CaseQueryRequest;

    #[test]
    fn display_names_request_and_case() {
        let query = CaseQuery::try_from(CaseQueryRequest::new(
            "Cr.A(SJ) - CRIMINAL APPEAL (SINGLE JUDGE)(24)",
            "460",
            "2006",
        ))
        .unwrap();
        let ctx = CaseCtx::new(7, &query);
        assert_eq!(ctx.to_string(), "[请求 #7 案件 Cr.A(SJ) 460/2006]");
    }
}
